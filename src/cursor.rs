/// Points at the slot the next `memoize` call of a render pass uses.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct CallCursor(usize);

impl CallCursor {
    /// A cursor at the start of a pass.
    pub const fn new() -> Self {
        Self(0)
    }

    /// The current position.
    #[inline]
    pub fn position(&self) -> usize {
        self.0
    }

    /// Return the current position and move on to the next slot.
    #[inline]
    pub fn advance(&mut self) -> usize {
        let index = self.0;
        self.0 += 1;
        index
    }

    /// Check the final position of a pass against the slot count of the
    /// previous completed pass, if there was one.
    ///
    /// Returns the mismatching `(expected, actual)` pair.
    pub fn check(&self, previous: Option<usize>) -> Result<(), (usize, usize)> {
        match previous {
            Some(expected) if expected != self.0 => Err((expected, self.0)),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor() {
        let mut cursor = CallCursor::new();
        assert_eq!(cursor.advance(), 0);
        assert_eq!(cursor.advance(), 1);
        assert_eq!(cursor.position(), 2);
        assert_eq!(cursor.check(None), Ok(()));
        assert_eq!(cursor.check(Some(2)), Ok(()));
        assert_eq!(cursor.check(Some(3)), Err((3, 2)));
    }
}
