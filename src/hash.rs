use std::hash::Hash;
use std::panic::Location;

use siphasher::sip128::{Hasher128, SipHasher13};

/// Produce a 128-bit hash of a value.
#[inline]
pub fn hash<T: Hash + ?Sized>(value: &T) -> u128 {
    let mut state = SipHasher13::new();
    value.hash(&mut state);
    state.finish128().as_u128()
}

/// A hashed source location of a `memoize` call.
///
/// Two calls have the same site if and only if they come from the same line
/// and column of the same file, modulo hash collisions which are negligible
/// for 128-bit hashes.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct CallSite {
    /// The hash of the location.
    fingerprint: u128,
    /// The location itself, kept for diagnostics.
    location: &'static Location<'static>,
}

impl CallSite {
    /// Fingerprint a caller location.
    pub fn new(location: &'static Location<'static>) -> Self {
        let fingerprint = hash(&(location.file(), location.line(), location.column()));
        Self { fingerprint, location }
    }

    /// The 128-bit fingerprint of the site.
    #[inline]
    pub fn fingerprint(&self) -> u128 {
        self.fingerprint
    }

    /// The source location of the site.
    #[inline]
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

impl std::fmt::Debug for CallSite {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.location)
    }
}
