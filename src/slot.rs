//! Per-instance memoization slots.

use std::any::Any;

use crate::dependency::{self, Deps};
use crate::hash::CallSite;

/// A single memoization slot.
///
/// A slot starts out unpopulated, becomes populated once its producer
/// succeeded and is repopulated whenever its dependencies change. It is
/// dropped together with its table.
pub struct Slot {
    /// The call site that created the slot.
    site: CallSite,
    /// The dependency snapshot of the last computation.
    deps: Option<Deps>,
    /// The cached payload, `None` until the first computation succeeded.
    payload: Option<Box<dyn Any + Send>>,
    /// The type name of the payload, for diagnostics.
    payload_type: Option<&'static str>,
}

impl Slot {
    /// Create an unpopulated slot for a call site.
    fn new(site: CallSite) -> Self {
        Self { site, deps: None, payload: None, payload_type: None }
    }

    /// The call site that created the slot.
    pub fn site(&self) -> CallSite {
        self.site
    }

    /// Whether the slot holds a payload.
    pub fn is_populated(&self) -> bool {
        self.payload.is_some()
    }

    /// Whether the slot holds a payload of type `T`.
    pub fn holds<T: Any>(&self) -> bool {
        self.payload.as_ref().is_some_and(|payload| payload.is::<T>())
    }

    /// The type name of the payload, if any.
    pub fn payload_type(&self) -> Option<&'static str> {
        self.payload_type
    }

    /// Return a copy of the cached payload if it is still valid for `deps`.
    ///
    /// The payload is invalid if the slot is unpopulated, the dependencies
    /// changed or the payload is not a `T`.
    pub fn lookup<T>(&self, deps: Option<&Deps>) -> Option<T>
    where
        T: Clone + 'static,
    {
        let payload = self.payload.as_ref()?;
        if dependency::changed(self.deps.as_ref(), deps) {
            return None;
        }
        payload.downcast_ref::<T>().cloned()
    }

    /// Replace the payload and the dependency snapshot.
    pub fn store<T>(&mut self, payload: T, deps: Option<Deps>)
    where
        T: Send + 'static,
    {
        self.payload = Some(Box::new(payload));
        self.payload_type = Some(std::any::type_name::<T>());
        self.deps = deps;
    }
}

/// Why a slot could not be handed out.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SlotError {
    /// The table was destroyed.
    Destroyed,
    /// The requested index skips over slots that were never created.
    Skipped {
        /// The current length of the table.
        len: usize,
    },
}

/// The ordered slots of one component instance, indexed by call order.
#[derive(Default)]
pub struct SlotTable {
    slots: Vec<Slot>,
    destroyed: bool,
}

impl SlotTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of slots created so far.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slot was created so far.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether the table was destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Return the slot at `index`, creating it for `site` if `index` is the
    /// next free position.
    pub fn ensure_slot(
        &mut self,
        index: usize,
        site: CallSite,
    ) -> Result<&mut Slot, SlotError> {
        if self.destroyed {
            return Err(SlotError::Destroyed);
        }

        let len = self.slots.len();
        if index > len {
            return Err(SlotError::Skipped { len });
        }

        if index == len {
            self.slots.push(Slot::new(site));
        }

        Ok(&mut self.slots[index])
    }

    /// Release all slots and the payloads they hold.
    ///
    /// The table rejects all further visits.
    pub fn destroy(&mut self) {
        // Replace rather than clear so that the memory is released, too.
        self.slots = Vec::new();
        self.destroyed = true;
    }
}

#[cfg(test)]
mod tests {
    use std::panic::Location;
    use std::sync::Arc;

    use super::*;
    use crate::deps;

    #[track_caller]
    fn site() -> CallSite {
        CallSite::new(Location::caller())
    }

    #[test]
    fn test_ensure_slot_grows_in_order() {
        let mut table = SlotTable::new();
        let here = site();
        assert!(table.ensure_slot(0, here).is_ok());
        assert!(table.ensure_slot(1, here).is_ok());
        assert!(table.ensure_slot(0, here).is_ok());
        assert_eq!(table.len(), 2);
        assert_eq!(table.ensure_slot(3, here).err(), Some(SlotError::Skipped { len: 2 }));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_slot_lookup() {
        let mut table = SlotTable::new();
        let slot = table.ensure_slot(0, site()).unwrap();
        assert!(!slot.is_populated());
        assert_eq!(slot.lookup::<u32>(Some(&deps![1])), None);

        slot.store(7u32, Some(deps![1]));
        assert!(slot.is_populated());
        assert!(slot.holds::<u32>());
        assert!(!slot.holds::<String>());
        assert_eq!(slot.payload_type(), Some("u32"));
        assert_eq!(slot.lookup::<u32>(Some(&deps![1])), Some(7));
        assert_eq!(slot.lookup::<u32>(Some(&deps![2])), None);
        assert_eq!(slot.lookup::<u32>(None), None);
        assert_eq!(slot.lookup::<String>(Some(&deps![1])), None);
    }

    #[test]
    fn test_destroy_releases_payloads() {
        let payload = Arc::new("payload");
        let mut table = SlotTable::new();
        table.ensure_slot(0, site()).unwrap().store(payload.clone(), None);
        assert_eq!(Arc::strong_count(&payload), 2);

        table.destroy();
        assert_eq!(Arc::strong_count(&payload), 1);
        assert!(table.is_destroyed());
        assert!(table.is_empty());
        assert_eq!(table.ensure_slot(0, site()).err(), Some(SlotError::Destroyed));
    }
}
