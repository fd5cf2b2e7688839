//! Owning storage for the units attached to a scheduler.

use std::any::Any;

use crate::ids::UnitId;
use crate::schedulable::Schedulable;

enum Slot {
    Present(Box<dyn Schedulable>),
    /// Taken out by the dispatch loop while its `execute_until` runs.
    Running,
    Detached,
}

struct Entry {
    name: String,
    slot: Slot,
}

/// Units indexed by [`UnitId`]. Ids are allocated sequentially and never
/// reused, so a stale id can only ever resolve to nothing.
#[derive(Default)]
pub(crate) struct UnitRegistry {
    entries: Vec<Entry>,
}

impl UnitRegistry {
    /// Creates an empty registry.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stores `unit` and returns its id.
    pub(crate) fn alloc(&mut self, unit: Box<dyn Schedulable>) -> UnitId {
        let id = UnitId::from_raw(self.entries.len() as u32);
        self.entries.push(Entry {
            name: unit.name().to_string(),
            slot: Slot::Present(unit),
        });
        id
    }

    fn entry(&self, id: UnitId) -> Option<&Entry> {
        self.entries.get(id.as_raw() as usize)
    }

    fn entry_mut(&mut self, id: UnitId) -> Option<&mut Entry> {
        self.entries.get_mut(id.as_raw() as usize)
    }

    /// The unit, unless it is detached or currently running.
    pub(crate) fn get(&self, id: UnitId) -> Option<&(dyn Schedulable + 'static)> {
        match &self.entry(id)?.slot {
            Slot::Present(unit) => Some(unit.as_ref()),
            _ => None,
        }
    }

    /// Mutable access to the unit, unless it is detached or currently running.
    pub(crate) fn get_mut(&mut self, id: UnitId) -> Option<&mut (dyn Schedulable + 'static)> {
        match &mut self.entry_mut(id)?.slot {
            Slot::Present(unit) => Some(unit.as_mut()),
            _ => None,
        }
    }

    /// The unit downcast to its concrete type.
    pub(crate) fn downcast<T: Schedulable>(&self, id: UnitId) -> Option<&T> {
        let any: &dyn Any = self.get(id)?;
        any.downcast_ref::<T>()
    }

    /// The unit downcast to its concrete type, mutably.
    pub(crate) fn downcast_mut<T: Schedulable>(&mut self, id: UnitId) -> Option<&mut T> {
        let any: &mut dyn Any = self.get_mut(id)?;
        any.downcast_mut::<T>()
    }

    /// Takes the unit out for dispatch. The slot stays reserved until
    /// [`put_back`](Self::put_back).
    ///
    /// # Panics
    ///
    /// Panics if the unit is not present. A queued sync point always belongs
    /// to an attached unit, so this indicates a corrupted queue.
    pub(crate) fn take(&mut self, id: UnitId) -> Box<dyn Schedulable> {
        let entry = self
            .entry_mut(id)
            .unwrap_or_else(|| panic!("sync point owned by unknown {id}"));
        match std::mem::replace(&mut entry.slot, Slot::Running) {
            Slot::Present(unit) => unit,
            Slot::Running => panic!("{id} ('{}') is already running", entry.name),
            Slot::Detached => panic!("sync point owned by detached {id} ('{}')", entry.name),
        }
    }

    /// Returns a unit taken with [`take`](Self::take).
    pub(crate) fn put_back(&mut self, id: UnitId, unit: Box<dyn Schedulable>) {
        let entry = self
            .entry_mut(id)
            .unwrap_or_else(|| panic!("put_back of unknown {id}"));
        assert!(
            matches!(entry.slot, Slot::Running),
            "put_back of {id} ('{}') which was not taken",
            entry.name
        );
        entry.slot = Slot::Present(unit);
    }

    /// Removes the unit from the registry and hands it back. Returns `None`
    /// if it was already detached or never existed.
    ///
    /// # Panics
    ///
    /// Panics if the unit is running.
    pub(crate) fn detach(&mut self, id: UnitId) -> Option<Box<dyn Schedulable>> {
        let entry = self.entry_mut(id)?;
        match std::mem::replace(&mut entry.slot, Slot::Detached) {
            Slot::Present(unit) => Some(unit),
            Slot::Detached => None,
            Slot::Running => panic!("cannot detach {id} ('{}') while it runs", entry.name),
        }
    }

    /// Name the unit reported when it was attached. Detached units keep
    /// their name.
    pub(crate) fn name(&self, id: UnitId) -> Option<&str> {
        self.entry(id).map(|e| e.name.as_str())
    }

    /// Returns `true` while the unit is attached, running or not.
    pub(crate) fn is_attached(&self, id: UnitId) -> bool {
        matches!(
            self.entry(id).map(|e| &e.slot),
            Some(Slot::Present(_)) | Some(Slot::Running)
        )
    }

    /// Number of attached units.
    pub(crate) fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| !matches!(e.slot, Slot::Detached))
            .count()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedulable::{SyncContext, SyncPointsState};
    use oxmsx_serialize::{ArchiveError, InputArchive, ObjectId, OutputArchive};
    use oxmsx_time::EmuTime;

    struct Stub {
        name: &'static str,
        hits: u32,
    }

    impl Schedulable for Stub {
        fn name(&self) -> &str {
            self.name
        }

        fn execute_until(&mut self, _time: EmuTime, _ctx: &mut SyncContext<'_>) {
            self.hits += 1;
        }

        fn save_state(
            &self,
            _pending: SyncPointsState,
            _ar: &mut OutputArchive,
        ) -> Result<ObjectId, ArchiveError> {
            unimplemented!()
        }

        fn load_state(
            &mut self,
            _ar: &InputArchive,
            _id: ObjectId,
        ) -> Result<SyncPointsState, ArchiveError> {
            unimplemented!()
        }
    }

    fn stub(name: &'static str) -> Box<dyn Schedulable> {
        Box::new(Stub { name, hits: 0 })
    }

    #[test]
    fn ids_are_sequential() {
        let mut reg = UnitRegistry::new();
        assert_eq!(reg.alloc(stub("a")).as_raw(), 0);
        assert_eq!(reg.alloc(stub("b")).as_raw(), 1);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn downcast_to_concrete() {
        let mut reg = UnitRegistry::new();
        let id = reg.alloc(stub("a"));
        reg.downcast_mut::<Stub>(id).unwrap().hits = 7;
        assert_eq!(reg.downcast::<Stub>(id).unwrap().hits, 7);
    }

    #[test]
    fn take_and_put_back() {
        let mut reg = UnitRegistry::new();
        let id = reg.alloc(stub("a"));
        let unit = reg.take(id);
        assert!(reg.get(id).is_none());
        assert!(reg.is_attached(id));
        assert_eq!(reg.name(id), Some("a"));
        reg.put_back(id, unit);
        assert!(reg.get(id).is_some());
    }

    #[test]
    #[should_panic(expected = "already running")]
    fn double_take_panics() {
        let mut reg = UnitRegistry::new();
        let id = reg.alloc(stub("a"));
        let _first = reg.take(id);
        let _second = reg.take(id);
    }

    #[test]
    fn detach_is_final() {
        let mut reg = UnitRegistry::new();
        let a = reg.alloc(stub("a"));
        let b = reg.alloc(stub("b"));
        assert!(reg.detach(a).is_some());
        assert!(reg.detach(a).is_none());
        assert!(!reg.is_attached(a));
        assert_eq!(reg.name(a), Some("a"));
        assert!(reg.is_attached(b));
        assert_eq!(reg.len(), 1);
        let c = reg.alloc(stub("c"));
        assert_ne!(c, a);
    }

    #[test]
    fn unknown_id_resolves_to_nothing() {
        let reg = UnitRegistry::new();
        assert!(reg.get(UnitId::from_raw(3)).is_none());
        assert!(reg.name(UnitId::from_raw(3)).is_none());
        assert_eq!(reg.len(), 0);
    }
}
