//! Handles for units registered with a scheduler.

use std::fmt;

/// Stable handle of a [`Schedulable`](crate::Schedulable) inside one
/// scheduler's registry. Handles are never reused, even after the unit is
/// detached.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a handle from a raw registry index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw registry index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn raw_roundtrip() {
        assert_eq!(UnitId::from_raw(42).as_raw(), 42);
    }

    #[test]
    fn hash_in_set() {
        let mut set = HashSet::new();
        set.insert(UnitId::from_raw(1));
        set.insert(UnitId::from_raw(2));
        set.insert(UnitId::from_raw(1));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn display() {
        assert_eq!(UnitId::from_raw(3).to_string(), "unit#3");
    }
}
