//! Identifiers of records inside an archive.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque id of a record in an archive. Ids are assigned from 1 upwards in
/// save order and are only meaningful within one archive.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(u32);

impl ObjectId {
    /// Creates an id from a raw value.
    pub fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_roundtrip() {
        assert_eq!(ObjectId::from_raw(7).as_raw(), 7);
    }

    #[test]
    fn display() {
        assert_eq!(ObjectId::from_raw(3).to_string(), "#3");
    }

    #[test]
    fn serializes_as_number() {
        assert_eq!(serde_json::to_string(&ObjectId::from_raw(12)).unwrap(), "12");
    }
}
