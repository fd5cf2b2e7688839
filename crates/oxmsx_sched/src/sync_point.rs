//! Sync points and the time-ordered queue that holds them.

use std::collections::VecDeque;

use oxmsx_time::EmuTime;

use crate::ids::UnitId;

/// A scheduled wake-up: at `time`, call `unit`'s
/// [`execute_until`](crate::Schedulable::execute_until).
///
/// Immutable once created. To move a wake-up, cancel it and register a new one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncPoint {
    time: EmuTime,
    unit: UnitId,
}

impl SyncPoint {
    /// Creates a sync point.
    pub fn new(time: EmuTime, unit: UnitId) -> Self {
        Self { time, unit }
    }

    /// When the owner wants to run.
    pub fn time(&self) -> EmuTime {
        self.time
    }

    /// The unit to wake.
    pub fn unit(&self) -> UnitId {
        self.unit
    }
}

/// Pending sync points, ascending by time.
///
/// Entries with equal times stay in registration order, so replaying the same
/// sequence of registrations always dispatches in the same order.
#[derive(Debug, Default, Clone)]
pub struct SyncQueue {
    entries: VecDeque<SyncPoint>,
}

impl SyncQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts after every entry whose time is less than or equal to `sp.time`.
    pub fn insert(&mut self, sp: SyncPoint) {
        let pos = self.entries.partition_point(|e| e.time <= sp.time);
        self.entries.insert(pos, sp);
    }

    /// The earliest entry.
    pub fn front(&self) -> Option<&SyncPoint> {
        self.entries.front()
    }

    /// Removes and returns the earliest entry.
    pub fn pop_front(&mut self) -> Option<SyncPoint> {
        self.entries.pop_front()
    }

    /// Time of the earliest entry, or [`EmuTime::INFINITY`] when empty.
    pub fn next_time(&self) -> EmuTime {
        self.front().map_or(EmuTime::INFINITY, |sp| sp.time)
    }

    /// Removes the earliest entry owned by `unit`. Returns whether one was found.
    pub fn remove_first(&mut self, unit: UnitId) -> bool {
        match self.entries.iter().position(|e| e.unit == unit) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Removes every entry owned by `unit` and returns how many were removed.
    pub fn remove_all(&mut self, unit: UnitId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.unit != unit);
        before - self.entries.len()
    }

    /// The earliest entry owned by `unit`.
    pub fn find(&self, unit: UnitId) -> Option<&SyncPoint> {
        self.entries.iter().find(|e| e.unit == unit)
    }

    /// Entries owned by `unit`, in queue order.
    pub fn matching(&self, unit: UnitId) -> impl Iterator<Item = &SyncPoint> + '_ {
        self.entries.iter().filter(move |e| e.unit == unit)
    }

    /// All entries in queue order.
    pub fn iter(&self) -> impl Iterator<Item = &SyncPoint> + '_ {
        self.entries.iter()
    }

    /// Distinct owners, in order of their earliest entry.
    pub fn owners(&self) -> Vec<UnitId> {
        let mut owners: Vec<UnitId> = Vec::new();
        for sp in &self.entries {
            if !owners.contains(&sp.unit) {
                owners.push(sp.unit);
            }
        }
        owners
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
