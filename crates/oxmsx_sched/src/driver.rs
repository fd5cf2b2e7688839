//! The binding between the scheduler and the component that drives the clock.

use std::cell::Cell;
use std::rc::Rc;

use oxmsx_time::EmuTime;

/// The component (normally the processor model) that advances emulated time
/// and calls [`Scheduler::run_until`](crate::Scheduler::run_until).
///
/// The scheduler tells the driver the earliest pending sync point after every
/// registration made outside a dispatch, and once at the end of each dispatch,
/// so the driver knows how far it may run uninterrupted.
pub trait ClockDriver {
    /// Records the earliest time at which the scheduler has work to do.
    fn set_next_sync_point(&mut self, time: EmuTime);
}

impl<F> ClockDriver for F
where
    F: FnMut(EmuTime),
{
    fn set_next_sync_point(&mut self, time: EmuTime) {
        (self)(time);
    }
}

/// A shared cell holding the next sync point.
///
/// Clone it: hand one copy to the scheduler as its driver and keep the other
/// in the processor model, which reads it with [`get`](Self::get).
#[derive(Clone, Debug)]
pub struct NextSyncPoint(Rc<Cell<EmuTime>>);

impl NextSyncPoint {
    /// Creates a cell with nothing scheduled.
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(EmuTime::INFINITY)))
    }

    /// The most recently reported next sync point.
    pub fn get(&self) -> EmuTime {
        self.0.get()
    }
}

impl Default for NextSyncPoint {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockDriver for NextSyncPoint {
    fn set_next_sync_point(&mut self, time: EmuTime) {
        self.0.set(time);
    }
}
