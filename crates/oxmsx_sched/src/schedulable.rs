//! The contract every scheduled device implements.

use std::any::Any;

use oxmsx_serialize::{ArchiveError, InputArchive, ObjectId, OutputArchive};
use oxmsx_time::EmuTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ids::UnitId;
use crate::scheduler::SchedulerCore;

/// A device that wants to be woken at specific emulated times.
///
/// Units are attached to a [`Scheduler`](crate::Scheduler), which owns them
/// and calls [`execute_until`](Self::execute_until) once per due sync point,
/// in time order.
pub trait Schedulable: Any {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Called when a sync point of this unit becomes due. `time` is the sync
    /// point's time and equals `ctx.now()`.
    ///
    /// The unit may register or cancel its own sync points through `ctx`.
    fn execute_until(&mut self, time: EmuTime, ctx: &mut SyncContext<'_>);

    /// Called once when the scheduler is dropped while this unit still has
    /// pending sync points.
    fn scheduler_deleted(&mut self) {
        warn!(unit = self.name(), "scheduler deleted with sync points still pending");
    }

    /// Saves the unit together with its pending sync point times.
    fn save_state(
        &self,
        pending: SyncPointsState,
        ar: &mut OutputArchive,
    ) -> Result<ObjectId, ArchiveError>;

    /// Restores the unit from record `id` and returns the sync point times it
    /// had pending when saved.
    fn load_state(
        &mut self,
        ar: &InputArchive,
        id: ObjectId,
    ) -> Result<SyncPointsState, ArchiveError>;
}

/// The pending sync point times of one unit, as stored in a save-state.
///
/// The scheduler never persists its queue; each unit carries its own entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPointsState {
    /// Pending times, in queue order.
    pub times: Vec<EmuTime>,
}

impl SyncPointsState {
    /// Creates a state from a list of times.
    pub fn new(times: Vec<EmuTime>) -> Self {
        Self { times }
    }

    /// Returns `true` if nothing was pending.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// A unit's view of the scheduler during [`Schedulable::execute_until`].
///
/// Every operation acts on the calling unit's own sync points. There is no
/// way to start another dispatch from here.
pub struct SyncContext<'a> {
    core: &'a mut SchedulerCore,
    unit: UnitId,
}

impl<'a> SyncContext<'a> {
    pub(crate) fn new(core: &'a mut SchedulerCore, unit: UnitId) -> Self {
        Self { core, unit }
    }

    /// Id of the unit being dispatched.
    pub fn unit(&self) -> UnitId {
        self.unit
    }

    /// The scheduler's current time.
    pub fn now(&self) -> EmuTime {
        self.core.current_time
    }

    /// Replaces this unit's pending sync points with one at `time`.
    ///
    /// # Panics
    ///
    /// Panics if `time` is before [`now`](Self::now).
    pub fn set_sync_point(&mut self, time: EmuTime) {
        self.core.register(time, self.unit, true);
    }

    /// Adds a sync point at `time`, keeping the ones already pending.
    ///
    /// # Panics
    ///
    /// Panics if `time` is before [`now`](Self::now).
    pub fn add_sync_point(&mut self, time: EmuTime) {
        self.core.register(time, self.unit, false);
    }

    /// Cancels this unit's earliest pending sync point.
    pub fn remove_sync_point(&mut self) -> bool {
        self.core.queue.remove_first(self.unit)
    }

    /// Cancels all of this unit's pending sync points.
    pub fn remove_sync_points(&mut self) -> usize {
        self.core.queue.remove_all(self.unit)
    }

    /// Earliest pending time of this unit.
    pub fn pending_sync_point(&self) -> Option<EmuTime> {
        self.core.queue.find(self.unit).map(|sp| sp.time())
    }

    /// All pending times of this unit, in queue order.
    pub fn sync_points(&self) -> Vec<EmuTime> {
        self.core
            .queue
            .matching(self.unit)
            .map(|sp| sp.time())
            .collect()
    }
}
