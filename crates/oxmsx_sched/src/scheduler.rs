//! The scheduler: pending queue, virtual clock and dispatch loop.

use std::fmt;
use std::ops::{Deref, DerefMut};

use oxmsx_serialize::{ArchiveError, InputArchive, ObjectId, OutputArchive, Versioned};
use oxmsx_time::EmuTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::driver::ClockDriver;
use crate::ids::UnitId;
use crate::registry::UnitRegistry;
use crate::schedulable::{Schedulable, SyncContext, SyncPointsState};
use crate::sync_point::{SyncPoint, SyncQueue};

/// Whether [`Scheduler::run_until`] is on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchState {
    /// No dispatch in progress.
    #[default]
    Idle,
    /// Inside the dispatch loop.
    Dispatching,
}

/// Outcome of one [`Scheduler::run_until`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Number of sync points dispatched.
    pub dispatched: usize,
    /// Earliest pending time afterwards, or [`EmuTime::INFINITY`].
    pub next: EmuTime,
}

/// Persisted part of the scheduler. The queue is rebuilt from the units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerState {
    /// Time of the last dispatched sync point.
    pub current_time: EmuTime,
}

impl Versioned for SchedulerState {
    const TYPE_NAME: &'static str = "Scheduler";
}

/// Everything a unit may touch during dispatch. The unit registry is kept
/// outside so units cannot reach each other or the dispatch loop.
pub(crate) struct SchedulerCore {
    pub(crate) queue: SyncQueue,
    pub(crate) current_time: EmuTime,
    pub(crate) state: DispatchState,
    pub(crate) driver: Option<Box<dyn ClockDriver>>,
}

impl SchedulerCore {
    fn new() -> Self {
        Self {
            queue: SyncQueue::new(),
            current_time: EmuTime::ZERO,
            state: DispatchState::Idle,
            driver: None,
        }
    }

    pub(crate) fn register(&mut self, time: EmuTime, unit: UnitId, supersede: bool) {
        assert!(
            time >= self.current_time,
            "sync point in the past: {unit} asked for {time}, current time is {}",
            self.current_time
        );
        if supersede {
            self.queue.remove_all(unit);
        }
        self.queue.insert(SyncPoint::new(time, unit));

        // During dispatch the loop reports the final value itself.
        if self.state == DispatchState::Idle {
            if let Some(driver) = &mut self.driver {
                driver.set_next_sync_point(self.queue.next_time());
            }
        }
    }
}

/// Marks the core as dispatching for as long as it lives.
struct Dispatching<'a> {
    core: &'a mut SchedulerCore,
}

impl<'a> Dispatching<'a> {
    fn enter(core: &'a mut SchedulerCore) -> Self {
        assert_eq!(
            core.state,
            DispatchState::Idle,
            "reentrant call to Scheduler::run_until"
        );
        core.state = DispatchState::Dispatching;
        Self { core }
    }
}

impl Deref for Dispatching<'_> {
    type Target = SchedulerCore;

    fn deref(&self) -> &SchedulerCore {
        self.core
    }
}

impl DerefMut for Dispatching<'_> {
    fn deref_mut(&mut self) -> &mut SchedulerCore {
        self.core
    }
}

impl Drop for Dispatching<'_> {
    fn drop(&mut self) {
        self.core.state = DispatchState::Idle;
    }
}

/// Owns the units, the pending sync points and the virtual clock.
///
/// All access happens from one thread. The scheduler holds trait objects
/// without `Send` bounds, so the compiler keeps it there.
pub struct Scheduler {
    core: SchedulerCore,
    units: UnitRegistry,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Creates a scheduler at time zero with nothing attached.
    pub fn new() -> Self {
        Self {
            core: SchedulerCore::new(),
            units: UnitRegistry::new(),
        }
    }

    /// Takes ownership of `unit` and returns its handle.
    pub fn attach<T: Schedulable>(&mut self, unit: T) -> UnitId {
        let id = self.units.alloc(Box::new(unit));
        debug!(unit = %id, name = self.units.name(id).unwrap_or_default(), "attached");
        id
    }

    /// Cancels the unit's sync points and hands the unit back.
    pub fn detach(&mut self, id: UnitId) -> Option<Box<dyn Schedulable>> {
        let unit = self.units.detach(id)?;
        let removed = self.core.queue.remove_all(id);
        debug!(unit = %id, name = unit.name(), removed, "detached");
        Some(unit)
    }

    /// The unit with handle `id`, downcast to `T`.
    pub fn unit<T: Schedulable>(&self, id: UnitId) -> Option<&T> {
        self.units.downcast(id)
    }

    /// Mutable access to the unit with handle `id`, downcast to `T`.
    pub fn unit_mut<T: Schedulable>(&mut self, id: UnitId) -> Option<&mut T> {
        self.units.downcast_mut(id)
    }

    /// Name the unit reported when it was attached.
    pub fn unit_name(&self, id: UnitId) -> Option<&str> {
        self.units.name(id)
    }

    /// Number of attached units.
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Installs the clock driver and tells it the current earliest sync point.
    ///
    /// # Panics
    ///
    /// Panics if a driver is already installed.
    pub fn set_clock_driver<D: ClockDriver + 'static>(&mut self, mut driver: D) {
        assert!(self.core.driver.is_none(), "clock driver already set");
        driver.set_next_sync_point(self.core.queue.next_time());
        self.core.driver = Some(Box::new(driver));
    }

    /// Removes the clock driver.
    pub fn take_clock_driver(&mut self) -> Option<Box<dyn ClockDriver>> {
        self.core.driver.take()
    }

    fn assert_attached(&self, id: UnitId) {
        assert!(self.units.is_attached(id), "{id} is not attached");
    }

    /// Replaces any pending sync points of `unit` with one at `time`.
    ///
    /// # Panics
    ///
    /// Panics if `time` is before [`current_time`](Self::current_time) or the
    /// unit is not attached.
    pub fn set_sync_point(&mut self, time: EmuTime, unit: UnitId) {
        self.assert_attached(unit);
        self.core.register(time, unit, true);
    }

    /// Adds a sync point at `time`, keeping the unit's other pending entries.
    ///
    /// # Panics
    ///
    /// Same conditions as [`set_sync_point`](Self::set_sync_point).
    pub fn add_sync_point(&mut self, time: EmuTime, unit: UnitId) {
        self.assert_attached(unit);
        self.core.register(time, unit, false);
    }

    /// Removes the unit's earliest pending sync point. Returns `false` and
    /// changes nothing if it had none.
    pub fn remove_sync_point(&mut self, unit: UnitId) -> bool {
        self.core.queue.remove_first(unit)
    }

    /// Removes all pending sync points of the unit and returns how many there were.
    pub fn remove_sync_points(&mut self, unit: UnitId) -> usize {
        self.core.queue.remove_all(unit)
    }

    /// The unit's pending sync points, in queue order.
    pub fn sync_points(&self, unit: UnitId) -> Vec<SyncPoint> {
        self.core.queue.matching(unit).copied().collect()
    }

    /// The unit's earliest pending time.
    pub fn pending_sync_point(&self, unit: UnitId) -> Option<EmuTime> {
        self.core.queue.find(unit).map(|sp| sp.time())
    }

    /// Time of the most recently dispatched sync point.
    pub fn current_time(&self) -> EmuTime {
        self.core.current_time
    }

    /// Earliest pending time, or [`EmuTime::INFINITY`].
    pub fn next_sync_point(&self) -> EmuTime {
        self.core.queue.next_time()
    }

    /// Number of queued sync points over all units.
    pub fn pending_count(&self) -> usize {
        self.core.queue.len()
    }

    /// Returns `true` while [`run_until`](Self::run_until) is executing.
    pub fn is_dispatching(&self) -> bool {
        self.core.state == DispatchState::Dispatching
    }

    /// Dispatches every sync point due at or before `limit`, in time order.
    ///
    /// Sync points registered during dispatch are honoured in the same call
    /// if they fall within `limit`. Afterwards the clock driver, if any, is
    /// told the new earliest pending time. Returns immediately when nothing
    /// is due.
    ///
    /// # Panics
    ///
    /// Panics on reentry, if a unit's `execute_until` panics, or if a queued
    /// sync point is older than the current time.
    pub fn run_until(&mut self, limit: EmuTime) -> DispatchReport {
        let mut next = self.core.queue.next_time();
        if next > limit {
            return DispatchReport {
                dispatched: 0,
                next,
            };
        }

        let mut dispatched = 0;
        {
            let mut core = Dispatching::enter(&mut self.core);
            while let Some(sp) = core.queue.pop_front() {
                assert!(
                    sp.time() >= core.current_time,
                    "time went backwards: {} is before {}",
                    sp.time(),
                    core.current_time
                );
                core.current_time = sp.time();

                let mut unit = self.units.take(sp.unit());
                trace!(unit = unit.name(), time = sp.time().ticks(), "dispatch");
                {
                    let mut ctx = SyncContext::new(&mut core, sp.unit());
                    unit.execute_until(sp.time(), &mut ctx);
                }
                self.units.put_back(sp.unit(), unit);
                dispatched += 1;

                next = core.queue.next_time();
                if next > limit {
                    break;
                }
            }
        }

        if let Some(driver) = &mut self.core.driver {
            driver.set_next_sync_point(next);
        }
        DispatchReport { dispatched, next }
    }

    /// Saves the scheduler's own state. Units are saved separately with
    /// [`save_unit`](Self::save_unit).
    pub fn save_state(&self, ar: &mut OutputArchive) -> Result<ObjectId, ArchiveError> {
        ar.save(&SchedulerState {
            current_time: self.core.current_time,
        })
    }

    /// Restores the current time from record `id`.
    ///
    /// # Panics
    ///
    /// Panics unless the scheduler is fresh: idle, at time zero and with an
    /// empty queue.
    pub fn load_state(&mut self, ar: &InputArchive, id: ObjectId) -> Result<(), ArchiveError> {
        assert!(
            !self.is_dispatching()
                && self.core.queue.is_empty()
                && self.core.current_time == EmuTime::ZERO,
            "scheduler state can only be loaded into a fresh scheduler"
        );
        let state = ar.load::<SchedulerState>(id)?.value;
        self.core.current_time = state.current_time;
        debug!(time = %state.current_time, "scheduler state loaded");
        Ok(())
    }

    /// Saves the unit along with its pending sync points.
    ///
    /// # Panics
    ///
    /// Panics if the unit is not attached.
    pub fn save_unit(&self, id: UnitId, ar: &mut OutputArchive) -> Result<ObjectId, ArchiveError> {
        let unit = self
            .units
            .get(id)
            .unwrap_or_else(|| panic!("{id} is not attached"));
        let pending = SyncPointsState::new(
            self.core.queue.matching(id).map(|sp| sp.time()).collect(),
        );
        unit.save_state(pending, ar)
    }

    /// Restores the unit from record `obj` and re-registers the sync points
    /// it had pending, replacing any it holds now.
    ///
    /// # Panics
    ///
    /// Panics if the unit is not attached.
    pub fn load_unit(
        &mut self,
        id: UnitId,
        ar: &InputArchive,
        obj: ObjectId,
    ) -> Result<(), ArchiveError> {
        let unit = self
            .units
            .get_mut(id)
            .unwrap_or_else(|| panic!("{id} is not attached"));
        let pending = unit.load_state(ar, obj)?;

        let now = self.core.current_time;
        if let Some(stale) = pending.times.iter().find(|t| **t < now) {
            return Err(ArchiveError::Decode {
                context: format!(
                    "sync points of '{}'",
                    self.units.name(id).unwrap_or_default()
                ),
                reason: format!("{stale} is before the saved current time {now}"),
            });
        }

        self.core.queue.remove_all(id);
        for time in &pending.times {
            self.core.register(*time, id, false);
        }
        debug!(unit = %id, restored = pending.times.len(), "unit state loaded");
        Ok(())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        let owners = self.core.queue.owners();
        self.core.queue.clear();
        for id in owners {
            // A unit that panicked mid-dispatch is gone already.
            if let Some(unit) = self.units.get_mut(id) {
                unit.scheduler_deleted();
            }
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("current_time", &self.core.current_time)
            .field("state", &self.core.state)
            .field("pending", &self.core.queue.len())
            .field("units", &self.units.len())
            .field("driver", &self.core.driver.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::NextSyncPoint;
    use oxmsx_serialize::ArchiveFormat;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<(String, u64)>>>;

    /// Records every dispatch and optionally reschedules itself.
    struct Recorder {
        name: String,
        log: Log,
        reschedule: Vec<u64>,
        deleted: Rc<RefCell<u32>>,
    }

    impl Recorder {
        fn new(name: &str, log: &Log) -> Self {
            Self {
                name: name.to_string(),
                log: Rc::clone(log),
                reschedule: Vec::new(),
                deleted: Rc::new(RefCell::new(0)),
            }
        }
    }

    #[derive(Serialize, Deserialize)]
    struct RecorderState {
        pending: SyncPointsState,
    }

    impl Versioned for RecorderState {
        const TYPE_NAME: &'static str = "Recorder";
    }

    impl Schedulable for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        fn execute_until(&mut self, time: EmuTime, ctx: &mut SyncContext<'_>) {
            assert_eq!(ctx.now(), time);
            self.log.borrow_mut().push((self.name.clone(), time.ticks()));
            if !self.reschedule.is_empty() {
                let next = self.reschedule.remove(0);
                ctx.set_sync_point(EmuTime::from_ticks(next));
            }
        }

        fn scheduler_deleted(&mut self) {
            *self.deleted.borrow_mut() += 1;
        }

        fn save_state(
            &self,
            pending: SyncPointsState,
            ar: &mut OutputArchive,
        ) -> Result<ObjectId, ArchiveError> {
            ar.save(&RecorderState { pending })
        }

        fn load_state(
            &mut self,
            ar: &InputArchive,
            id: ObjectId,
        ) -> Result<SyncPointsState, ArchiveError> {
            Ok(ar.load::<RecorderState>(id)?.value.pending)
        }
    }

    fn t(ticks: u64) -> EmuTime {
        EmuTime::from_ticks(ticks)
    }

    fn entries(log: &Log) -> Vec<(String, u64)> {
        log.borrow().clone()
    }

    #[test]
    fn fresh_scheduler() {
        let sched = Scheduler::new();
        assert_eq!(sched.current_time(), EmuTime::ZERO);
        assert_eq!(sched.next_sync_point(), EmuTime::INFINITY);
        assert_eq!(sched.pending_count(), 0);
        assert!(!sched.is_dispatching());
    }

    #[test]
    fn empty_run_is_a_no_op() {
        let mut sched = Scheduler::new();
        let report = sched.run_until(t(100));
        assert_eq!(report.dispatched, 0);
        assert_eq!(report.next, EmuTime::INFINITY);
        assert_eq!(sched.current_time(), EmuTime::ZERO);
    }

    #[test]
    fn dispatches_in_time_order() {
        let log = Log::default();
        let mut sched = Scheduler::new();
        let a = sched.attach(Recorder::new("a", &log));
        let b = sched.attach(Recorder::new("b", &log));
        sched.set_sync_point(t(10), a);
        sched.set_sync_point(t(5), b);

        let report = sched.run_until(t(20));
        assert_eq!(report, DispatchReport { dispatched: 2, next: EmuTime::INFINITY });
        assert_eq!(entries(&log), vec![("b".to_string(), 5), ("a".to_string(), 10)]);
        assert_eq!(sched.current_time(), t(10));
    }

    #[test]
    fn stops_at_limit() {
        let log = Log::default();
        let mut sched = Scheduler::new();
        let a = sched.attach(Recorder::new("a", &log));
        sched.add_sync_point(t(5), a);
        sched.add_sync_point(t(50), a);

        let report = sched.run_until(t(20));
        assert_eq!(report.dispatched, 1);
        assert_eq!(report.next, t(50));
        assert_eq!(sched.current_time(), t(5));
        assert_eq!(sched.pending_count(), 1);
    }

    #[test]
    fn limit_is_inclusive() {
        let log = Log::default();
        let mut sched = Scheduler::new();
        let a = sched.attach(Recorder::new("a", &log));
        sched.set_sync_point(t(20), a);
        assert_eq!(sched.run_until(t(20)).dispatched, 1);
    }

    #[test]
    fn reschedule_within_limit_runs_in_same_call() {
        let log = Log::default();
        let mut sched = Scheduler::new();
        let mut rec = Recorder::new("a", &log);
        rec.reschedule = vec![15];
        let a = sched.attach(rec);
        sched.set_sync_point(t(10), a);

        sched.run_until(t(20));
        assert_eq!(entries(&log), vec![("a".to_string(), 10), ("a".to_string(), 15)]);
        assert_eq!(sched.current_time(), t(15));
    }

    #[test]
    fn set_sync_point_supersedes() {
        let log = Log::default();
        let mut sched = Scheduler::new();
        let a = sched.attach(Recorder::new("a", &log));
        sched.set_sync_point(t(10), a);
        sched.set_sync_point(t(30), a);
        assert_eq!(sched.pending_count(), 1);
        assert_eq!(sched.pending_sync_point(a), Some(t(30)));

        sched.run_until(t(100));
        assert_eq!(entries(&log), vec![("a".to_string(), 30)]);
    }

    #[test]
    fn add_sync_point_keeps_all() {
        let log = Log::default();
        let mut sched = Scheduler::new();
        let a = sched.attach(Recorder::new("a", &log));
        sched.add_sync_point(t(30), a);
        sched.add_sync_point(t(10), a);
        let times: Vec<_> = sched.sync_points(a).iter().map(|sp| sp.time()).collect();
        assert_eq!(times, vec![t(10), t(30)]);
    }

    #[test]
    fn remove_without_entries_changes_nothing() {
        let log = Log::default();
        let mut sched = Scheduler::new();
        let a = sched.attach(Recorder::new("a", &log));
        let b = sched.attach(Recorder::new("b", &log));
        sched.set_sync_point(t(10), a);
        assert!(!sched.remove_sync_point(b));
        assert_eq!(sched.pending_count(), 1);
        assert!(sched.remove_sync_point(a));
        assert!(!sched.remove_sync_point(a));
        assert_eq!(sched.remove_sync_points(a), 0);
    }

    #[test]
    fn driver_sees_registrations_and_dispatch_result() {
        let log = Log::default();
        let next = NextSyncPoint::new();
        let mut sched = Scheduler::new();
        sched.set_clock_driver(next.clone());
        let a = sched.attach(Recorder::new("a", &log));
        let b = sched.attach(Recorder::new("b", &log));

        sched.set_sync_point(t(40), a);
        assert_eq!(next.get(), t(40));
        sched.set_sync_point(t(25), b);
        assert_eq!(next.get(), t(25));

        sched.run_until(t(30));
        assert_eq!(next.get(), t(40));
        sched.run_until(t(40));
        assert_eq!(next.get(), EmuTime::INFINITY);
    }

    #[test]
    fn driver_learns_existing_queue_when_installed() {
        let log = Log::default();
        let mut sched = Scheduler::new();
        let a = sched.attach(Recorder::new("a", &log));
        sched.set_sync_point(t(12), a);
        let next = NextSyncPoint::new();
        sched.set_clock_driver(next.clone());
        assert_eq!(next.get(), t(12));
        assert!(sched.take_clock_driver().is_some());
        assert!(sched.take_clock_driver().is_none());
    }

    #[test]
    #[should_panic(expected = "clock driver already set")]
    fn second_driver_panics() {
        let mut sched = Scheduler::new();
        sched.set_clock_driver(NextSyncPoint::new());
        sched.set_clock_driver(NextSyncPoint::new());
    }

    #[test]
    fn detach_cancels_sync_points() {
        let log = Log::default();
        let mut sched = Scheduler::new();
        let a = sched.attach(Recorder::new("a", &log));
        sched.set_sync_point(t(10), a);
        let unit = sched.detach(a).unwrap();
        assert_eq!(unit.name(), "a");
        assert_eq!(sched.pending_count(), 0);
        assert_eq!(sched.unit_count(), 0);
        assert!(sched.detach(a).is_none());
    }

    #[test]
    #[should_panic(expected = "is not attached")]
    fn registering_for_detached_unit_panics() {
        let log = Log::default();
        let mut sched = Scheduler::new();
        let a = sched.attach(Recorder::new("a", &log));
        sched.detach(a);
        sched.set_sync_point(t(1), a);
    }

    #[test]
    fn unit_downcast() {
        let log = Log::default();
        let mut sched = Scheduler::new();
        let a = sched.attach(Recorder::new("a", &log));
        assert_eq!(sched.unit::<Recorder>(a).unwrap().name, "a");
        sched.unit_mut::<Recorder>(a).unwrap().name = "renamed".into();
        assert_eq!(sched.unit::<Recorder>(a).unwrap().name, "renamed");
        assert_eq!(sched.unit_name(a), Some("a"));
    }

    #[test]
    fn drop_notifies_each_owner_once() {
        let log = Log::default();
        let mut sched = Scheduler::new();
        let a = Recorder::new("a", &log);
        let b = Recorder::new("b", &log);
        let idle = Recorder::new("idle", &log);
        let (da, db, di) = (
            Rc::clone(&a.deleted),
            Rc::clone(&b.deleted),
            Rc::clone(&idle.deleted),
        );
        let a = sched.attach(a);
        let b = sched.attach(b);
        sched.attach(idle);
        sched.add_sync_point(t(1), a);
        sched.add_sync_point(t(2), a);
        sched.add_sync_point(t(3), b);
        drop(sched);

        assert_eq!(*da.borrow(), 1);
        assert_eq!(*db.borrow(), 1);
        assert_eq!(*di.borrow(), 0);
    }

    #[test]
    fn guard_resets_after_unit_panic() {
        struct Bomb;
        impl Schedulable for Bomb {
            fn name(&self) -> &str {
                "bomb"
            }
            fn execute_until(&mut self, _time: EmuTime, _ctx: &mut SyncContext<'_>) {
                panic!("boom");
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

        let mut sched = Scheduler::new();
        let bomb = sched.attach(Bomb);
        sched.set_sync_point(t(1), bomb);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            sched.run_until(t(5));
        }));
        assert!(result.is_err());
        assert!(!sched.is_dispatching());
    }

    #[test]
    fn unit_state_round_trip() {
        let log = Log::default();
        let mut sched = Scheduler::new();
        let a = sched.attach(Recorder::new("a", &log));
        sched.set_sync_point(t(3), a);
        sched.run_until(t(3));
        sched.add_sync_point(t(7), a);
        sched.add_sync_point(t(9), a);

        let mut out = OutputArchive::new(ArchiveFormat::Json);
        let root = sched.save_state(&mut out).unwrap();
        let unit_obj = sched.save_unit(a, &mut out).unwrap();
        let bytes = out.finish(root).unwrap();

        let input = InputArchive::from_bytes(&bytes).unwrap();
        let log2 = Log::default();
        let mut restored = Scheduler::new();
        let a2 = restored.attach(Recorder::new("a", &log2));
        restored.load_state(&input, input.root()).unwrap();
        restored.load_unit(a2, &input, unit_obj).unwrap();

        assert_eq!(restored.current_time(), t(3));
        let times: Vec<_> = restored.sync_points(a2).iter().map(|sp| sp.time()).collect();
        assert_eq!(times, vec![t(7), t(9)]);
    }

    #[test]
    fn stale_unit_times_are_rejected() {
        let log = Log::default();
        let mut out = OutputArchive::new(ArchiveFormat::Binary);
        let sched_obj = out
            .save(&SchedulerState {
                current_time: t(100),
            })
            .unwrap();
        let unit_obj = out
            .save(&RecorderState {
                pending: SyncPointsState::new(vec![t(50)]),
            })
            .unwrap();
        let bytes = out.finish(sched_obj).unwrap();
        let input = InputArchive::from_bytes(&bytes).unwrap();

        let mut sched = Scheduler::new();
        let a = sched.attach(Recorder::new("a", &log));
        sched.load_state(&input, sched_obj).unwrap();
        let err = sched.load_unit(a, &input, unit_obj).unwrap_err();
        assert!(err.to_string().contains("before the saved current time"));
        assert_eq!(sched.pending_count(), 0);
    }

    #[test]
    #[should_panic(expected = "fresh scheduler")]
    fn load_into_used_scheduler_panics() {
        let log = Log::default();
        let mut sched = Scheduler::new();
        let a = sched.attach(Recorder::new("a", &log));
        sched.set_sync_point(t(1), a);

        let mut out = OutputArchive::new(ArchiveFormat::Binary);
        let root = sched.save_state(&mut out).unwrap();
        let bytes = out.finish(root).unwrap();
        let input = InputArchive::from_bytes(&bytes).unwrap();
        let _ = sched.load_state(&input, root);
    }
}
