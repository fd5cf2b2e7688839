//! Processor stand-in and the machine's clock driver.

use oxmsx_sched::{NextSyncPoint, Scheduler};
use oxmsx_serialize::{ArchiveError, InputArchive, ObjectId, OutputArchive, Versioned};
use oxmsx_time::{EmuDuration, EmuTime, Frequency, TickClock};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Work done by one [`Cpu::execute_until`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Number of slices, i.e. calls into the scheduler.
    pub slices: u64,
    /// Sync points dispatched over all slices.
    pub dispatched: usize,
}

impl std::ops::AddAssign for RunStats {
    fn add_assign(&mut self, rhs: RunStats) {
        self.slices += rhs.slices;
        self.dispatched += rhs.dispatched;
    }
}

/// Persisted processor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuState {
    /// Processor clock, positioned at the last executed cycle.
    pub clock: TickClock,
    /// Cycles executed since power-on.
    pub cycles: u64,
}

impl Versioned for CpuState {
    const TYPE_NAME: &'static str = "Cpu";
}

/// Runs ahead in steps of `cycles_per_step` cycles and synchronizes with the
/// scheduler each time it reaches the next sync point.
///
/// The scheduler owns a clone of [`driver`](Self::driver) as its
/// [`ClockDriver`](oxmsx_sched::ClockDriver); the CPU reads the other half.
#[derive(Debug)]
pub struct Cpu {
    clock: TickClock,
    cycles_per_step: u64,
    cycles: u64,
    next_sync: NextSyncPoint,
}

impl Cpu {
    /// Creates a CPU at time zero.
    ///
    /// # Panics
    ///
    /// Panics if `cycles_per_step` is zero or `freq` is not positive.
    pub fn new(freq: Frequency, cycles_per_step: u64) -> Self {
        assert!(cycles_per_step > 0, "cycles_per_step must be non-zero");
        Self {
            clock: TickClock::new(EmuTime::ZERO, freq),
            cycles_per_step,
            cycles: 0,
            next_sync: NextSyncPoint::new(),
        }
    }

    /// The writer half to install with
    /// [`Scheduler::set_clock_driver`](oxmsx_sched::Scheduler::set_clock_driver).
    pub fn driver(&self) -> NextSyncPoint {
        self.next_sync.clone()
    }

    /// Current processor time.
    pub fn time(&self) -> EmuTime {
        self.clock.time()
    }

    /// Cycles executed since power-on.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// The sync point the scheduler most recently reported.
    pub fn next_sync_point(&self) -> EmuTime {
        self.next_sync.get()
    }

    fn step_len(&self) -> EmuDuration {
        self.clock.step() * self.cycles_per_step
    }

    /// Runs until the processor time reaches `until`.
    ///
    /// Each slice executes at least one step and stops at the first step
    /// boundary at or past the nearer of `until` and the next sync point.
    /// The scheduler then dispatches everything up to the processor time.
    ///
    /// # Panics
    ///
    /// Panics if `until` is [`EmuTime::INFINITY`].
    pub fn execute_until(&mut self, sched: &mut Scheduler, until: EmuTime) -> RunStats {
        assert!(!until.is_infinity(), "cannot run until infinity");
        let step = self.step_len();
        let mut stats = RunStats::default();

        while self.time() < until {
            let target = self.next_sync.get().min(until);
            let steps = if target > self.time() {
                let ahead = (target - self.time()).ticks();
                ahead.div_ceil(step.ticks())
            } else {
                1
            };
            self.clock.fast_add(steps * self.cycles_per_step);
            self.cycles += steps * self.cycles_per_step;

            let report = sched.run_until(self.time());
            trace!(
                time = self.time().ticks(),
                dispatched = report.dispatched,
                next = report.next.ticks(),
                "cpu slice"
            );
            stats += RunStats {
                slices: 1,
                dispatched: report.dispatched,
            };
        }
        stats
    }

    /// Snapshot of the persisted fields.
    pub fn state(&self) -> CpuState {
        CpuState {
            clock: self.clock,
            cycles: self.cycles,
        }
    }

    /// Saves the processor.
    pub fn save_state(&self, ar: &mut OutputArchive) -> Result<ObjectId, ArchiveError> {
        ar.save(&self.state())
    }

    /// Restores the processor from record `id`. The sync point reader keeps
    /// its binding to the scheduler.
    pub fn load_state(&mut self, ar: &InputArchive, id: ObjectId) -> Result<(), ArchiveError> {
        let state = ar.load::<CpuState>(id)?.value;
        self.clock = state.clock;
        self.cycles = state.cycles;
        Ok(())
    }
}
