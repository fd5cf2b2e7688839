//! A free-running periodic timer, the simplest scheduled device.

use oxmsx_sched::{Schedulable, SyncContext, SyncPointsState};
use oxmsx_serialize::{ArchiveError, InputArchive, ObjectId, OutputArchive, Versioned};
use oxmsx_time::{EmuDuration, EmuTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fires once per period and immediately schedules the next firing.
#[derive(Debug, Clone)]
pub struct PeriodicTimer {
    name: String,
    period: EmuDuration,
    fired: u64,
    last_fire: Option<EmuTime>,
}

/// Current persisted layout.
#[derive(Debug, Serialize, Deserialize)]
struct TimerState {
    period: EmuDuration,
    fired: u64,
    last_fire: Option<EmuTime>,
    sync_points: SyncPointsState,
}

impl Versioned for TimerState {
    const TYPE_NAME: &'static str = "PeriodicTimer";
    const VERSION: u32 = 2;
}

/// Layout before the fire counter was added.
#[derive(Debug, Serialize, Deserialize)]
struct TimerStateV1 {
    period: EmuDuration,
    sync_points: SyncPointsState,
}

impl PeriodicTimer {
    /// Creates a timer that fires every `period`.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero.
    pub fn new(name: impl Into<String>, period: EmuDuration) -> Self {
        assert!(period > EmuDuration::ZERO, "timer period must be non-zero");
        Self {
            name: name.into(),
            period,
            fired: 0,
            last_fire: None,
        }
    }

    /// The first firing when powered on at `start`.
    pub fn first_fire(&self, start: EmuTime) -> EmuTime {
        start + self.period
    }

    /// Firing interval.
    pub fn period(&self) -> EmuDuration {
        self.period
    }

    /// Number of firings so far.
    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// Time of the most recent firing.
    pub fn last_fire(&self) -> Option<EmuTime> {
        self.last_fire
    }
}

impl Schedulable for PeriodicTimer {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute_until(&mut self, time: EmuTime, ctx: &mut SyncContext<'_>) {
        self.fired += 1;
        self.last_fire = Some(time);
        ctx.set_sync_point(time + self.period);
    }

    fn scheduler_deleted(&mut self) {
        debug!(timer = %self.name, fired = self.fired, "scheduler gone");
    }

    fn save_state(
        &self,
        pending: SyncPointsState,
        ar: &mut OutputArchive,
    ) -> Result<ObjectId, ArchiveError> {
        ar.save(&TimerState {
            period: self.period,
            fired: self.fired,
            last_fire: self.last_fire,
            sync_points: pending,
        })
    }

    fn load_state(
        &mut self,
        ar: &InputArchive,
        id: ObjectId,
    ) -> Result<SyncPointsState, ArchiveError> {
        let rec = ar.record(id, TimerState::TYPE_NAME, TimerState::VERSION)?;
        let state = match rec.version() {
            1 => {
                let old: TimerStateV1 = rec.decode()?;
                TimerState {
                    period: old.period,
                    fired: 0,
                    last_fire: None,
                    sync_points: old.sync_points,
                }
            }
            _ => rec.decode::<TimerState>()?,
        };
        if state.period == EmuDuration::ZERO {
            return Err(ArchiveError::Decode {
                context: format!("timer '{}'", self.name),
                reason: "period is zero".to_string(),
            });
        }
        self.period = state.period;
        self.fired = state.fired;
        self.last_fire = state.last_fire;
        Ok(state.sync_points)
    }
}
