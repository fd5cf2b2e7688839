//! A device that fires at a fixed list of offsets, holding several sync
//! points at once.

use oxmsx_sched::{Schedulable, SyncContext, SyncPointsState};
use oxmsx_serialize::{ArchiveError, InputArchive, ObjectId, OutputArchive, Versioned};
use oxmsx_time::{EmuDuration, EmuTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Registers one sync point per offset at power-on and records when each
/// one fires.
#[derive(Debug, Clone)]
pub struct Sequencer {
    name: String,
    offsets: Vec<EmuDuration>,
    fired: Vec<EmuTime>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SequencerState {
    offsets: Vec<EmuDuration>,
    fired: Vec<EmuTime>,
    sync_points: SyncPointsState,
}

impl Versioned for SequencerState {
    const TYPE_NAME: &'static str = "Sequencer";
}

impl Sequencer {
    /// Creates a sequencer for `offsets`, measured from power-on.
    pub fn new(name: impl Into<String>, offsets: Vec<EmuDuration>) -> Self {
        Self {
            name: name.into(),
            offsets,
            fired: Vec::new(),
        }
    }

    /// All firing times when powered on at `start`, in offset order.
    pub fn schedule(&self, start: EmuTime) -> Vec<EmuTime> {
        self.offsets.iter().map(|off| start + *off).collect()
    }

    /// Configured offsets.
    pub fn offsets(&self) -> &[EmuDuration] {
        &self.offsets
    }

    /// Times at which the sequencer fired, in dispatch order.
    pub fn fired(&self) -> &[EmuTime] {
        &self.fired
    }
}

impl Schedulable for Sequencer {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute_until(&mut self, time: EmuTime, ctx: &mut SyncContext<'_>) {
        self.fired.push(time);
        if ctx.pending_sync_point().is_none() {
            debug!(sequencer = %self.name, fired = self.fired.len(), "sequence complete");
        }
    }

    fn scheduler_deleted(&mut self) {
        debug!(sequencer = %self.name, "scheduler gone with entries left");
    }

    fn save_state(
        &self,
        pending: SyncPointsState,
        ar: &mut OutputArchive,
    ) -> Result<ObjectId, ArchiveError> {
        ar.save(&SequencerState {
            offsets: self.offsets.clone(),
            fired: self.fired.clone(),
            sync_points: pending,
        })
    }

    fn load_state(
        &mut self,
        ar: &InputArchive,
        id: ObjectId,
    ) -> Result<SyncPointsState, ArchiveError> {
        let state = ar.load::<SequencerState>(id)?.value;
        self.offsets = state.offsets;
        self.fired = state.fired;
        Ok(state.sync_points)
    }
}
