//! A complete machine: scheduler, processor and devices, with save-states.

use std::fmt;

use oxmsx_config::{resolve_machine, DeviceKind, MachineConfig, ResolvedMachine};
use oxmsx_sched::{Schedulable, Scheduler, UnitId};
use oxmsx_serialize::{ArchiveFormat, InputArchive, ObjectId, OutputArchive, Versioned};
use oxmsx_time::{EmuDuration, EmuTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cpu::{Cpu, RunStats};
use crate::error::MachineError;
use crate::sequencer::Sequencer;
use crate::timer::PeriodicTimer;

/// Device flavours a machine file can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    /// [`PeriodicTimer`].
    Periodic,
    /// [`Sequencer`].
    Sequence,
}

impl DeviceType {
    fn as_str(self) -> &'static str {
        match self {
            DeviceType::Periodic => "periodic",
            DeviceType::Sequence => "sequence",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
struct DeviceSlot {
    name: String,
    kind: DeviceType,
    id: UnitId,
}

/// Reference from the root record to one device record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Device name.
    pub name: String,
    /// Device flavour.
    pub kind: DeviceType,
    /// Record holding the device state.
    pub state: ObjectId,
}

/// Root record of a machine save-state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineState {
    /// Machine name from the configuration.
    pub name: String,
    /// Whether devices had been started.
    pub powered: bool,
    /// Scheduler record.
    pub scheduler: ObjectId,
    /// Processor record.
    pub cpu: ObjectId,
    /// Device records, in attach order.
    pub devices: Vec<DeviceRecord>,
}

impl Versioned for MachineState {
    const TYPE_NAME: &'static str = "Machine";
}

/// What one device has done so far, for reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSummary {
    /// Device name.
    pub name: String,
    /// Device flavour.
    pub kind: DeviceType,
    /// Number of firings.
    pub fired: u64,
    /// Most recent firing.
    pub last_fire: Option<EmuTime>,
    /// Pending sync points.
    pub pending: Vec<EmuTime>,
}

/// An emulated machine.
pub struct Machine {
    config: ResolvedMachine,
    scheduler: Scheduler,
    cpu: Cpu,
    devices: Vec<DeviceSlot>,
    powered: bool,
}

impl Machine {
    /// Builds a powered-off machine at time zero.
    pub fn new(config: &ResolvedMachine) -> Self {
        let cpu = Cpu::new(config.cpu_frequency, config.cycles_per_step);
        let mut scheduler = Scheduler::new();
        scheduler.set_clock_driver(cpu.driver());

        let devices = config
            .devices
            .iter()
            .map(|dev| {
                let (kind, id) = match &dev.kind {
                    DeviceKind::Periodic { period, .. } => (
                        DeviceType::Periodic,
                        scheduler.attach(PeriodicTimer::new(dev.name.clone(), *period)),
                    ),
                    DeviceKind::Sequence { offsets } => (
                        DeviceType::Sequence,
                        scheduler.attach(Sequencer::new(dev.name.clone(), offsets.clone())),
                    ),
                };
                DeviceSlot {
                    name: dev.name.clone(),
                    kind,
                    id,
                }
            })
            .collect();

        Self {
            config: config.clone(),
            scheduler,
            cpu,
            devices,
            powered: false,
        }
    }

    /// Resolves `config` and builds the machine.
    pub fn from_config(config: &MachineConfig) -> Result<Self, MachineError> {
        Ok(Self::new(&resolve_machine(config)?))
    }

    /// Machine name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The configuration the machine was built from.
    pub fn config(&self) -> &ResolvedMachine {
        &self.config
    }

    /// Returns `true` once [`power_on`](Self::power_on) has run.
    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Starts every device relative to the current time.
    ///
    /// # Panics
    ///
    /// Panics if the machine is already powered on.
    pub fn power_on(&mut self) {
        assert!(!self.powered, "machine '{}' is already powered on", self.config.name);
        let start = self.scheduler.current_time();
        for slot in &self.devices {
            match slot.kind {
                DeviceType::Periodic => {
                    let first = self
                        .scheduler
                        .unit::<PeriodicTimer>(slot.id)
                        .map(|timer| timer.first_fire(start));
                    if let Some(first) = first {
                        self.scheduler.set_sync_point(first, slot.id);
                    }
                }
                DeviceType::Sequence => {
                    let times = self
                        .scheduler
                        .unit::<Sequencer>(slot.id)
                        .map(|seq| seq.schedule(start))
                        .unwrap_or_default();
                    for time in times {
                        self.scheduler.add_sync_point(time, slot.id);
                    }
                }
            }
        }
        self.powered = true;
        info!(machine = %self.config.name, devices = self.devices.len(), "powered on");
    }

    /// Runs for `duration` of emulated time.
    ///
    /// Fails without running if the end time does not fit on the timeline.
    pub fn run_for(&mut self, duration: EmuDuration) -> Result<RunStats, MachineError> {
        let until = self
            .time()
            .checked_add(duration)
            .ok_or(MachineError::TimeOverflow { duration })?;
        Ok(self.run_until(until))
    }

    /// Runs until the processor reaches `until`.
    pub fn run_until(&mut self, until: EmuTime) -> RunStats {
        let stats = self.cpu.execute_until(&mut self.scheduler, until);
        debug!(
            time = %self.time(),
            slices = stats.slices,
            dispatched = stats.dispatched,
            "run finished"
        );
        stats
    }

    /// Processor time.
    pub fn time(&self) -> EmuTime {
        self.cpu.time()
    }

    /// The processor.
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// The scheduler.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// The device called `name`, if it exists and is a `T`.
    pub fn device<T: Schedulable>(&self, name: &str) -> Option<&T> {
        let slot = self.devices.iter().find(|slot| slot.name == name)?;
        self.scheduler.unit::<T>(slot.id)
    }

    /// Per-device report in attach order.
    pub fn summaries(&self) -> Vec<DeviceSummary> {
        self.devices
            .iter()
            .map(|slot| {
                let (fired, last_fire) = match slot.kind {
                    DeviceType::Periodic => self
                        .scheduler
                        .unit::<PeriodicTimer>(slot.id)
                        .map_or((0, None), |t| (t.fired(), t.last_fire())),
                    DeviceType::Sequence => self
                        .scheduler
                        .unit::<Sequencer>(slot.id)
                        .map_or((0, None), |s| {
                            (s.fired().len() as u64, s.fired().last().copied())
                        }),
                };
                DeviceSummary {
                    name: slot.name.clone(),
                    kind: slot.kind,
                    fired,
                    last_fire,
                    pending: self
                        .scheduler
                        .sync_points(slot.id)
                        .iter()
                        .map(|sp| sp.time())
                        .collect(),
                }
            })
            .collect()
    }

    /// Encodes the whole machine.
    pub fn save(&self, format: ArchiveFormat) -> Result<Vec<u8>, MachineError> {
        let mut ar = OutputArchive::new(format);
        let scheduler = self.scheduler.save_state(&mut ar)?;
        let cpu = self.cpu.save_state(&mut ar)?;
        let mut devices = Vec::with_capacity(self.devices.len());
        for slot in &self.devices {
            devices.push(DeviceRecord {
                name: slot.name.clone(),
                kind: slot.kind,
                state: self.scheduler.save_unit(slot.id, &mut ar)?,
            });
        }
        let root = ar.save(&MachineState {
            name: self.config.name.clone(),
            powered: self.powered,
            scheduler,
            cpu,
            devices,
        })?;
        let bytes = ar.finish(root)?;
        info!(
            machine = %self.config.name,
            time = %self.time(),
            bytes = bytes.len(),
            ?format,
            "state saved"
        );
        Ok(bytes)
    }

    /// Builds a fresh machine from `config` and loads `bytes` into it.
    ///
    /// The save-state must come from a machine with the same name and the
    /// same device table.
    pub fn load(config: &ResolvedMachine, bytes: &[u8]) -> Result<Self, MachineError> {
        let ar = InputArchive::from_bytes(bytes)?;
        let state = ar.load::<MachineState>(ar.root())?.value;
        let mut machine = Machine::new(config);
        machine.check_layout(&state)?;

        machine.scheduler.load_state(&ar, state.scheduler)?;
        machine.cpu.load_state(&ar, state.cpu)?;
        for (slot, record) in machine.devices.iter().zip(&state.devices) {
            machine.scheduler.load_unit(slot.id, &ar, record.state)?;
        }
        machine.powered = state.powered;
        info!(
            machine = %machine.config.name,
            time = %machine.time(),
            producer = ar.producer(),
            "state loaded"
        );
        Ok(machine)
    }

    /// Replaces this machine with the one in `bytes`. On error the machine
    /// is left untouched.
    pub fn restore(&mut self, bytes: &[u8]) -> Result<(), MachineError> {
        let restored = Machine::load(&self.config, bytes)?;
        *self = restored;
        Ok(())
    }

    fn check_layout(&self, state: &MachineState) -> Result<(), MachineError> {
        if state.name != self.config.name {
            return Err(MachineError::Mismatch(format!(
                "state is for machine '{}', this is '{}'",
                state.name, self.config.name
            )));
        }
        let saved: Vec<_> = state.devices.iter().map(|d| (d.name.as_str(), d.kind)).collect();
        let ours: Vec<_> = self.devices.iter().map(|d| (d.name.as_str(), d.kind)).collect();
        if saved != ours {
            return Err(MachineError::Mismatch(format!(
                "device table differs: state has [{}], machine has [{}]",
                describe(&saved),
                describe(&ours)
            )));
        }
        Ok(())
    }
}

fn describe(devices: &[(&str, DeviceType)]) -> String {
    devices
        .iter()
        .map(|(name, kind)| format!("{name}:{kind}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("name", &self.config.name)
            .field("time", &self.time())
            .field("powered", &self.powered)
            .field("devices", &self.devices.len())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxmsx_config::load_config_from_str;

    const TOML: &str = r#"
[machine]
name = "test"
cpu_frequency = "1MHz"
cycles_per_step = 1

[devices.hz1000]
kind = "periodic"
frequency = "1KHz"

[devices.seq]
kind = "sequence"
at = ["500us", "1500us"]
"#;

    fn machine() -> Machine {
        Machine::from_config(&load_config_from_str(TOML).unwrap()).unwrap()
    }

    #[test]
    fn new_machine_is_idle() {
        let m = machine();
        assert!(!m.is_powered());
        assert_eq!(m.time(), EmuTime::ZERO);
        assert_eq!(m.scheduler().unit_count(), 2);
        assert_eq!(m.scheduler().pending_count(), 0);
    }

    #[test]
    fn power_on_registers_devices() {
        let mut m = machine();
        m.power_on();
        assert_eq!(m.scheduler().pending_count(), 3);
        assert_eq!(m.cpu().next_sync_point(), EmuTime::ZERO + EmuDuration::from_micros(500));
    }

    #[test]
    #[should_panic(expected = "already powered on")]
    fn double_power_on_panics() {
        let mut m = machine();
        m.power_on();
        m.power_on();
    }

    #[test]
    fn devices_fire_during_run() {
        let mut m = machine();
        m.power_on();
        m.run_for(EmuDuration::from_millis(3)).unwrap();

        let timer = m.device::<PeriodicTimer>("hz1000").unwrap();
        assert_eq!(timer.fired(), 3);
        let seq = m.device::<Sequencer>("seq").unwrap();
        assert_eq!(seq.fired().len(), 2);
        assert!(m.device::<Sequencer>("hz1000").is_none());
        assert!(m.device::<PeriodicTimer>("missing").is_none());
    }

    #[test]
    fn summaries_follow_attach_order() {
        let mut m = machine();
        m.power_on();
        m.run_for(EmuDuration::from_millis(1)).unwrap();
        let summaries = m.summaries();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].name, "hz1000");
        assert_eq!(summaries[0].kind, DeviceType::Periodic);
        assert_eq!(summaries[0].fired, 1);
        assert_eq!(summaries[0].pending.len(), 1);
        assert_eq!(summaries[1].name, "seq");
        assert_eq!(summaries[1].fired, 1);
        assert_eq!(summaries[1].pending.len(), 1);
    }

    #[test]
    fn save_lists_every_record() {
        let mut m = machine();
        m.power_on();
        let bytes = m.save(ArchiveFormat::Binary).unwrap();
        let ar = InputArchive::from_bytes(&bytes).unwrap();
        let types: Vec<_> = ar.records().map(|r| r.type_name).collect();
        assert_eq!(
            types,
            vec!["Scheduler", "Cpu", "PeriodicTimer", "Sequencer", "Machine"]
        );
    }

    #[test]
    fn load_rejects_other_machine() {
        let m = machine();
        let bytes = m.save(ArchiveFormat::Json).unwrap();
        let other = load_config_from_str(&TOML.replace("name = \"test\"", "name = \"other\"")).unwrap();
        let err = Machine::load(&resolve_machine(&other).unwrap(), &bytes).unwrap_err();
        assert!(matches!(err, MachineError::Mismatch(_)));
    }

    #[test]
    fn load_rejects_other_device_table() {
        let m = machine();
        let bytes = m.save(ArchiveFormat::Binary).unwrap();
        let other = load_config_from_str(&TOML.replace("[devices.seq]", "[devices.seq2]")).unwrap();
        let err = Machine::load(&resolve_machine(&other).unwrap(), &bytes).unwrap_err();
        assert!(err.to_string().contains("device table differs"));
    }

    #[test]
    fn run_past_end_of_time_is_an_error() {
        let mut m = machine();
        m.power_on();
        let before = m.time();
        let err = m.run_for(EmuDuration::from_ticks(u64::MAX)).unwrap_err();
        assert!(matches!(err, MachineError::TimeOverflow { .. }));
        assert_eq!(m.time(), before);
        assert!(m.run_for(EmuDuration::from_millis(1)).is_ok());
    }

    #[test]
    fn failed_restore_keeps_machine() {
        let mut m = machine();
        m.power_on();
        m.run_for(EmuDuration::from_millis(1)).unwrap();
        let before = m.time();
        assert!(m.restore(b"garbage").is_err());
        assert_eq!(m.time(), before);
        assert!(m.is_powered());
    }
}
