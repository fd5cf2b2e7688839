//! `oxmsx inspect`: describe a save-state without building a machine.

use std::io::Write;

use oxmsx_machine::MachineState;
use oxmsx_sched::SchedulerState;
use oxmsx_serialize::{ArchiveFormat, InputArchive, Versioned};

use crate::InspectArgs;

/// Runs the `oxmsx inspect` command.
pub fn run(args: &InspectArgs, out: &mut dyn Write) -> Result<i32, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(&args.state)
        .map_err(|e| format!("cannot read state '{}': {e}", args.state))?;
    let archive = InputArchive::from_bytes(&bytes)?;
    describe(&archive, out)?;
    Ok(0)
}

fn describe(archive: &InputArchive, out: &mut dyn Write) -> Result<(), Box<dyn std::error::Error>> {
    let format = match archive.format() {
        ArchiveFormat::Binary => "binary",
        ArchiveFormat::Json => "json",
    };
    writeln!(out, "format:   {format}")?;
    writeln!(out, "producer: {}", archive.producer())?;
    writeln!(out, "root:     {}", archive.root())?;

    let root_is_machine = archive
        .records()
        .any(|r| r.id == archive.root() && r.type_name == MachineState::TYPE_NAME);
    if root_is_machine {
        let machine = archive.load::<MachineState>(archive.root())?.value;
        let sched = archive.load::<SchedulerState>(machine.scheduler)?.value;
        writeln!(out, "machine:  {} (powered: {})", machine.name, machine.powered)?;
        writeln!(
            out,
            "time:     {} ({:.6}s)",
            sched.current_time,
            sched.current_time.as_secs_f64()
        )?;
    }

    writeln!(out, "records:  {}", archive.len())?;
    writeln!(out, "  {:>4}  {:<16} {:>7}", "id", "type", "version")?;
    for rec in archive.records() {
        writeln!(
            out,
            "  {:>4}  {:<16} {:>7}",
            rec.id.as_raw(),
            rec.type_name,
            rec.version
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxmsx_config::{load_config_from_str, resolve_machine};
    use oxmsx_machine::Machine;

    fn saved_state(format: ArchiveFormat) -> Vec<u8> {
        let config = load_config_from_str(
            r#"
[machine]
name = "inspect_me"

[devices.vsync]
kind = "periodic"
frequency = "60Hz"
"#,
        )
        .unwrap();
        let mut machine = Machine::new(&resolve_machine(&config).unwrap());
        machine.power_on();
        machine.run_for(oxmsx_time::EmuDuration::from_millis(40)).unwrap();
        machine.save(format).unwrap()
    }

    #[test]
    fn describes_machine_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.state");
        std::fs::write(&path, saved_state(ArchiveFormat::Binary)).unwrap();

        let mut out = Vec::new();
        let args = InspectArgs {
            state: path.to_string_lossy().into_owned(),
        };
        assert_eq!(run(&args, &mut out).unwrap(), 0);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("format:   binary"));
        assert!(text.contains("machine:  inspect_me (powered: true)"));
        assert!(text.contains("records:  4"));
        assert!(text.contains("PeriodicTimer"));
        assert!(text.contains("Scheduler"));
    }

    #[test]
    fn json_state_is_detected() {
        let archive = InputArchive::from_bytes(&saved_state(ArchiveFormat::Json)).unwrap();
        let mut out = Vec::new();
        describe(&archive, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("format:   json"));
    }

    #[test]
    fn garbage_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk");
        std::fs::write(&path, b"not a state").unwrap();
        let args = InspectArgs {
            state: path.to_string_lossy().into_owned(),
        };
        let err = run(&args, &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("bad magic"));
    }
}
