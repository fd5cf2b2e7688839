//! `oxmsx run`: build, optionally restore, run, report, optionally save.

use std::io::Write;

use oxmsx_config::{resolve_machine, MachineConfig};
use oxmsx_machine::{Machine, RunStats};
use oxmsx_serialize::ArchiveFormat;
use oxmsx_time::{EmuDuration, EmuTime};
use tracing::info;

use crate::{GlobalArgs, RunArgs};

/// Run length when neither `--for` nor `[run] duration` is given.
const DEFAULT_RUN_MILLIS: u64 = 20;

/// Runs the `oxmsx run` command and writes the report to `out`.
pub fn run(
    args: &RunArgs,
    global: &GlobalArgs,
    config: &MachineConfig,
    out: &mut dyn Write,
) -> Result<i32, Box<dyn std::error::Error>> {
    let resolved = resolve_machine(config)?;

    let duration = match &args.for_duration {
        Some(text) => text.parse::<EmuDuration>()?,
        None => resolved
            .run
            .duration
            .unwrap_or_else(|| EmuDuration::from_millis(DEFAULT_RUN_MILLIS)),
    };

    let mut machine = match &args.load {
        Some(path) => {
            let bytes = std::fs::read(path)
                .map_err(|e| format!("cannot read state '{path}': {e}"))?;
            let machine = Machine::load(&resolved, &bytes)?;
            info!(path = %path, time = %machine.time(), "restored state");
            machine
        }
        None => {
            let mut machine = Machine::new(&resolved);
            machine.power_on();
            machine
        }
    };

    let start = machine.time();
    let stats = machine.run_for(duration)?;

    if !global.quiet {
        write_report(out, &machine, start, &stats)?;
    }

    if let Some(path) = &args.save {
        let format = args
            .format
            .map(ArchiveFormat::from)
            .unwrap_or(resolved.run.state_format);
        let bytes = machine.save(format)?;
        std::fs::write(path, &bytes).map_err(|e| format!("cannot write state '{path}': {e}"))?;
        if !global.quiet {
            writeln!(out, "saved {} bytes to {path}", bytes.len())?;
        }
    }

    Ok(0)
}

fn fmt_time(time: Option<EmuTime>) -> String {
    match time {
        Some(t) => format!("{:.6}s", t.as_secs_f64()),
        None => "-".to_string(),
    }
}

fn write_report(
    out: &mut dyn Write,
    machine: &Machine,
    start: EmuTime,
    stats: &RunStats,
) -> std::io::Result<()> {
    let end = machine.time();
    writeln!(
        out,
        "machine '{}': {} -> {} ({} cycles, {} slices, {} sync points)",
        machine.name(),
        fmt_time(Some(start)),
        fmt_time(Some(end)),
        machine.cpu().cycles(),
        stats.slices,
        stats.dispatched
    )?;
    writeln!(
        out,
        "  {:<16} {:<9} {:>8} {:>12} {:>12}",
        "device", "kind", "fired", "last", "next"
    )?;
    for dev in machine.summaries() {
        writeln!(
            out,
            "  {:<16} {:<9} {:>8} {:>12} {:>12}",
            dev.name,
            dev.kind.to_string(),
            dev.fired,
            fmt_time(dev.last_fire),
            fmt_time(dev.pending.first().copied())
        )?;
    }
    Ok(())
}
