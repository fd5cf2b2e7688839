//! oxmsx CLI: run a scheduled machine and work with its save-states.
//!
//! `oxmsx run` builds the machine described by `machine.toml`, optionally
//! restores a state, runs it for a while and prints what every device did.
//! `oxmsx inspect` lists the records of a state file.

#![warn(missing_docs)]

mod inspect;
mod logging;
mod run;

use std::io;
use std::path::Path;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use oxmsx_config::MachineConfig;
use oxmsx_serialize::ArchiveFormat;

/// File looked up in the working directory when `--config` is not given.
const DEFAULT_CONFIG_FILE: &str = "machine.toml";

/// oxmsx: deterministic discrete-event machine emulation.
#[derive(Parser, Debug)]
#[command(name = "oxmsx", version, about = "oxmsx emulator scheduler")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a `machine.toml` file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the machine.
    Run(RunArgs),
    /// Show the contents of a save-state.
    Inspect(InspectArgs),
}

/// Arguments for `oxmsx run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Emulated time to run (e.g. "20ms", "500us", "1s").
    #[arg(long = "for")]
    pub for_duration: Option<String>,

    /// Restore this save-state before running.
    #[arg(long)]
    pub load: Option<String>,

    /// Write a save-state here after running.
    #[arg(long)]
    pub save: Option<String>,

    /// Save-state encoding; defaults to `[run] state_format`.
    #[arg(long, value_enum)]
    pub format: Option<StateFormat>,
}

/// Arguments for `oxmsx inspect`.
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Save-state file.
    pub state: String,
}

/// Save-state encoding selectable on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StateFormat {
    /// Compact checksummed binary.
    Binary,
    /// Pretty-printed JSON.
    Json,
}

impl From<StateFormat> for ArchiveFormat {
    fn from(format: StateFormat) -> Self {
        match format {
            StateFormat::Binary => ArchiveFormat::Binary,
            StateFormat::Json => ArchiveFormat::Json,
        }
    }
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print debug information.
    pub verbose: bool,
    /// Optional path to a machine file.
    pub config: Option<String>,
}

/// Loads `--config`, else `machine.toml` in the working directory, else the
/// built-in machine.
fn load_machine_config(global: &GlobalArgs) -> Result<MachineConfig, oxmsx_config::ConfigError> {
    match &global.config {
        Some(path) => oxmsx_config::load_config(Path::new(path)),
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            oxmsx_config::load_config(Path::new(DEFAULT_CONFIG_FILE))
        }
        None => oxmsx_config::default_config(),
    }
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };

    let result = load_machine_config(&global)
        .map_err(Box::<dyn std::error::Error>::from)
        .and_then(|config| {
            logging::init(&global, config.log.level);
            let mut stdout = io::stdout().lock();
            match cli.command {
                Command::Run(ref args) => run::run(args, &global, &config, &mut stdout),
                Command::Inspect(ref args) => inspect::run(args, &mut stdout),
            }
        });

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
