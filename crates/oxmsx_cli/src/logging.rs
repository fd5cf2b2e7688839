//! tracing subscriber setup.

use oxmsx_config::LogLevel;
use tracing_subscriber::EnvFilter;

use crate::GlobalArgs;

/// Picks the filter: `--quiet`/`--verbose` win, then `RUST_LOG`, then the
/// machine file's `[log] level`.
fn directive(global: &GlobalArgs, env: Option<String>, level: LogLevel) -> String {
    if global.quiet {
        return "error".to_string();
    }
    if global.verbose {
        return "debug".to_string();
    }
    match env {
        Some(env) if !env.trim().is_empty() => env,
        _ => level.as_str().to_string(),
    }
}

/// Installs the global fmt subscriber writing to stderr.
pub fn init(global: &GlobalArgs, level: LogLevel) {
    let wanted = directive(global, std::env::var("RUST_LOG").ok(), level);
    let filter = EnvFilter::try_new(&wanted).unwrap_or_else(|e| {
        eprintln!("invalid log filter '{wanted}': {e}, using info");
        EnvFilter::new("info")
    });

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("failed to init logger: {e}");
    }
}
