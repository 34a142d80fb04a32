//! Logger initialization (console + optional file)

use anyhow::Result;
use simplelog::*;
use std::fs::File;
use std::str::FromStr;

/// Initialize the global logger.
///
/// Logs go to stderr and, when `log_file_path` is given, to that file as
/// well. `level` accepts the usual names (`error`, `warn`, `info`, `debug`,
/// `trace`, `off`); anything else falls back to `info`.
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - The file could not be created or a logger is
///   already installed
pub fn init_logger(level: &str, log_file_path: Option<&str>) -> Result<()> {
    let level = parse_level(level);
    let config = ConfigBuilder::new()
        .add_filter_allow_str("tubecore")
        .add_filter_allow_str("tubedeck")
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::with_capacity(2);
    loggers.push(TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ));

    if let Some(path) = log_file_path {
        let log_file = File::create(path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;
        loggers.push(WriteLogger::new(level, config, log_file));
    }

    CombinedLogger::init(loggers).map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

fn parse_level(level: &str) -> LevelFilter {
    LevelFilter::from_str(level.trim()).unwrap_or(LevelFilter::Info)
}
