//! Logger initialisation.
//!
//! Log output goes to stdout through `fern`. The level comes from the model's `settings.toml`,
//! overridden by the `GRIDPLAN_LOG_LEVEL` environment variable when set; level names are
//! colourised when stdout is a terminal.
use anyhow::{bail, Result};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::Dispatch;
use std::env;

pub(crate) const DEFAULT_LOG_LEVEL: &str = "info";

/// Parse a log level name (off, error, warn, info, debug or trace) into a filter.
fn parse_level(name: &str) -> Result<log::LevelFilter> {
    let level = match name.to_lowercase().as_str() {
        "off" => log::LevelFilter::Off,
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        unknown => bail!("Unknown log level: {unknown}"),
    };

    Ok(level)
}

/// Initialise the program logger.
///
/// # Arguments
///
/// * `log_level_from_settings`: The log level specified in `settings.toml`, if any
pub fn init(log_level_from_settings: Option<&str>) -> Result<()> {
    let level_name = env::var("GRIDPLAN_LOG_LEVEL").unwrap_or_else(|_| {
        log_level_from_settings
            .unwrap_or(DEFAULT_LOG_LEVEL)
            .to_string()
    });
    let level = parse_level(&level_name)?;

    // Colourise level names only when talking to a terminal
    let colours = atty::is(atty::Stream::Stdout).then(|| {
        ColoredLevelConfig::new()
            .error(Color::Red)
            .warn(Color::Yellow)
            .info(Color::Green)
            .debug(Color::Blue)
            .trace(Color::Magenta)
    });

    Dispatch::new()
        .format(move |out, message, record| {
            let level = match &colours {
                Some(colours) => colours.color(record.level()).to_string(),
                None => record.level().to_string(),
            };
            out.finish(format_args!(
                "[{} {} {}] {}",
                Local::now().format("%H:%M:%S"),
                level,
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()?;

    Ok(())
}
