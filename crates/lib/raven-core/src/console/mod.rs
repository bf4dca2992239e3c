use std::path::PathBuf;

use structopt::StructOpt;

use crate::log::{LevelFilter, LogConfig};

/// Collect console configuration into a struct.
pub fn from_args() -> anyhow::Result<ConsoleVars> {
    resolve(ConsoleVarsImpl::from_args())
}

/// Same as [`from_args`], but parse from the given iterator instead of the process arguments.
pub fn from_iter<I>(iter: I) -> anyhow::Result<ConsoleVars>
where
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    resolve(ConsoleVarsImpl::from_iter_safe(iter)?)
}

pub fn parse_level(level: &str) -> anyhow::Result<LevelFilter> {
    let level = match level.to_lowercase().trim() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        other => anyhow::bail!("Unknown log level: {}", other),
    };

    Ok(level)
}

/// Console variables collect from console commands.
#[derive(Clone, Debug)]
pub struct ConsoleVars {
    pub level: LevelFilter,
    pub log_file: Option<PathBuf>,
    /// Extent of the frame the host renders before post processing.
    pub width: u32,
    pub height: u32,
}

impl ConsoleVars {
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            file: self.log_file.clone(),
        }
    }
}

fn resolve(vars: ConsoleVarsImpl) -> anyhow::Result<ConsoleVars> {
    if vars.width == 0 || vars.height == 0 {
        anyhow::bail!("Frame extent must be non-zero, got {}x{}", vars.width, vars.height);
    }

    Ok(ConsoleVars {
        level: parse_level(&vars.level)?,
        log_file: vars.log_file,
        width: vars.width,
        height: vars.height,
    })
}

#[derive(Debug, StructOpt)]
#[structopt(name = "raven sandbox", about = "Post processing playground of raven engine.")]
struct ConsoleVarsImpl {
    /// log level (please choose from trace, debug, info, warn, error)
    #[structopt(short, long, default_value = "debug")]
    level: String,

    /// mirror log records into this file
    #[structopt(long, parse(from_os_str))]
    log_file: Option<PathBuf>,

    #[structopt(long, default_value = "320")]
    width: u32,

    #[structopt(long, default_value = "180")]
    height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_default_console_vars() {
        let vars = from_iter(["sandbox"]).unwrap();

        assert_eq!(vars.level, LevelFilter::Debug);
        assert_eq!((vars.width, vars.height), (320, 180));
        assert!(vars.log_file.is_none());
    }

    #[test]
    fn parse_explicit_console_vars() {
        let vars = from_iter(["sandbox", "-l", "WARN", "--width", "1920", "--height", "1080"]).unwrap();

        assert_eq!(vars.level, LevelFilter::Warn);
        assert_eq!((vars.width, vars.height), (1920, 1080));
    }

    #[test]
    fn reject_unknown_level_and_empty_extent() {
        assert!(from_iter(["sandbox", "--level", "loud"]).is_err());
        assert!(from_iter(["sandbox", "--width", "0"]).is_err());
    }
}
