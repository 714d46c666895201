//! Logging setup for the service.
//!
//! `service.log_level` is validated with [`parse_level`] when the config is
//! loaded, so [`init`] only ever sees a real level. `RUST_LOG` directives
//! refine it unless a CLI `-v` level was given.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// HTTP client internals that flood the output at debug and trace.
const QUIET_AT_DEBUG: &str = "hyper=warn,hyper_util=warn,rustls=warn";

/// Parse `service.log_level` (or its env override) into a [`LevelFilter`].
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    let trimmed = level.trim();
    if trimmed.is_empty() {
        return Err(AppError::Config("service.log_level must not be empty".into()));
    }
    trimmed.parse::<LevelFilter>().map_err(|_| {
        AppError::Config(format!(
            "unrecognised log level '{level}' (expected off, error, warn, info, debug or trace)"
        ))
    })
}

/// Install the global stderr subscriber.
///
/// With `cli_override` the given level wins outright. Otherwise a parseable
/// `RUST_LOG` takes precedence and `level` is the fallback.
pub fn init(level: LevelFilter, cli_override: bool) -> Result<(), AppError> {
    let filter = if cli_override {
        level_filter(level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| level_filter(level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}

fn level_filter(level: LevelFilter) -> EnvFilter {
    let quiet = if level >= LevelFilter::DEBUG { QUIET_AT_DEBUG } else { "" };
    EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(quiet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_levels_parse() {
        assert_eq!(parse_level("info").unwrap(), LevelFilter::INFO);
        assert_eq!(parse_level(" DEBUG ").unwrap(), LevelFilter::DEBUG);
        assert_eq!(parse_level("off").unwrap(), LevelFilter::OFF);
    }

    #[test]
    fn bad_levels_are_config_errors() {
        for bad in ["", "verbose", "recruitgenie=debug"] {
            assert!(matches!(parse_level(bad), Err(AppError::Config(_))), "expected '{bad}' to be rejected");
        }
    }

    #[test]
    fn filter_caps_at_requested_level() {
        assert_eq!(level_filter(LevelFilter::WARN).max_level_hint(), Some(LevelFilter::WARN));
        assert_eq!(level_filter(LevelFilter::TRACE).max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn second_init_reports_logger_error() {
        // Another test in this process may have installed a subscriber first.
        let _ = init(LevelFilter::INFO, true);
        assert!(matches!(init(LevelFilter::INFO, true), Err(AppError::Logger(_))));
    }
}
