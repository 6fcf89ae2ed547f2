//! Structured logging setup for jarwright
//!
//! Build progress ("Compiling 3 source files in app:core"), engine selection and
//! lifecycle decisions are reported through `tracing`. This module installs the
//! subscriber: pretty console output by default, JSON for CI log collectors, with
//! `RUST_LOG` always taking part in filtering.
//!
//! # Example
//!
//! ```no_run
//! use jarwright::util::logging;
//! use jarwright::SessionConfig;
//!
//! // Level from JARWRIGHT_LOG_LEVEL, JSON from JARWRIGHT_LOG_JSON
//! logging::init_from_env();
//!
//! // Or derive it from a session: traced tools raise the level to debug
//! let config = SessionConfig::default().with_trace("javac");
//! logging::init_for_session(&config);
//! ```

use crate::config::SessionConfig;
use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ensures logging is only initialized once
static INIT: Once = Once::new();

/// Configuration for logging initialization
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for `jarwright` targets
    pub level: Level,

    /// Use JSON output format (for CI log collection)
    pub use_json: bool,

    /// Include the module target (e.g., jarwright::invoker) in logs
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,

    /// Include thread ID and name in logs; useful with parallel project builds
    pub include_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: false,
            include_location: false,
            include_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// JSON output with full metadata, for CI servers
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            use_json: true,
            include_target: true,
            include_location: true,
            include_thread_ids: true,
        }
    }

    /// Debug level console output, for working on build definitions
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            use_json: false,
            include_target: true,
            include_location: false,
            include_thread_ids: false,
        }
    }

    /// Derives the logging setup of a build session
    ///
    /// Any traced tool needs at least debug level so its command lines show up;
    /// parallel builds are easier to follow with thread ids.
    pub fn for_session(config: &SessionConfig) -> Self {
        let mut level = parse_level(&config.log_level);
        if !config.trace.is_empty() && level < Level::DEBUG {
            level = Level::DEBUG;
        }
        Self {
            level,
            include_thread_ids: !config.trace.is_empty(),
            ..Default::default()
        }
    }
}

/// Parses a log level from a string, case-insensitively
///
/// Unknown values fall back to `Level::INFO`.
///
/// ```
/// use jarwright::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("debug"), Level::DEBUG);
/// assert_eq!(parse_level("invalid"), Level::INFO);
/// ```
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

/// Installs the global subscriber; later calls are ignored
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = format!("jarwright={}", config.level).parse() {
            filter = filter.add_directive(directive);
        }

        // Directory walking is chatty at debug level
        if env::var("RUST_LOG").is_err() {
            for quiet in ["globset=warn", "ignore=warn"] {
                if let Ok(directive) = quiet.parse() {
                    filter = filter.add_directive(directive);
                }
            }
        }

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .init();
        }
    });
}

pub fn init_default() {
    init_logging(LoggingConfig::default());
}

/// Initializes logging from `JARWRIGHT_LOG_LEVEL` and `JARWRIGHT_LOG_JSON`
pub fn init_from_env() {
    let level_str = env::var("JARWRIGHT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let level = parse_level(&level_str);

    let use_json = env::var("JARWRIGHT_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    init_logging(LoggingConfig {
        level,
        use_json,
        ..Default::default()
    });
}

pub fn init_for_session(config: &SessionConfig) {
    init_logging(LoggingConfig::for_session(config));
}

pub fn with_level(level_str: &str) {
    init_logging(LoggingConfig::with_level(parse_level(level_str)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        trace = { "trace", Level::TRACE },
        debug = { "Debug", Level::DEBUG },
        info = { "INFO", Level::INFO },
        warn = { "warn", Level::WARN },
        error = { "error", Level::ERROR },
        invalid = { "verbose", Level::INFO },
        empty = { "", Level::INFO },
    )]
    fn test_parse_level(input: &str, expected: Level) {
        assert_eq!(parse_level(input), expected);
    }

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.use_json);
        assert!(!config.include_target);
        assert!(!config.include_thread_ids);
    }

    #[test]
    fn test_production_config() {
        let config = LoggingConfig::production();
        assert!(config.use_json);
        assert!(config.include_location);
        assert!(config.include_thread_ids);
    }

    #[test]
    fn test_development_config() {
        let config = LoggingConfig::development();
        assert_eq!(config.level, Level::DEBUG);
        assert!(!config.use_json);
    }

    #[test]
    fn test_session_without_trace_keeps_level() {
        let mut session = SessionConfig::default();
        session.trace.clear();
        session.log_level = "warn".to_string();
        let config = LoggingConfig::for_session(&session);
        assert_eq!(config.level, Level::WARN);
        assert!(!config.include_thread_ids);
    }

    #[test]
    fn test_session_trace_raises_level() {
        let mut session = SessionConfig::default().with_trace("javac");
        session.log_level = "info".to_string();
        let config = LoggingConfig::for_session(&session);
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.include_thread_ids);
    }

    #[test]
    fn test_session_trace_keeps_more_verbose_level() {
        let mut session = SessionConfig::default().with_trace("all");
        session.log_level = "trace".to_string();
        assert_eq!(LoggingConfig::for_session(&session).level, Level::TRACE);
    }
}
