//! Configuration management for jarwright
//!
//! Session settings are loaded from environment variables with sensible defaults.
//! They control where the JDK lives, whether commands actually run, which tools trace
//! their output, and the defaults written into generated manifests.
//!
//! # Environment Variables
//!
//! - `JAVA_HOME`: JDK installation; tools are resolved from `$JAVA_HOME/bin`
//! - `JAVA_OPTS` / `JAVA_OPTIONS`: default JVM arguments for `java` invocations
//! - `JARWRIGHT_DRYRUN`: skip external processes (true|false) - default: "false"
//! - `JARWRIGHT_TRACE`: comma separated trace categories (java, javac, javadoc, testng,
//!   junit, all) - default: none
//! - `JARWRIGHT_DEBUG`: default for the compiler `debug` option - default: "true"
//! - `JARWRIGHT_CLASSPATH_LIMIT`: classpath length that triggers a pathing jar -
//!   default: 8000 on Windows, unlimited elsewhere
//! - `JARWRIGHT_JAVA_VERSION`: value of the `Build-Jdk` manifest header - default: the
//!   `JAVA_VERSION` entry of `$JAVA_HOME/release`
//! - `JARWRIGHT_LOCAL_REPOSITORY`: local artifact repository - default: "~/.m2/repository"
//! - `JARWRIGHT_LOG_LEVEL`: logging level - default: "info"
//! - `USER` / `USERNAME`: value of the `Build-By` manifest header
//!
//! # Example
//!
//! ```no_run
//! use jarwright::SessionConfig;
//!
//! let config = SessionConfig::default().with_dryrun(true);
//! config.validate().expect("Invalid configuration");
//! ```

use std::collections::BTreeSet;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_DEBUG: bool = true;
#[cfg(windows)]
const DEFAULT_CLASSPATH_LIMIT: Option<usize> = Some(8000);
#[cfg(not(windows))]
const DEFAULT_CLASSPATH_LIMIT: Option<usize> = None;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown option {key} for {context}. Valid options: {}", .allowed.join(", "))]
    UnknownOption {
        context: String,
        key: String,
        allowed: Vec<String>,
    },

    #[error("Unknown {kind} engine: {name}")]
    UnknownEngine { kind: String, name: String },

    /// Signature files in META-INF are meaningless without a manifest
    #[error("{archive} has its manifest disabled but META-INF files require one: {}", .files.join(", "))]
    ManifestRequired { archive: String, files: Vec<String> },

    #[error("File not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Project {0} is already defined")]
    DuplicateProject(String),

    #[error("No such project: {0}")]
    UnknownProject(String),

    #[error("Failed to parse {field}: {error}")]
    InvalidValue { field: String, error: String },

    #[error("Are we forgetting something? JAVA_HOME not set.")]
    MissingJavaHome,

    #[error("JAVA_HOME does not point to a valid JRE/JDK installation: {}", .0.display())]
    InvalidJavaHome(PathBuf),

    #[error("Circular ordering between extension hooks: {}", .0.join(", "))]
    CircularExtensionOrder(Vec<String>),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, error: impl fmt::Display) -> Self {
        Self::InvalidValue {
            field: field.into(),
            error: error.to_string(),
        }
    }
}

/// Settings shared by every project of a build session
///
/// `Default::default()` loads from the environment; the `with_*` builders override
/// individual settings for programmatic use and tests.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub java_home: Option<PathBuf>,
    pub dryrun: bool,
    pub trace: BTreeSet<String>,
    /// Default for the compiler `debug` option
    pub debug: bool,
    /// Default JVM arguments when an invocation does not name its own
    pub java_opts: Vec<String>,
    /// Joined classpath length above which a pathing jar is used (None = never)
    pub classpath_limit: Option<usize>,
    pub build_user: Option<String>,
    pub java_version: Option<String>,
    pub local_repository: PathBuf,
    /// Base directory for top-level projects
    pub root_dir: PathBuf,
    pub log_level: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let java_home = env::var_os("JAVA_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let dryrun = env_bool("JARWRIGHT_DRYRUN").unwrap_or(false);
        let debug = env_bool("JARWRIGHT_DEBUG").unwrap_or(DEFAULT_DEBUG);

        let trace = env::var("JARWRIGHT_TRACE")
            .map(|v| parse_trace(&v))
            .unwrap_or_default();

        let java_opts = env::var("JAVA_OPTS")
            .or_else(|_| env::var("JAVA_OPTIONS"))
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        let classpath_limit = match env::var("JARWRIGHT_CLASSPATH_LIMIT") {
            Ok(v) if v.eq_ignore_ascii_case("none") => None,
            Ok(v) => v.parse::<usize>().ok().or(DEFAULT_CLASSPATH_LIMIT),
            Err(_) => DEFAULT_CLASSPATH_LIMIT,
        };

        let build_user = env::var("USER").or_else(|_| env::var("USERNAME")).ok();

        let java_version = env::var("JARWRIGHT_JAVA_VERSION").ok().or_else(|| {
            java_home
                .as_deref()
                .and_then(|home| read_release_version(&home.join("release")))
        });

        let local_repository = env::var_os("JARWRIGHT_LOCAL_REPOSITORY")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".m2").join("repository")))
            .unwrap_or_else(|| PathBuf::from(".m2/repository"));

        let root_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        let log_level = env::var("JARWRIGHT_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            java_home,
            dryrun,
            trace,
            debug,
            java_opts,
            classpath_limit,
            build_user,
            java_version,
            local_repository,
            root_dir,
            log_level,
        }
    }
}

impl SessionConfig {
    pub fn with_java_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.java_home = Some(home.into());
        self
    }

    pub fn with_dryrun(mut self, dryrun: bool) -> Self {
        self.dryrun = dryrun;
        self
    }

    pub fn with_trace(mut self, category: &str) -> Self {
        self.trace.insert(category.to_lowercase());
        self
    }

    pub fn with_classpath_limit(mut self, limit: Option<usize>) -> Self {
        self.classpath_limit = limit;
        self
    }

    pub fn with_java_opts(mut self, opts: Vec<String>) -> Self {
        self.java_opts = opts;
        self
    }

    pub fn with_root_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.root_dir = dir.into();
        self
    }

    pub fn with_local_repository(mut self, dir: impl Into<PathBuf>) -> Self {
        self.local_repository = dir.into();
        self
    }

    pub fn with_build_user(mut self, user: Option<String>) -> Self {
        self.build_user = user;
        self
    }

    pub fn with_java_version(mut self, version: Option<String>) -> Self {
        self.java_version = version;
        self
    }

    /// Whether output for `category` (a tool name) is traced
    pub fn trace(&self, category: &str) -> bool {
        self.trace.contains("all") || self.trace.contains(category)
    }

    /// Absolute path of a JDK tool, e.g. `java_bin("javac")`
    pub fn java_bin(&self, name: &str) -> Result<PathBuf, ConfigError> {
        let home = self.java_home.as_ref().ok_or(ConfigError::MissingJavaHome)?;
        let bin = home.join("bin");
        if !bin.is_dir() {
            return Err(ConfigError::InvalidJavaHome(home.clone()));
        }
        Ok(bin.join(name))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(0) = self.classpath_limit {
            return Err(ConfigError::ValidationFailed(
                "Classpath limit must be greater than zero".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        if let Some(home) = &self.java_home {
            if !home.join("bin").is_dir() {
                return Err(ConfigError::InvalidJavaHome(home.clone()));
            }
        }

        Ok(())
    }
}

impl fmt::Display for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Jarwright Configuration:")?;
        match &self.java_home {
            Some(home) => writeln!(f, "  Java Home: {}", home.display())?,
            None => writeln!(f, "  Java Home: (not set)")?,
        }
        writeln!(f, "  Dry Run: {}", self.dryrun)?;
        if !self.trace.is_empty() {
            let categories: Vec<&str> = self.trace.iter().map(String::as_str).collect();
            writeln!(f, "  Trace: {}", categories.join(","))?;
        }
        match self.classpath_limit {
            Some(limit) => writeln!(f, "  Classpath Limit: {} bytes", limit)?,
            None => writeln!(f, "  Classpath Limit: none")?,
        }
        writeln!(f, "  Local Repository: {}", self.local_repository.display())?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

fn env_bool(key: &str) -> Option<bool> {
    env::var(key).ok().and_then(|v| match v.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    })
}

fn parse_trace(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .collect()
}

/// Reads `JAVA_VERSION="17.0.2"` from a JDK `release` file
fn read_release_version(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    content.lines().find_map(|line| {
        line.strip_prefix("JAVA_VERSION=")
            .map(|v| v.trim().trim_matches('"').to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    /// Helper to temporarily set environment variables for testing
    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }

        fn remove(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_configuration() {
        let _guards = vec![
            EnvGuard::remove("JARWRIGHT_DRYRUN"),
            EnvGuard::remove("JARWRIGHT_TRACE"),
            EnvGuard::remove("JARWRIGHT_DEBUG"),
            EnvGuard::remove("JARWRIGHT_CLASSPATH_LIMIT"),
            EnvGuard::set("JARWRIGHT_LOG_LEVEL", "INFO"),
        ];

        let config = SessionConfig::default();
        assert!(!config.dryrun);
        assert!(config.debug);
        assert!(config.trace.is_empty());
        assert_eq!(config.classpath_limit, DEFAULT_CLASSPATH_LIMIT);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        let _guards = vec![
            EnvGuard::set("JARWRIGHT_DRYRUN", "yes"),
            EnvGuard::set("JARWRIGHT_TRACE", "javac, TestNG"),
            EnvGuard::set("JARWRIGHT_DEBUG", "false"),
            EnvGuard::set("JARWRIGHT_CLASSPATH_LIMIT", "120"),
            EnvGuard::set("JAVA_OPTS", "-Xmx1g  -ea"),
        ];

        let config = SessionConfig::default();
        assert!(config.dryrun);
        assert!(!config.debug);
        assert!(config.trace("javac"));
        assert!(config.trace("testng"));
        assert!(!config.trace("java"));
        assert_eq!(config.classpath_limit, Some(120));
        assert_eq!(config.java_opts, vec!["-Xmx1g", "-ea"]);
    }

    #[test]
    #[serial]
    fn test_java_options_fallback() {
        let _guards = vec![
            EnvGuard::remove("JAVA_OPTS"),
            EnvGuard::set("JAVA_OPTIONS", "-Dfoo=bar"),
        ];

        let config = SessionConfig::default();
        assert_eq!(config.java_opts, vec!["-Dfoo=bar"]);
    }

    #[test]
    #[serial]
    fn test_java_version_from_release_file() {
        let home = TempDir::new().unwrap();
        fs::create_dir(home.path().join("bin")).unwrap();
        fs::write(
            home.path().join("release"),
            "IMPLEMENTOR=\"Eclipse Adoptium\"\nJAVA_VERSION=\"17.0.2\"\n",
        )
        .unwrap();
        let _guards = vec![
            EnvGuard::set("JAVA_HOME", home.path().to_str().unwrap()),
            EnvGuard::remove("JARWRIGHT_JAVA_VERSION"),
        ];

        let config = SessionConfig::default();
        assert_eq!(config.java_version.as_deref(), Some("17.0.2"));
        assert_eq!(
            config.java_bin("javac").unwrap(),
            home.path().join("bin").join("javac")
        );
    }

    #[test]
    fn test_trace_all() {
        let config = SessionConfig::default().with_trace("all");
        assert!(config.trace("java"));
        assert!(config.trace("javadoc"));
    }

    #[test]
    fn test_java_bin_requires_java_home() {
        let mut config = SessionConfig::default();
        config.java_home = None;
        assert!(matches!(
            config.java_bin("java"),
            Err(ConfigError::MissingJavaHome)
        ));
    }

    #[test]
    fn test_java_bin_rejects_home_without_bin() {
        let home = TempDir::new().unwrap();
        let config = SessionConfig::default().with_java_home(home.path());
        assert!(matches!(
            config.java_bin("java"),
            Err(ConfigError::InvalidJavaHome(_))
        ));
    }

    #[test]
    fn test_validation_zero_classpath_limit() {
        let config = SessionConfig::default().with_classpath_limit(Some(0));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_validation_log_level() {
        let mut config = SessionConfig::default();
        config.java_home = None;
        config.log_level = "verbose".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_display_configuration() {
        let config = SessionConfig::default()
            .with_dryrun(true)
            .with_classpath_limit(Some(100));
        let display = config.to_string();
        assert!(display.contains("Jarwright Configuration:"));
        assert!(display.contains("Dry Run: true"));
        assert!(display.contains("Classpath Limit: 100 bytes"));
    }
}
