//! Build error taxonomy
//!
//! Configuration problems, toolchain invocation failures, test failures and report
//! parsing failures are distinct variants so callers can tell "the process could not
//! run" apart from "the process ran and tests failed".

use crate::config::ConfigError;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    /// Rejected configuration (unknown option, unknown engine, missing manifest)
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// External tool exited unsuccessfully
    #[error("Failed to {operation}, see errors above{}{}", describe_exit(.exit_code), describe_command(.command))]
    Invocation {
        operation: String,
        exit_code: Option<i32>,
        command: Option<String>,
    },

    /// The test runner completed but some tests did not pass
    #[error("Tests failed in {project}: {}", .failed.join(", "))]
    TestFailure { project: String, failed: Vec<String> },

    /// A report file exists but does not match the extraction rule of its framework
    #[error("Unable to read {framework} report {}: {reason}", .path.display())]
    ReportParse {
        framework: String,
        path: PathBuf,
        reason: String,
    },

    #[error("I/O error on {}: {error}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: io::Error,
    },

    /// Failure reported by an external collaborator (resolver, container I/O)
    #[error(transparent)]
    External(#[from] anyhow::Error),
}

impl BuildError {
    pub fn io(path: impl AsRef<Path>, error: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            error,
        }
    }

    pub fn invocation(operation: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::Invocation {
            operation: operation.into(),
            exit_code,
            command: None,
        }
    }

    /// Identifiers of failing tests, if this is a test failure
    pub fn failed_tests(&self) -> Option<&[String]> {
        match self {
            Self::TestFailure { failed, .. } => Some(failed),
            _ => None,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" (exit code {})", code),
        None => String::new(),
    }
}

fn describe_command(command: &Option<String>) -> String {
    match command {
        Some(command) => format!("\n  command: {}", command),
        None => String::new(),
    }
}
