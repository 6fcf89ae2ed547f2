use crate::error::{BuildError, BuildResult};
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fs;
use std::path::Path;

/// Result of a test run, written next to the framework reports so that a process
/// driving the build from outside can read it back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TestOutcome {
    Completed {
        passed: Vec<String>,
        failed: Vec<String>,
    },
    /// The run itself failed; `backtrace` is the chain of error sources
    Error {
        message: String,
        backtrace: Vec<String>,
    },
}

impl TestOutcome {
    pub const FILE_NAME: &'static str = "outcome.yml";

    pub fn from_error(error: &BuildError) -> Self {
        let mut backtrace = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            backtrace.push(cause.to_string());
            source = cause.source();
        }
        Self::Error {
            message: error.to_string(),
            backtrace,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { failed, .. } if failed.is_empty())
    }

    pub fn write(&self, path: &Path) -> BuildResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        let text = serde_yaml::to_string(self).map_err(|e| BuildError::External(e.into()))?;
        fs::write(path, text).map_err(|e| BuildError::io(path, e))
    }

    pub fn read(path: &Path) -> BuildResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
        serde_yaml::from_str(&text).map_err(|e| BuildError::External(e.into()))
    }
}
