//! Fixtures shared by the integration tests: a temporary workspace with a fake JDK
//! and a local repository, and sessions wired to a recording process runner

#![allow(dead_code)]

use jarwright::invoker::RecordingRunner;
use jarwright::{ArtifactCoordinate, LocalRepository, Session, SessionConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(dir.path().join("jdk/bin")).expect("Failed to create fake JDK");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Writes a file below the workspace, creating its parents
    pub fn write(&self, relative: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn repository(&self) -> PathBuf {
        self.path("repo")
    }

    /// Places a dummy artifact in the local repository and returns its path
    pub fn artifact(&self, spec: &str) -> PathBuf {
        let coordinate: ArtifactCoordinate = spec.parse().unwrap();
        let path = LocalRepository::new(self.repository()).locate(&coordinate);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, spec.as_bytes()).unwrap();
        path
    }

    /// Configuration independent of the environment the tests run in
    pub fn config(&self) -> SessionConfig {
        let mut config = SessionConfig::default()
            .with_root_dir(self.root())
            .with_java_home(self.path("jdk"))
            .with_local_repository(self.repository())
            .with_dryrun(false)
            .with_classpath_limit(None)
            .with_java_opts(Vec::new())
            .with_build_user(Some("builder".to_string()))
            .with_java_version(Some("17".to_string()));
        config.trace.clear();
        config
    }

    pub fn session(&self, runner: Arc<RecordingRunner>) -> Session {
        Session::builder(self.config()).runner(runner).build()
    }
}
