//! Dependency specifications and the resolver seam
//!
//! Build steps never fetch artifacts themselves. They hand a list of
//! [`DependencySpec`]s to a [`DependencyResolver`] and work with the local paths it
//! returns. [`LocalRepository`] resolves coordinates against a Maven-layout
//! repository on disk.

use crate::config::ConfigError;
use anyhow::{bail, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// `group:id:type[:classifier]:version`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactCoordinate {
    pub group: String,
    pub id: String,
    pub kind: String,
    pub classifier: Option<String>,
    pub version: String,
}

impl ArtifactCoordinate {
    /// `id-version[-classifier].type`
    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!("{}-{}-{}.{}", self.id, self.version, classifier, self.kind),
            None => format!("{}-{}.{}", self.id, self.version, self.kind),
        }
    }

    /// Location relative to a Maven-layout repository root
    pub fn repository_path(&self) -> PathBuf {
        let mut path: PathBuf = self.group.split('.').collect();
        path.push(&self.id);
        path.push(&self.version);
        path.push(self.file_name());
        path
    }
}

impl FromStr for ArtifactCoordinate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(ConfigError::invalid("artifact", format!("empty segment in {}", s)));
        }
        match parts.as_slice() {
            [group, id, kind, version] => Ok(Self {
                group: group.to_string(),
                id: id.to_string(),
                kind: kind.to_string(),
                classifier: None,
                version: version.to_string(),
            }),
            [group, id, kind, classifier, version] => Ok(Self {
                group: group.to_string(),
                id: id.to_string(),
                kind: kind.to_string(),
                classifier: Some(classifier.to_string()),
                version: version.to_string(),
            }),
            _ => Err(ConfigError::invalid(
                "artifact",
                format!("expected group:id:type[:classifier]:version, got {}", s),
            )),
        }
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.id, self.kind)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{}", classifier)?;
        }
        write!(f, ":{}", self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DependencySpec {
    /// Local file or directory, used as is
    Path(PathBuf),
    Artifact(ArtifactCoordinate),
}

impl DependencySpec {
    /// Coordinates when `spec` looks like one, a path otherwise
    pub fn parse(spec: &str) -> Self {
        if looks_like_coordinate(spec) {
            if let Ok(coordinate) = spec.parse() {
                return Self::Artifact(coordinate);
            }
        }
        Self::Path(PathBuf::from(spec))
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// File name of the resolved artifact, known without resolving
    pub fn file_name(&self) -> Option<String> {
        match self {
            Self::Path(p) => p.file_name().map(|n| n.to_string_lossy().into_owned()),
            Self::Artifact(a) => Some(a.file_name()),
        }
    }
}

/// Windows drive paths (`C:\x`, `C:/x`) and anything with separators is a path
fn looks_like_coordinate(spec: &str) -> bool {
    let segments = spec.split(':').count();
    (4..=5).contains(&segments) && !spec.contains('/') && !spec.contains('\\')
}

impl From<&str> for DependencySpec {
    fn from(spec: &str) -> Self {
        Self::parse(spec)
    }
}

impl From<String> for DependencySpec {
    fn from(spec: String) -> Self {
        Self::parse(&spec)
    }
}

impl From<PathBuf> for DependencySpec {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for DependencySpec {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<ArtifactCoordinate> for DependencySpec {
    fn from(coordinate: ArtifactCoordinate) -> Self {
        Self::Artifact(coordinate)
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::Artifact(a) => write!(f, "{}", a),
        }
    }
}

/// Turns dependency specifications into local paths
pub trait DependencyResolver: Send + Sync {
    /// One path per spec, in order
    fn resolve(&self, specs: &[DependencySpec]) -> Result<Vec<PathBuf>>;
}

/// Maven-layout repository on the local disk
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn locate(&self, coordinate: &ArtifactCoordinate) -> PathBuf {
        self.root.join(coordinate.repository_path())
    }
}

impl DependencyResolver for LocalRepository {
    fn resolve(&self, specs: &[DependencySpec]) -> Result<Vec<PathBuf>> {
        specs
            .iter()
            .map(|spec| match spec {
                DependencySpec::Path(path) => Ok(path.clone()),
                DependencySpec::Artifact(coordinate) => {
                    let path = self.locate(coordinate);
                    if !path.is_file() {
                        bail!(
                            "Artifact {} not found in local repository {} (expected {})",
                            coordinate,
                            self.root.display(),
                            path.display()
                        );
                    }
                    Ok(path)
                }
            })
            .collect()
    }
}
