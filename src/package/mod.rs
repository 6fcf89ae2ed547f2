//! Packaging
//!
//! A [`PackageSpec`] describes one archive of a project: its kind, file name, manifest
//! and meta-inf overrides, the content slots whose defaults it replaces, and free-form
//! inclusions through an [`ArchiveLayout`]. Assembly layers the per-kind defaults (see
//! `assemble`) under the explicit configuration and writes the result through the
//! session's container format.

mod assemble;
mod defaults;
mod layout;

pub use defaults::PackagingDefaults;
pub use layout::{ArchiveLayout, PathLayout};

pub(crate) use assemble::assemble;

use crate::config::ConfigError;
use crate::manifest::ManifestSource;
use crate::resolver::DependencySpec;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageKind {
    Jar,
    /// Web application
    War,
    /// Axis2 service archive
    Aar,
    Zip,
    /// Jar of the compile and resource sources, classifier `sources`
    Sources,
    /// Jar of the generated documentation, classifier `javadoc`
    Javadoc,
}

impl PackageKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Jar => "jar",
            Self::War => "war",
            Self::Aar => "aar",
            Self::Zip => "zip",
            Self::Sources => "sources",
            Self::Javadoc => "javadoc",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jar | Self::Sources | Self::Javadoc => "jar",
            Self::War => "war",
            Self::Aar => "aar",
            Self::Zip => "zip",
        }
    }

    pub fn default_classifier(&self) -> Option<&'static str> {
        match self {
            Self::Sources => Some("sources"),
            Self::Javadoc => Some("javadoc"),
            _ => None,
        }
    }

    /// Whether archives of this kind carry `META-INF/MANIFEST.MF` and meta-inf files
    pub fn has_manifest(&self) -> bool {
        matches!(self, Self::Jar | Self::War | Self::Aar)
    }
}

impl FromStr for PackageKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jar" => Ok(Self::Jar),
            "war" => Ok(Self::War),
            "aar" => Ok(Self::Aar),
            "zip" => Ok(Self::Zip),
            "sources" => Ok(Self::Sources),
            "javadoc" => Ok(Self::Javadoc),
            other => Err(ConfigError::invalid("package kind", format!("unknown kind '{}'", other))),
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `<id with ':' replaced by '-'>[-<version>][-<classifier>].<ext>`
pub fn package_file_name(id: &str, version: Option<&str>, classifier: Option<&str>, ext: &str) -> String {
    let mut name = id.replace(':', "-");
    if let Some(version) = version {
        name.push('-');
        name.push_str(version);
    }
    if let Some(classifier) = classifier {
        name.push('-');
        name.push_str(classifier);
    }
    name.push('.');
    name.push_str(ext);
    name
}

/// One archive of a project
#[derive(Debug, Clone)]
pub struct PackageSpec {
    kind: PackageKind,
    classifier: Option<String>,
    file: PathBuf,
    manifest: Option<ManifestSource>,
    meta_inf: Option<Vec<PathBuf>>,
    contents: Option<Vec<PathBuf>>,
    classes: Option<Vec<PathBuf>>,
    libs: Option<Vec<DependencySpec>>,
    layout: ArchiveLayout,
}

impl PackageSpec {
    pub fn new(kind: PackageKind, file: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            classifier: kind.default_classifier().map(str::to_string),
            file: file.into(),
            manifest: None,
            meta_inf: None,
            contents: None,
            classes: None,
            libs: None,
            layout: ArchiveLayout::new(),
        }
    }

    pub fn kind(&self) -> PackageKind {
        self.kind
    }

    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Manifest override; the project's manifest is used when unset
    pub fn manifest(&self) -> Option<&ManifestSource> {
        self.manifest.as_ref()
    }

    pub fn with_manifest(&mut self, manifest: impl Into<ManifestSource>) -> &mut Self {
        self.manifest = Some(manifest.into());
        self
    }

    pub fn meta_inf(&self) -> Option<&[PathBuf]> {
        self.meta_inf.as_deref()
    }

    pub fn with_meta_inf(&mut self, files: Vec<PathBuf>) -> &mut Self {
        self.meta_inf = Some(files);
        self
    }

    /// Replaces the default content (compiled classes and resources) of jar and aar
    /// archives; each directory's contents land at the archive root
    pub fn with_contents(&mut self, dirs: Vec<PathBuf>) -> &mut Self {
        self.contents = Some(dirs);
        self
    }

    pub fn contents(&self) -> Option<&[PathBuf]> {
        self.contents.as_deref()
    }

    /// Replaces the default `WEB-INF/classes` directories of a war
    pub fn with_classes(&mut self, dirs: Vec<PathBuf>) -> &mut Self {
        self.classes = Some(dirs);
        self
    }

    pub fn classes(&self) -> Option<&[PathBuf]> {
        self.classes.as_deref()
    }

    /// Replaces the default libraries of a war (`WEB-INF/lib`, defaulting to the compile
    /// dependencies) or an aar (`lib`, empty by default)
    pub fn with_libs(&mut self, libs: Vec<DependencySpec>) -> &mut Self {
        self.libs = Some(libs);
        self
    }

    pub fn libs(&self) -> Option<&[DependencySpec]> {
        self.libs.as_deref()
    }

    pub fn layout(&self) -> &ArchiveLayout {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut ArchiveLayout {
        &mut self.layout
    }

    /// Includes a file or directory at the archive root
    pub fn include(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.layout.include(path);
        self
    }

    pub fn include_as(&mut self, path: impl Into<PathBuf>, name: &str) -> &mut Self {
        self.layout.include_as(path, name);
        self
    }

    pub fn include_contents(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.layout.include_contents(dir);
        self
    }

    /// Excludes entries matching a glob, anywhere in the archive
    pub fn exclude(&mut self, pattern: &str) -> &mut Self {
        self.layout.exclude(pattern);
        self
    }

    /// Layout below `prefix` inside the archive
    pub fn path(&mut self, prefix: &str) -> &mut PathLayout {
        self.layout.path(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_file_name() {
        assert_eq!(package_file_name("app:web", Some("1.0"), None, "war"), "app-web-1.0.war");
        assert_eq!(
            package_file_name("app", Some("2.1"), Some("sources"), "jar"),
            "app-2.1-sources.jar"
        );
        assert_eq!(package_file_name("app", None, None, "zip"), "app.zip");
    }

    #[test]
    fn test_kind_properties() {
        assert_eq!(PackageKind::Javadoc.extension(), "jar");
        assert_eq!(PackageKind::Javadoc.default_classifier(), Some("javadoc"));
        assert!(PackageKind::War.has_manifest());
        assert!(!PackageKind::Sources.has_manifest());
        assert_eq!("WAR".parse::<PackageKind>().unwrap(), PackageKind::War);
        assert!("tar".parse::<PackageKind>().is_err());
    }

    #[test]
    fn test_sources_spec_has_classifier() {
        let spec = PackageSpec::new(PackageKind::Sources, "target/app-sources.jar");
        assert_eq!(spec.classifier(), Some("sources"));
        assert!(spec.contents().is_none());
    }
}
