//! Projects
//!
//! A [`Project`] is one node of the build tree. It carries its identity (name,
//! hierarchical id, base directory), the per-toolchain configuration areas, the
//! manifest and meta-inf defaults inherited from its parent, and the archives it
//! produces. Extensions keep their own state in a type-keyed side table
//! ([`Project::extension`]) instead of adding fields here.

mod build;
mod config;
mod layout;
mod outcome;

pub use config::{CompileConfig, DocConfig, ResourcesConfig, SetupAction, TestConfig};
pub use layout::{Layout, Usage};
pub use outcome::TestOutcome;

use crate::manifest::ManifestSource;
use crate::options::Options;
use crate::package::{package_file_name, PackageKind, PackageSpec};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Separator of hierarchical project ids (`parent:child`)
pub const ID_SEPARATOR: char = ':';

/// What a child receives from its parent when its definition starts
#[derive(Debug, Clone, Default)]
pub(crate) struct Inherited {
    pub manifest: Option<ManifestSource>,
    pub meta_inf: Option<Vec<PathBuf>>,
    pub test_framework: Option<String>,
    pub version: Option<String>,
    pub group: Option<String>,
}

/// One node of the build tree
pub struct Project {
    name: String,
    id: String,
    base_dir: PathBuf,
    children: Vec<String>,
    version: Option<String>,
    group: Option<String>,
    comment: Option<String>,
    layout: Layout,
    pub compile: CompileConfig,
    pub resources: ResourcesConfig,
    pub test: TestConfig,
    pub doc: DocConfig,
    manifest: ManifestSource,
    meta_inf: Vec<PathBuf>,
    packages: Vec<PackageSpec>,
    assets: Vec<PathBuf>,
    clean_paths: Vec<PathBuf>,
    settings: Options,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    pub(crate) inherited: Inherited,
}

impl Project {
    pub(crate) fn new(id: &str, base_dir: PathBuf, inherited: Inherited) -> Self {
        let name = id.rsplit(ID_SEPARATOR).next().unwrap_or(id).to_string();
        Self {
            name,
            id: id.to_string(),
            base_dir,
            children: Vec::new(),
            version: inherited.version.clone(),
            group: inherited.group.clone(),
            comment: None,
            layout: Layout::default(),
            compile: CompileConfig::default(),
            resources: ResourcesConfig::default(),
            test: TestConfig::default(),
            doc: DocConfig::default(),
            manifest: ManifestSource::default(),
            meta_inf: Vec::new(),
            packages: Vec::new(),
            assets: Vec::new(),
            clean_paths: Vec::new(),
            settings: Options::new(),
            extensions: HashMap::new(),
            inherited,
        }
    }

    #[cfg(test)]
    pub(crate) fn detached(name: &str) -> Self {
        Self::new(name, PathBuf::from(name), Inherited::default())
    }

    #[cfg(test)]
    pub(crate) fn detached_in(name: &str, base_dir: &Path) -> Self {
        Self::new(name, base_dir.to_path_buf(), Inherited::default())
    }

    /// Local name, the last segment of the id
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hierarchical id, e.g. `app:web`
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Id of the parent project, if any
    pub fn parent_id(&self) -> Option<&str> {
        self.id.rsplit_once(ID_SEPARATOR).map(|(parent, _)| parent)
    }

    /// Ids of every ancestor, root first
    pub fn ancestor_ids(&self) -> Vec<String> {
        let mut ancestors = Vec::new();
        let mut rest = self.id.as_str();
        while let Some((parent, _)) = rest.rsplit_once(ID_SEPARATOR) {
            ancestors.push(parent.to_string());
            rest = parent;
        }
        ancestors.reverse();
        ancestors
    }

    pub fn children(&self) -> &[String] {
        &self.children
    }

    pub(crate) fn add_child(&mut self, id: &str) {
        self.children.push(id.to_string());
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// `path` resolved against the base directory
    pub fn path_to(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn set_version(&mut self, version: impl Into<String>) -> &mut Self {
        self.version = Some(version.into());
        self
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn set_group(&mut self, group: impl Into<String>) -> &mut Self {
        self.group = Some(group.into());
        self
    }

    /// Free-form description
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) -> &mut Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut Layout {
        &mut self.layout
    }

    pub fn compile_config(&self, usage: Usage) -> &CompileConfig {
        match usage {
            Usage::Main => &self.compile,
            Usage::Test => &self.test.compile,
        }
    }

    pub fn compile_config_mut(&mut self, usage: Usage) -> &mut CompileConfig {
        match usage {
            Usage::Main => &mut self.compile,
            Usage::Test => &mut self.test.compile,
        }
    }

    pub fn manifest(&self) -> &ManifestSource {
        &self.manifest
    }

    pub fn manifest_mut(&mut self) -> &mut ManifestSource {
        &mut self.manifest
    }

    pub fn set_manifest(&mut self, manifest: impl Into<ManifestSource>) {
        self.manifest = manifest.into();
    }

    pub fn disable_manifest(&mut self) {
        self.manifest = ManifestSource::Disabled;
    }

    /// Files copied into `META-INF/` of every archive with a manifest
    pub fn meta_inf(&self) -> &[PathBuf] {
        &self.meta_inf
    }

    pub fn meta_inf_mut(&mut self) -> &mut Vec<PathBuf> {
        &mut self.meta_inf
    }

    /// Package of `kind`, created on first use as
    /// `target/<id>-<version>[-classifier].<ext>`
    pub fn package(&mut self, kind: PackageKind) -> &mut PackageSpec {
        match self.packages.iter().position(|p| p.kind() == kind) {
            Some(index) => &mut self.packages[index],
            None => {
                let file_name = package_file_name(
                    &self.id,
                    self.version.as_deref(),
                    kind.default_classifier(),
                    kind.extension(),
                );
                let file = self.path_to(&self.layout.target).join(file_name);
                self.packages.push(PackageSpec::new(kind, file));
                let last = self.packages.len() - 1;
                &mut self.packages[last]
            }
        }
    }

    pub fn packages(&self) -> &[PackageSpec] {
        &self.packages
    }

    pub fn has_package(&self, kind: PackageKind) -> bool {
        self.packages.iter().any(|p| p.kind() == kind)
    }

    /// Generated asset directories, laid out at the root of a war
    pub fn assets(&self) -> &[PathBuf] {
        &self.assets
    }

    pub fn add_asset(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if !self.assets.contains(&dir) {
            self.assets.push(dir);
        }
    }

    /// Extra paths removed by [`Project::clean`]
    pub fn clean_paths(&self) -> &[PathBuf] {
        &self.clean_paths
    }

    pub fn add_clean_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.clean_paths.contains(&path) {
            self.clean_paths.push(path);
        }
    }

    pub fn settings(&self) -> &Options {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Options {
        &mut self.settings
    }

    /// Side-table state of an extension, created with `Default` on first access
    pub fn extension<T: Any + Default + Send + Sync>(&mut self) -> &mut T {
        let slot = self
            .extensions
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()));
        match slot.downcast_mut::<T>() {
            Some(state) => state,
            None => unreachable!("extension slots are keyed by their own type"),
        }
    }

    pub fn extension_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|slot| slot.downcast_ref::<T>())
    }

    pub fn has_extension<T: Any + Send + Sync>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }

    /// What a child defined now receives from this project
    pub(crate) fn inheritance(&self) -> Inherited {
        Inherited {
            manifest: Some(self.manifest.clone()),
            meta_inf: Some(self.meta_inf.clone()),
            test_framework: self
                .test
                .requested()
                .map(str::to_string)
                .or_else(|| self.inherited.test_framework.clone()),
            version: self.version.clone(),
            group: self.group.clone(),
        }
    }
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("id", &self.id)
            .field("base_dir", &self.base_dir)
            .field("version", &self.version)
            .field("compile", &self.compile)
            .field("test", &self.test)
            .field("manifest", &self.manifest)
            .field("packages", &self.packages)
            .finish()
    }
}
