use crate::config::ConfigError;
use crate::container::{ContainerFormat, ContainerWriter, EntrySource, FILE_MODE};
use crate::error::{BuildError, BuildResult};
use crate::manifest::{Manifest, MANIFEST_ENTRY};
use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const META_INF: &str = "META-INF";
const SIGNATURE_EXTENSIONS: [&str; 4] = ["SF", "RSA", "DSA", "EC"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Inclusion {
    /// File or directory under its own name
    Path(PathBuf),
    /// File or directory under another name
    As(PathBuf, String),
    /// Children of a directory
    Contents(PathBuf),
}

/// Inclusions and exclusions below one prefix of an archive
#[derive(Debug, Clone, Default)]
pub struct PathLayout {
    prefix: String,
    inclusions: Vec<Inclusion>,
    excludes: Vec<String>,
}

impl PathLayout {
    fn new(prefix: &str) -> Self {
        Self {
            prefix: normalize_prefix(prefix),
            ..Default::default()
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn include(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.push(Inclusion::Path(path.into()));
        self
    }

    pub fn include_as(&mut self, path: impl Into<PathBuf>, name: &str) -> &mut Self {
        self.push(Inclusion::As(path.into(), name.trim_matches('/').to_string()));
        self
    }

    pub fn include_contents(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.push(Inclusion::Contents(dir.into()));
        self
    }

    /// Excludes entries below this prefix; the glob is matched against the path
    /// relative to the prefix and against the entry's file name
    pub fn exclude(&mut self, pattern: &str) -> &mut Self {
        self.excludes.push(pattern.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.inclusions.is_empty()
    }

    fn push(&mut self, inclusion: Inclusion) {
        if !self.inclusions.contains(&inclusion) {
            self.inclusions.push(inclusion);
        }
    }
}

/// Where every file of an archive comes from
#[derive(Debug, Clone, Default)]
pub struct ArchiveLayout {
    paths: Vec<PathLayout>,
    excludes: Vec<String>,
}

impl ArchiveLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layout below `prefix`, created on first use; `""` is the archive root
    pub fn path(&mut self, prefix: &str) -> &mut PathLayout {
        let prefix = normalize_prefix(prefix);
        match self.paths.iter().position(|p| p.prefix == prefix) {
            Some(index) => &mut self.paths[index],
            None => {
                self.paths.push(PathLayout::new(&prefix));
                let last = self.paths.len() - 1;
                &mut self.paths[last]
            }
        }
    }

    pub fn paths(&self) -> &[PathLayout] {
        &self.paths
    }

    pub fn include(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.path("").include(path);
        self
    }

    pub fn include_as(&mut self, path: impl Into<PathBuf>, name: &str) -> &mut Self {
        self.path("").include_as(path, name);
        self
    }

    pub fn include_contents(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.path("").include_contents(dir);
        self
    }

    /// Excludes entries whose archive path or file name matches the glob
    pub fn exclude(&mut self, pattern: &str) -> &mut Self {
        self.excludes.push(pattern.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.paths.iter().all(PathLayout::is_empty)
    }

    /// Writes the archive: the manifest first, then meta-inf files, then every
    /// inclusion in order. Parent directories get their own entries.
    /// Returns the number of entries written.
    pub(crate) fn write(
        &self,
        file: &Path,
        manifest: Option<&Manifest>,
        meta_inf: &[PathBuf],
        container: &dyn ContainerFormat,
    ) -> BuildResult<usize> {
        if manifest.is_none() {
            let signatures: Vec<String> = meta_inf
                .iter()
                .filter(|f| is_signature_file(f))
                .map(|f| f.display().to_string())
                .collect();
            if !signatures.is_empty() {
                return Err(ConfigError::ManifestRequired {
                    archive: file.display().to_string(),
                    files: signatures,
                }
                .into());
            }
        }

        let global = compile_globs(&self.excludes)?;
        let mut collector = Collector::default();

        let mut meta = PathLayout::new(META_INF);
        for path in meta_inf {
            meta.include(path);
        }
        collector.collect(&meta, &global, &GlobSet::empty())?;
        for layout in &self.paths {
            let local = compile_globs(&layout.excludes)?;
            collector.collect(layout, &global, &local)?;
        }

        let mut archive = ArchiveWriter {
            writer: container.create(file).map_err(BuildError::External)?,
            directories: HashSet::new(),
            count: 0,
        };

        if let Some(manifest) = manifest {
            archive.first(MANIFEST_ENTRY, manifest.to_text().as_bytes())?;
            archive.directory(&format!("{}/", META_INF))?;
        }
        for entry in &collector.entries {
            match &entry.source {
                None => archive.directory(&entry.name)?,
                Some(_) if manifest.is_some() && entry.name == MANIFEST_ENTRY => {
                    warn!(archive = %file.display(), "Ignoring included {}, the configured manifest wins", MANIFEST_ENTRY);
                }
                Some(source) => archive.file(&entry.name, EntrySource::File(source), file_mode(source))?,
            }
        }
        let count = archive.finish()?;
        debug!(archive = %file.display(), entries = count, "Wrote archive");
        Ok(count)
    }
}

struct Entry {
    name: String,
    /// `None` for directories
    source: Option<PathBuf>,
}

#[derive(Default)]
struct Collector {
    entries: Vec<Entry>,
    names: HashSet<String>,
}

impl Collector {
    fn collect(&mut self, layout: &PathLayout, global: &GlobSet, local: &GlobSet) -> BuildResult<()> {
        for inclusion in &layout.inclusions {
            let (source, base) = match inclusion {
                Inclusion::Path(path) => {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    (path, name)
                }
                Inclusion::As(path, name) => (path, name.clone()),
                Inclusion::Contents(path) => (path, String::new()),
            };
            if !source.exists() {
                return Err(ConfigError::MissingFile(source.clone()).into());
            }

            if source.is_file() {
                let relative = if base.is_empty() {
                    source
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default()
                } else {
                    base
                };
                self.add(layout, &relative, Some(source.clone()), global, local);
                continue;
            }

            if !base.is_empty() {
                self.add(layout, &format!("{}/", base), None, global, local);
            }
            for (relative, path, is_dir) in walk(source) {
                let relative = join(&base, &relative);
                if is_dir {
                    self.add(layout, &format!("{}/", relative), None, global, local);
                } else {
                    self.add(layout, &relative, Some(path), global, local);
                }
            }
        }
        Ok(())
    }

    fn add(&mut self, layout: &PathLayout, relative: &str, source: Option<PathBuf>, global: &GlobSet, local: &GlobSet) {
        let name = join(&layout.prefix, relative);
        if excluded(&name, global) || excluded(relative, local) {
            debug!(entry = %name, "Excluded from archive");
            return;
        }
        if !self.names.insert(name.clone()) {
            if source.is_some() {
                debug!(entry = %name, "Skipping duplicate archive entry");
            }
            return;
        }
        self.entries.push(Entry { name, source });
    }
}

struct ArchiveWriter {
    writer: Box<dyn ContainerWriter>,
    directories: HashSet<String>,
    count: usize,
}

impl ArchiveWriter {
    /// Writes an entry without its parent directories
    fn first(&mut self, name: &str, content: &[u8]) -> BuildResult<()> {
        self.writer
            .add_entry(name, EntrySource::Bytes(content), FILE_MODE)
            .with_context(|| format!("Failed to add {}", name))?;
        self.count += 1;
        Ok(())
    }

    fn parents(&mut self, name: &str) -> BuildResult<()> {
        let trimmed = name.trim_end_matches('/');
        let mut end = 0;
        while let Some(offset) = trimmed[end..].find('/') {
            end += offset + 1;
            let parent = trimmed[..end].to_string();
            self.add_directory(parent)?;
        }
        Ok(())
    }

    fn add_directory(&mut self, name: String) -> BuildResult<()> {
        if self.directories.contains(&name) {
            return Ok(());
        }
        self.writer
            .add_directory(&name)
            .with_context(|| format!("Failed to add directory {}", name))?;
        self.directories.insert(name);
        self.count += 1;
        Ok(())
    }

    fn directory(&mut self, name: &str) -> BuildResult<()> {
        self.parents(name)?;
        self.add_directory(name.to_string())
    }

    fn file(&mut self, name: &str, source: EntrySource<'_>, mode: u32) -> BuildResult<()> {
        self.parents(name)?;
        self.writer
            .add_entry(name, source, mode)
            .with_context(|| format!("Failed to add {}", name))?;
        self.count += 1;
        Ok(())
    }

    fn finish(self) -> BuildResult<usize> {
        self.writer.finish().map_err(BuildError::External)?;
        Ok(self.count)
    }
}

fn normalize_prefix(prefix: &str) -> String {
    prefix.replace('\\', "/").trim_matches('/').to_string()
}

fn join(prefix: &str, relative: &str) -> String {
    if prefix.is_empty() {
        relative.to_string()
    } else if relative.is_empty() {
        format!("{}/", prefix)
    } else {
        format!("{}/{}", prefix, relative)
    }
}

/// Entries below `dir` as (relative path, path, is directory), dot files included
fn walk(dir: &Path) -> Vec<(String, PathBuf, bool)> {
    WalkBuilder::new(dir)
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build()
        .filter_map(Result::ok)
        .filter(|entry| entry.depth() > 0)
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(dir).ok()?;
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            Some((relative, entry.into_path(), is_dir))
        })
        .collect()
}

fn compile_globs(patterns: &[String]) -> BuildResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| ConfigError::invalid("exclude pattern", e))?;
        builder.add(glob);
    }
    Ok(builder.build().map_err(|e| ConfigError::invalid("exclude pattern", e))?)
}

/// Matches the path, each of its ancestors and the file name
fn excluded(name: &str, globs: &GlobSet) -> bool {
    if globs.is_empty() {
        return false;
    }
    let trimmed = name.trim_end_matches('/');
    if trimmed.is_empty() {
        return false;
    }
    if globs.is_match(trimmed) {
        return true;
    }
    if let Some(file_name) = trimmed.rsplit('/').next() {
        if globs.is_match(file_name) {
            return true;
        }
    }
    trimmed
        .match_indices('/')
        .any(|(index, _)| globs.is_match(&trimmed[..index]))
}

fn is_signature_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_uppercase();
            SIGNATURE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

#[cfg(unix)]
fn file_mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o777)
        .unwrap_or(FILE_MODE)
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> u32 {
    FILE_MODE
}
