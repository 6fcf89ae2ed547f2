//! Classpath assembly and pathing jars
//!
//! A pathing jar is an archive holding nothing but a manifest whose `Class-Path`
//! header lists the real entries. The JVM resolves it exactly like the long form,
//! which keeps command lines under the platform's length limit.

use super::temp::ScopedTempFile;
use crate::container::{ContainerFormat, EntrySource, FILE_MODE};
use crate::error::{BuildError, BuildResult};
use crate::manifest::{Manifest, Section, MANIFEST_ENTRY};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

#[cfg(windows)]
pub const PATH_SEPARATOR: &str = ";";
#[cfg(not(windows))]
pub const PATH_SEPARATOR: &str = ":";

/// Classpath argument of one invocation
///
/// Owns the pathing jar, if one was built; it is removed when this is dropped.
#[derive(Debug)]
pub struct Classpath {
    value: String,
    entries: Vec<PathBuf>,
    wrapper: Option<ScopedTempFile>,
}

impl Classpath {
    /// Value passed to `-classpath`
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Resolved entries, deduplicated, in order
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn wrapper(&self) -> Option<&Path> {
        self.wrapper.as_ref().map(ScopedTempFile::path)
    }
}

/// Makes `path` absolute against the current directory
pub(crate) fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

pub(crate) fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(PATH_SEPARATOR)
}

/// Deduplicates resolved entries and decides between the joined form and a pathing jar
pub(crate) fn assemble(
    resolved: Vec<PathBuf>,
    pathing_jar: Option<bool>,
    limit: Option<usize>,
    container: &dyn ContainerFormat,
) -> BuildResult<Option<Classpath>> {
    let mut entries: Vec<PathBuf> = Vec::with_capacity(resolved.len());
    for path in resolved.iter().map(|p| absolute(p)) {
        if !entries.contains(&path) {
            entries.push(path);
        }
    }
    if entries.is_empty() {
        return Ok(None);
    }

    let joined = join_paths(&entries);
    let use_wrapper = match pathing_jar {
        Some(forced) => forced,
        None => limit.map(|limit| joined.len() > limit).unwrap_or(false),
    };
    if !use_wrapper {
        return Ok(Some(Classpath {
            value: joined,
            entries,
            wrapper: None,
        }));
    }

    let wrapper = write_pathing_jar(&entries, container)?;
    debug!(
        entries = entries.len(),
        length = joined.len(),
        jar = %wrapper.path().display(),
        "Using pathing jar for classpath"
    );
    Ok(Some(Classpath {
        value: wrapper.path().to_string_lossy().into_owned(),
        entries,
        wrapper: Some(wrapper),
    }))
}

/// `Class-Path` value: URL-encoded entries separated by spaces, directories end in `/`
pub fn class_path_header(entries: &[PathBuf]) -> String {
    entries
        .iter()
        .map(|entry| class_path_url(entry, entry.is_dir()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn class_path_url(path: &Path, is_dir: bool) -> String {
    let mut raw = path.to_string_lossy().replace('\\', "/");
    if is_dir && !raw.ends_with('/') {
        raw.push('/');
    }
    let encoded = raw
        .split('/')
        .map(|segment| {
            if is_drive(segment) {
                segment.to_string()
            } else {
                urlencoding::encode(segment).into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("/");
    // Drive-letter paths need a leading slash to stay absolute as URLs
    if raw.starts_with('/') {
        encoded
    } else {
        format!("/{}", encoded)
    }
}

fn is_drive(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn write_pathing_jar(
    entries: &[PathBuf],
    container: &dyn ContainerFormat,
) -> BuildResult<ScopedTempFile> {
    let mut main = Section::new();
    main.insert("Class-Path", class_path_header(entries));
    let manifest = Manifest::from_sections(vec![main]);

    let jar = ScopedTempFile::create("javacmd", ".jar")?;
    let mut writer = container.create(jar.path()).map_err(BuildError::External)?;
    writer
        .add_entry(
            MANIFEST_ENTRY,
            EntrySource::Bytes(manifest.to_text().as_bytes()),
            FILE_MODE,
        )
        .map_err(BuildError::External)?;
    writer.finish().map_err(BuildError::External)?;
    Ok(jar)
}
