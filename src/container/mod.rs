//! Archive container I/O capability
//!
//! Packaging never touches the binary container format directly; it adds, reads and
//! lists entries through these traits. [`ZipFormat`] is the implementation used for
//! jar, war, aar and zip files.

mod zip_format;

pub use zip_format::ZipFormat;

use anyhow::Result;
use std::path::Path;

/// Default permissions of file entries
pub const FILE_MODE: u32 = 0o644;
/// Default permissions of directory entries
pub const DIR_MODE: u32 = 0o755;

/// Content of a file entry
#[derive(Debug, Clone, Copy)]
pub enum EntrySource<'a> {
    Bytes(&'a [u8]),
    File(&'a Path),
}

pub trait ContainerWriter {
    /// Adds a file entry with the given unix permissions
    fn add_entry(&mut self, name: &str, source: EntrySource<'_>, mode: u32) -> Result<()>;

    /// Adds a directory entry; `name` may omit the trailing `/`
    fn add_directory(&mut self, name: &str) -> Result<()>;

    fn finish(self: Box<Self>) -> Result<()>;
}

pub trait ContainerReader {
    /// Entry names in archive order
    fn list_entries(&mut self) -> Result<Vec<String>>;

    /// Entry content, or `None` when the archive has no such entry
    fn read_entry(&mut self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Unix permission bits of an entry, when recorded
    fn entry_mode(&mut self, name: &str) -> Result<Option<u32>>;
}

pub trait ContainerFormat: Send + Sync {
    /// Creates (or truncates) an archive at `path`
    fn create(&self, path: &Path) -> Result<Box<dyn ContainerWriter>>;

    fn open(&self, path: &Path) -> Result<Box<dyn ContainerReader>>;

    /// Replaces one entry of an existing archive, keeping every other entry as is.
    /// An entry that did not exist is written ahead of the existing ones.
    fn replace_entry(&self, path: &Path, name: &str, content: &[u8], mode: u32) -> Result<()>;
}
