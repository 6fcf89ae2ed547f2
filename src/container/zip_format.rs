use super::{ContainerFormat, ContainerReader, ContainerWriter, EntrySource, DIR_MODE};
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Zip container (jar, war, aar and zip files)
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipFormat;

fn options(mode: u32) -> FileOptions {
    FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(mode)
}

struct ZipContainerWriter {
    path: PathBuf,
    zip: ZipWriter<File>,
}

impl ContainerWriter for ZipContainerWriter {
    fn add_entry(&mut self, name: &str, source: EntrySource<'_>, mode: u32) -> Result<()> {
        self.zip
            .start_file(name, options(mode))
            .with_context(|| format!("Failed to start entry {} in {}", name, self.path.display()))?;
        match source {
            EntrySource::Bytes(bytes) => self.zip.write_all(bytes)?,
            EntrySource::File(file) => {
                let mut input = File::open(file)
                    .with_context(|| format!("Failed to open {}", file.display()))?;
                io::copy(&mut input, &mut self.zip)?;
            }
        }
        Ok(())
    }

    fn add_directory(&mut self, name: &str) -> Result<()> {
        let name = name.trim_end_matches('/');
        self.zip
            .add_directory(format!("{}/", name), options(DIR_MODE))
            .with_context(|| format!("Failed to add directory {} to {}", name, self.path.display()))
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        self.zip
            .finish()
            .with_context(|| format!("Failed to finalize {}", self.path.display()))?;
        Ok(())
    }
}

struct ZipContainerReader {
    archive: ZipArchive<File>,
}

impl ContainerReader for ZipContainerReader {
    fn list_entries(&mut self) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(self.archive.len());
        for i in 0..self.archive.len() {
            names.push(self.archive.by_index(i)?.name().to_string());
        }
        Ok(names)
    }

    fn read_entry(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        Ok(Some(bytes))
    }

    fn entry_mode(&mut self, name: &str) -> Result<Option<u32>> {
        match self.archive.by_name(name) {
            Ok(entry) => Ok(entry.unix_mode().map(|mode| mode & 0o7777)),
            Err(ZipError::FileNotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl ContainerFormat for ZipFormat {
    fn create(&self, path: &Path) -> Result<Box<dyn ContainerWriter>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let file =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(Box::new(ZipContainerWriter {
            path: path.to_path_buf(),
            zip: ZipWriter::new(file),
        }))
    }

    fn open(&self, path: &Path) -> Result<Box<dyn ContainerReader>> {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let archive = ZipArchive::new(file)
            .with_context(|| format!("Not a valid archive: {}", path.display()))?;
        Ok(Box::new(ZipContainerReader { archive }))
    }

    fn replace_entry(&self, path: &Path, name: &str, content: &[u8], mode: u32) -> Result<()> {
        let existing =
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let mut old = ZipArchive::new(Cursor::new(existing))
            .with_context(|| format!("Not a valid archive: {}", path.display()))?;

        let file = File::create(path)
            .with_context(|| format!("Failed to open {} for writing", path.display()))?;
        let mut zip = ZipWriter::new(file);

        let present = (0..old.len()).any(|i| old.by_index_raw(i).map(|e| e.name() == name).unwrap_or(false));
        if !present {
            zip.start_file(name, options(mode))?;
            zip.write_all(content)?;
        }
        for i in 0..old.len() {
            let entry = old.by_index_raw(i)?;
            if entry.name() == name {
                drop(entry);
                zip.start_file(name, options(mode))?;
                zip.write_all(content)?;
            } else {
                zip.raw_copy_file(entry)?;
            }
        }
        zip.finish()
            .with_context(|| format!("Failed to finalize {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_sample(path: &Path) {
        let mut writer = ZipFormat.create(path).unwrap();
        writer.add_directory("META-INF").unwrap();
        writer
            .add_entry("META-INF/MANIFEST.MF", EntrySource::Bytes(b"Manifest-Version: 1.0\n"), 0o644)
            .unwrap();
        writer
            .add_entry("bin/run.sh", EntrySource::Bytes(b"#!/bin/sh\n"), 0o755)
            .unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn test_entries_keep_order_and_modes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("sample.jar");
        write_sample(&path);

        let mut reader = ZipFormat.open(&path).unwrap();
        assert_eq!(
            reader.list_entries().unwrap(),
            vec!["META-INF/", "META-INF/MANIFEST.MF", "bin/run.sh"]
        );
        assert_eq!(reader.entry_mode("META-INF/MANIFEST.MF").unwrap(), Some(0o644));
        assert_eq!(reader.entry_mode("bin/run.sh").unwrap(), Some(0o755));
        assert_eq!(reader.entry_mode("missing").unwrap(), None);
    }

    #[test]
    fn test_read_entry_from_file_source() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("data.txt");
        fs::write(&source, "hello").unwrap();
        let path = dir.path().join("data.zip");
        let mut writer = ZipFormat.create(&path).unwrap();
        writer.add_entry("data.txt", EntrySource::File(&source), 0o644).unwrap();
        writer.finish().unwrap();

        let mut reader = ZipFormat.open(&path).unwrap();
        assert_eq!(reader.read_entry("data.txt").unwrap(), Some(b"hello".to_vec()));
        assert_eq!(reader.read_entry("other.txt").unwrap(), None);
    }

    #[test]
    fn test_replace_entry_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.jar");
        write_sample(&path);

        ZipFormat
            .replace_entry(&path, "META-INF/MANIFEST.MF", b"Manifest-Version: 2.0\n", 0o644)
            .unwrap();

        let mut reader = ZipFormat.open(&path).unwrap();
        assert_eq!(
            reader.list_entries().unwrap(),
            vec!["META-INF/", "META-INF/MANIFEST.MF", "bin/run.sh"]
        );
        assert_eq!(
            reader.read_entry("META-INF/MANIFEST.MF").unwrap(),
            Some(b"Manifest-Version: 2.0\n".to_vec())
        );
        assert_eq!(reader.read_entry("bin/run.sh").unwrap(), Some(b"#!/bin/sh\n".to_vec()));
    }

    #[test]
    fn test_replace_missing_entry_goes_first() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.zip");
        let mut writer = ZipFormat.create(&path).unwrap();
        writer.add_entry("a.txt", EntrySource::Bytes(b"a"), 0o644).unwrap();
        writer.finish().unwrap();

        ZipFormat.replace_entry(&path, "first.txt", b"1", 0o644).unwrap();

        let mut reader = ZipFormat.open(&path).unwrap();
        assert_eq!(reader.list_entries().unwrap(), vec!["first.txt", "a.txt"]);
    }

    #[test]
    fn test_open_rejects_non_archive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("not.jar");
        fs::write(&path, "plain text").unwrap();
        assert!(ZipFormat.open(&path).is_err());
    }
}
