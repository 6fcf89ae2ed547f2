//! Manifest model
//!
//! A [`Manifest`] is an ordered list of [`Section`]s; the first one is the main
//! section and always carries `Manifest-Version` and `Created-By`. Those standard
//! headers are added only when missing, so a manifest parsed from an existing
//! document keeps its own version.
//!
//! Projects hold a [`ManifestSource`]: the manifest itself, text or a file to parse,
//! a deferred producer evaluated at packaging time, or `Disabled`.

mod section;
mod text;

pub use section::Section;

use crate::config::ConfigError;
use crate::container::ContainerFormat;
use crate::error::{BuildError, BuildResult};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Archive entry holding the manifest
pub const MANIFEST_ENTRY: &str = "META-INF/MANIFEST.MF";

/// Headers injected into the main section when absent
pub const STANDARD_HEADERS: [(&str, &str); 2] =
    [("Manifest-Version", "1.0"), ("Created-By", "Jarwright")];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    sections: Vec<Section>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self::from_sections(Vec::new())
    }
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manifest whose main section holds `headers`
    pub fn from_headers<K, V, I>(headers: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::from_sections(vec![headers.into_iter().collect()])
    }

    /// One section per entry; the first is the main section
    pub fn from_sections(mut sections: Vec<Section>) -> Self {
        if sections.is_empty() {
            sections.push(Section::new());
        }
        for (name, value) in STANDARD_HEADERS.iter().rev() {
            sections[0].prepend_if_absent(name, value);
        }
        Self { sections }
    }

    pub fn parse(text: &str) -> Self {
        Self::from_sections(text::parse_sections(text))
    }

    pub fn main(&self) -> &Section {
        &self.sections[0]
    }

    pub fn main_mut(&mut self) -> &mut Section {
        &mut self.sections[0]
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Named section lookup (`Name: com/example/`)
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().skip(1).find(|s| s.get("Name") == Some(name))
    }

    pub fn push_section(&mut self, section: Section) {
        self.sections.push(section);
    }

    pub fn to_text(&self) -> String {
        text::serialize_sections(&self.sections)
    }

    /// Reads `META-INF/MANIFEST.MF` of an archive; a fresh manifest if there is none
    pub fn from_archive(format: &dyn ContainerFormat, archive: &Path) -> BuildResult<Self> {
        let mut reader = format.open(archive)?;
        match reader.read_entry(MANIFEST_ENTRY)? {
            Some(bytes) => Ok(Self::parse(&String::from_utf8_lossy(&bytes))),
            None => Ok(Self::new()),
        }
    }

    /// Rewrites the manifest of an existing archive after `update` changed it
    pub fn update_archive<T>(
        format: &dyn ContainerFormat,
        archive: &Path,
        update: impl FnOnce(&mut Manifest) -> T,
    ) -> BuildResult<T> {
        let mut manifest = Self::from_archive(format, archive)?;
        let result = update(&mut manifest);
        format.replace_entry(archive, MANIFEST_ENTRY, manifest.to_text().as_bytes(), 0o644)?;
        Ok(result)
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

pub type ManifestProducer = Arc<dyn Fn() -> BuildResult<Manifest> + Send + Sync>;

/// How a project or package obtains its manifest
#[derive(Clone)]
pub enum ManifestSource {
    /// No manifest is written
    Disabled,
    Manifest(Manifest),
    /// Raw `MANIFEST.MF` text
    Text(String),
    /// Existing manifest file, read at packaging time
    File(PathBuf),
    /// Evaluated when the archive is assembled
    Deferred(ManifestProducer),
}

impl Default for ManifestSource {
    fn default() -> Self {
        Self::Manifest(Manifest::new())
    }
}

impl fmt::Debug for ManifestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("Disabled"),
            Self::Manifest(m) => f.debug_tuple("Manifest").field(m).finish(),
            Self::Text(t) => f.debug_tuple("Text").field(t).finish(),
            Self::File(p) => f.debug_tuple("File").field(p).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<Manifest> for ManifestSource {
    fn from(manifest: Manifest) -> Self {
        Self::Manifest(manifest)
    }
}

impl ManifestSource {
    pub fn deferred(producer: impl Fn() -> BuildResult<Manifest> + Send + Sync + 'static) -> Self {
        Self::Deferred(Arc::new(producer))
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// The manifest to write, or `None` when disabled
    pub fn resolve(&self) -> BuildResult<Option<Manifest>> {
        match self {
            Self::Disabled => Ok(None),
            Self::Manifest(m) => Ok(Some(m.clone())),
            Self::Text(t) => Ok(Some(Manifest::parse(t))),
            Self::File(path) => {
                if !path.is_file() {
                    return Err(ConfigError::MissingFile(path.clone()).into());
                }
                let text = fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
                Ok(Some(Manifest::parse(&text)))
            }
            Self::Deferred(producer) => producer().map(Some),
        }
    }

    /// Main section for in-place edits, materializing text, file and deferred sources
    pub fn main_mut(&mut self) -> BuildResult<Option<&mut Section>> {
        if let Self::Text(_) | Self::File(_) | Self::Deferred(_) = self {
            if let Some(manifest) = self.resolve()? {
                *self = Self::Manifest(manifest);
            }
        }
        match self {
            Self::Manifest(m) => Ok(Some(m.main_mut())),
            _ => Ok(None),
        }
    }

    /// Sets a main-section header; an error when the manifest is disabled
    pub fn set_header(&mut self, name: &str, value: &str) -> BuildResult<()> {
        match self.main_mut()? {
            Some(main) => {
                main.insert(name, value);
                Ok(())
            }
            None => Err(ConfigError::invalid(
                format!("manifest header {}", name),
                "the manifest is disabled",
            )
            .into()),
        }
    }

    /// Header of the main section, when the manifest is held in memory
    pub fn header(&self, name: &str) -> Option<&str> {
        match self {
            Self::Manifest(m) => m.main().get(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ZipFormat;
    use tempfile::TempDir;

    #[test]
    fn test_default_has_standard_headers() {
        let manifest = Manifest::new();
        assert_eq!(manifest.main().get("Manifest-Version"), Some("1.0"));
        assert_eq!(manifest.main().get("Created-By"), Some("Jarwright"));
    }

    #[test]
    fn test_round_trip_of_flat_mapping() {
        let manifest = Manifest::from_headers([
            ("Main-Class", "com.example.Main"),
            ("Implementation-Title", "Example"),
            ("Class-Path", &"lib/dependency.jar ".repeat(12)[..]),
        ]);
        let parsed = Manifest::parse(&manifest.to_text());
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn test_parse_keeps_existing_version() {
        let parsed = Manifest::parse("Manifest-Version: 1.9\nFoo: bar\n");
        let versions: Vec<&str> = parsed
            .main()
            .iter()
            .filter(|(k, _)| *k == "Manifest-Version")
            .map(|(_, v)| v)
            .collect();
        assert_eq!(versions, vec!["1.9"]);
        let text = parsed.to_text();
        assert_eq!(text.matches("Manifest-Version").count(), 1);
    }

    #[test]
    fn test_text_ends_with_single_newline() {
        let text = Manifest::new().to_text();
        assert!(text.ends_with('\n'));
        assert!(!text.ends_with("\n\n"));
    }

    #[test]
    fn test_long_value_round_trips() {
        let value = "com.example.".repeat(20);
        let manifest = Manifest::from_headers([("Export-Package", value.as_str())]);
        let text = manifest.to_text();
        assert!(text.lines().all(|line| line.len() <= 71));
        assert_eq!(
            Manifest::parse(&text).main().get("Export-Package"),
            Some(value.as_str())
        );
    }

    #[test]
    fn test_named_sections() {
        let mut manifest = Manifest::new();
        manifest.push_section([("Sealed", "true"), ("Name", "com/example/")].into_iter().collect());
        let text = manifest.to_text();
        assert!(text.contains("\n\nName: com/example/\nSealed: true\n"));
        let parsed = Manifest::parse(&text);
        assert_eq!(
            parsed.section("com/example/").and_then(|s| s.get("Sealed")),
            Some("true")
        );
    }

    #[test]
    fn test_source_set_header_materializes_text() {
        let mut source = ManifestSource::Text("Foo: 1\n".to_string());
        source.set_header("bar", "Bar").unwrap();
        assert_eq!(source.header("Foo"), Some("1"));
        assert_eq!(source.header("bar"), Some("Bar"));
    }

    #[test]
    fn test_disabled_source_rejects_headers() {
        let mut source = ManifestSource::Disabled;
        assert!(source.resolve().unwrap().is_none());
        assert!(source.set_header("Foo", "1").is_err());
    }

    #[test]
    fn test_deferred_source_is_evaluated_on_resolve() {
        let source = ManifestSource::deferred(|| Ok(Manifest::from_headers([("Lazy", "yes")])));
        let manifest = source.resolve().unwrap().unwrap();
        assert_eq!(manifest.main().get("Lazy"), Some("yes"));
        assert_eq!(manifest.main().get("Manifest-Version"), Some("1.0"));
    }

    #[test]
    fn test_file_source_must_exist() {
        let dir = TempDir::new().unwrap();
        let source = ManifestSource::File(dir.path().join("MANIFEST.MF"));
        assert!(matches!(
            source.resolve(),
            Err(BuildError::Config(ConfigError::MissingFile(_)))
        ));
    }

    #[test]
    fn test_update_archive_rewrites_manifest() {
        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("app.jar");
        let format = ZipFormat;
        {
            let mut writer = format.create(&jar).unwrap();
            writer
                .add_entry(
                    MANIFEST_ENTRY,
                    crate::container::EntrySource::Bytes(b"Manifest-Version: 1.0\n"),
                    0o644,
                )
                .unwrap();
            writer
                .add_entry("Main.class", crate::container::EntrySource::Bytes(b"cafe"), 0o644)
                .unwrap();
            writer.finish().unwrap();
        }

        Manifest::update_archive(&format, &jar, |m| {
            m.main_mut().insert("Main-Class", "Main");
        })
        .unwrap();

        let manifest = Manifest::from_archive(&format, &jar).unwrap();
        assert_eq!(manifest.main().get("Main-Class"), Some("Main"));
        let mut reader = format.open(&jar).unwrap();
        assert_eq!(
            reader.list_entries().unwrap(),
            vec![MANIFEST_ENTRY.to_string(), "Main.class".to_string()]
        );
    }

    #[test]
    fn test_from_archive_without_manifest() {
        let dir = TempDir::new().unwrap();
        let zip = dir.path().join("plain.zip");
        let format = ZipFormat;
        let writer = format.create(&zip).unwrap();
        writer.finish().unwrap();
        let manifest = Manifest::from_archive(&format, &zip).unwrap();
        assert_eq!(manifest, Manifest::new());
    }
}
