use crate::lifecycle::{Extension, ExtensionRegistry};
use crate::project::Usage;
use std::path::{Path, PathBuf};

/// Generated source directories of a project, for IDE integration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedSources {
    main: Vec<PathBuf>,
    test: Vec<PathBuf>,
}

impl GeneratedSources {
    pub fn dirs(&self, usage: Usage) -> &[PathBuf] {
        match usage {
            Usage::Main => &self.main,
            Usage::Test => &self.test,
        }
    }

    pub fn add(&mut self, usage: Usage, dir: impl AsRef<Path>) {
        let dirs = match usage {
            Usage::Main => &mut self.main,
            Usage::Test => &mut self.test,
        };
        let dir = dir.as_ref().to_path_buf();
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
}

/// Seeds an empty [`GeneratedSources`] on every project
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneratedSourcesTracking;

impl Extension for GeneratedSourcesTracking {
    fn name(&self) -> &'static str {
        "generated-sources"
    }

    fn register(&self, registry: &ExtensionRegistry) {
        registry.before_define("generated-sources", &[], |project, _| {
            *project.extension::<GeneratedSources>() = GeneratedSources::default();
            Ok(())
        });
    }
}
