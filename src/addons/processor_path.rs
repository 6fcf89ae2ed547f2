use super::generated_sources::{GeneratedSources, GeneratedSourcesTracking};
use crate::error::{BuildError, BuildResult};
use crate::lifecycle::{Extension, ExtensionRegistry};
use crate::options::OptionValue;
use crate::project::{Project, Usage};
use std::fs;
use tracing::debug;

/// Annotation processor output directories
///
/// When the compile options of main or test code carry `processor` (anything but
/// `false`) or a non-empty `processor_path`, javac gets `-s <dir>` with
/// `target/generated/processors/<main|test>/java`. The directory is created,
/// registered for cleaning and recorded as generated sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessorPath;

impl Extension for ProcessorPath {
    fn name(&self) -> &'static str {
        "processor-path"
    }

    fn register(&self, registry: &ExtensionRegistry) {
        registry.install(&GeneratedSourcesTracking);
        registry.after_define("processor-path", &["compile"], |project, _| {
            add_output_dir(project, Usage::Main)?;
            add_output_dir(project, Usage::Test)
        });
    }
}

fn processing_enabled(project: &Project, usage: Usage) -> bool {
    let options = &project.compile_config(usage).options;
    match options.get("processor") {
        Some(OptionValue::Bool(enabled)) => *enabled,
        Some(_) => true,
        None => !options.get_list("processor_path").is_empty(),
    }
}

fn add_output_dir(project: &mut Project, usage: Usage) -> BuildResult<()> {
    if !processing_enabled(project, usage) {
        return Ok(());
    }
    let dir = project.path_to(project.layout().processors_dir(usage));
    debug!(project = project.id(), dir = %dir.display(), "Annotation processor output");
    project
        .compile_config_mut(usage)
        .options
        .append("other", vec!["-s".into(), dir.display().to_string().into()]);
    fs::create_dir_all(&dir).map_err(|e| BuildError::io(&dir, e))?;
    project.add_clean_path(dir.clone());
    if project.has_extension::<GeneratedSources>() {
        project.extension::<GeneratedSources>().add(usage, &dir);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::invoker::RecordingRunner;
    use crate::session::Session;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn session(root: &Path) -> Session {
        let config = SessionConfig::default().with_dryrun(true).with_root_dir(root);
        let session = Session::builder(config)
            .runner(Arc::new(RecordingRunner::new()))
            .build();
        session.install(&ProcessorPath);
        session
    }

    #[test]
    fn test_installs_generated_sources_tracking() {
        let dir = TempDir::new().unwrap();
        let session = session(dir.path());
        assert!(session.extensions().is_installed("generated-sources"));
        assert!(session.extensions().is_installed("processor-path"));
    }

    #[test]
    fn test_processor_path_adds_output_dir() {
        let dir = TempDir::new().unwrap();
        let session = session(dir.path());
        session
            .define("app", |app| {
                app.compile.option("processor_path", vec!["com.google.dagger:dagger-compiler:jar:2.40"]);
                Ok(())
            })
            .unwrap();

        let generated = dir.path().join("target/generated/processors/main/java");
        session
            .with_project("app", |app, _| {
                assert_eq!(
                    app.compile.options.get_list("other"),
                    vec!["-s".to_string(), generated.display().to_string()]
                );
                assert!(generated.is_dir());
                assert!(app.clean_paths().contains(&generated));
                let sources = app.extension_ref::<GeneratedSources>().unwrap();
                assert_eq!(sources.dirs(Usage::Main), &[generated.clone()]);
                assert!(sources.dirs(Usage::Test).is_empty());
                assert!(app.test.compile.options.get("other").is_none());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_processor_false_disables() {
        let dir = TempDir::new().unwrap();
        let session = session(dir.path());
        session
            .define("app", |app| {
                app.test.compile.option("processor", false);
                app.test.compile.option("processor_path", vec!["org.immutables:value:jar:2.8.8"]);
                Ok(())
            })
            .unwrap();
        session
            .with_project("app", |app, _| {
                assert!(app.test.compile.options.get("other").is_none());
                assert!(app.clean_paths().is_empty());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_existing_other_options_are_kept() {
        let dir = TempDir::new().unwrap();
        let session = session(dir.path());
        session
            .define("app", |app| {
                app.compile.option("processor", true);
                app.compile.option("other", vec!["-encoding", "UTF-8"]);
                Ok(())
            })
            .unwrap();
        session
            .with_project("app", |app, _| {
                let other = app.compile.options.get_list("other");
                assert_eq!(&other[..3], &["-encoding", "UTF-8", "-s"]);
                Ok(())
            })
            .unwrap();
    }
}
