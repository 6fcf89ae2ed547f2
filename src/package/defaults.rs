use crate::error::BuildResult;
use crate::lifecycle::{Extension, ExtensionRegistry};
use crate::manifest::ManifestSource;
use crate::project::Project;
use crate::session::Session;

/// Manifest and meta-inf defaults of every project
///
/// Children start from a copy of their parent's manifest and meta-inf files, unless the
/// parent disabled its manifest. Other projects get `Build-By`, `Build-Jdk`, `Implementation-Title` and, once a version is
/// set, `Implementation-Version`, plus `LICENSE` in `META-INF/` when the file exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackagingDefaults;

impl Extension for PackagingDefaults {
    fn name(&self) -> &'static str {
        "package"
    }

    fn register(&self, registry: &ExtensionRegistry) {
        registry.before_define("package", &["build"], seed_manifest);
    }
}

fn seed_manifest(project: &mut Project, session: &Session) -> BuildResult<()> {
    let inherited = project
        .inherited
        .manifest
        .clone()
        .filter(|m| !matches!(m, ManifestSource::Disabled));
    if let Some(manifest) = inherited {
        project.set_manifest(manifest);
        *project.meta_inf_mut() = project.inherited.meta_inf.clone().unwrap_or_default();
        return Ok(());
    }

    let config = session.config();
    let title = project.comment().unwrap_or(project.name()).to_string();
    let version = project.version().map(str::to_string);
    let manifest = project.manifest_mut();
    if let Some(user) = &config.build_user {
        manifest.set_header("Build-By", user)?;
    }
    if let Some(jdk) = &config.java_version {
        manifest.set_header("Build-Jdk", jdk)?;
    }
    manifest.set_header("Implementation-Title", &title)?;
    if let Some(version) = version {
        manifest.set_header("Implementation-Version", &version)?;
    }

    let license = project.path_to("LICENSE");
    if license.is_file() {
        project.meta_inf_mut().push(license);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::config::SessionConfig;
    use crate::manifest::Manifest;
    use crate::session::{DefineOptions, Session};
    use std::fs;
    use tempfile::TempDir;

    fn session(dir: &TempDir) -> Session {
        let config = SessionConfig::default()
            .with_dryrun(true)
            .with_root_dir(dir.path())
            .with_build_user(Some("alice".to_string()))
            .with_java_version(Some("17.0.2".to_string()));
        Session::new(config)
    }

    #[test]
    fn test_top_level_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("LICENSE"), "Apache").unwrap();
        let session = session(&dir);
        session
            .define_with("app", DefineOptions::default().version("1.2"), |_| Ok(()))
            .unwrap();
        session
            .with_project("app", |app, _| {
                assert_eq!(app.manifest().header("Build-By"), Some("alice"));
                assert_eq!(app.manifest().header("Build-Jdk"), Some("17.0.2"));
                assert_eq!(app.manifest().header("Implementation-Title"), Some("app"));
                assert_eq!(app.manifest().header("Implementation-Version"), Some("1.2"));
                assert_eq!(app.meta_inf(), &[dir.path().join("LICENSE")]);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_no_version_no_license() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir);
        session
            .define_with("app", DefineOptions::default().comment("The application"), |_| Ok(()))
            .unwrap();
        session
            .with_project("app", |app, _| {
                assert_eq!(app.manifest().header("Implementation-Title"), Some("The application"));
                assert_eq!(app.manifest().header("Implementation-Version"), None);
                assert!(app.meta_inf().is_empty());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_children_copy_the_parent_manifest() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir);
        session
            .define("parent", |parent| {
                parent.set_manifest(Manifest::from_headers([("Foo", "1")]));
                parent.define("child", |child| {
                    child.manifest_mut().set_header("Bar", "2")?;
                    Ok(())
                })?;
                parent.define("sibling", |_| Ok(()))
            })
            .unwrap();
        let header = |id: &str, name: &str| {
            session
                .with_project(id, |p, _| Ok(p.manifest().header(name).map(str::to_string)))
                .unwrap()
        };
        assert_eq!(header("parent:child", "Foo").as_deref(), Some("1"));
        assert_eq!(header("parent:child", "Bar").as_deref(), Some("2"));
        assert_eq!(header("parent:sibling", "Bar"), None);
        assert_eq!(header("parent", "Bar"), None);
    }

    #[test]
    fn test_child_of_disabled_manifest_gets_fresh_defaults() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir);
        session
            .define_with("parent", DefineOptions::default().version("2.0"), |parent| {
                parent.disable_manifest();
                parent.define("child", |_| Ok(()))
            })
            .unwrap();
        session
            .with_project("parent", |parent, _| {
                assert!(!parent.manifest().is_enabled());
                Ok(())
            })
            .unwrap();
        session
            .with_project("parent:child", |child, _| {
                assert!(child.manifest().is_enabled());
                assert_eq!(child.manifest().header("Build-By"), Some("alice"));
                assert_eq!(child.manifest().header("Build-Jdk"), Some("17.0.2"));
                assert_eq!(child.manifest().header("Implementation-Title"), Some("child"));
                assert_eq!(child.manifest().header("Implementation-Version"), Some("2.0"));
                Ok(())
            })
            .unwrap();
    }
}
