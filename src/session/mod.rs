//! Build session
//!
//! The [`Session`] is threaded through every definition and build step instead of
//! process-wide registries. It owns the configuration, the toolchain registries, the
//! extension registry, the command invoker and the table of defined projects.
//!
//! A project is owned by the definition that creates it until its after-define phase
//! completes; only then does it enter the table, behind its own lock, so build steps
//! on different projects can run in parallel.

mod context;

pub use context::{DefineContext, DefineOptions};

use crate::config::{ConfigError, SessionConfig};
use crate::container::{ContainerFormat, ZipFormat};
use crate::error::{BuildError, BuildResult};
use crate::invoker::{CommandInvoker, ProcessRunner, SystemRunner};
use crate::lifecycle::{Extension, ExtensionRegistry, Phase};
use crate::package::{PackageKind, PackagingDefaults};
use crate::project::{Inherited, Project, ID_SEPARATOR};
use crate::resolver::{DependencyResolver, LocalRepository};
use crate::toolchain::{JavadocDefaults, ToolchainWiring, Toolchains};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

pub struct Session {
    config: Arc<SessionConfig>,
    toolchains: Toolchains,
    extensions: ExtensionRegistry,
    invoker: CommandInvoker,
    projects: RwLock<BTreeMap<String, Arc<Mutex<Project>>>>,
    /// Ids whose definition is in progress
    reserved: Mutex<HashSet<String>>,
}

/// Collaborators of a session; anything not set uses the system default
pub struct SessionBuilder {
    config: SessionConfig,
    runner: Option<Arc<dyn ProcessRunner>>,
    resolver: Option<Arc<dyn DependencyResolver>>,
    container: Option<Arc<dyn ContainerFormat>>,
    toolchains: Option<Toolchains>,
    builtin_extensions: bool,
}

impl SessionBuilder {
    pub fn runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn DependencyResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn container(mut self, container: Arc<dyn ContainerFormat>) -> Self {
        self.container = Some(container);
        self
    }

    pub fn toolchains(mut self, toolchains: Toolchains) -> Self {
        self.toolchains = Some(toolchains);
        self
    }

    /// Whether toolchain wiring, packaging and javadoc defaults are installed (default true)
    pub fn builtin_extensions(mut self, enabled: bool) -> Self {
        self.builtin_extensions = enabled;
        self
    }

    pub fn build(self) -> Session {
        let config = Arc::new(self.config);
        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(LocalRepository::new(config.local_repository.clone())));
        let runner = self.runner.unwrap_or_else(|| Arc::new(SystemRunner));
        let container = self.container.unwrap_or_else(|| Arc::new(ZipFormat));
        let invoker = CommandInvoker::new(config.clone(), resolver, runner, container);

        let extensions = ExtensionRegistry::new();
        if self.builtin_extensions {
            extensions.install(&ToolchainWiring);
            extensions.install(&PackagingDefaults);
            extensions.install(&JavadocDefaults);
        }

        Session {
            config,
            toolchains: self.toolchains.unwrap_or_default(),
            extensions,
            invoker,
            projects: RwLock::new(BTreeMap::new()),
            reserved: Mutex::new(HashSet::new()),
        }
    }
}

impl Session {
    /// Session with the system process runner, the local repository, zip archives,
    /// the default toolchains and the built-in extensions
    pub fn new(config: SessionConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: SessionConfig) -> SessionBuilder {
        SessionBuilder {
            config,
            runner: None,
            resolver: None,
            container: None,
            toolchains: None,
            builtin_extensions: true,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn toolchains(&self) -> &Toolchains {
        &self.toolchains
    }

    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    pub fn invoker(&self) -> &CommandInvoker {
        &self.invoker
    }

    /// Installs an extension; projects defined from now on see its hooks
    pub fn install(&self, extension: &dyn Extension) -> bool {
        self.extensions.install(extension)
    }

    /// Defines a top-level project in the session root directory
    pub fn define<F>(&self, name: &str, body: F) -> BuildResult<()>
    where
        F: FnOnce(&mut DefineContext<'_>) -> BuildResult<()>,
    {
        self.define_with(name, DefineOptions::default(), body)
    }

    pub fn define_with<F>(&self, name: &str, options: DefineOptions, body: F) -> BuildResult<()>
    where
        F: FnOnce(&mut DefineContext<'_>) -> BuildResult<()>,
    {
        let base_dir = match &options.base_dir {
            Some(dir) => self.config.root_dir.join(dir),
            None => self.config.root_dir.clone(),
        };
        self.define_project(name.to_string(), base_dir, Inherited::default(), options, body)
    }

    pub(crate) fn define_project<F>(
        &self,
        id: String,
        base_dir: PathBuf,
        inherited: Inherited,
        options: DefineOptions,
        body: F,
    ) -> BuildResult<()>
    where
        F: FnOnce(&mut DefineContext<'_>) -> BuildResult<()>,
    {
        if id.is_empty() || id.split(ID_SEPARATOR).any(str::is_empty) {
            return Err(ConfigError::invalid("project name", format!("'{}' is not a valid project id", id)).into());
        }
        self.reserve(&id)?;
        let result = self.run_definition(&id, base_dir, inherited, options, body);
        let outcome = match result {
            Ok(project) => {
                self.projects
                    .write()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(id.clone(), Arc::new(Mutex::new(project)));
                info!("Defined project {}", id);
                Ok(())
            }
            Err(e) => Err(e),
        };
        self.reserved.lock().unwrap_or_else(|e| e.into_inner()).remove(&id);
        outcome
    }

    fn reserve(&self, id: &str) -> BuildResult<()> {
        let mut reserved = self.reserved.lock().unwrap_or_else(|e| e.into_inner());
        let defined = self
            .projects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(id);
        if defined || !reserved.insert(id.to_string()) {
            return Err(ConfigError::DuplicateProject(id.to_string()).into());
        }
        Ok(())
    }

    fn run_definition<F>(
        &self,
        id: &str,
        base_dir: PathBuf,
        inherited: Inherited,
        options: DefineOptions,
        body: F,
    ) -> BuildResult<Project>
    where
        F: FnOnce(&mut DefineContext<'_>) -> BuildResult<()>,
    {
        let mut project = Project::new(id, base_dir, inherited);
        options.apply(&mut project);
        debug!(project = id, base_dir = %project.base_dir().display(), "Defining project");

        self.extensions.run_phase(Phase::BeforeDefine, &mut project, self)?;
        let mut context = DefineContext::new(project, self);
        body(&mut context)?;
        let mut project = context.into_project();
        self.extensions.run_phase(Phase::AfterDefine, &mut project, self)?;
        Ok(project)
    }

    pub fn project(&self, id: &str) -> Option<Arc<Mutex<Project>>> {
        self.projects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    /// Ids of every defined project, sorted
    pub fn project_ids(&self) -> Vec<String> {
        self.projects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    /// Ids of `root` and every project below it
    pub fn descendants(&self, root: &str) -> Vec<String> {
        let prefix = format!("{}{}", root, ID_SEPARATOR);
        self.project_ids()
            .into_iter()
            .filter(|id| id == root || id.starts_with(&prefix))
            .collect()
    }

    /// Runs `f` on a defined project, holding its lock for the duration
    pub fn with_project<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Project, &Session) -> BuildResult<R>,
    ) -> BuildResult<R> {
        let project = self
            .project(id)
            .ok_or_else(|| BuildError::from(ConfigError::UnknownProject(id.to_string())))?;
        let mut guard = project.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard, self)
    }

    /// Runs one build step on several projects concurrently
    ///
    /// Every project is locked on its own; a failure is reported for its project and
    /// does not stop the others.
    pub fn run_parallel<T, F>(&self, ids: &[&str], step: F) -> Vec<(String, BuildResult<T>)>
    where
        T: Send,
        F: Fn(&mut Project, &Session) -> BuildResult<T> + Sync,
    {
        ids.par_iter()
            .map(|id| (id.to_string(), self.with_project(id, |p, s| step(p, s))))
            .collect()
    }

    /// Adds a sources package to `root` and its descendants that have sources
    ///
    /// `only` restricts the selection and `except` removes from it; both match a
    /// project's name or id. Returns the ids that received a package.
    pub fn package_with_sources(&self, root: &str, only: &[&str], except: &[&str]) -> BuildResult<Vec<String>> {
        self.package_selected(root, only, except, PackageKind::Sources, |project| {
            project
                .compile
                .sources
                .iter()
                .chain(project.resources.sources.iter())
                .any(|s| project.path_to(s).exists())
        })
    }

    /// Adds a javadoc package to `root` and its descendants that have documentable sources
    pub fn package_with_javadoc(&self, root: &str, only: &[&str], except: &[&str]) -> BuildResult<Vec<String>> {
        self.package_selected(root, only, except, PackageKind::Javadoc, |project| {
            project.doc.engine().is_some()
                && project.compile.sources.iter().any(|s| project.path_to(s).exists())
        })
    }

    fn package_selected(
        &self,
        root: &str,
        only: &[&str],
        except: &[&str],
        kind: PackageKind,
        eligible: impl Fn(&Project) -> bool,
    ) -> BuildResult<Vec<String>> {
        if self.project(root).is_none() {
            return Err(ConfigError::UnknownProject(root.to_string()).into());
        }
        let mut packaged = Vec::new();
        for id in self.descendants(root) {
            let added = self.with_project(&id, |project, _| {
                let named = |list: &[&str]| list.iter().any(|n| *n == project.name() || *n == project.id());
                let selected = (only.is_empty() || named(only)) && !named(except);
                if !selected || !eligible(project) {
                    debug!(project = %id, kind = %kind, "Not packaging");
                    return Ok(false);
                }
                project.package(kind);
                Ok(true)
            })?;
            if added {
                packaged.push(id);
            }
        }
        Ok(packaged)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("toolchains", &self.toolchains)
            .field("extensions", &self.extensions)
            .field("projects", &self.project_ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::RecordingRunner;
    use std::fs;
    use tempfile::TempDir;

    fn session(root: &std::path::Path) -> Session {
        let config = SessionConfig::default()
            .with_dryrun(true)
            .with_root_dir(root)
            .with_build_user(Some("tester".to_string()))
            .with_java_version(Some("17".to_string()));
        Session::builder(config)
            .runner(Arc::new(RecordingRunner::new()))
            .build()
    }

    #[test]
    fn test_define_registers_projects_bottom_up() {
        let dir = TempDir::new().unwrap();
        let session = session(dir.path());
        session
            .define("app", |app| {
                app.set_version("1.0");
                app.define("core", |_| Ok(()))?;
                app.define("web", |web| {
                    assert_eq!(web.version(), Some("1.0"));
                    Ok(())
                })
            })
            .unwrap();
        assert_eq!(session.project_ids(), vec!["app", "app:core", "app:web"]);
        session
            .with_project("app", |app, _| {
                assert_eq!(app.children(), &["app:core".to_string(), "app:web".to_string()]);
                Ok(())
            })
            .unwrap();
        session
            .with_project("app:web", |web, _| {
                assert_eq!(web.base_dir(), dir.path().join("web"));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_duplicate_project() {
        let dir = TempDir::new().unwrap();
        let session = session(dir.path());
        session.define("app", |_| Ok(())).unwrap();
        let err = session.define("app", |_| Ok(())).unwrap_err();
        assert!(matches!(err, BuildError::Config(ConfigError::DuplicateProject(_))));
    }

    #[test]
    fn test_failed_definition_is_not_registered() {
        let dir = TempDir::new().unwrap();
        let session = session(dir.path());
        let err = session
            .define("app", |_| Err(ConfigError::ValidationFailed("nope".to_string()).into()))
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
        assert!(session.project("app").is_none());
        session.define("app", |_| Ok(())).unwrap();
    }

    #[test]
    fn test_unknown_project() {
        let dir = TempDir::new().unwrap();
        let session = session(dir.path());
        let err = session.with_project("missing", |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, BuildError::Config(ConfigError::UnknownProject(_))));
    }

    #[test]
    fn test_run_parallel_reports_per_project() {
        let dir = TempDir::new().unwrap();
        let session = session(dir.path());
        session
            .define("app", |app| {
                app.define("good", |_| Ok(()))?;
                app.define("bad", |_| Ok(()))
            })
            .unwrap();
        let results = session.run_parallel(&["app:good", "app:bad"], |project, _| {
            match project.name() {
                "bad" => Err(ConfigError::ValidationFailed("bad".to_string()).into()),
                name => Ok(name.to_string()),
            }
        });
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].1.as_ref().unwrap(), "good");
        assert!(results[1].1.is_err());
    }

    #[test]
    fn test_package_with_sources_skips_projects_without_sources() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("lib/src/main/java")).unwrap();
        fs::write(dir.path().join("lib/src/main/java/Lib.java"), "class Lib {}").unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        let session = session(dir.path());
        session
            .define("app", |app| {
                app.set_version("2.0");
                app.define("lib", |_| Ok(()))?;
                app.define("docs", |_| Ok(()))
            })
            .unwrap();

        let packaged = session.package_with_sources("app", &[], &[]).unwrap();
        assert_eq!(packaged, vec!["app:lib"]);
        session
            .with_project("app:lib", |lib, _| {
                assert_eq!(lib.packages()[0].kind(), PackageKind::Sources);
                assert!(lib.packages()[0].file().ends_with("target/app-lib-2.0-sources.jar"));
                Ok(())
            })
            .unwrap();
        assert!(session.package_with_sources("app", &[], &["lib"]).unwrap().is_empty());
    }
}
