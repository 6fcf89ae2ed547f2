use super::Session;
use crate::error::{BuildError, BuildResult};
use crate::project::{Project, ID_SEPARATOR};
use rayon::prelude::*;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;

/// Settings applied to a project before its before-define phase
#[derive(Debug, Clone, Default)]
pub struct DefineOptions {
    /// Relative to the parent's base directory (the session root for top-level
    /// projects); defaults to the project name for children
    pub base_dir: Option<PathBuf>,
    pub version: Option<String>,
    pub group: Option<String>,
    pub comment: Option<String>,
}

impl DefineOptions {
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub(crate) fn apply(&self, project: &mut Project) {
        if let Some(version) = &self.version {
            project.set_version(version.clone());
        }
        if let Some(group) = &self.group {
            project.set_group(group.clone());
        }
        if let Some(comment) = &self.comment {
            project.set_comment(comment.clone());
        }
    }
}

/// A project whose definition body is running
///
/// Dereferences to the [`Project`]; child projects are defined through it so they
/// complete their whole lifecycle before this project's after-define phase.
pub struct DefineContext<'s> {
    project: Project,
    session: &'s Session,
}

impl<'s> DefineContext<'s> {
    pub(crate) fn new(project: Project, session: &'s Session) -> Self {
        Self { project, session }
    }

    pub(crate) fn into_project(self) -> Project {
        self.project
    }

    pub fn session(&self) -> &'s Session {
        self.session
    }

    pub fn define<F>(&mut self, name: &str, body: F) -> BuildResult<()>
    where
        F: FnOnce(&mut DefineContext<'_>) -> BuildResult<()>,
    {
        self.define_with(name, DefineOptions::default(), body)
    }

    pub fn define_with<F>(&mut self, name: &str, options: DefineOptions, body: F) -> BuildResult<()>
    where
        F: FnOnce(&mut DefineContext<'_>) -> BuildResult<()>,
    {
        let (id, base_dir) = self.child(name, &options);
        self.session
            .define_project(id.clone(), base_dir, self.project.inheritance(), options, body)?;
        self.project.add_child(&id);
        Ok(())
    }

    /// Defines sibling children concurrently and waits for all of them
    ///
    /// Children are recorded in the given order. When several fail, the first
    /// failure in that order is returned after every child has finished.
    pub fn define_parallel<F>(&mut self, children: Vec<(&str, F)>) -> BuildResult<()>
    where
        F: FnOnce(&mut DefineContext<'_>) -> BuildResult<()> + Send,
    {
        let session = self.session;
        let jobs: Vec<_> = children
            .into_iter()
            .map(|(name, body)| {
                let (id, base_dir) = self.child(name, &DefineOptions::default());
                (id, base_dir, self.project.inheritance(), body)
            })
            .collect();

        let results: Vec<(String, BuildResult<()>)> = jobs
            .into_par_iter()
            .map(|(id, base_dir, inherited, body)| {
                let result = session.define_project(id.clone(), base_dir, inherited, DefineOptions::default(), body);
                (id, result)
            })
            .collect();

        let mut first_error: Option<BuildError> = None;
        for (id, result) in results {
            match result {
                Ok(()) => self.project.add_child(&id),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn child(&self, name: &str, options: &DefineOptions) -> (String, PathBuf) {
        let id = format!("{}{}{}", self.project.id(), ID_SEPARATOR, name);
        let base_dir = match &options.base_dir {
            Some(dir) => self.project.path_to(dir),
            None => self.project.base_dir().join(name),
        };
        (id, base_dir)
    }

    /// Binds the compiler `name` now, for main and test code
    pub fn use_compiler(&mut self, name: &str) -> BuildResult<()> {
        let compilers = &self.session.toolchains().compilers;
        let main = compilers.create(name, &self.project)?;
        let test = compilers.create(name, &self.project)?;
        self.project.compile.using(name).bind(main);
        self.project.test.compile.using(name).bind(test);
        Ok(())
    }

    pub fn use_test_framework(&mut self, name: &str) -> BuildResult<()> {
        let framework = self.session.toolchains().test_frameworks.create(name, &self.project)?;
        self.project.test.using(name).bind(framework);
        Ok(())
    }

    pub fn use_doc_engine(&mut self, name: &str) -> BuildResult<()> {
        let engine = self.session.toolchains().doc_engines.create(name, &self.project)?;
        self.project.doc.using(name).bind(engine);
        Ok(())
    }
}

impl Deref for DefineContext<'_> {
    type Target = Project;

    fn deref(&self) -> &Project {
        &self.project
    }
}

impl DerefMut for DefineContext<'_> {
    fn deref_mut(&mut self) -> &mut Project {
        &mut self.project
    }
}
