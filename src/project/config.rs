//! Per-toolchain configuration of a project

use super::Project;
use crate::error::BuildResult;
use crate::options::{OptionValue, Options};
use crate::resolver::DependencySpec;
use crate::session::Session;
use crate::toolchain::{Compiler, DocEngine, TestFramework};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Action run right before tests, after compilation
pub type SetupAction = Arc<dyn Fn(&mut Project, &Session) -> BuildResult<()> + Send + Sync>;

/// Sources, target, dependencies and options of one compilation
#[derive(Default)]
pub struct CompileConfig {
    pub sources: Vec<PathBuf>,
    pub target: Option<PathBuf>,
    pub dependencies: Vec<DependencySpec>,
    pub options: Options,
    requested: Option<String>,
    engine: Option<Box<dyn Compiler>>,
}

impl CompileConfig {
    pub fn from(&mut self, source: impl Into<PathBuf>) -> &mut Self {
        let source = source.into();
        if !self.sources.contains(&source) {
            self.sources.push(source);
        }
        self
    }

    pub fn with(&mut self, dependency: impl Into<DependencySpec>) -> &mut Self {
        let dependency = dependency.into();
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
        self
    }

    pub fn set_target(&mut self, target: impl Into<PathBuf>) -> &mut Self {
        self.target = Some(target.into());
        self
    }

    pub fn option(&mut self, key: &str, value: impl Into<OptionValue>) -> &mut Self {
        self.options.set(key, value);
        self
    }

    /// Requests an engine by name; bound when the definition completes
    pub fn using(&mut self, name: &str) -> &mut Self {
        self.requested = Some(name.to_string());
        self
    }

    pub fn requested(&self) -> Option<&str> {
        self.requested.as_deref()
    }

    pub fn engine(&self) -> Option<&dyn Compiler> {
        self.engine.as_deref()
    }

    /// Language of the bound compiler
    pub fn language(&self) -> Option<&'static str> {
        self.engine.as_ref().map(|e| e.spec().language)
    }

    /// Binds `engine`, replacing any engine bound before
    pub(crate) fn bind(&mut self, engine: Box<dyn Compiler>) {
        self.engine = Some(engine);
    }
}

impl fmt::Debug for CompileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileConfig")
            .field("sources", &self.sources)
            .field("target", &self.target)
            .field("dependencies", &self.dependencies)
            .field("options", &self.options)
            .field("engine", &self.engine.as_ref().map(|e| e.spec().name))
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResourcesConfig {
    pub sources: Vec<PathBuf>,
    pub target: Option<PathBuf>,
}

impl ResourcesConfig {
    pub fn from(&mut self, source: impl Into<PathBuf>) -> &mut Self {
        let source = source.into();
        if !self.sources.contains(&source) {
            self.sources.push(source);
        }
        self
    }
}

/// Test compilation, framework binding, options and results
#[derive(Default)]
pub struct TestConfig {
    pub compile: CompileConfig,
    pub resources: ResourcesConfig,
    /// Extra runtime dependencies of the tests
    pub dependencies: Vec<DependencySpec>,
    pub options: Options,
    pub report_to: Option<PathBuf>,
    /// Glob patterns over test identifiers; empty includes everything
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    requested: Option<String>,
    engine: Option<Box<dyn TestFramework>>,
    setup: Vec<SetupAction>,
    passed: Vec<String>,
    failed: Vec<String>,
}

impl TestConfig {
    pub fn with(&mut self, dependency: impl Into<DependencySpec>) -> &mut Self {
        let dependency = dependency.into();
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
        self
    }

    pub fn option(&mut self, key: &str, value: impl Into<OptionValue>) -> &mut Self {
        self.options.set(key, value);
        self
    }

    pub fn using(&mut self, framework: &str) -> &mut Self {
        self.requested = Some(framework.to_string());
        self
    }

    pub fn requested(&self) -> Option<&str> {
        self.requested.as_deref()
    }

    pub fn framework(&self) -> Option<&dyn TestFramework> {
        self.engine.as_deref()
    }

    pub(crate) fn bind(&mut self, engine: Box<dyn TestFramework>) {
        self.engine = Some(engine);
    }

    /// Registers an action to run before the tests
    pub fn setup(&mut self, action: impl Fn(&mut Project, &Session) -> BuildResult<()> + Send + Sync + 'static) {
        self.setup.push(Arc::new(action));
    }

    pub(crate) fn setup_actions(&self) -> Vec<SetupAction> {
        self.setup.clone()
    }

    pub fn passed_tests(&self) -> &[String] {
        &self.passed
    }

    pub fn failed_tests(&self) -> &[String] {
        &self.failed
    }

    pub(crate) fn record(&mut self, passed: Vec<String>, failed: Vec<String>) {
        self.passed = passed;
        self.failed = failed;
    }
}

impl fmt::Debug for TestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestConfig")
            .field("compile", &self.compile)
            .field("resources", &self.resources)
            .field("dependencies", &self.dependencies)
            .field("options", &self.options)
            .field("framework", &self.engine.as_ref().map(|e| e.spec().name))
            .field("failed", &self.failed)
            .finish()
    }
}

#[derive(Default)]
pub struct DocConfig {
    /// Sources to document; the compile sources when empty
    pub sources: Vec<PathBuf>,
    pub sourcepath: Vec<PathBuf>,
    pub classpath: Vec<DependencySpec>,
    pub target: Option<PathBuf>,
    pub options: Options,
    requested: Option<String>,
    engine: Option<Box<dyn DocEngine>>,
}

impl DocConfig {
    pub fn option(&mut self, key: &str, value: impl Into<OptionValue>) -> &mut Self {
        self.options.set(key, value);
        self
    }

    pub fn using(&mut self, name: &str) -> &mut Self {
        self.requested = Some(name.to_string());
        self
    }

    pub fn requested(&self) -> Option<&str> {
        self.requested.as_deref()
    }

    pub fn engine(&self) -> Option<&dyn DocEngine> {
        self.engine.as_deref()
    }

    /// Name of the bound engine
    pub fn engine_name(&self) -> Option<&'static str> {
        self.engine.as_ref().map(|e| e.spec().name)
    }

    pub(crate) fn bind(&mut self, engine: Box<dyn DocEngine>) {
        self.engine = Some(engine);
    }
}

impl fmt::Debug for DocConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocConfig")
            .field("sources", &self.sources)
            .field("sourcepath", &self.sourcepath)
            .field("target", &self.target)
            .field("options", &self.options)
            .field("engine", &self.engine_name())
            .finish()
    }
}
