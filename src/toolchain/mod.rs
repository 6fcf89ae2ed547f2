//! Toolchain registries
//!
//! Three kinds of pluggable engines act on projects: compilers, test frameworks and
//! documentation generators. Each kind has an ordered [`EngineRegistry`]; a project
//! binds at most one engine per kind, either by explicit name or by the first
//! registration whose applicability predicate accepts it.

mod compiler;
mod doc;
mod registry;
mod report;
mod test_framework;
mod wiring;

pub use compiler::Javac;
pub use doc::Javadoc;
pub use registry::{EngineRegistry, Registration};
pub use report::{failed_tests, ReportFormat};
pub use test_framework::{derive_test_candidates, JUnit, TestNG};
pub use wiring::{JavadocDefaults, ToolchainWiring};

use crate::config::ConfigError;
use crate::error::BuildResult;
use crate::invoker::CommandInvoker;
use crate::options::Options;
use crate::package::PackageKind;
use crate::resolver::DependencySpec;
use std::path::{Path, PathBuf};

/// Declarative metadata of an engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSpec {
    pub name: &'static str,
    pub language: &'static str,
    /// Extension of the source files the engine consumes
    pub source_ext: &'static str,
    /// Default target subdirectory, e.g. `classes` for `target/classes`
    pub target: &'static str,
    /// Extension of the files it produces
    pub target_ext: &'static str,
    /// Default packaging of the project's output
    pub packaging: Option<PackageKind>,
}

pub struct CompileRequest<'a> {
    /// Project id, used in progress messages
    pub name: &'a str,
    /// Relative paths in `options` resolve against it
    pub base_dir: &'a Path,
    /// Source files and directories
    pub sources: &'a [PathBuf],
    pub target: &'a Path,
    pub dependencies: &'a [DependencySpec],
    pub options: &'a Options,
}

pub trait Compiler: Send + Sync {
    fn spec(&self) -> &EngineSpec;

    fn check_options(&self, options: &Options) -> Result<(), ConfigError>;

    /// Source files that produce output, directories expanded
    fn source_files(&self, sources: &[PathBuf]) -> Vec<PathBuf>;

    fn compile(&self, request: &CompileRequest<'_>, invoker: &CommandInvoker) -> BuildResult<()>;
}

pub struct TestRequest<'a> {
    pub project_id: &'a str,
    pub project_name: &'a str,
    /// Compiled test classes
    pub classes: &'a Path,
    /// Full runtime classpath of the tests
    pub dependencies: &'a [DependencySpec],
    pub options: &'a Options,
    pub report_to: &'a Path,
}

pub trait TestFramework: Send + Sync {
    fn spec(&self) -> &EngineSpec;

    fn check_options(&self, options: &Options) -> Result<(), ConfigError>;

    /// Libraries the framework needs on the test classpath
    fn dependencies(&self) -> Vec<DependencySpec>;

    /// Test identifiers found in the compiled test classes
    fn tests(&self, request: &TestRequest<'_>) -> BuildResult<Vec<String>>;

    /// Runs `tests` as one batch and returns the ones that passed
    fn run(
        &self,
        tests: &[String],
        request: &TestRequest<'_>,
        invoker: &CommandInvoker,
    ) -> BuildResult<Vec<String>>;
}

pub struct DocRequest<'a> {
    pub name: &'a str,
    pub sources: &'a [PathBuf],
    pub target: &'a Path,
    pub classpath: &'a [DependencySpec],
    pub sourcepath: &'a [PathBuf],
    pub options: &'a Options,
}

pub trait DocEngine: Send + Sync {
    fn spec(&self) -> &EngineSpec;

    fn check_options(&self, _options: &Options) -> Result<(), ConfigError> {
        Ok(())
    }

    fn generate(&self, request: &DocRequest<'_>, invoker: &CommandInvoker) -> BuildResult<()>;
}

/// Registries of every toolchain kind, shared by the projects of a session
#[derive(Debug)]
pub struct Toolchains {
    pub compilers: EngineRegistry<dyn Compiler>,
    pub test_frameworks: EngineRegistry<dyn TestFramework>,
    pub doc_engines: EngineRegistry<dyn DocEngine>,
}

impl Toolchains {
    pub fn new() -> Self {
        Self {
            compilers: EngineRegistry::new("compiler"),
            test_frameworks: EngineRegistry::new("test framework"),
            doc_engines: EngineRegistry::new("doc"),
        }
    }

    /// Javac; JUnit (when a JUnit library is declared) then TestNG; Javadoc
    pub fn with_defaults() -> Self {
        let toolchains = Self::new();
        Javac::register(&toolchains.compilers);
        JUnit::register(&toolchains.test_frameworks);
        TestNG::register(&toolchains.test_frameworks);
        Javadoc::register(&toolchains.doc_engines);
        toolchains
    }
}

impl Default for Toolchains {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registration_order() {
        let toolchains = Toolchains::with_defaults();
        assert_eq!(toolchains.compilers.names(), vec!["javac"]);
        assert_eq!(toolchains.test_frameworks.names(), vec!["junit", "testng"]);
        assert_eq!(toolchains.doc_engines.names(), vec!["javadoc"]);
    }

    #[test]
    fn test_javac_spec() {
        let toolchains = Toolchains::with_defaults();
        let javac = toolchains.compilers.get("javac").unwrap();
        assert_eq!(javac.spec().target, "classes");
        assert_eq!(javac.spec().packaging, Some(PackageKind::Jar));
    }
}
