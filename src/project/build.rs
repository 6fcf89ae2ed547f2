//! Build steps of a project
//!
//! Each step delegates to the engine bound for its toolchain kind and is a no-op
//! when that toolchain is unbound or has nothing to work on.

use super::{Project, TestOutcome, Usage};
use crate::error::{BuildError, BuildResult};
use crate::package::{self, PackageKind};
use crate::resolver::DependencySpec;
use crate::session::Session;
use crate::toolchain::{CompileRequest, DocRequest, TestFramework, TestRequest};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

impl Project {
    /// Output directory of the compiler for `usage`
    pub fn compile_target(&self, usage: Usage) -> PathBuf {
        let config = self.compile_config(usage);
        match &config.target {
            Some(target) => self.path_to(target),
            None => {
                let name = config.engine().map(|e| e.spec().target).unwrap_or("classes");
                self.path_to(self.layout().target_dir(usage, name))
            }
        }
    }

    pub fn resources_target(&self, usage: Usage) -> PathBuf {
        let configured = match usage {
            Usage::Main => &self.resources.target,
            Usage::Test => &self.test.resources.target,
        };
        match configured {
            Some(target) => self.path_to(target),
            None => self.path_to(self.layout().resources_target(usage)),
        }
    }

    /// Directory the test framework writes its reports to
    pub fn test_report_dir(&self) -> PathBuf {
        match &self.test.report_to {
            Some(dir) => self.path_to(dir),
            None => {
                let name = self.test.framework().map(|f| f.spec().name).unwrap_or("tests");
                self.path_to(self.layout().reports_dir(name))
            }
        }
    }

    pub fn doc_target(&self) -> PathBuf {
        match &self.doc.target {
            Some(target) => self.path_to(target),
            None => self.path_to(self.layout().doc_dir()),
        }
    }

    /// Compiles the main sources
    pub fn compile(&self, session: &Session) -> BuildResult<()> {
        let dependencies = self.compile.dependencies.clone();
        self.run_compiler(Usage::Main, &dependencies, session)
    }

    /// Compiles the test sources against the main output and the framework libraries
    pub fn compile_tests(&self, session: &Session) -> BuildResult<()> {
        let mut dependencies = self.test.compile.dependencies.clone();
        for spec in self.main_classpath() {
            push_unique(&mut dependencies, spec);
        }
        if let Some(framework) = self.test.framework() {
            for spec in framework.dependencies() {
                push_unique(&mut dependencies, spec);
            }
        }
        self.run_compiler(Usage::Test, &dependencies, session)
    }

    fn run_compiler(&self, usage: Usage, dependencies: &[DependencySpec], session: &Session) -> BuildResult<()> {
        let config = self.compile_config(usage);
        let Some(compiler) = config.engine() else {
            debug!(project = self.id(), usage = %usage, "No compiler bound");
            return Ok(());
        };
        let sources: Vec<PathBuf> = config
            .sources
            .iter()
            .map(|s| self.path_to(s))
            .filter(|s| s.exists())
            .collect();
        if compiler.source_files(&sources).is_empty() {
            debug!(project = self.id(), usage = %usage, "Nothing to compile");
            return Ok(());
        }
        let name = match usage {
            Usage::Main => self.id().to_string(),
            Usage::Test => format!("{}:test", self.id()),
        };
        let target = self.compile_target(usage);
        let dependencies: Vec<DependencySpec> = dependencies.iter().map(|d| self.anchored(d)).collect();
        let request = CompileRequest {
            name: &name,
            base_dir: self.base_dir(),
            sources: &sources,
            target: &target,
            dependencies: &dependencies,
            options: &config.options,
        };
        compiler.compile(&request, session.invoker())
    }

    /// Copies resource directories into the resources target; returns the number of files
    pub fn process_resources(&self, usage: Usage) -> BuildResult<usize> {
        let sources = match usage {
            Usage::Main => &self.resources.sources,
            Usage::Test => &self.test.resources.sources,
        };
        let target = self.resources_target(usage);
        let mut copied = 0;
        for source in sources.iter().map(|s| self.path_to(s)).filter(|s| s.is_dir()) {
            copied += copy_tree(&source, &target)?;
        }
        if copied > 0 {
            debug!(project = self.id(), usage = %usage, files = copied, "Copied resources");
        }
        Ok(copied)
    }

    /// Compiled main classes and resources followed by the compile dependencies
    fn main_classpath(&self) -> Vec<DependencySpec> {
        let mut classpath = vec![
            DependencySpec::path(self.compile_target(Usage::Main)),
            DependencySpec::path(self.resources_target(Usage::Main)),
        ];
        for spec in &self.compile.dependencies {
            push_unique(&mut classpath, self.anchored(spec));
        }
        classpath
    }

    /// Relative path dependencies resolved against the base directory
    pub(crate) fn anchored(&self, spec: &DependencySpec) -> DependencySpec {
        match spec {
            DependencySpec::Path(path) => DependencySpec::Path(self.path_to(path)),
            other => other.clone(),
        }
    }

    fn test_classpath(&self, framework: &dyn TestFramework) -> Vec<DependencySpec> {
        let mut classpath = vec![
            DependencySpec::path(self.compile_target(Usage::Test)),
            DependencySpec::path(self.resources_target(Usage::Test)),
        ];
        let rest = self
            .test
            .compile
            .dependencies
            .iter()
            .cloned()
            .chain(self.main_classpath())
            .chain(self.test.dependencies.iter().cloned())
            .chain(framework.dependencies());
        for spec in rest {
            push_unique(&mut classpath, self.anchored(&spec));
        }
        classpath
    }

    /// Compiles and runs the tests, then records which passed and which failed
    ///
    /// The outcome is also written as YAML to `<report dir>/outcome.yml`. Failing
    /// tests are a [`BuildError::TestFailure`].
    pub fn run_tests(&mut self, session: &Session) -> BuildResult<()> {
        if self.test.framework().is_none() {
            debug!(project = self.id(), "No test framework bound");
            return Ok(());
        }
        self.compile(session)?;
        self.process_resources(Usage::Main)?;
        self.compile_tests(session)?;
        self.process_resources(Usage::Test)?;
        for action in self.test.setup_actions() {
            action(self, session)?;
        }

        let result = self.execute_tests(session);
        let outcome = match &result {
            Ok((passed, failed)) => TestOutcome::Completed {
                passed: passed.clone(),
                failed: failed.clone(),
            },
            Err(e) => TestOutcome::from_error(e),
        };
        outcome.write(&self.test_report_dir().join(TestOutcome::FILE_NAME))?;

        let (passed, failed) = result?;
        let total = passed.len() + failed.len();
        self.test.record(passed, failed.clone());
        if !failed.is_empty() {
            error!(project = self.id(), "Tests failed: {}", failed.join(", "));
            return Err(BuildError::TestFailure {
                project: self.id().to_string(),
                failed,
            });
        }
        if total > 0 {
            info!("{} tests passed in {}", total, self.id());
        }
        Ok(())
    }

    fn execute_tests(&self, session: &Session) -> BuildResult<(Vec<String>, Vec<String>)> {
        let Some(framework) = self.test.framework() else {
            return Ok((Vec::new(), Vec::new()));
        };
        framework.check_options(&self.test.options)?;
        let report_to = self.test_report_dir();
        fs::create_dir_all(&report_to).map_err(|e| BuildError::io(&report_to, e))?;
        let classes = self.compile_target(Usage::Test);
        let dependencies = self.test_classpath(framework);
        let request = TestRequest {
            project_id: self.id(),
            project_name: self.id(),
            classes: &classes,
            dependencies: &dependencies,
            options: &self.test.options,
            report_to: &report_to,
        };

        let include = compile_globs(&self.test.include)?;
        let exclude = compile_globs(&self.test.exclude)?;
        let tests: Vec<String> = framework
            .tests(&request)?
            .into_iter()
            .filter(|t| self.test.include.is_empty() || include.is_match(t))
            .filter(|t| !exclude.is_match(t))
            .collect();
        if tests.is_empty() {
            info!("No tests found in {}", self.id());
            return Ok((Vec::new(), Vec::new()));
        }
        debug!(project = self.id(), framework = framework.spec().name, tests = tests.len(), "Running tests");

        let passed = framework.run(&tests, &request, session.invoker())?;
        let failed = tests.iter().filter(|t| !passed.contains(t)).cloned().collect();
        Ok((passed, failed))
    }

    /// Runs the bound doc engine over the doc sources (the compile sources by default)
    pub fn generate_docs(&self, session: &Session) -> BuildResult<()> {
        let Some(engine) = self.doc.engine() else {
            debug!(project = self.id(), "No doc engine bound");
            return Ok(());
        };
        engine.check_options(&self.doc.options)?;
        let configured = match self.doc.sources.is_empty() {
            true => &self.compile.sources,
            false => &self.doc.sources,
        };
        let sources: Vec<PathBuf> = configured
            .iter()
            .map(|s| self.path_to(s))
            .filter(|s| s.exists())
            .collect();
        if sources.is_empty() {
            debug!(project = self.id(), "Nothing to document");
            return Ok(());
        }
        let classpath: Vec<DependencySpec> = match self.doc.classpath.is_empty() {
            true => &self.compile.dependencies,
            false => &self.doc.classpath,
        }
        .iter()
        .map(|d| self.anchored(d))
        .collect();
        let sourcepath: Vec<PathBuf> = self.doc.sourcepath.iter().map(|s| self.path_to(s)).collect();
        let target = self.doc_target();
        let request = DocRequest {
            name: self.id(),
            sources: &sources,
            target: &target,
            classpath: &classpath,
            sourcepath: &sourcepath,
            options: &self.doc.options,
        };
        engine.generate(&request, session.invoker())
    }

    /// Builds every package of the project, compiling first; returns the archive paths
    pub fn build_packages(&self, session: &Session) -> BuildResult<Vec<PathBuf>> {
        if self.packages().is_empty() {
            return Ok(Vec::new());
        }
        self.compile(session)?;
        self.process_resources(Usage::Main)?;
        if self.has_package(PackageKind::Javadoc) {
            self.generate_docs(session)?;
        }
        self.packages()
            .iter()
            .map(|spec| package::assemble(self, spec, session.invoker()))
            .collect()
    }

    /// Tests, then packages
    pub fn build(&mut self, session: &Session) -> BuildResult<Vec<PathBuf>> {
        self.run_tests(session)?;
        self.build_packages(session)
    }

    /// Removes `target/`, `reports/` and every registered clean path
    pub fn clean(&self) -> BuildResult<()> {
        let mut paths = vec![
            self.path_to(&self.layout().target),
            self.path_to(&self.layout().reports),
        ];
        paths.extend(self.clean_paths().iter().map(|p| self.path_to(p)));
        for path in paths {
            let removed = match path.is_dir() {
                true => fs::remove_dir_all(&path),
                false => fs::remove_file(&path),
            };
            match removed {
                Ok(()) => debug!(path = %path.display(), "Removed"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(BuildError::io(&path, e)),
            }
        }
        Ok(())
    }
}

fn push_unique(list: &mut Vec<DependencySpec>, spec: DependencySpec) {
    if !list.contains(&spec) {
        list.push(spec);
    }
}

fn compile_globs(patterns: &[String]) -> BuildResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).map_err(|e| BuildError::External(e.into()))?);
    }
    builder.build().map_err(|e| BuildError::External(e.into()))
}

/// Copies every file below `source` into `target`, keeping relative paths
fn copy_tree(source: &Path, target: &Path) -> BuildResult<usize> {
    let mut copied = 0;
    for entry in WalkBuilder::new(source).standard_filters(false).build() {
        let entry = entry.map_err(|e| BuildError::External(e.into()))?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let destination = target.join(relative);
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            fs::create_dir_all(&destination).map_err(|e| BuildError::io(&destination, e))?;
        } else {
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
            }
            fs::copy(entry.path(), &destination).map_err(|e| BuildError::io(entry.path(), e))?;
            copied += 1;
        }
    }
    Ok(copied)
}
