//! Command invoker
//!
//! Turns logical operations (run a class, compile sources, generate docs, run an
//! arbitrary tool) into external process invocations. Classpaths are resolved through
//! the session's [`DependencyResolver`], oversized ones go through a pathing jar, and
//! every temporary file created for an invocation is removed when the invocation
//! returns, whichever way it returns.

mod args;
mod classpath;
mod mock;
mod process;
mod temp;

pub use args::{JavaOptions, JavacOptions, JavadocOptions};
pub use classpath::{class_path_header, Classpath, PATH_SEPARATOR};
pub use mock::RecordingRunner;
pub use process::{CommandLine, ProcessRunner, ProcessStatus, SystemRunner};
pub use temp::ScopedTempFile;

pub(crate) use classpath::absolute;

use crate::config::{ConfigError, SessionConfig};
use crate::container::ContainerFormat;
use crate::error::{BuildError, BuildResult};
use crate::resolver::{DependencyResolver, DependencySpec};
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Receives (success, exit code) once the process finished
pub type Completion = Box<dyn FnOnce(bool, Option<i32>) -> BuildResult<()> + Send>;

pub struct CommandInvoker {
    config: Arc<SessionConfig>,
    resolver: Arc<dyn DependencyResolver>,
    runner: Arc<dyn ProcessRunner>,
    container: Arc<dyn ContainerFormat>,
}

impl CommandInvoker {
    pub fn new(
        config: Arc<SessionConfig>,
        resolver: Arc<dyn DependencyResolver>,
        runner: Arc<dyn ProcessRunner>,
        container: Arc<dyn ContainerFormat>,
    ) -> Self {
        Self {
            config,
            resolver,
            runner,
            container,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn container(&self) -> &dyn ContainerFormat {
        self.container.as_ref()
    }

    pub fn resolve(&self, specs: &[DependencySpec]) -> BuildResult<Vec<PathBuf>> {
        self.resolver.resolve(specs).map_err(BuildError::External)
    }

    /// Resolves, deduplicates and joins a classpath, building a pathing jar when
    /// forced or when the joined form exceeds the session's length limit
    pub fn classpath(
        &self,
        specs: &[DependencySpec],
        pathing_jar: Option<bool>,
    ) -> BuildResult<Option<Classpath>> {
        if specs.is_empty() {
            return Ok(None);
        }
        let resolved = self.resolve(specs)?;
        classpath::assemble(
            resolved,
            pathing_jar,
            self.config.classpath_limit,
            self.container.as_ref(),
        )
    }

    /// Runs `java` with `args` (main class or `-jar` first)
    pub fn java(
        &self,
        args: &[String],
        options: &JavaOptions,
        completion: Option<Completion>,
    ) -> BuildResult<()> {
        let verbose = options.verbose.unwrap_or_else(|| self.config.trace("java"));
        let name = options.name.clone().unwrap_or_else(|| match args.first() {
            Some(first) => format!("java {}", first),
            None => "java".to_string(),
        });

        let mut command = CommandLine::new(self.config.java_bin("java")?);
        command.dir = options.dir.clone();

        let classpath = self.classpath(&options.classpath, options.pathing_jar)?;
        if let Some(classpath) = &classpath {
            command.args(["-classpath", classpath.value()]);
        }
        for (key, value) in &options.properties {
            command.arg(format!("-D{}={}", key, value));
        }
        match &options.java_args {
            Some(java_args) => command.args(java_args.iter().cloned()),
            None => command.args(self.config.java_opts.iter().cloned()),
        };
        command.args(args.iter().cloned());

        self.execute(&command, &name, &format!("execute {}", name), verbose, completion)
    }

    /// Compiles `files` (directories expand to the `.java` files below them)
    pub fn javac(&self, files: &[PathBuf], options: &JavacOptions) -> BuildResult<()> {
        let files = expand_sources(files);
        let name = options
            .name
            .clone()
            .unwrap_or_else(|| absolute(Path::new(".")).display().to_string());

        let mut command = CommandLine::new(self.config.java_bin("javac")?);
        let classpath = self.classpath(&options.classpath, None)?;
        if let Some(classpath) = &classpath {
            command.args(["-classpath", classpath.value()]);
        }
        if !options.sourcepath.is_empty() {
            command.args(["-sourcepath".to_string(), classpath::join_paths(&options.sourcepath)]);
        }
        let output = options.output.as_deref().map(absolute);
        if let Some(output) = &output {
            command.args(["-d".to_string(), output.to_string_lossy().into_owned()]);
        }
        command.args(options.javac_args.iter().cloned());

        let argfile = ScopedTempFile::with_contents("javac", ".args", argfile_contents(&files).as_bytes())?;
        command.arg(format!("@{}", argfile.path().display()));

        if !self.config.dryrun {
            if let Some(output) = &output {
                fs::create_dir_all(output).map_err(|e| BuildError::io(output, e))?;
            }
            info!("Compiling {} source files in {}", files.len(), name);
        }
        self.execute(&command, &name, "compile", self.config.trace("javac"), None)
    }

    /// Generates Javadoc for `files` into the configured output directory
    pub fn javadoc(&self, files: &[PathBuf], options: &JavadocOptions) -> BuildResult<()> {
        let output = options
            .output
            .as_deref()
            .map(absolute)
            .ok_or_else(|| ConfigError::ValidationFailed("No output defined for javadoc".to_string()))?;
        let name = options
            .name
            .clone()
            .unwrap_or_else(|| absolute(Path::new(".")).display().to_string());
        let verbose = self.config.trace("javadoc");

        let mut command = CommandLine::new(self.config.java_bin("javadoc")?);
        command.args(["-d".to_string(), output.to_string_lossy().into_owned()]);
        command.arg(if verbose { "-verbose" } else { "-quiet" });
        command.args(options.flag_args());
        if !options.sourcepath.is_empty() {
            command.args(["-sourcepath".to_string(), classpath::join_paths(&options.sourcepath)]);
        }
        if !options.classpath.is_empty() {
            let resolved: Vec<PathBuf> = self
                .resolve(&options.classpath)?
                .iter()
                .map(|p| absolute(p))
                .collect();
            command.args(["-classpath".to_string(), classpath::join_paths(&resolved)]);
        }
        command.args(
            expand_sources(files)
                .iter()
                .map(|f| f.to_string_lossy().into_owned()),
        );

        if !self.config.dryrun {
            info!("Generating Javadoc for {}", name);
        }
        self.execute(&command, &name, "generate Javadocs", verbose, None)
    }

    /// Runs an arbitrary command; `name` doubles as its trace category
    pub fn run(
        &self,
        command: &CommandLine,
        name: &str,
        completion: Option<Completion>,
    ) -> BuildResult<()> {
        let verbose = self.config.trace(name);
        self.execute(command, name, &format!("execute {}", name), verbose, completion)
    }

    fn execute(
        &self,
        command: &CommandLine,
        name: &str,
        operation: &str,
        verbose: bool,
        completion: Option<Completion>,
    ) -> BuildResult<()> {
        if verbose {
            info!("Running {}: {}", name, command);
        } else {
            trace!(command = %command, "Running {}", name);
        }
        // Completion callbacks only see real exits
        if self.config.dryrun {
            debug!(name, "Dry run, command not executed");
            return Ok(());
        }

        let status = self
            .runner
            .run(command)
            .map_err(|e| BuildError::io(&command.program, e))?;
        debug!(name, success = status.success, code = ?status.code, "Process finished");

        match completion {
            Some(completion) => completion(status.success, status.code),
            None if status.success => Ok(()),
            None => Err(BuildError::Invocation {
                operation: operation.to_string(),
                exit_code: status.code,
                command: verbose.then(|| command.to_string()),
            }),
        }
    }
}

/// Files as absolute paths; directories expand to their `.java` files, duplicates dropped
pub(crate) fn expand_sources(files: &[PathBuf]) -> Vec<PathBuf> {
    let mut expanded: Vec<PathBuf> = Vec::new();
    for file in files {
        let file = absolute(file);
        if file.is_dir() {
            for source in java_files(&file) {
                if !expanded.contains(&source) {
                    expanded.push(source);
                }
            }
        } else if !expanded.contains(&file) {
            expanded.push(file);
        }
    }
    expanded
}

/// Every `.java` file below `dir`, in path order
pub(crate) fn java_files(dir: &Path) -> Vec<PathBuf> {
    WalkBuilder::new(dir)
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().map(|e| e == "java").unwrap_or(false))
        .collect()
}

/// javac argument file: paths separated by spaces, quoted when they contain whitespace
fn argfile_contents(files: &[PathBuf]) -> String {
    files
        .iter()
        .map(|f| {
            let path = f.to_string_lossy();
            if path.chars().any(char::is_whitespace) {
                format!("\"{}\"", path.replace('\\', "\\\\").replace('"', "\\\""))
            } else {
                path.into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
