use super::{CompileRequest, Compiler, EngineRegistry, EngineSpec};
use crate::config::{ConfigError, SessionConfig};
use crate::error::BuildResult;
use crate::invoker::{expand_sources, java_files, CommandInvoker, JavacOptions, PATH_SEPARATOR};
use crate::options::{OptionValue, Options};
use crate::package::PackageKind;
use crate::project::{Project, Usage};
use crate::resolver::DependencySpec;
use std::path::PathBuf;

/// The `javac` compiler
///
/// Used when `.java` files exist in the configured sources or in `src/main/java`
/// (`src/test/java` for tests). Options:
/// - `warnings`: issue warnings (default false)
/// - `debug`: generate debugging information (default from the session)
/// - `deprecation`: show deprecation messages (default false)
/// - `source`, `target`: source and bytecode compatibility
/// - `lint`: `true`, a category name or a list of categories
/// - `other`: extra compiler arguments
/// - `processor`, `processor_path`: annotation processing (see the processor-path add-on)
#[derive(Debug, Clone, Copy, Default)]
pub struct Javac;

impl Javac {
    pub const SPEC: EngineSpec = EngineSpec {
        name: "javac",
        language: "java",
        source_ext: "java",
        target: "classes",
        target_ext: "class",
        packaging: Some(PackageKind::Jar),
    };

    pub const OPTIONS: [&'static str; 9] = [
        "warnings",
        "debug",
        "deprecation",
        "source",
        "target",
        "lint",
        "other",
        "processor",
        "processor_path",
    ];

    pub fn register(registry: &EngineRegistry<dyn Compiler>) {
        registry.register(Self::SPEC, Self::applies_to, |_| Box::new(Javac));
    }

    pub fn applies_to(project: &Project, usage: Usage) -> bool {
        let config = project.compile_config(usage);
        let configured = config
            .sources
            .iter()
            .map(|source| project.path_to(source))
            .any(|source| match source.is_dir() {
                true => !java_files(&source).is_empty(),
                false => source.extension().map(|e| e == "java").unwrap_or(false),
            });
        configured || !java_files(&project.path_to(project.layout().source_dir(usage, "java"))).is_empty()
    }

    pub fn javac_args(options: &Options, config: &SessionConfig) -> Vec<String> {
        let mut args = Vec::new();
        if !options.get_bool("warnings").unwrap_or(false) {
            args.push("-nowarn".to_string());
        }
        if config.trace("javac") {
            args.push("-verbose".to_string());
        }
        if options.get_bool("debug").unwrap_or(config.debug) {
            args.push("-g".to_string());
        }
        if options.get_bool("deprecation").unwrap_or(false) {
            args.push("-deprecation".to_string());
        }
        for flag in ["source", "target"] {
            if let Some(value) = options.get(flag) {
                args.push(format!("-{}", flag));
                args.push(value.render());
            }
        }
        match options.get("lint") {
            Some(OptionValue::Bool(true)) => args.push("-Xlint".to_string()),
            Some(OptionValue::List(categories)) => args.push(format!(
                "-Xlint:{}",
                categories.iter().map(OptionValue::render).collect::<Vec<_>>().join(",")
            )),
            Some(OptionValue::Str(category)) => args.push(format!("-Xlint:{}", category)),
            _ => {}
        }
        if options.get_bool("processor") == Some(false) {
            args.push("-proc:none".to_string());
        }
        if let Some(other) = options.get("other") {
            args.extend(other.to_strings());
        }
        args
    }
}

impl Compiler for Javac {
    fn spec(&self) -> &EngineSpec {
        &Self::SPEC
    }

    fn check_options(&self, options: &Options) -> Result<(), ConfigError> {
        options.check("javac", &Self::OPTIONS)
    }

    /// `package-info.java` produces no class file and is left out
    fn source_files(&self, sources: &[PathBuf]) -> Vec<PathBuf> {
        expand_sources(sources)
            .into_iter()
            .filter(|f| f.file_name().map(|n| n != "package-info.java").unwrap_or(true))
            .collect()
    }

    fn compile(&self, request: &CompileRequest<'_>, invoker: &CommandInvoker) -> BuildResult<()> {
        self.check_options(request.options)?;
        let files = self.source_files(request.sources);
        let mut javac_args = Self::javac_args(request.options, invoker.config());
        let processor_path: Vec<DependencySpec> = request
            .options
            .get_list("processor_path")
            .into_iter()
            .map(DependencySpec::from)
            .map(|spec| match spec {
                DependencySpec::Path(path) if path.is_relative() => {
                    DependencySpec::Path(request.base_dir.join(path))
                }
                other => other,
            })
            .collect();
        if !processor_path.is_empty() {
            let resolved = invoker.resolve(&processor_path)?;
            let joined: Vec<String> = resolved.iter().map(|p| p.display().to_string()).collect();
            javac_args.push("-processorpath".to_string());
            javac_args.push(joined.join(PATH_SEPARATOR));
        }
        let options = JavacOptions {
            classpath: request.dependencies.to_vec(),
            sourcepath: request.sources.iter().filter(|s| s.is_dir()).cloned().collect(),
            output: Some(request.target.to_path_buf()),
            javac_args,
            name: Some(request.name.to_string()),
        };
        invoker.javac(&files, &options)
    }
}
