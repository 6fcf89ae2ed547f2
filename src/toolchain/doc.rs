use super::{DocEngine, DocRequest, EngineRegistry, EngineSpec};
use crate::error::BuildResult;
use crate::invoker::{CommandInvoker, JavadocOptions};
use crate::options::OptionValue;
use crate::resolver::DependencySpec;

/// Javadoc
///
/// Every doc option is passed through as a javadoc flag: `true` becomes `-key`,
/// `false` becomes `-nokey`, lists repeat the flag and maps expand to `-key k v`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Javadoc;

impl Javadoc {
    pub const SPEC: EngineSpec = EngineSpec {
        name: "javadoc",
        language: "java",
        source_ext: "java",
        target: "doc",
        target_ext: "html",
        packaging: None,
    };

    pub fn register(registry: &EngineRegistry<dyn DocEngine>) {
        registry.register(
            Self::SPEC,
            |project, _| project.compile.language() == Some("java"),
            |_| Box::new(Javadoc),
        );
    }

    pub fn options(request: &DocRequest<'_>) -> JavadocOptions {
        let mut options = JavadocOptions::from_options(request.options);
        options.output = Some(request.target.to_path_buf());
        options.name = Some(request.name.to_string());
        if options.sourcepath.is_empty() {
            options.sourcepath = request.sourcepath.to_vec();
        }
        let mut classpath: Vec<DependencySpec> = request.classpath.to_vec();
        for extra in options.classpath.drain(..) {
            if !classpath.contains(&extra) {
                classpath.push(extra);
            }
        }
        options.classpath = classpath;
        // Verbosity is decided by the javadoc trace category
        options.flags.remove("verbose");
        options.flags.remove("quiet");
        options
    }
}

impl DocEngine for Javadoc {
    fn spec(&self) -> &EngineSpec {
        &Self::SPEC
    }

    fn generate(&self, request: &DocRequest<'_>, invoker: &CommandInvoker) -> BuildResult<()> {
        let options = Self::options(request);
        invoker.javadoc(request.sources, &options)
    }
}

/// Window title default: the project comment, or its name
pub(crate) fn default_window_title(comment: Option<&str>, name: &str) -> OptionValue {
    OptionValue::from(comment.unwrap_or(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use std::path::{Path, PathBuf};

    #[test]
    fn test_request_fields_override_options() {
        let options = Options::new()
            .with("output", "elsewhere")
            .with("windowtitle", "API")
            .with("verbose", true)
            .with("classpath", vec!["lib/extra.jar"]);
        let classpath = vec![DependencySpec::path("lib/a.jar")];
        let sourcepath = vec![PathBuf::from("src/main/java")];
        let request = DocRequest {
            name: "foo",
            sources: &[],
            target: Path::new("target/doc"),
            classpath: &classpath,
            sourcepath: &sourcepath,
            options: &options,
        };
        let javadoc = Javadoc::options(&request);
        assert_eq!(javadoc.output, Some(PathBuf::from("target/doc")));
        assert_eq!(javadoc.sourcepath, sourcepath);
        assert_eq!(javadoc.classpath.len(), 2);
        assert_eq!(javadoc.flag_args(), vec!["-windowtitle", "API"]);
    }

    #[test]
    fn test_default_window_title() {
        assert_eq!(default_window_title(Some("My App"), "app").as_str(), Some("My App"));
        assert_eq!(default_window_title(None, "app").as_str(), Some("app"));
    }
}
