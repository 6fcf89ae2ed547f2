//! JaCoCo code coverage
//!
//! With [`Coverage`] installed, the tests of every project with compiled test
//! classes run with the JaCoCo agent. [`CoverageConfig`] is the per-project side
//! table; [`coverage_report`] merges the execution data of a project tree into
//! xml, csv and html reports.

use crate::error::{BuildError, BuildResult};
use crate::invoker::JavaOptions;
use crate::lifecycle::{Extension, ExtensionRegistry};
use crate::options::OptionValue;
use crate::project::{Project, Usage};
use crate::resolver::DependencySpec;
use crate::session::Session;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const AGENT: &str = "org.jacoco:org.jacoco.agent:jar:runtime:0.8.6";

pub const DEPENDENCIES: [&str; 9] = [
    "args4j:args4j:jar:2.0.28",
    "org.jacoco:org.jacoco.report:jar:0.8.6",
    "org.jacoco:org.jacoco.core:jar:0.8.6",
    "org.jacoco:org.jacoco.cli:jar:0.8.6",
    "org.ow2.asm:asm:jar:8.0.1",
    "org.ow2.asm:asm-commons:jar:8.0.1",
    "org.ow2.asm:asm-tree:jar:8.0.1",
    "org.ow2.asm:asm-analysis:jar:8.0.1",
    "org.ow2.asm:asm-util:jar:8.0.1",
];

const REPORT_MAIN: &str = "org.jacoco.cli.internal.Main";

/// Agent settings of one project; unset fields use the agent's defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageConfig {
    /// Defaults to true
    pub enabled: Option<bool>,
    /// Defaults to `reports/jacoco/jacoco.cov`
    pub destfile: Option<PathBuf>,
    /// Defaults to `file`
    pub output: Option<String>,
    pub session_id: Option<String>,
    pub address: Option<String>,
    pub port: Option<u16>,
    pub class_dump_dir: Option<PathBuf>,
    pub dump_on_exit: Option<bool>,
    pub append: Option<bool>,
    pub exclude_classloader: Option<String>,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
}

impl CoverageConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn output(&self) -> &str {
        self.output.as_deref().unwrap_or("file")
    }

    /// Execution data file of `project`
    pub fn destfile(&self, project: &Project) -> PathBuf {
        match &self.destfile {
            Some(file) => project.path_to(file),
            None => project.path_to(project.layout().reports_dir("jacoco").join("jacoco.cov")),
        }
    }

    /// `key=value` pairs of the `-javaagent` argument, in the agent's documented order
    pub fn agent_options(&self, destfile: &Path) -> Vec<String> {
        let mut options = vec![format!("destfile={}", destfile.display())];
        let optional = [
            ("append", self.append.map(|v| v.to_string())),
            ("exclclassloader", self.exclude_classloader.clone()),
            ("sessionid", self.session_id.clone()),
            ("dumponexit", self.dump_on_exit.map(|v| v.to_string())),
            ("output", Some(self.output().to_string())),
            ("address", self.address.clone()),
            ("port", self.port.map(|p| p.to_string())),
            ("classdumpdir", self.class_dump_dir.as_ref().map(|d| d.display().to_string())),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                options.push(format!("{}={}", key, value));
            }
        }
        if !self.includes.is_empty() {
            options.push(format!("includes={}", self.includes.join(":")));
        }
        if !self.excludes.is_empty() {
            options.push(format!("excludes={}", self.excludes.join(":")));
        }
        options
    }
}

/// Runs tests with the JaCoCo agent
#[derive(Debug, Clone, Copy, Default)]
pub struct Coverage;

impl Extension for Coverage {
    fn name(&self) -> &'static str {
        "coverage"
    }

    fn register(&self, registry: &ExtensionRegistry) {
        registry.after_define("coverage", &["test"], |project, _| {
            let enabled = project.extension::<CoverageConfig>().is_enabled();
            if enabled && project.test.compile.target.is_some() {
                project.test.setup(attach_agent);
            }
            Ok(())
        });
    }
}

fn attach_agent(project: &mut Project, session: &Session) -> BuildResult<()> {
    let config = project.extension_ref::<CoverageConfig>().cloned().unwrap_or_default();
    if !config.is_enabled() {
        return Ok(());
    }
    let agent_jar: String = session
        .invoker()
        .resolve(&[DependencySpec::from(AGENT)])?
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    let destfile = config.destfile(project);
    let argument = format!("-javaagent:{}={}", agent_jar, config.agent_options(&destfile).join(","));

    let java_args = project.test.options.get_list("java_args");
    if !java_args.contains(&argument) {
        debug!(project = project.id(), "Attaching coverage agent");
        project.test.options.append("java_args", vec![OptionValue::from(argument)]);
    }
    Ok(())
}

/// Builds the JaCoCo report of `root` and its descendants
///
/// Reports go to `reports/jacoco/` of `root`. Returns false, without running
/// anything, when no project produced execution data.
pub fn coverage_report(session: &Session, root: &str) -> BuildResult<bool> {
    let mut execution_files = Vec::new();
    let mut class_paths = Vec::new();
    let mut source_paths = Vec::new();
    for id in session.descendants(root) {
        session.with_project(&id, |project, _| {
            let config = project.extension_ref::<CoverageConfig>().cloned().unwrap_or_default();
            if !config.is_enabled() {
                return Ok(());
            }
            let destfile = config.destfile(project);
            if destfile.is_file() {
                execution_files.push(destfile);
            }
            let classes = project.compile_target(Usage::Main);
            if classes.exists() {
                class_paths.push(classes);
            }
            for source in &project.compile.sources {
                let source = project.path_to(source);
                if source.exists() {
                    source_paths.push(source);
                }
            }
            Ok(())
        })?;
    }
    if execution_files.is_empty() {
        debug!(root, "No coverage data");
        return Ok(false);
    }

    let reports = session.with_project(root, |project, _| {
        Ok(project.path_to(project.layout().reports_dir("jacoco")))
    })?;
    let html = reports.join("docs");
    fs::create_dir_all(&html).map_err(|e| BuildError::io(&html, e))?;

    let mut args = vec![REPORT_MAIN.to_string(), "report".to_string()];
    args.extend(execution_files.iter().map(|f| f.display().to_string()));
    for classes in &class_paths {
        args.push("--classfiles".to_string());
        args.push(classes.display().to_string());
    }
    args.push("--csv".to_string());
    args.push(reports.join("jacoco.csv").display().to_string());
    args.push("--encoding".to_string());
    args.push("UTF-8".to_string());
    args.push("--html".to_string());
    args.push(html.display().to_string());
    for source in &source_paths {
        args.push("--sourcefiles".to_string());
        args.push(source.display().to_string());
    }
    args.push("--xml".to_string());
    args.push(reports.join("jacoco.xml").display().to_string());

    info!("Generating coverage report for {}", root);
    let classpath = DEPENDENCIES.iter().map(|d| DependencySpec::from(*d)).collect();
    let options = JavaOptions::named("jacoco report").with_classpath(classpath);
    session.invoker().java(&args, &options, None)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::invoker::RecordingRunner;
    use crate::resolver::{ArtifactCoordinate, LocalRepository};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn place_artifact(repo: &Path, spec: &str) -> PathBuf {
        let coordinate: ArtifactCoordinate = spec.parse().unwrap();
        let path = LocalRepository::new(repo).locate(&coordinate);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"jar").unwrap();
        path
    }

    fn session(dir: &Path, runner: Arc<RecordingRunner>) -> Session {
        fs::create_dir_all(dir.join("jdk/bin")).unwrap();
        let config = SessionConfig::default()
            .with_root_dir(dir)
            .with_java_home(dir.join("jdk"))
            .with_local_repository(dir.join("repo"));
        let session = Session::builder(config).runner(runner).build();
        session.install(&Coverage);
        session
    }

    #[test]
    fn test_agent_options() {
        let config = CoverageConfig {
            append: Some(true),
            port: Some(6300),
            includes: vec!["com.example.*".to_string(), "org.example.*".to_string()],
            ..Default::default()
        };
        assert_eq!(
            config.agent_options(Path::new("/r/jacoco.cov")),
            vec![
                "destfile=/r/jacoco.cov",
                "append=true",
                "output=file",
                "port=6300",
                "includes=com.example.*:org.example.*",
            ]
        );
    }

    #[test]
    fn test_agent_attached_when_tests_exist() {
        let dir = TempDir::new().unwrap();
        let agent = place_artifact(&dir.path().join("repo"), AGENT);
        fs::create_dir_all(dir.path().join("src/test/java")).unwrap();
        fs::write(dir.path().join("src/test/java/FooTest.java"), "class FooTest {}").unwrap();
        let session = session(dir.path(), Arc::new(RecordingRunner::new()));
        session
            .define("app", |app| {
                app.extension::<CoverageConfig>().session_id = Some("ci".to_string());
                Ok(())
            })
            .unwrap();

        session
            .with_project("app", |app, session| {
                let actions = app.test.setup_actions();
                assert_eq!(actions.len(), 1);
                actions[0](&mut *app, session)?;
                actions[0](&mut *app, session)?;
                let expected = format!(
                    "-javaagent:{}=destfile={},sessionid=ci,output=file",
                    agent.display(),
                    dir.path().join("reports/jacoco/jacoco.cov").display()
                );
                assert_eq!(app.test.options.get_list("java_args"), vec![expected]);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_disabled_or_without_tests() {
        let dir = TempDir::new().unwrap();
        let session = session(dir.path(), Arc::new(RecordingRunner::new()));
        session.define("plain", |_| Ok(())).unwrap();
        session
            .with_project("plain", |plain, _| {
                assert!(plain.test.setup_actions().is_empty());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_report_without_data_runs_nothing() {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let session = session(dir.path(), runner.clone());
        session.define("app", |_| Ok(())).unwrap();
        assert!(!coverage_report(&session, "app").unwrap());
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn test_report_command() {
        let dir = TempDir::new().unwrap();
        let repo = dir.path().join("repo");
        for dependency in DEPENDENCIES {
            place_artifact(&repo, dependency);
        }
        fs::create_dir_all(dir.path().join("reports/jacoco")).unwrap();
        fs::write(dir.path().join("reports/jacoco/jacoco.cov"), b"data").unwrap();
        fs::create_dir_all(dir.path().join("target/classes")).unwrap();

        let runner = Arc::new(RecordingRunner::new());
        let session = session(dir.path(), runner.clone());
        session.define("app", |_| Ok(())).unwrap();
        assert!(coverage_report(&session, "app").unwrap());

        let command = runner.last().unwrap();
        let reports = dir.path().join("reports/jacoco");
        assert!(command.has_arg(REPORT_MAIN));
        assert!(command.has_arg("report"));
        assert_eq!(
            command.value_of("--classfiles"),
            Some(dir.path().join("target/classes").display().to_string().as_str())
        );
        assert_eq!(
            command.value_of("--xml"),
            Some(reports.join("jacoco.xml").display().to_string().as_str())
        );
        assert_eq!(command.value_of("--encoding"), Some("UTF-8"));
        assert!(reports.join("docs").is_dir());
    }
}
