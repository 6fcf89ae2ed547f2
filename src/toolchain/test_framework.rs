use super::report::{failed_tests, ReportFormat};
use super::{EngineRegistry, EngineSpec, TestFramework, TestRequest};
use crate::config::ConfigError;
use crate::error::{BuildError, BuildResult};
use crate::invoker::{CommandInvoker, JavaOptions, ScopedTempFile};
use crate::options::Options;
use crate::project::{Project, Usage};
use crate::resolver::DependencySpec;
use ignore::WalkBuilder;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Dotted class names of every compiled class below `classes`, nested classes excluded
pub fn derive_test_candidates(classes: &Path) -> Vec<String> {
    if !classes.is_dir() {
        return Vec::new();
    }
    let mut candidates: Vec<String> = WalkBuilder::new(classes)
        .standard_filters(false)
        .build()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|entry| entry.path().extension().map(|e| e == "class").unwrap_or(false))
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(classes).ok()?.with_extension("");
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(".");
            Some(name)
        })
        .filter(|name| !name.contains('$'))
        .collect();
    candidates.sort();
    candidates
}

type RunStatus = Arc<Mutex<Option<(bool, Option<i32>)>>>;

/// Runs a framework's launcher once for the whole batch with its arguments in an
/// argument file, and reports how the process ended (`None` in dry-run mode)
fn launch(
    invoker: &CommandInvoker,
    main_class: &str,
    prefix: &str,
    lines: &[String],
    options: JavaOptions,
) -> BuildResult<Option<(bool, Option<i32>)>> {
    let argfile = ScopedTempFile::with_contents(prefix, ".args", lines.join("\n").as_bytes())?;
    let status: RunStatus = Arc::default();
    let sink = status.clone();
    invoker.java(
        &[main_class.to_string(), format!("@{}", argfile.path().display())],
        &options,
        Some(Box::new(move |success, code| {
            *sink.lock().unwrap_or_else(|e| e.into_inner()) = Some((success, code));
            Ok(())
        })),
    )?;
    let result = *status.lock().unwrap_or_else(|e| e.into_inner());
    Ok(result)
}

/// Turns the failed list of a finished run into the passed list
///
/// A missing report counts as "everything passed" only when the runner exited
/// successfully (or did not run at all); a runner that failed without writing a
/// report is an invocation failure.
fn passed_tests(
    tests: &[String],
    failed: Option<Vec<String>>,
    status: Option<(bool, Option<i32>)>,
    name: &str,
    report: &Path,
) -> BuildResult<Vec<String>> {
    match failed {
        Some(failed) => Ok(tests.iter().filter(|t| !failed.contains(t)).cloned().collect()),
        None => match status {
            Some((false, code)) => Err(BuildError::invocation(format!("execute {}", name), code)),
            Some((true, _)) => {
                warn!(
                    report = %report.display(),
                    "No test report found after {}, treating all {} tests as passed",
                    name,
                    tests.len()
                );
                Ok(tests.to_vec())
            }
            None => Ok(tests.to_vec()),
        },
    }
}

/// TestNG
///
/// Tests are the compiled classes whose name ends in `Test`, excluding classes named
/// `Abstract*`. Options:
/// - `properties`: system properties passed to the suite
/// - `java_args`: JVM arguments
/// - `args`: extra TestNG command line arguments
/// - `groups`, `excludegroups`: group selection
#[derive(Debug, Clone, Copy, Default)]
pub struct TestNG;

impl TestNG {
    pub const SPEC: EngineSpec = EngineSpec {
        name: "testng",
        language: "java",
        source_ext: "java",
        target: "classes",
        target_ext: "class",
        packaging: None,
    };

    pub const OPTIONS: [&'static str; 5] = ["properties", "java_args", "args", "groups", "excludegroups"];

    pub const DEPENDENCIES: [&'static str; 3] = [
        "org.testng:testng:jar:7.4.0",
        "com.beust:jcommander:jar:1.78",
        "org.webjars:jquery:jar:3.5.1",
    ];

    const INCLUDE: &'static str = r".*Test$";
    const EXCLUDE: &'static str = r"(^|\.)Abstract[^.]*$";

    pub fn register(registry: &EngineRegistry<dyn TestFramework>) {
        registry.register(
            Self::SPEC,
            |project, _| project.test.compile.language() == Some("java"),
            |_| Box::new(TestNG),
        );
    }

    /// `<report_to>/<project id>/Command line test.xml`
    pub fn report_path(report_to: &Path, project_id: &str) -> PathBuf {
        report_to.join(project_id).join("Command line test.xml")
    }

    pub fn command_args(tests: &[String], request: &TestRequest<'_>) -> Vec<String> {
        let options = request.options;
        let mut args = vec![
            "-suitename".to_string(),
            request.project_id.to_string(),
            "-log".to_string(),
            "2".to_string(),
            "-d".to_string(),
            request.report_to.display().to_string(),
        ];
        let excludegroups = options.get_list("excludegroups");
        if !excludegroups.is_empty() {
            args.push("-excludegroups".to_string());
            args.push(excludegroups.join(","));
        }
        let groups = options.get_list("groups");
        if !groups.is_empty() {
            args.push("-groups".to_string());
            args.push(groups.join(","));
        }
        args.push("-testclass".to_string());
        args.push(tests.join(","));
        args.extend(options.get_list("args"));
        args
    }
}

impl TestFramework for TestNG {
    fn spec(&self) -> &EngineSpec {
        &Self::SPEC
    }

    fn check_options(&self, options: &Options) -> Result<(), ConfigError> {
        options.check("testng", &Self::OPTIONS)
    }

    fn dependencies(&self) -> Vec<DependencySpec> {
        Self::DEPENDENCIES.iter().map(|d| DependencySpec::parse(d)).collect()
    }

    fn tests(&self, request: &TestRequest<'_>) -> BuildResult<Vec<String>> {
        let include = Regex::new(Self::INCLUDE).map_err(|e| BuildError::External(e.into()))?;
        let exclude = Regex::new(Self::EXCLUDE).map_err(|e| BuildError::External(e.into()))?;
        Ok(derive_test_candidates(request.classes)
            .into_iter()
            .filter(|c| include.is_match(c) && !exclude.is_match(c))
            .collect())
    }

    fn run(
        &self,
        tests: &[String],
        request: &TestRequest<'_>,
        invoker: &CommandInvoker,
    ) -> BuildResult<Vec<String>> {
        self.check_options(request.options)?;
        let name = format!("TestNG in {}", request.project_name);
        let options = JavaOptions {
            classpath: request.dependencies.to_vec(),
            java_args: request.options.get("java_args").map(|v| v.to_strings()),
            properties: request.options.get_map("properties"),
            name: Some(name.clone()),
            verbose: Some(invoker.config().trace("testng")),
            ..Default::default()
        };

        let report = Self::report_path(request.report_to, request.project_id);
        if report.exists() {
            fs::remove_file(&report).map_err(|e| BuildError::io(&report, e))?;
        }
        let status = launch(
            invoker,
            "org.testng.TestNG",
            "testng",
            &Self::command_args(tests, request),
            options,
        )?;
        debug!(name = %name, status = ?status, "TestNG finished");

        let failed = match report.exists() {
            true => Some(failed_tests(ReportFormat::TestNg7, &report)?),
            false => None,
        };
        passed_tests(tests, failed, status, &name, &report)
    }
}

/// JUnit through the JUnit Platform console launcher
///
/// Tests are the compiled classes referencing a JUnit 4 or Jupiter `@Test`
/// annotation. Chosen automatically when the project declares a JUnit library.
/// Options: `properties`, `java_args`, `args`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JUnit;

impl JUnit {
    pub const SPEC: EngineSpec = EngineSpec {
        name: "junit",
        language: "java",
        source_ext: "java",
        target: "classes",
        target_ext: "class",
        packaging: None,
    };

    pub const OPTIONS: [&'static str; 3] = ["properties", "java_args", "args"];

    pub const DEPENDENCIES: [&'static str; 1] =
        ["org.junit.platform:junit-platform-console-standalone:jar:1.8.2"];

    const ANNOTATIONS: [&'static [u8]; 2] = [b"Lorg/junit/jupiter/api/Test;", b"Lorg/junit/Test;"];

    pub fn register(registry: &EngineRegistry<dyn TestFramework>) {
        registry.register(Self::SPEC, Self::applies_to, |_| Box::new(JUnit));
    }

    fn applies_to(project: &Project, _usage: Usage) -> bool {
        project.test.compile.language() == Some("java")
            && project
                .test
                .compile
                .dependencies
                .iter()
                .chain(project.test.dependencies.iter())
                .any(is_junit)
    }

    fn is_test_class(path: &Path) -> bool {
        match fs::read(path) {
            Ok(bytes) => Self::ANNOTATIONS
                .iter()
                .any(|a| bytes.windows(a.len()).any(|w| w == *a)),
            Err(_) => false,
        }
    }

    pub fn command_args(tests: &[String], request: &TestRequest<'_>) -> Vec<String> {
        let mut args = vec![
            "--disable-banner".to_string(),
            "--reports-dir".to_string(),
            request.report_to.display().to_string(),
        ];
        for test in tests {
            args.push("--select-class".to_string());
            args.push(test.clone());
        }
        args.extend(request.options.get_list("args"));
        args
    }

    fn reports(report_to: &Path) -> Vec<PathBuf> {
        let mut reports: Vec<PathBuf> = fs::read_dir(report_to)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|e| e.path())
                    .filter(|p| {
                        p.file_name()
                            .map(|n| {
                                let n = n.to_string_lossy();
                                n.starts_with("TEST-") && n.ends_with(".xml")
                            })
                            .unwrap_or(false)
                    })
                    .collect()
            })
            .unwrap_or_default();
        reports.sort();
        reports
    }
}

fn is_junit(spec: &DependencySpec) -> bool {
    match spec {
        DependencySpec::Artifact(a) => a.group.starts_with("org.junit") || a.id == "junit",
        DependencySpec::Path(p) => p
            .file_name()
            .map(|n| n.to_string_lossy().starts_with("junit"))
            .unwrap_or(false),
    }
}

impl TestFramework for JUnit {
    fn spec(&self) -> &EngineSpec {
        &Self::SPEC
    }

    fn check_options(&self, options: &Options) -> Result<(), ConfigError> {
        options.check("junit", &Self::OPTIONS)
    }

    fn dependencies(&self) -> Vec<DependencySpec> {
        Self::DEPENDENCIES.iter().map(|d| DependencySpec::parse(d)).collect()
    }

    fn tests(&self, request: &TestRequest<'_>) -> BuildResult<Vec<String>> {
        Ok(derive_test_candidates(request.classes)
            .into_iter()
            .filter(|c| {
                let mut path = request.classes.to_path_buf();
                path.extend(c.split('.'));
                path.set_extension("class");
                Self::is_test_class(&path)
            })
            .collect())
    }

    fn run(
        &self,
        tests: &[String],
        request: &TestRequest<'_>,
        invoker: &CommandInvoker,
    ) -> BuildResult<Vec<String>> {
        self.check_options(request.options)?;
        let name = format!("JUnit in {}", request.project_name);
        let options = JavaOptions {
            classpath: request.dependencies.to_vec(),
            java_args: request.options.get("java_args").map(|v| v.to_strings()),
            properties: request.options.get_map("properties"),
            name: Some(name.clone()),
            verbose: Some(invoker.config().trace("junit")),
            ..Default::default()
        };

        for stale in Self::reports(request.report_to) {
            fs::remove_file(&stale).map_err(|e| BuildError::io(&stale, e))?;
        }
        let status = launch(
            invoker,
            "org.junit.platform.console.ConsoleLauncher",
            "junit",
            &Self::command_args(tests, request),
            options,
        )?;

        let reports = Self::reports(request.report_to);
        let failed = if reports.is_empty() {
            None
        } else {
            let mut failed = Vec::new();
            for report in &reports {
                for class in failed_tests(ReportFormat::JUnitLegacyXml, report)? {
                    if !failed.contains(&class) {
                        failed.push(class);
                    }
                }
            }
            Some(failed)
        };
        passed_tests(tests, failed, status, &name, request.report_to)
    }
}
