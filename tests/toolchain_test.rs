//! Engine selection, the test run end to end and classpath assembly through the
//! process seam

mod common;

use common::Workspace;
use jarwright::invoker::{JavaOptions, RecordingRunner};
use jarwright::project::Usage;
use jarwright::toolchain::{CompileRequest, Compiler, EngineSpec, Toolchains};
use jarwright::{
    BuildError, BuildResult, CommandInvoker, ConfigError, DependencySpec, Manifest, Options,
    ProcessStatus, Session, ZipFormat,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

struct Fake(&'static EngineSpec);

impl Compiler for Fake {
    fn spec(&self) -> &EngineSpec {
        self.0
    }

    fn check_options(&self, _options: &Options) -> Result<(), ConfigError> {
        Ok(())
    }

    fn source_files(&self, sources: &[PathBuf]) -> Vec<PathBuf> {
        sources.to_vec()
    }

    fn compile(&self, _request: &CompileRequest<'_>, _invoker: &CommandInvoker) -> BuildResult<()> {
        Ok(())
    }
}

static NEVER: EngineSpec = EngineSpec {
    name: "never",
    language: "never",
    source_ext: "nv",
    target: "never-classes",
    target_ext: "nvc",
    packaging: None,
};

static GROOVY: EngineSpec = EngineSpec {
    name: "groovyc",
    language: "groovy",
    source_ext: "groovy",
    target: "classes",
    target_ext: "class",
    packaging: None,
};

fn toolchains() -> Toolchains {
    let toolchains = Toolchains::new();
    toolchains
        .compilers
        .register(NEVER.clone(), |_, _| false, |_| Box::new(Fake(&NEVER)));
    toolchains.compilers.register(
        GROOVY.clone(),
        |project, usage| project.path_to(project.layout().source_dir(usage, "groovy")).is_dir(),
        |_| Box::new(Fake(&GROOVY)),
    );
    toolchains
}

#[test]
fn test_first_applicable_engine_is_selected() {
    let ws = Workspace::new();
    ws.write("src/main/groovy/App.groovy", "class App {}");
    let session = Session::builder(ws.config())
        .runner(Arc::new(RecordingRunner::new()))
        .toolchains(toolchains())
        .build();
    session.define("app", |_| Ok(())).unwrap();
    session
        .with_project("app", |app, _| {
            assert_eq!(app.compile.engine().map(|e| e.spec().name), Some("groovyc"));
            assert_eq!(app.compile.sources, vec![ws.path("src/main/groovy")]);
            assert!(app.test.compile.engine().is_none());
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_explicit_engine_bypasses_applicability() {
    let ws = Workspace::new();
    ws.write("src/main/groovy/App.groovy", "class App {}");
    let session = Session::builder(ws.config())
        .runner(Arc::new(RecordingRunner::new()))
        .toolchains(toolchains())
        .build();
    session
        .define("app", |app| {
            app.compile.using("never");
            Ok(())
        })
        .unwrap();
    session
        .with_project("app", |app, _| {
            assert_eq!(app.compile.engine().map(|e| e.spec().name), Some("never"));
            assert_eq!(app.compile_target(Usage::Main), ws.path("target/never-classes"));
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_unknown_explicit_engine_fails_definition() {
    let ws = Workspace::new();
    let session = Session::builder(ws.config())
        .runner(Arc::new(RecordingRunner::new()))
        .toolchains(toolchains())
        .build();
    let err = session
        .define("app", |app| {
            app.compile.using("kotlinc");
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, BuildError::Config(ConfigError::UnknownEngine { .. })));
    assert!(session.project("app").is_none());
}

#[test]
fn test_relative_source_dir_binds_javac() {
    let ws = Workspace::new();
    ws.write("java/com/example/App.java", "class App {}");
    let runner = Arc::new(RecordingRunner::new());
    let session = ws.session(runner.clone());
    session
        .define("app", |app| {
            app.compile.from("java").option("processor_path", vec!["lib/processor.jar"]);
            Ok(())
        })
        .unwrap();

    session
        .with_project("app", |app, s| {
            assert_eq!(app.compile.engine().map(|e| e.spec().name), Some("javac"));
            app.compile(s)
        })
        .unwrap();

    let command = runner.last().unwrap();
    assert!(command.program.ends_with("javac"));
    assert_eq!(command.value_of("-d"), ws.path("target/classes").to_str());
    assert_eq!(command.value_of("-sourcepath"), ws.path("java").to_str());
    assert_eq!(
        command.value_of("-processorpath"),
        ws.path("lib/processor.jar").to_str()
    );
}

const JUNIT_ANNOTATION: &[u8] = b"\xca\xfe\xba\xbeLorg/junit/jupiter/api/Test;";

const FAILING_REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuite name="JUnit Jupiter" tests="2" failures="1">
  <testcase name="passes()" classname="PassingClass"/>
  <testcase name="fails()" classname="FailingClass">
    <failure type="org.opentest4j.AssertionFailedError" message="expected: true">trace</failure>
  </testcase>
</testsuite>"#;

/// Pretends to be javac and the JUnit console launcher
fn fake_jdk(reports: PathBuf) -> impl Fn(&jarwright::CommandLine) -> ProcessStatus + Send + Sync {
    move |command| {
        let program = command.program.file_name().unwrap().to_string_lossy().into_owned();
        if program == "javac" {
            let output = PathBuf::from(command.value_of("-d").unwrap());
            if output.ends_with("test/classes") {
                fs::create_dir_all(&output).unwrap();
                fs::write(output.join("FailingClass.class"), JUNIT_ANNOTATION).unwrap();
                fs::write(output.join("PassingClass.class"), JUNIT_ANNOTATION).unwrap();
                fs::write(output.join("PassingClass$Helper.class"), JUNIT_ANNOTATION).unwrap();
            }
            return ProcessStatus::ok();
        }
        if command.has_arg("org.junit.platform.console.ConsoleLauncher") {
            fs::create_dir_all(&reports).unwrap();
            fs::write(reports.join("TEST-junit-jupiter.xml"), FAILING_REPORT).unwrap();
            return ProcessStatus::from_code(1);
        }
        ProcessStatus::ok()
    }
}

#[test]
fn test_failing_test_class_fails_the_build() {
    let ws = Workspace::new();
    ws.write("src/main/java/App.java", "class App {}");
    ws.write("src/test/java/FailingClass.java", "class FailingClass {}");
    ws.write("src/test/java/PassingClass.java", "class PassingClass {}");
    ws.artifact("org.junit.jupiter:junit-jupiter-api:jar:5.8.2");
    ws.artifact("org.junit.platform:junit-platform-console-standalone:jar:1.8.2");

    let runner = Arc::new(RecordingRunner::with_handler(fake_jdk(ws.path("reports/junit"))));
    let session = ws.session(runner.clone());
    session
        .define("app", |app| {
            app.test.with("org.junit.jupiter:junit-jupiter-api:jar:5.8.2");
            Ok(())
        })
        .unwrap();

    let err = session.with_project("app", |app, s| app.run_tests(s)).unwrap_err();
    assert_eq!(err.failed_tests(), Some(&["FailingClass".to_string()][..]));
    assert_eq!(err.to_string(), "Tests failed in app: FailingClass");

    session
        .with_project("app", |app, _| {
            assert_eq!(app.test.failed_tests(), &["FailingClass"]);
            assert_eq!(app.test.passed_tests(), &["PassingClass"]);
            Ok(())
        })
        .unwrap();

    let outcome = fs::read_to_string(ws.path("reports/junit/outcome.yml")).unwrap();
    assert!(outcome.contains("status: completed"), "{}", outcome);
    assert!(outcome.contains("FailingClass"), "{}", outcome);

    let programs: Vec<String> = runner
        .commands()
        .iter()
        .map(|c| c.program.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(programs, vec!["javac", "javac", "java"]);
}

#[test]
fn test_long_classpath_goes_through_pathing_jar() {
    let ws = Workspace::new();
    let lib = ws.write("lib/a.jar", "jar");
    let classes = ws.path("target/classes");
    fs::create_dir_all(&classes).unwrap();

    let seen: Arc<Mutex<Option<(String, String)>>> = Arc::default();
    let sink = seen.clone();
    let runner = Arc::new(RecordingRunner::with_handler(move |command| {
        let classpath = command.value_of("-classpath").unwrap().to_string();
        let manifest = Manifest::from_archive(&ZipFormat, Path::new(&classpath)).unwrap();
        let header = manifest.main().get("Class-Path").unwrap_or_default().to_string();
        *sink.lock().unwrap() = Some((classpath, header));
        ProcessStatus::ok()
    }));
    let config = ws.config().with_classpath_limit(Some(10));
    let session = Session::builder(config).runner(runner).build();

    let options = JavaOptions::named("pathing").with_classpath(vec![
        DependencySpec::path(&lib),
        DependencySpec::path(&classes),
    ]);
    session
        .invoker()
        .java(&["com.example.Main".to_string()], &options, None)
        .unwrap();

    let (wrapper, header) = seen.lock().unwrap().clone().unwrap();
    assert!(wrapper.ends_with(".jar"), "{}", wrapper);
    assert!(!Path::new(&wrapper).exists(), "pathing jar left behind");
    let entries: Vec<&str> = header.split(' ').collect();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].ends_with("/lib/a.jar"), "{}", header);
    assert!(entries[1].ends_with("/target/classes/"), "{}", header);
}
