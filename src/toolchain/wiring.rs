//! Built-in extensions that bind engines to projects
//!
//! Hooks, by name:
//! - `build` (before): conventional resource directories
//! - `compile` (after): compilers for main and test code, default sources and targets
//! - `test` (after `compile`): test framework, explicit, inherited or auto-selected
//! - `doc` (after `compile`): documentation engine
//! - `javadoc` (after `doc`): javadoc window title and source path

use super::doc::default_window_title;
use crate::error::BuildResult;
use crate::lifecycle::{Extension, ExtensionRegistry};
use crate::project::{Project, Usage};
use crate::session::Session;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct ToolchainWiring;

impl Extension for ToolchainWiring {
    fn name(&self) -> &'static str {
        "toolchains"
    }

    fn register(&self, registry: &ExtensionRegistry) {
        registry.before_define("build", &[], |project, _| {
            seed_resources(project);
            Ok(())
        });
        registry.after_define("compile", &[], |project, session| {
            bind_compiler(project, session, Usage::Main)?;
            bind_compiler(project, session, Usage::Test)
        });
        registry.after_define("test", &["compile"], bind_test_framework);
        registry.after_define("doc", &["compile"], bind_doc_engine);
    }
}

fn seed_resources(project: &mut Project) {
    let main = project.path_to(project.layout().resources_dir(Usage::Main));
    if main.is_dir() {
        project.resources.from(main);
    }
    let test = project.path_to(project.layout().resources_dir(Usage::Test));
    if test.is_dir() {
        project.test.resources.from(test);
    }
}

fn bind_compiler(project: &mut Project, session: &Session, usage: Usage) -> BuildResult<()> {
    if project.compile_config(usage).engine().is_none() {
        let explicit = match usage {
            Usage::Main => project.compile.requested(),
            Usage::Test => project.test.compile.requested().or(project.compile.requested()),
        }
        .map(str::to_string);
        if let Some(engine) = session
            .toolchains()
            .compilers
            .bind(project, usage, explicit.as_deref())?
        {
            project.compile_config_mut(usage).bind(engine);
        }
    }

    let Some((language, target)) = project
        .compile_config(usage)
        .engine()
        .map(|e| (e.spec().language, e.spec().target))
    else {
        return Ok(());
    };
    let source = project.path_to(project.layout().source_dir(usage, language));
    let target = project.layout().target_dir(usage, target);
    let config = project.compile_config_mut(usage);
    if config.sources.is_empty() && source.is_dir() {
        config.from(source);
    }
    if config.target.is_none() {
        config.set_target(target);
    }
    if let Some(engine) = config.engine() {
        engine.check_options(&config.options)?;
    }
    Ok(())
}

fn bind_test_framework(project: &mut Project, session: &Session) -> BuildResult<()> {
    if project.test.framework().is_none() {
        let explicit = project
            .test
            .requested()
            .map(str::to_string)
            .or_else(|| project.inherited.test_framework.clone());
        if let Some(framework) = session
            .toolchains()
            .test_frameworks
            .bind(project, Usage::Test, explicit.as_deref())?
        {
            project.test.bind(framework);
        }
    }

    let Some(framework) = project.test.framework() else {
        debug!(project = project.id(), "No test framework applies");
        return Ok(());
    };
    framework.check_options(&project.test.options)?;
    let name = framework.spec().name;
    if project.test.report_to.is_none() {
        project.test.report_to = Some(project.layout().reports_dir(name));
    }
    Ok(())
}

fn bind_doc_engine(project: &mut Project, session: &Session) -> BuildResult<()> {
    if project.doc.engine().is_none() {
        let explicit = project.doc.requested().map(str::to_string);
        if let Some(engine) = session
            .toolchains()
            .doc_engines
            .bind(project, Usage::Main, explicit.as_deref())?
        {
            project.doc.bind(engine);
        }
    }
    if let Some(engine) = project.doc.engine() {
        engine.check_options(&project.doc.options)?;
        if project.doc.target.is_none() {
            project.doc.target = Some(project.layout().doc_dir());
        }
    }
    Ok(())
}

/// Javadoc window title and source path defaults
#[derive(Debug, Clone, Copy, Default)]
pub struct JavadocDefaults;

impl Extension for JavadocDefaults {
    fn name(&self) -> &'static str {
        "javadoc-defaults"
    }

    fn register(&self, registry: &ExtensionRegistry) {
        registry.after_define("javadoc", &["doc"], |project, _| {
            if project.doc.engine_name() != Some("javadoc") {
                return Ok(());
            }
            if !project.doc.options.contains("windowtitle") {
                let title = default_window_title(project.comment(), project.name());
                project.doc.options.set("windowtitle", title);
            }
            if project.doc.sourcepath.is_empty() {
                let sources: Vec<_> = project
                    .compile
                    .sources
                    .iter()
                    .map(|s| project.path_to(s))
                    .filter(|s| s.is_dir())
                    .collect();
                project.doc.sourcepath = sources;
            }
            Ok(())
        });
    }
}
