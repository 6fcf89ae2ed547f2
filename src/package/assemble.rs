//! Per-kind archive defaults
//!
//! | kind    | default content                                                    |
//! |---------|--------------------------------------------------------------------|
//! | jar     | compiled classes and resources at the root (`contents` slot)       |
//! | aar     | as jar, plus `services.xml` and `*.wsdl` from `src/main/axis2` in `META-INF/`, and `libs` under `lib/` |
//! | war     | `WEB-INF/classes` (`classes` slot), `WEB-INF/lib` (`libs` slot, default the compile dependencies), the webapp directory and asset directories at the root |
//! | sources | compile and resource source directories                           |
//! | javadoc | the doc target                                                     |
//! | zip     | nothing                                                            |
//!
//! A slot set on the [`PackageSpec`] replaces the default for that slot; free-form
//! inclusions are always kept and take precedence over defaults for the same entry.

use super::{PackageKind, PackageSpec};
use crate::error::{BuildError, BuildResult};
use crate::invoker::CommandInvoker;
use crate::project::{Project, Usage};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Assembles `spec` for `project` and returns the archive path
pub(crate) fn assemble(project: &Project, spec: &PackageSpec, invoker: &CommandInvoker) -> BuildResult<PathBuf> {
    let kind = spec.kind();
    let mut layout = spec.layout().clone();

    match kind {
        PackageKind::Jar | PackageKind::Aar => {
            for dir in contents(project, spec) {
                layout.include_contents(dir);
            }
        }
        PackageKind::War => {
            let classes = match spec.classes() {
                Some(dirs) => dirs.iter().map(|d| project.path_to(d)).collect(),
                None => compiled_output(project),
            };
            for dir in classes {
                layout.path("WEB-INF/classes").include_contents(dir);
            }
            let libs = match spec.libs() {
                Some(libs) => libs.to_vec(),
                None => project.compile.dependencies.clone(),
            };
            let libs: Vec<_> = libs.iter().map(|l| project.anchored(l)).collect();
            for lib in invoker.resolve(&libs)? {
                layout.path("WEB-INF/lib").include(lib);
            }
            let webapp = project.path_to(project.layout().webapp_dir());
            if webapp.is_dir() {
                layout.include_contents(webapp);
            }
            for asset in project.assets().iter().map(|a| project.path_to(a)).filter(|a| a.is_dir()) {
                layout.include_contents(asset);
            }
        }
        PackageKind::Sources => {
            let sources = project.compile.sources.iter().chain(project.resources.sources.iter());
            for dir in sources.map(|s| project.path_to(s)).filter(|s| s.is_dir()) {
                layout.include_contents(dir);
            }
        }
        PackageKind::Javadoc => {
            let doc = project.doc_target();
            if doc.is_dir() {
                layout.include_contents(doc);
            }
        }
        PackageKind::Zip => {}
    }

    if kind == PackageKind::Aar {
        for file in service_descriptors(&project.path_to(project.layout().axis2_dir()))? {
            layout.path("META-INF").include(file);
        }
        let libs: Vec<_> = spec.libs().unwrap_or_default().iter().map(|l| project.anchored(l)).collect();
        for lib in invoker.resolve(&libs)? {
            layout.path("lib").include(lib);
        }
    }

    let (manifest, meta_inf) = match kind.has_manifest() {
        true => {
            let source = spec.manifest().unwrap_or_else(|| project.manifest());
            let meta_inf = spec.meta_inf().unwrap_or_else(|| project.meta_inf());
            (source.resolve()?, meta_inf.iter().map(|f| project.path_to(f)).collect())
        }
        false => (None, Vec::new()),
    };

    let file = project.path_to(spec.file());
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
    }
    let entries = layout.write(&file, manifest.as_ref(), &meta_inf, invoker.container())?;
    info!("Packaging {} ({} entries)", file.display(), entries);
    Ok(file)
}

/// The `contents` slot, or the compiled classes and resources that exist
fn contents(project: &Project, spec: &PackageSpec) -> Vec<PathBuf> {
    match spec.contents() {
        Some(dirs) => dirs.iter().map(|d| project.path_to(d)).collect(),
        None => compiled_output(project),
    }
}

fn compiled_output(project: &Project) -> Vec<PathBuf> {
    [project.compile_target(Usage::Main), project.resources_target(Usage::Main)]
        .into_iter()
        .filter(|d| d.is_dir())
        .collect()
}

/// `services.xml` and every `*.wsdl` file directly in `dir`, sorted
fn service_descriptors(dir: &Path) -> BuildResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| BuildError::io(dir, e))?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name().map(|n| n == "services.xml").unwrap_or(false)
                || p.extension().map(|e| e.eq_ignore_ascii_case("wsdl")).unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}
