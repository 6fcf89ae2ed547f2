//! jarwright - project-aware build engine for Java-family projects
//!
//! The crate models a tree of build units ("projects"), binds pluggable toolchains
//! (compilers, test frameworks, documentation generators) to them, and assembles the
//! results into archives with correctly serialized `META-INF/MANIFEST.MF` entries.
//!
//! # Core Concepts
//!
//! - **Session**: the build-session context. Owns configuration, toolchain registries,
//!   the extension registry, the command invoker and every defined project.
//! - **Extension lifecycle**: before/after-define hooks that seed and finalize project
//!   configuration, run top-down before a definition and bottom-up after it.
//! - **Toolchains**: ordered engine registries with applicability predicates and
//!   explicit override by name.
//! - **Command invoker**: builds `java`, `javac` and `javadoc` command lines, including
//!   pathing jars for oversized classpaths, and cleans up temporary files on every path.
//! - **Packaging**: jar, war, aar, zip, sources and javadoc archives built from
//!   inheritable manifest and meta-inf defaults.
//!
//! # Example Usage
//!
//! ```no_run
//! use jarwright::{PackageKind, Session, SessionConfig};
//!
//! # fn main() -> jarwright::BuildResult<()> {
//! let session = Session::new(SessionConfig::default());
//! session.define("app", |app| {
//!     app.set_version("1.0");
//!     app.manifest_mut().set_header("Main-Class", "com.example.Main")?;
//!     app.package(PackageKind::Jar);
//!     Ok(())
//! })?;
//!
//! session.with_project("app", |app, session| {
//!     app.compile(session)?;
//!     app.build_packages(session)
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`lifecycle`]: extension registry and before/after-define phases
//! - [`toolchain`]: compiler, test framework and doc engine registries
//! - [`invoker`]: external process invocation and classpath assembly
//! - [`manifest`]: `MANIFEST.MF` model with exact parse/serialize rules
//! - [`package`]: archive layouts and package assembly
//! - [`addons`]: optional extensions (annotation processors, coverage, shading)

pub mod addons;
pub mod config;
pub mod container;
pub mod error;
pub mod invoker;
pub mod lifecycle;
pub mod manifest;
pub mod options;
pub mod package;
pub mod project;
pub mod resolver;
pub mod session;
pub mod toolchain;
pub mod util;

pub use config::{ConfigError, SessionConfig};
pub use container::{ContainerFormat, ZipFormat};
pub use error::{BuildError, BuildResult};
pub use invoker::{CommandInvoker, CommandLine, ProcessRunner, ProcessStatus, SystemRunner};
pub use lifecycle::{Extension, ExtensionRegistry, Phase};
pub use manifest::{Manifest, ManifestSource, Section};
pub use options::{OptionValue, Options};
pub use package::{ArchiveLayout, PackageKind, PackageSpec};
pub use project::{Project, Usage};
pub use resolver::{ArtifactCoordinate, DependencyResolver, DependencySpec, LocalRepository};
pub use session::{DefineContext, DefineOptions, Session};
pub use toolchain::{EngineSpec, Toolchains};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};
