//! Optional extensions
//!
//! Nothing here is installed by default; install through [`crate::Session::install`]
//! before defining the projects that should see the hooks.

mod coverage;
mod generated_sources;
mod processor_path;
mod shade;

pub use coverage::{coverage_report, Coverage, CoverageConfig};
pub use generated_sources::{GeneratedSources, GeneratedSourcesTracking};
pub use processor_path::ProcessorPath;
pub use shade::shade;
