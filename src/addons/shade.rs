use crate::error::{BuildError, BuildResult};
use crate::invoker::CommandLine;
use crate::resolver::DependencySpec;
use crate::session::Session;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const SHADE_CLI: &str = "org.realityforge.shade:shade-cli:jar:1.0.0";

/// Rewrites `input` with `relocations` (package prefix pairs) applied and moves the
/// result to `output`
pub fn shade(session: &Session, input: &Path, output: &Path, relocations: &[(&str, &str)]) -> BuildResult<()> {
    let cli = session.invoker().resolve(&[DependencySpec::from(SHADE_CLI)])?;
    let shaded = PathBuf::from(format!("{}-shaded", input.display()));

    let mut command = CommandLine::new(session.config().java_bin("java")?);
    command.arg("-jar");
    command.args(cli.iter().map(|p| p.display().to_string()));
    command.args(["--input".to_string(), input.display().to_string()]);
    command.args(["--output".to_string(), shaded.display().to_string()]);
    command.args(relocations.iter().map(|(from, to)| format!("-r{}{}", from, to)));

    info!("Shading {}", input.display());
    session.invoker().run(&command, "shade", None)?;
    if session.config().dryrun {
        return Ok(());
    }
    fs::rename(&shaded, output).map_err(|e| BuildError::io(&shaded, e))
}
