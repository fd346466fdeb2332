use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use crate::config::PipConfig;
use crate::effects::PackageInstaller;
use crate::errors::LayerError;
use crate::process::{run_command, run_command_streaming, RunOutput};
use crate::CommandContext;

use super::plan::LayerRequest;

/// What a single package-manager pass installs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstallSource<'a> {
    Library(&'a str),
    Requirements(&'a Path),
}

impl InstallSource<'_> {
    fn label(&self) -> String {
        match self {
            InstallSource::Library(name) => (*name).to_string(),
            InstallSource::Requirements(path) => format!("-r {}", path.display()),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PipInvocation<'a> {
    pub source: InstallSource<'a>,
    pub target: &'a Path,
    /// Echo the package manager's output while it runs.
    pub stream: bool,
}

impl PipInvocation<'_> {
    /// Arguments following the package-manager program, one vector slot each.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["install".to_string()];
        match self.source {
            InstallSource::Library(name) => args.push(name.to_string()),
            InstallSource::Requirements(path) => {
                args.push("-r".to_string());
                args.push(path.display().to_string());
            }
        }
        args.push("--target".to_string());
        args.push(self.target.display().to_string());
        args
    }
}

/// Installs through the system `pip` (or the `PYLAYER_PIP` override).
pub struct PipInstaller;

impl PackageInstaller for PipInstaller {
    fn install(&self, config: &PipConfig, invocation: &PipInvocation<'_>) -> Result<RunOutput> {
        let mut command = resolve_pip_command(config);
        let program = command.remove(0);
        command.extend(invocation.args());
        debug!(program = %program, args = ?command, "invoking package manager");
        if invocation.stream {
            run_command_streaming(&program, &command, Path::new("."))
        } else {
            run_command(&program, &command, Path::new("."))
        }
    }
}

/// Program plus leading arguments; never empty.
pub(crate) fn resolve_pip_command(config: &PipConfig) -> Vec<String> {
    if let Some(command) = config.command.as_ref().filter(|command| !command.is_empty()) {
        return command.clone();
    }
    for candidate in ["pip3", "pip"] {
        if let Ok(path) = which::which(candidate) {
            return vec![path.display().to_string()];
        }
    }
    vec!["pip".to_string()]
}

/// Runs one package-manager pass per library, then one for the manifest.
pub(crate) fn install_dependencies(
    ctx: &CommandContext,
    request: &LayerRequest,
    package_dir: &Path,
) -> Result<()> {
    for library in &request.libraries {
        install_one(ctx, InstallSource::Library(library), package_dir)?;
    }
    if let Some(manifest) = request.requirements_file.as_deref() {
        if !manifest.is_file() {
            return Err(LayerError::MissingRequirements {
                path: manifest.to_path_buf(),
            }
            .into());
        }
        install_one(ctx, InstallSource::Requirements(manifest), package_dir)?;
    }
    Ok(())
}

fn install_one(ctx: &CommandContext, source: InstallSource<'_>, target: &Path) -> Result<()> {
    info!(source = %source.label(), "installing");
    let invocation = PipInvocation {
        source,
        target,
        stream: !ctx.global.quiet && !ctx.global.json,
    };
    let output = ctx.installer().install(ctx.config().pip(), &invocation)?;
    if !output.success() {
        return Err(LayerError::PackageManager {
            command: format!("pip install {}", source.label()),
            code: output.code,
            stderr: output.stderr,
        }
        .into());
    }
    Ok(())
}
