use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;

use crate::outcome::ExecutionOutcome;
use crate::CommandContext;

use super::archive::{format_bytes, write_layer_archive, ArchiveSummary};
use super::install::install_dependencies;
use super::plan::{validate_layer_name, LayerDescriptor, LayerRequest};
use super::publish::publish_archive;
use super::workspace::LayerWorkspace;

/// Installs the requested packages into a fresh workspace, zips them, and
/// either publishes the archive or keeps a copy of it.
///
/// The workspace is removed before this returns, on success and on error.
///
/// # Errors
/// Returns an error when the layer name is unusable, the package manager
/// fails, archiving or copying hits an I/O error, the publish call is
/// rejected, or the workspace cannot be removed.
pub fn create_layer(ctx: &CommandContext, request: &LayerRequest) -> Result<ExecutionOutcome> {
    validate_layer_name(&request.layer_name)?;
    let descriptor = LayerDescriptor::from_request(request);

    let workspace = LayerWorkspace::create()?;
    let workspace_root = workspace.root().to_path_buf();
    info!(
        layer = %descriptor.name,
        libraries = request.libraries.len(),
        requirements = request.requirements_file.is_some(),
        "building layer"
    );

    install_dependencies(ctx, request, workspace.package_dir())?;

    let archive_path = workspace.archive_path(&request.archive_file_name());
    let summary = write_layer_archive(workspace.root(), workspace.package_dir(), &archive_path)?;
    info!(
        entries = summary.entries,
        size = %format_bytes(summary.bytes),
        "archived layer"
    );

    let outcome = if request.upload {
        let published = publish_archive(ctx, &descriptor, &summary.path)?;
        let message = serde_json::to_string_pretty(&published.response)
            .context("failed to render publish response")?;
        ExecutionOutcome::success(
            message,
            json!({
                "passthrough": true,
                "status": published.status,
                "response": published.response,
                "archive": summary,
                "descriptor": descriptor,
                "workspace": workspace_root,
            }),
        )
    } else {
        let persisted = persist_archive(&summary, request)?;
        ExecutionOutcome::success(
            format!(
                "Lambda layer package created at: {}",
                persisted.path.display()
            ),
            json!({
                "archive": persisted,
                "descriptor": descriptor,
                "workspace": workspace_root,
            }),
        )
    };

    workspace.close()?;
    Ok(outcome)
}

/// Copies the archive out of the workspace so the reported path outlives teardown.
fn persist_archive(summary: &ArchiveSummary, request: &LayerRequest) -> Result<ArchiveSummary> {
    let out_dir = match &request.out_dir {
        Some(dir) => dir.clone(),
        None => env::current_dir().context("failed to read the working directory")?,
    };
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let out_dir = out_dir
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", out_dir.display()))?;
    let destination: PathBuf = out_dir.join(request.archive_file_name());
    fs::copy(&summary.path, &destination).with_context(|| {
        format!(
            "failed to copy {} to {}",
            summary.path.display(),
            destination.display()
        )
    })?;
    tracing::debug!(archive = %destination.display(), "kept layer archive");
    Ok(ArchiveSummary {
        path: destination,
        ..summary.clone()
    })
}
