use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::core::aws::{PublishLayerVersion, PublishedLayer};
use crate::CommandContext;

use super::archive::format_bytes;
use super::plan::LayerDescriptor;

/// Reads the archive fully into memory and submits it as a new layer version.
pub(crate) fn publish_archive(
    ctx: &CommandContext,
    descriptor: &LayerDescriptor,
    archive: &Path,
) -> Result<PublishedLayer> {
    let bytes =
        fs::read(archive).with_context(|| format!("failed to read {}", archive.display()))?;
    info!(
        layer = %descriptor.name,
        region = %descriptor.region,
        size = %format_bytes(bytes.len() as u64),
        "publishing layer"
    );
    let request = PublishLayerVersion {
        layer_name: &descriptor.name,
        description: &descriptor.description,
        compatible_runtimes: &descriptor.compatible_runtimes,
        region: &descriptor.region,
        zip_file: &bytes,
    };
    ctx.publisher()
        .publish_layer_version(ctx.config().publish(), &request)
}
