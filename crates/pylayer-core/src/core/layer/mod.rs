//! The layer workflow: workspace setup, dependency install, archival,
//! optional publication, and teardown.

mod archive;
mod create;
mod install;
mod plan;
mod publish;
mod workspace;

pub use archive::{format_bytes, ArchiveSummary};
pub use create::create_layer;
pub use install::{InstallSource, PipInstaller, PipInvocation};
pub use plan::{
    layer_description, LayerDescriptor, LayerRequest, DEFAULT_REGION, DEFAULT_RUNTIME,
    PACKAGE_DIR_NAME,
};
pub use workspace::LayerWorkspace;
