mod core;

pub(crate) use crate::core::config;
pub(crate) use crate::core::runtime::{effects, process};
pub(crate) use crate::core::tooling::{errors, outcome};

pub use crate::core::aws::{LambdaPublisher, PublishLayerVersion, PublishedLayer};
pub use crate::core::config::context::CommandContext;
pub use crate::core::config::{Config, EnvSnapshot, GlobalOptions, PipConfig, PublishConfig};
pub use crate::core::layer::{
    create_layer, format_bytes, layer_description, ArchiveSummary, InstallSource, LayerDescriptor,
    LayerRequest, LayerWorkspace, PipInstaller, PipInvocation, DEFAULT_REGION, DEFAULT_RUNTIME,
    PACKAGE_DIR_NAME,
};
pub use crate::core::runtime::effects::{
    Effects, LayerPublisher, PackageInstaller, SharedEffects, SystemEffects,
};
pub use crate::core::runtime::process::RunOutput;
pub use crate::core::tooling::errors::LayerError;
pub use crate::core::tooling::outcome::{to_json_response, CommandStatus, ExecutionOutcome};

pub(crate) const PYLAYER_VERSION: &str = env!("CARGO_PKG_VERSION");
