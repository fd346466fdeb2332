use std::sync::Arc;

use anyhow::Result;

use crate::config::{PipConfig, PublishConfig};
use crate::core::aws::{LambdaPublisher, PublishLayerVersion, PublishedLayer};
use crate::core::layer::{PipInstaller, PipInvocation};
use crate::process::RunOutput;

/// Runs the package manager against a target directory.
pub trait PackageInstaller: Send + Sync {
    fn install(&self, config: &PipConfig, invocation: &PipInvocation<'_>) -> Result<RunOutput>;
}

/// Submits a layer archive to the provider.
pub trait LayerPublisher: Send + Sync {
    fn publish_layer_version(
        &self,
        config: &PublishConfig,
        request: &PublishLayerVersion<'_>,
    ) -> Result<PublishedLayer>;
}

pub trait Effects: Send + Sync {
    fn installer(&self) -> &dyn PackageInstaller;
    fn publisher(&self) -> &dyn LayerPublisher;
}

pub struct SystemEffects {
    installer: Arc<PipInstaller>,
    publisher: Arc<LambdaPublisher>,
}

impl SystemEffects {
    #[must_use]
    pub fn new() -> Self {
        Self {
            installer: Arc::new(PipInstaller),
            publisher: Arc::new(LambdaPublisher),
        }
    }
}

impl Default for SystemEffects {
    fn default() -> Self {
        Self::new()
    }
}

impl Effects for SystemEffects {
    fn installer(&self) -> &dyn PackageInstaller {
        self.installer.as_ref()
    }

    fn publisher(&self) -> &dyn LayerPublisher {
        self.publisher.as_ref()
    }
}

pub type SharedEffects = Arc<dyn Effects>;
