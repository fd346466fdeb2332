use std::fmt;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::EnvSnapshot;
use crate::errors::LayerError;

use super::providers::{ContainerEndpoint, InstanceMetadata, WebIdentity};

const DEFAULT_PROFILE: &str = "default";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Where credentials may come from, resolved lazily so `--no-upload` runs
/// never read credential files or reach a metadata service.
#[derive(Debug, Clone)]
pub(crate) struct CredentialSource {
    env: Option<Credentials>,
    web_identity: Option<WebIdentity>,
    shared_file: Option<PathBuf>,
    config_file: Option<PathBuf>,
    profile: String,
    container: Option<ContainerEndpoint>,
    instance_metadata: Option<InstanceMetadata>,
}

impl CredentialSource {
    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Self {
        let env = match (
            snapshot.non_empty("AWS_ACCESS_KEY_ID"),
            snapshot.non_empty("AWS_SECRET_ACCESS_KEY"),
        ) {
            (Some(access_key_id), Some(secret_access_key)) => Some(Credentials {
                access_key_id: access_key_id.to_string(),
                secret_access_key: secret_access_key.to_string(),
                session_token: snapshot
                    .non_empty("AWS_SESSION_TOKEN")
                    .map(ToString::to_string),
            }),
            _ => None,
        };
        let shared_file = snapshot
            .non_empty("AWS_SHARED_CREDENTIALS_FILE")
            .map(PathBuf::from)
            .or_else(|| dirs_next::home_dir().map(|home| home.join(".aws").join("credentials")));
        let config_file = snapshot
            .non_empty("AWS_CONFIG_FILE")
            .map(PathBuf::from)
            .or_else(|| dirs_next::home_dir().map(|home| home.join(".aws").join("config")));
        let profile = snapshot
            .non_empty("AWS_PROFILE")
            .unwrap_or(DEFAULT_PROFILE)
            .to_string();
        Self {
            env,
            web_identity: WebIdentity::from_snapshot(snapshot),
            shared_file,
            config_file,
            profile,
            container: ContainerEndpoint::from_snapshot(snapshot),
            instance_metadata: InstanceMetadata::from_snapshot(snapshot),
        }
    }

    /// Walks the provider chain: environment keys, web identity, the
    /// selected profile of the credentials and config files, container
    /// credentials, then instance metadata.
    pub(crate) fn resolve(&self) -> Result<Credentials> {
        if let Some(credentials) = &self.env {
            tracing::debug!("using AWS credentials from the environment");
            return Ok(credentials.clone());
        }
        if let Some(provider) = &self.web_identity {
            tracing::debug!("using AWS credentials from web identity");
            return provider.fetch();
        }
        if let Some(credentials) = self.profile_file_credentials()? {
            return Ok(credentials);
        }
        if let Some(provider) = &self.container {
            tracing::debug!("using AWS credentials from the container endpoint");
            return provider.fetch();
        }
        if let Some(provider) = &self.instance_metadata {
            if let Some(credentials) = provider.fetch()? {
                tracing::debug!("using AWS credentials from instance metadata");
                return Ok(credentials);
            }
        }
        Err(LayerError::MissingCredentials {
            profile: self.profile.clone(),
        }
        .into())
    }

    fn profile_file_credentials(&self) -> Result<Option<Credentials>> {
        let config_section = if self.profile == DEFAULT_PROFILE {
            DEFAULT_PROFILE.to_string()
        } else {
            format!("profile {}", self.profile)
        };
        let files = [
            (self.shared_file.as_ref(), self.profile.clone()),
            (self.config_file.as_ref(), config_section),
        ];
        for (path, section) in files {
            let Some(path) = path.filter(|path| path.is_file()) else {
                continue;
            };
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            if let Some(credentials) = parse_shared_credentials(&contents, &section) {
                tracing::debug!(
                    profile = %self.profile,
                    file = %path.display(),
                    "using AWS credentials from profile"
                );
                return Ok(Some(credentials));
            }
        }
        Ok(None)
    }
}

/// Reads the static keys of one INI section, as found in `~/.aws/credentials`
/// (`[name]`) or `~/.aws/config` (`[profile name]`).
pub(crate) fn parse_shared_credentials(contents: &str, section: &str) -> Option<Credentials> {
    let mut in_profile = false;
    let mut access_key_id = None;
    let mut secret_access_key = None;
    let mut session_token = None;
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(header) = line.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            in_profile = header.split_whitespace().eq(section.split_whitespace());
            continue;
        }
        if !in_profile {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim().to_ascii_lowercase().as_str() {
            "aws_access_key_id" => access_key_id = Some(value),
            "aws_secret_access_key" => secret_access_key = Some(value),
            "aws_session_token" => session_token = Some(value),
            _ => {}
        }
    }
    Some(Credentials {
        access_key_id: access_key_id.filter(|value| !value.is_empty())?,
        secret_access_key: secret_access_key.filter(|value| !value.is_empty())?,
        session_token: session_token.filter(|value| !value.is_empty()),
    })
}
