use std::collections::HashMap;
use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::aws::CredentialSource;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: u8,
    pub trace: bool,
    pub json: bool,
}

#[derive(Debug, Clone)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    #[must_use]
    pub fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Returns the trimmed value of `key`, treating blank values as unset.
    pub(crate) fn non_empty(&self, key: &str) -> Option<&str> {
        self.var(key).map(str::trim).filter(|value| !value.is_empty())
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

#[derive(Debug)]
pub struct Config {
    pub(crate) pip: PipConfig,
    pub(crate) publish: PublishConfig,
}

impl Config {
    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Self {
        Self {
            pip: PipConfig {
                command: snapshot.non_empty("PYLAYER_PIP").map(|raw| {
                    raw.split_whitespace()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                }),
            },
            publish: PublishConfig {
                endpoint: snapshot
                    .non_empty("PYLAYER_LAMBDA_ENDPOINT")
                    .map(ToString::to_string),
                timeout: DEFAULT_HTTP_TIMEOUT,
                credentials: CredentialSource::from_snapshot(snapshot),
            },
        }
    }

    #[must_use]
    pub fn pip(&self) -> &PipConfig {
        &self.pip
    }

    #[must_use]
    pub fn publish(&self) -> &PublishConfig {
        &self.publish
    }
}

/// How the package manager is launched.
#[derive(Debug, Clone, Default)]
pub struct PipConfig {
    /// Program followed by leading arguments, e.g. `python3 -m pip`.
    pub command: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub endpoint: Option<String>,
    pub timeout: Duration,
    pub(crate) credentials: CredentialSource,
}

impl PublishConfig {
    pub(crate) fn credentials(&self) -> &CredentialSource {
        &self.credentials
    }
}
