use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use time::OffsetDateTime;
use url::Url;

use crate::config::EnvSnapshot;

use super::credentials::Credentials;
use super::lambda::build_http_client;

const STS_API_VERSION: &str = "2011-06-15";
const STS_TIMEOUT: Duration = Duration::from_secs(30);
const METADATA_TIMEOUT: Duration = Duration::from_secs(2);
const CONTAINER_HOST: &str = "http://169.254.170.2";
const CONTAINER_LOOPBACK_HOSTS: &[&str] = &["169.254.170.2", "169.254.170.23"];
const IMDS_DEFAULT_ENDPOINT: &str = "http://169.254.169.254";
const IMDS_TOKEN_TTL_SECONDS: &str = "21600";
const IMDS_TOKEN_TTL_HEADER: &str = "x-aws-ec2-metadata-token-ttl-seconds";
const IMDS_TOKEN_HEADER: &str = "x-aws-ec2-metadata-token";
const IMDS_CREDENTIALS_PATH: &str = "/latest/meta-data/iam/security-credentials/";

/// `{AccessKeyId, SecretAccessKey, Token}` as served by the container and
/// instance metadata endpoints.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MetadataCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: Option<String>,
}

impl From<MetadataCredentials> for Credentials {
    fn from(value: MetadataCredentials) -> Self {
        Self {
            access_key_id: value.access_key_id,
            secret_access_key: value.secret_access_key,
            session_token: value.token.filter(|token| !token.is_empty()),
        }
    }
}

/// OIDC token exchange through STS `AssumeRoleWithWebIdentity`.
#[derive(Debug, Clone)]
pub(crate) struct WebIdentity {
    token_file: PathBuf,
    role_arn: String,
    session_name: String,
    endpoint: String,
    use_proxies: bool,
}

impl WebIdentity {
    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Option<Self> {
        let token_file = PathBuf::from(snapshot.non_empty("AWS_WEB_IDENTITY_TOKEN_FILE")?);
        let role_arn = snapshot.non_empty("AWS_ROLE_ARN")?.to_string();
        let session_name = snapshot.non_empty("AWS_ROLE_SESSION_NAME").map_or_else(
            || format!("pylayer-{}", OffsetDateTime::now_utc().unix_timestamp()),
            ToString::to_string,
        );
        let override_url = snapshot.non_empty("AWS_ENDPOINT_URL_STS");
        let endpoint = match override_url {
            Some(url) => url.to_string(),
            None => match snapshot
                .non_empty("AWS_REGION")
                .or_else(|| snapshot.non_empty("AWS_DEFAULT_REGION"))
            {
                Some(region) => format!("https://sts.{region}.amazonaws.com/"),
                None => "https://sts.amazonaws.com/".to_string(),
            },
        };
        Some(Self {
            token_file,
            role_arn,
            session_name,
            endpoint,
            use_proxies: override_url.is_none(),
        })
    }

    pub(crate) fn fetch(&self) -> Result<Credentials> {
        let token = fs::read_to_string(&self.token_file).with_context(|| {
            format!(
                "failed to read web identity token {}",
                self.token_file.display()
            )
        })?;
        let endpoint = Url::parse(&self.endpoint)
            .with_context(|| format!("invalid STS endpoint `{}`", self.endpoint))?;
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("Action", "AssumeRoleWithWebIdentity")
            .append_pair("Version", STS_API_VERSION)
            .append_pair("RoleArn", &self.role_arn)
            .append_pair("RoleSessionName", &self.session_name)
            .append_pair("WebIdentityToken", token.trim())
            .finish();

        tracing::debug!(role = %self.role_arn, endpoint = %endpoint, "assuming role with web identity");
        let client = build_http_client(STS_TIMEOUT, self.use_proxies)?;
        let response = client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .context("AssumeRoleWithWebIdentity request failed")?;
        let status = response.status();
        let text = response
            .text()
            .context("failed to read AssumeRoleWithWebIdentity response")?;
        if !status.is_success() {
            return Err(anyhow!(
                "AssumeRoleWithWebIdentity for {} failed ({}): {}",
                self.role_arn,
                status.as_u16(),
                text.trim()
            ));
        }
        parse_assume_role_response(&text)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleEnvelope {
    assume_role_with_web_identity_response: AssumeRoleResponse,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleResponse {
    assume_role_with_web_identity_result: AssumeRoleResult,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleResult {
    credentials: StsCredentials,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
}

/// STS answers in JSON when asked to, and in its XML query format otherwise.
fn parse_assume_role_response(body: &str) -> Result<Credentials> {
    if let Ok(envelope) = serde_json::from_str::<AssumeRoleEnvelope>(body) {
        let credentials = envelope
            .assume_role_with_web_identity_response
            .assume_role_with_web_identity_result
            .credentials;
        return Ok(Credentials {
            access_key_id: credentials.access_key_id,
            secret_access_key: credentials.secret_access_key,
            session_token: Some(credentials.session_token),
        });
    }
    let element = |tag: &str| {
        xml_element(body, tag)
            .map(ToString::to_string)
            .ok_or_else(|| anyhow!("AssumeRoleWithWebIdentity response is missing <{tag}>"))
    };
    Ok(Credentials {
        access_key_id: element("AccessKeyId")?,
        secret_access_key: element("SecretAccessKey")?,
        session_token: Some(element("SessionToken")?),
    })
}

fn xml_element<'a>(body: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = body.find(&open)? + open.len();
    let end = start + body[start..].find(&close)?;
    Some(body[start..end].trim()).filter(|value| !value.is_empty())
}

/// ECS/EKS-style task credentials served over HTTP.
#[derive(Clone)]
pub(crate) struct ContainerEndpoint {
    url: String,
    token_file: Option<PathBuf>,
    token: Option<String>,
}

impl fmt::Debug for ContainerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerEndpoint")
            .field("url", &self.url)
            .field("token_file", &self.token_file)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ContainerEndpoint {
    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Option<Self> {
        let url = match snapshot.non_empty("AWS_CONTAINER_CREDENTIALS_RELATIVE_URI") {
            Some(relative) => format!("{CONTAINER_HOST}{relative}"),
            None => snapshot
                .non_empty("AWS_CONTAINER_CREDENTIALS_FULL_URI")?
                .to_string(),
        };
        Some(Self {
            url,
            token_file: snapshot
                .non_empty("AWS_CONTAINER_AUTHORIZATION_TOKEN_FILE")
                .map(PathBuf::from),
            token: snapshot
                .non_empty("AWS_CONTAINER_AUTHORIZATION_TOKEN")
                .map(ToString::to_string),
        })
    }

    pub(crate) fn fetch(&self) -> Result<Credentials> {
        let url = container_url(&self.url)?;
        let authorization = match &self.token_file {
            Some(path) => Some(
                fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?
                    .trim()
                    .to_string(),
            ),
            None => self.token.clone(),
        };

        tracing::debug!(endpoint = %url, "fetching container credentials");
        let client = build_http_client(METADATA_TIMEOUT, false)?;
        let mut request = client.get(url.clone());
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        let response = request
            .send()
            .with_context(|| format!("container credentials request to {url} failed"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!(
                "container credentials endpoint {url} returned {}",
                status.as_u16()
            ));
        }
        let credentials: MetadataCredentials = response
            .json()
            .context("invalid container credentials response")?;
        Ok(credentials.into())
    }
}

/// Plain-HTTP full URIs must stay on the local host or the task metadata addresses.
fn container_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("invalid container credentials URI `{raw}`"))?;
    if url.scheme() == "https" {
        return Ok(url);
    }
    let allowed = match url.host() {
        Some(url::Host::Ipv4(addr)) => {
            addr.is_loopback() || CONTAINER_LOOPBACK_HOSTS.contains(&addr.to_string().as_str())
        }
        Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
        Some(url::Host::Domain(domain)) => domain == "localhost",
        None => false,
    };
    if url.scheme() != "http" || !allowed {
        return Err(anyhow!(
            "container credentials URI `{raw}` must use https or a loopback host"
        ));
    }
    Ok(url)
}

/// EC2 instance metadata, IMDSv2 session tokens only.
#[derive(Debug, Clone)]
pub(crate) struct InstanceMetadata {
    endpoint: String,
}

impl InstanceMetadata {
    /// `None` when `AWS_EC2_METADATA_DISABLED=true`.
    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Option<Self> {
        if snapshot
            .non_empty("AWS_EC2_METADATA_DISABLED")
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
        {
            return None;
        }
        let endpoint = snapshot
            .non_empty("AWS_EC2_METADATA_SERVICE_ENDPOINT")
            .unwrap_or(IMDS_DEFAULT_ENDPOINT)
            .trim_end_matches('/')
            .to_string();
        Some(Self { endpoint })
    }

    /// Returns `Ok(None)` when no metadata service answers or no role is attached.
    pub(crate) fn fetch(&self) -> Result<Option<Credentials>> {
        let client = build_http_client(METADATA_TIMEOUT, false)?;
        let token_url = format!("{}/latest/api/token", self.endpoint);
        let token = match client
            .put(&token_url)
            .header(IMDS_TOKEN_TTL_HEADER, IMDS_TOKEN_TTL_SECONDS)
            .send()
        {
            Ok(response) if response.status().is_success() => response
                .text()
                .context("failed to read instance metadata token")?,
            Ok(response) => {
                tracing::debug!(
                    status = response.status().as_u16(),
                    "instance metadata refused a session token"
                );
                return Ok(None);
            }
            Err(err) => {
                tracing::debug!("instance metadata unavailable: {err}");
                return Ok(None);
            }
        };
        let token = token.trim();

        let roles_url = format!("{}{IMDS_CREDENTIALS_PATH}", self.endpoint);
        let response = client
            .get(&roles_url)
            .header(IMDS_TOKEN_HEADER, token)
            .send()
            .context("instance metadata role lookup failed")?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!("no IAM role attached to this instance");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(anyhow!(
                "instance metadata role lookup returned {}",
                response.status().as_u16()
            ));
        }
        let roles = response
            .text()
            .context("failed to read instance metadata roles")?;
        let Some(role) = roles.lines().map(str::trim).find(|line| !line.is_empty()) else {
            return Ok(None);
        };

        tracing::debug!(role, "fetching instance profile credentials");
        let response = client
            .get(format!("{roles_url}{role}"))
            .header(IMDS_TOKEN_HEADER, token)
            .send()
            .context("instance metadata credentials request failed")?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "instance metadata credentials for {role} returned {}",
                response.status().as_u16()
            ));
        }
        let credentials: MetadataCredentials = response
            .json()
            .context("invalid instance metadata credentials")?;
        Ok(Some(credentials.into()))
    }
}
