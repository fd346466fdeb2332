use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use url::Url;

use crate::config::PublishConfig;
use crate::effects::LayerPublisher;
use crate::errors::LayerError;
use crate::PYLAYER_VERSION;

use super::credentials::Credentials;
use super::sigv4::{sign_request, uri_encode, SignableRequest, SigningScope};

const LAMBDA_SERVICE: &str = "lambda";
const LAMBDA_API_VERSION: &str = "2018-10-31";

/// Everything one `PublishLayerVersion` call carries.
pub struct PublishLayerVersion<'a> {
    pub layer_name: &'a str,
    pub description: &'a str,
    pub compatible_runtimes: &'a [String],
    pub region: &'a str,
    /// Raw archive bytes; base64-encoded on the wire.
    pub zip_file: &'a [u8],
}

/// The provider's answer, kept verbatim.
#[derive(Clone, Debug, Serialize)]
pub struct PublishedLayer {
    pub status: u16,
    pub response: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PublishLayerVersionBody<'a> {
    content: LayerContent,
    description: &'a str,
    compatible_runtimes: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct LayerContent {
    zip_file: String,
}

/// Publishes through the Lambda REST API with SigV4-signed requests.
pub struct LambdaPublisher;

impl LayerPublisher for LambdaPublisher {
    fn publish_layer_version(
        &self,
        config: &PublishConfig,
        request: &PublishLayerVersion<'_>,
    ) -> Result<PublishedLayer> {
        let credentials = config.credentials().resolve()?;
        let endpoint = lambda_endpoint(config.endpoint.as_deref(), request.region)?;
        let client = build_http_client(config.timeout, config.endpoint.is_none())?;
        publish_with(
            &client,
            &endpoint,
            &credentials,
            request,
            OffsetDateTime::now_utc(),
        )
    }
}

/// Environment proxies are honored only for the public regional endpoint.
pub(crate) fn build_http_client(timeout: Duration, use_proxies: bool) -> Result<Client> {
    let builder = Client::builder()
        .user_agent(format!("pylayer/{PYLAYER_VERSION}"))
        .timeout(timeout);
    let builder = if use_proxies {
        builder
    } else {
        builder.no_proxy()
    };
    builder.build().context("failed to build HTTP client")
}

fn lambda_endpoint(override_url: Option<&str>, region: &str) -> Result<Url> {
    let raw = match override_url {
        Some(url) => url.to_string(),
        None => format!("https://lambda.{region}.amazonaws.com"),
    };
    Url::parse(&raw).with_context(|| format!("invalid Lambda endpoint `{raw}`"))
}

fn publish_with(
    client: &Client,
    endpoint: &Url,
    credentials: &Credentials,
    request: &PublishLayerVersion<'_>,
    now: OffsetDateTime,
) -> Result<PublishedLayer> {
    let mut url = endpoint.clone();
    url.set_path(&format!(
        "/{LAMBDA_API_VERSION}/layers/{}/versions",
        uri_encode(request.layer_name)
    ));
    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => return Err(anyhow!("Lambda endpoint `{endpoint}` has no host")),
    };

    let body = PublishLayerVersionBody {
        content: LayerContent {
            zip_file: STANDARD.encode(request.zip_file),
        },
        description: request.description,
        compatible_runtimes: request.compatible_runtimes,
    };
    let payload = serde_json::to_vec(&body).context("failed to encode request body")?;

    let signed = sign_request(
        &SignableRequest {
            method: "POST",
            host: &host,
            path: url.path(),
            query: "",
            headers: &[("content-type", "application/json")],
            payload: &payload,
        },
        credentials,
        SigningScope {
            region: request.region,
            service: LAMBDA_SERVICE,
        },
        now,
    )?;

    tracing::debug!(
        url = %url,
        layer = request.layer_name,
        bytes = request.zip_file.len(),
        "publishing layer version"
    );
    let mut builder = client
        .post(url.as_str())
        .header(CONTENT_TYPE, "application/json")
        .header("X-Amz-Date", signed.amz_date.as_str())
        .header(AUTHORIZATION, signed.authorization.as_str());
    if let Some(token) = signed.security_token.as_deref() {
        builder = builder.header("X-Amz-Security-Token", token);
    }
    let response = builder
        .body(payload)
        .send()
        .with_context(|| format!("failed to reach Lambda at {url}"))?;

    let status = response.status();
    let error_type = response
        .headers()
        .get("x-amzn-ErrorType")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(':').next().unwrap_or(value).to_string());
    let text = response
        .text()
        .context("failed to read Lambda response body")?;
    let parsed: Value =
        serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text.clone()));

    if !status.is_success() {
        let error_type = error_type
            .or_else(|| {
                parsed
                    .get("__type")
                    .and_then(Value::as_str)
                    .map(ToString::to_string)
            })
            .unwrap_or_else(|| "UnknownError".to_string());
        let message = parsed
            .get("message")
            .or_else(|| parsed.get("Message"))
            .and_then(Value::as_str)
            .map_or(text, ToString::to_string);
        return Err(LayerError::PublishRejected {
            layer: request.layer_name.to_string(),
            status: status.as_u16(),
            error_type,
            message,
        }
        .into());
    }

    Ok(PublishedLayer {
        status: status.as_u16(),
        response: parsed,
    })
}
