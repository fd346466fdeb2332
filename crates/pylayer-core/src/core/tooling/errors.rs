use std::path::PathBuf;

/// Fatal conditions raised by the layer workflow.
///
/// Each variant carries the underlying detail verbatim; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    #[error("invalid layer name `{name}`: {reason}")]
    InvalidLayerName { name: String, reason: &'static str },
    #[error("`{command}` exited with status {code}{}", stderr_tail(stderr))]
    PackageManager {
        command: String,
        code: i32,
        stderr: String,
    },
    #[error("requirements file not found: {}", path.display())]
    MissingRequirements { path: PathBuf },
    #[error(
        "no AWS credentials found: set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY, \
         add a `{profile}` profile to the shared credentials or config file, \
         or run with a web identity, container, or instance role"
    )]
    MissingCredentials { profile: String },
    #[error("PublishLayerVersion for `{layer}` failed with HTTP {status} ({error_type}): {message}")]
    PublishRejected {
        layer: String,
        status: u16,
        error_type: String,
        message: String,
    },
}

fn stderr_tail(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(":\n{trimmed}")
    }
}
