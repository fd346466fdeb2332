use std::path::PathBuf;

use serde::Serialize;

use crate::errors::LayerError;

/// Directory the Python runtime adds to `sys.path` when a layer is attached.
pub const PACKAGE_DIR_NAME: &str = "python";
pub const DEFAULT_RUNTIME: &str = "python3.10";
pub const DEFAULT_REGION: &str = "us-east-1";

const GENERIC_SUBJECT: &str = "multiple libraries";

#[derive(Clone, Debug)]
pub struct LayerRequest {
    pub libraries: Vec<String>,
    pub requirements_file: Option<PathBuf>,
    pub layer_name: String,
    pub runtime: String,
    pub region: String,
    pub upload: bool,
    /// Where the archive is kept when `upload` is false; defaults to the working directory.
    pub out_dir: Option<PathBuf>,
}

impl LayerRequest {
    #[must_use]
    pub fn new(layer_name: impl Into<String>) -> Self {
        Self {
            libraries: Vec::new(),
            requirements_file: None,
            layer_name: layer_name.into(),
            runtime: DEFAULT_RUNTIME.to_string(),
            region: DEFAULT_REGION.to_string(),
            upload: true,
            out_dir: None,
        }
    }

    pub(crate) fn archive_file_name(&self) -> String {
        format!("{}.zip", self.layer_name)
    }
}

/// Name, description, runtimes, and region handed to the publish call verbatim.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct LayerDescriptor {
    pub name: String,
    pub description: String,
    pub compatible_runtimes: Vec<String>,
    pub region: String,
}

impl LayerDescriptor {
    #[must_use]
    pub fn from_request(request: &LayerRequest) -> Self {
        Self {
            name: request.layer_name.clone(),
            description: layer_description(&request.libraries),
            compatible_runtimes: vec![request.runtime.clone()],
            region: request.region.clone(),
        }
    }
}

#[must_use]
pub fn layer_description(libraries: &[String]) -> String {
    if libraries.is_empty() {
        format!("Lambda layer for {GENERIC_SUBJECT}")
    } else {
        format!("Lambda layer for {}", libraries.join(", "))
    }
}

/// The layer name doubles as a file name, so it must stay a single path component.
pub(crate) fn validate_layer_name(name: &str) -> Result<(), LayerError> {
    let reason = if name.trim().is_empty() {
        Some("must not be empty")
    } else if name.contains(['/', '\\']) {
        Some("must not contain path separators")
    } else if name == "." || name == ".." {
        Some("must not be a relative path component")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(LayerError::InvalidLayerName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_lists_libraries_in_order() {
        let libraries = vec!["requests".to_string(), "boto3".to_string(), "attrs".to_string()];
        assert_eq!(
            layer_description(&libraries),
            "Lambda layer for requests, boto3, attrs"
        );
    }

    #[test]
    fn description_falls_back_when_no_libraries_named() {
        assert_eq!(layer_description(&[]), "Lambda layer for multiple libraries");
    }

    #[test]
    fn request_defaults_match_cli_defaults() {
        let request = LayerRequest::new("test-layer");
        assert_eq!(request.runtime, "python3.10");
        assert_eq!(request.region, "us-east-1");
        assert!(request.upload);
        assert_eq!(request.archive_file_name(), "test-layer.zip");
    }

    #[test]
    fn descriptor_passes_runtime_through_unvalidated() {
        let mut request = LayerRequest::new("edge");
        request.runtime = "python9.99-custom".to_string();
        request.region = "eu-west-3".to_string();
        request.libraries = vec!["numpy".to_string()];
        let descriptor = LayerDescriptor::from_request(&request);
        assert_eq!(descriptor.name, "edge");
        assert_eq!(descriptor.compatible_runtimes, vec!["python9.99-custom"]);
        assert_eq!(descriptor.region, "eu-west-3");
        assert_eq!(descriptor.description, "Lambda layer for numpy");
    }

    #[test]
    fn layer_names_must_be_single_path_components() {
        assert!(validate_layer_name("test-layer").is_ok());
        assert!(validate_layer_name("").is_err());
        assert!(validate_layer_name("  ").is_err());
        assert!(validate_layer_name("../escape").is_err());
        assert!(validate_layer_name("a\\b").is_err());
        assert!(validate_layer_name("..").is_err());
    }
}
