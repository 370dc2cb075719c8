//! Manifest errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, transforming, or applying a manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Template source does not exist
    #[error("Template source not found: {0}")]
    SourceNotFound(PathBuf),

    /// Reading a template file failed
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A template file is not valid YAML/JSON
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A document parsed but is not a usable Kubernetes object
    #[error("Invalid resource in {path} (document {index}): {reason}")]
    InvalidResource {
        path: PathBuf,
        index: usize,
        reason: String,
    },

    /// A transformer rejected a resource
    #[error("Transformer {transformer} failed: {source}")]
    Transform {
        transformer: &'static str,
        #[source]
        source: TransformError,
    },

    /// The apply/delete engine failed
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// A resource did not have the shape a transformer expects
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    /// A required field is absent
    #[error("{resource}: missing field `{path}`")]
    MissingField { resource: String, path: String },

    /// A field exists with the wrong type
    #[error("{resource}: field `{path}` is not {expected}")]
    UnexpectedShape {
        resource: String,
        path: String,
        expected: &'static str,
    },
}

/// Errors from the resource apply/delete engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Resource lacks `apiVersion`/`kind` or `metadata.name`
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    /// The cluster does not serve this group/version/kind
    #[error("Unknown resource type: {0}")]
    UnknownKind(String),

    /// API discovery failed
    #[error("API discovery failed: {0}")]
    Discovery(#[source] kube::Error),

    /// Resource does not exist in the cluster
    #[error("Not found: {0}")]
    NotFound(String),

    /// Kubernetes API rejected the request
    #[error("Kubernetes API error for {resource}: {source}")]
    Api {
        resource: String,
        #[source]
        source: kube::Error,
    },
}

impl EngineError {
    /// Whether the error means the resource is already gone
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound(_))
    }
}
