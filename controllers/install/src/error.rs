//! Controller-specific error types.
//!
//! This module defines error types specific to the Install Controller
//! that are not covered by upstream library errors.

use crate::store::StoreError;
use kube::Error as KubeError;
use manifest::{EngineError, ManifestError};
use thiserror::Error;

/// Errors that can occur in the Install Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Install object store error
    #[error("Install store error: {0}")]
    Store(#[from] StoreError),

    /// Loading, transforming or applying templates failed
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Resource engine setup failed
    #[error("Resource engine error: {0}")]
    Engine(#[from] EngineError),

    /// A hostname is set but no ingress templates were loaded
    #[error("Install {0} sets a hostname but no ingress templates are loaded")]
    MissingIngressTemplates(String),

    /// The Install object cannot be used as an owner
    #[error("Invalid Install object: {0}")]
    InvalidInstall(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
