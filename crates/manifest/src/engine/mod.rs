//! Resource apply/delete engine
//!
//! [`ResourceEngine`] is the seam between the manifest and the cluster. The
//! kube-backed [`KubeEngine`] is used in production; tests use the in-memory
//! mock from the `test-util` feature.

mod kube_engine;

pub use kube_engine::KubeEngine;

use crate::error::EngineError;
use kube::api::{DynamicObject, PropagationPolicy};

/// How dependents are handled when a resource is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletePropagation {
    /// Dependents are deleted before the owner deletion completes
    Foreground,
    /// The owner is deleted immediately; the garbage collector removes dependents
    #[default]
    Background,
    /// Dependents are left behind
    Orphan,
}

impl From<DeletePropagation> for PropagationPolicy {
    fn from(value: DeletePropagation) -> Self {
        match value {
            DeletePropagation::Foreground => PropagationPolicy::Foreground,
            DeletePropagation::Background => PropagationPolicy::Background,
            DeletePropagation::Orphan => PropagationPolicy::Orphan,
        }
    }
}

/// Applies and deletes individual resource objects
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ResourceEngine: Send + Sync {
    /// Creates or updates `resource` in the cluster
    async fn apply(&self, resource: &DynamicObject) -> Result<(), EngineError>;

    /// Deletes `resource`; returns [`EngineError::NotFound`] when it does not exist
    async fn delete(
        &self,
        resource: &DynamicObject,
        propagation: DeletePropagation,
    ) -> Result<(), EngineError>;
}
