//! Owner reference injection

use super::{KindSelector, Transformer};
use crate::error::TransformError;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::DynamicObject;

/// Makes the install object the controlling owner of every namespaced resource.
///
/// Deleting the owner then lets the garbage collector remove everything it
/// installed. Any previous owner list is replaced, which keeps the rewrite
/// idempotent.
#[derive(Debug, Clone)]
pub struct InjectOwner {
    owner: OwnerReference,
}

impl InjectOwner {
    /// Creates the transformer, forcing `controller` and `blockOwnerDeletion` on.
    pub fn new(mut owner: OwnerReference) -> Self {
        owner.controller = Some(true);
        owner.block_owner_deletion = Some(true);
        Self { owner }
    }
}

impl Transformer for InjectOwner {
    fn name(&self) -> &'static str {
        "inject-owner"
    }

    fn selector(&self) -> KindSelector {
        KindSelector::Namespaced
    }

    fn transform(&self, resource: &mut DynamicObject) -> Result<(), TransformError> {
        resource.metadata.owner_references = Some(vec![self.owner.clone()]);
        Ok(())
    }
}
