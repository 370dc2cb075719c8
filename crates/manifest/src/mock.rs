//! Mock ResourceEngine for unit testing
//!
//! Records every call in memory instead of talking to a cluster, and can be
//! told to fail specific applies or to report specific resources as missing.

use crate::engine::{DeletePropagation, ResourceEngine};
use crate::error::EngineError;
use crate::resource;
use kube::api::DynamicObject;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// One recorded engine call
#[derive(Debug, Clone)]
pub enum EngineCall {
    /// `apply` of a resource
    Apply(DynamicObject),
    /// `delete` of a resource
    Delete {
        /// Resource passed to `delete`
        resource: DynamicObject,
        /// Requested propagation policy
        propagation: DeletePropagation,
    },
}

/// In-memory ResourceEngine
#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    calls: Arc<Mutex<Vec<EngineCall>>>,
    failing_applies: Arc<Mutex<HashSet<String>>>,
    missing: Arc<Mutex<HashSet<String>>>,
}

impl MockEngine {
    /// Engine with no recorded calls and no failures
    pub fn new() -> Self {
        Self::default()
    }

    /// Make applies of resources named `name` fail
    pub fn fail_apply_of(&self, name: impl Into<String>) {
        self.failing_applies.lock().unwrap().insert(name.into());
    }

    /// Make deletes of resources named `name` report not found
    pub fn mark_missing(&self, name: impl Into<String>) {
        self.missing.lock().unwrap().insert(name.into());
    }

    /// Every call, in order
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Resources passed to `apply`, in order
    pub fn applied(&self) -> Vec<DynamicObject> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|call| match call {
                EngineCall::Apply(resource) => Some(resource.clone()),
                EngineCall::Delete { .. } => None,
            })
            .collect()
    }

    /// Resources passed to `delete`, in order
    pub fn deleted(&self) -> Vec<(DynamicObject, DeletePropagation)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|call| match call {
                EngineCall::Delete { resource, propagation } => Some((resource.clone(), *propagation)),
                EngineCall::Apply(_) => None,
            })
            .collect()
    }

    fn name_of(resource: &DynamicObject) -> String {
        resource.metadata.name.clone().unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl ResourceEngine for MockEngine {
    async fn apply(&self, resource: &DynamicObject) -> Result<(), EngineError> {
        if self.failing_applies.lock().unwrap().contains(&Self::name_of(resource)) {
            return Err(EngineError::InvalidResource(format!(
                "admission rejected {}",
                resource::display_name(resource)
            )));
        }
        self.calls.lock().unwrap().push(EngineCall::Apply(resource.clone()));
        Ok(())
    }

    async fn delete(
        &self,
        resource: &DynamicObject,
        propagation: DeletePropagation,
    ) -> Result<(), EngineError> {
        self.calls.lock().unwrap().push(EngineCall::Delete {
            resource: resource.clone(),
            propagation,
        });
        if self.missing.lock().unwrap().contains(&Self::name_of(resource)) {
            return Err(EngineError::NotFound(resource::display_name(resource)));
        }
        Ok(())
    }
}
