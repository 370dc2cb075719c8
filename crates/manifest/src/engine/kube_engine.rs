//! Kubernetes-backed resource engine
//!
//! Resolves each object's group/version/kind through API discovery and
//! applies it with Server-Side Apply, similar to `kubectl apply --server-side`.

use super::{DeletePropagation, ResourceEngine};
use crate::error::EngineError;
use crate::resource;
use kube::{
    api::{Api, DeleteParams, DynamicObject, Patch, PatchParams},
    core::GroupVersionKind,
    discovery::{ApiCapabilities, ApiResource, Discovery, Scope},
    Client,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Field manager name for Server-Side Apply
const FIELD_MANAGER: &str = "pipeline-operator";

/// Applies and deletes resources through the Kubernetes API
pub struct KubeEngine {
    client: Client,
    discovery: RwLock<Discovery>,
}

impl std::fmt::Debug for KubeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeEngine").finish_non_exhaustive()
    }
}

impl KubeEngine {
    /// Creates an engine and runs an initial API discovery
    pub async fn new(client: Client) -> Result<Self, EngineError> {
        let discovery = Discovery::new(client.clone())
            .run()
            .await
            .map_err(EngineError::Discovery)?;
        Ok(Self {
            client,
            discovery: RwLock::new(discovery),
        })
    }

    /// Resolves a GVK, refreshing discovery once if the kind is unknown
    /// (for example a CRD installed after startup).
    async fn resolve(&self, gvk: &GroupVersionKind) -> Result<(ApiResource, ApiCapabilities), EngineError> {
        if let Some(found) = self.discovery.read().await.resolve_gvk(gvk) {
            return Ok(found);
        }

        info!("Refreshing API discovery for unknown kind {}/{}/{}", gvk.group, gvk.version, gvk.kind);
        let refreshed = Discovery::new(self.client.clone())
            .run()
            .await
            .map_err(EngineError::Discovery)?;
        let found = refreshed.resolve_gvk(gvk);
        *self.discovery.write().await = refreshed;

        found.ok_or_else(|| {
            EngineError::UnknownKind(format!("{}/{}/{}", gvk.group, gvk.version, gvk.kind))
        })
    }

    async fn api_for(&self, resource: &DynamicObject) -> Result<(Api<DynamicObject>, String), EngineError> {
        let gvk = resource::gvk(resource).ok_or_else(|| {
            EngineError::InvalidResource(format!(
                "{} has no apiVersion/kind",
                resource::display_name(resource)
            ))
        })?;
        let name = resource
            .metadata
            .name
            .clone()
            .ok_or_else(|| EngineError::InvalidResource("resource missing metadata.name".to_string()))?;

        let (api_resource, capabilities) = self.resolve(&gvk).await?;
        let api = if capabilities.scope == Scope::Namespaced {
            let ns = resource.metadata.namespace.as_deref().unwrap_or("default");
            Api::namespaced_with(self.client.clone(), ns, &api_resource)
        } else {
            Api::all_with(self.client.clone(), &api_resource)
        };
        Ok((api, name))
    }
}

#[async_trait::async_trait]
impl ResourceEngine for KubeEngine {
    async fn apply(&self, resource: &DynamicObject) -> Result<(), EngineError> {
        let (api, name) = self.api_for(resource).await?;

        // Take ownership of fields other managers may have touched
        let params = PatchParams::apply(FIELD_MANAGER).force();
        api.patch(&name, &params, &Patch::Apply(resource))
            .await
            .map_err(|source| EngineError::Api {
                resource: resource::display_name(resource),
                source,
            })?;

        debug!("Applied {}", resource::display_name(resource));
        Ok(())
    }

    async fn delete(
        &self,
        resource: &DynamicObject,
        propagation: DeletePropagation,
    ) -> Result<(), EngineError> {
        let (api, name) = self.api_for(resource).await?;

        let params = DeleteParams {
            propagation_policy: Some(propagation.into()),
            ..Default::default()
        };

        match api.delete(&name, &params).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(resp)) if resp.code == 404 => {
                Err(EngineError::NotFound(resource::display_name(resource)))
            }
            Err(source) => Err(EngineError::Api {
                resource: resource::display_name(resource),
                source,
            }),
        }
    }
}
