//! Install object store.
//!
//! [`InstallStore`] abstracts the Kubernetes API calls the reconciler makes on
//! Install objects so reconciliation can be unit tested against an in-memory
//! store.

use crds::{Install, InstallStatus};
use kube::api::{Api, ListParams, Patch, PatchParams, PostParams};
use kube::Client;
use std::fmt;
use thiserror::Error;

/// Namespaced identity of an Install object
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstallKey {
    /// Namespace the Install lives in
    pub namespace: String,
    /// Install object name
    pub name: String,
}

impl InstallKey {
    /// Key for `namespace`/`name`
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of an existing object; `None` if it has no name
    pub fn from_install(install: &Install, default_namespace: &str) -> Option<Self> {
        let name = install.metadata.name.clone()?;
        let namespace = install
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| default_namespace.to_string());
        Some(Self { namespace, name })
    }
}

impl fmt::Display for InstallKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Install store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Kubernetes API error
    #[error(transparent)]
    Kube(#[from] kube::Error),

    /// Create raced with another writer
    #[error("Install {0} already exists")]
    AlreadyExists(String),

    /// Request refused before or by the backend
    #[error("Install store rejected request: {0}")]
    Rejected(String),
}

/// Operations on Install objects
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait InstallStore: Send + Sync {
    /// Fetches one Install; `Ok(None)` when it does not exist
    async fn get(&self, key: &InstallKey) -> Result<Option<Install>, StoreError>;

    /// Lists Installs in `namespace`
    async fn list(&self, namespace: &str) -> Result<Vec<Install>, StoreError>;

    /// Creates an Install in its own namespace
    async fn create(&self, install: &Install) -> Result<Install, StoreError>;

    /// Replaces the status subresource
    async fn update_status(&self, key: &InstallKey, status: &InstallStatus) -> Result<(), StoreError>;
}

/// Install store backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeInstallStore {
    client: Client,
}

impl fmt::Debug for KubeInstallStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeInstallStore").finish_non_exhaustive()
    }
}

impl KubeInstallStore {
    /// Store talking to the cluster through `client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Install> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait::async_trait]
impl InstallStore for KubeInstallStore {
    async fn get(&self, key: &InstallKey) -> Result<Option<Install>, StoreError> {
        Ok(self.api(&key.namespace).get_opt(&key.name).await?)
    }

    async fn list(&self, namespace: &str) -> Result<Vec<Install>, StoreError> {
        let list = self.api(namespace).list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn create(&self, install: &Install) -> Result<Install, StoreError> {
        let key = InstallKey::from_install(install, "default")
            .ok_or_else(|| StoreError::Rejected("Install has no name".to_string()))?;
        match self.api(&key.namespace).create(&PostParams::default(), install).await {
            Ok(created) => Ok(created),
            Err(kube::Error::Api(api_err)) if api_err.code == 409 => {
                Err(StoreError::AlreadyExists(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_status(&self, key: &InstallKey, status: &InstallStatus) -> Result<(), StoreError> {
        let status_patch = serde_json::json!({
            "status": status
        });
        self.api(&key.namespace)
            .patch_status(&key.name, &PatchParams::default(), &Patch::Merge(&status_patch))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
pub use mock::MockInstallStore;
