//! Reconciliation logic for Install resources.
//!
//! One pass fetches the Install object and then either removes what was
//! installed for it, does nothing because it is already current, or applies
//! the templates parametrized for it and records the result in its status.
//! A pass never retries; the watcher's error policy requeues failures.

use crate::error::ControllerError;
use crate::status;
use crate::store::{InstallKey, InstallStore};
use crds::Install;
use kube::Resource;
use manifest::transform::{InjectEnv, InjectHostname, InjectNamespace, InjectOwner};
use manifest::{DeletePropagation, Manifest, Pipeline, ResourceEngine};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Environment variable carrying the configured hostname into deployments
pub const HOST_NAME_ENV: &str = "HOST_NAME";

/// What a reconciliation pass did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The Install is gone; its resources were deleted
    Removed,
    /// Status already records the target version
    UpToDate,
    /// Templates were applied and status written
    Installed { resources: usize },
}

/// Reconciles Install objects against the loaded templates
pub struct Reconciler {
    store: Arc<dyn InstallStore>,
    engine: Arc<dyn ResourceEngine>,
    manifest: Manifest,
    ingress: Option<Manifest>,
    target_version: String,
}

impl Reconciler {
    /// Creates a new reconciler.
    ///
    /// `ingress` is only needed for Installs that set a hostname.
    pub fn new(
        store: Arc<dyn InstallStore>,
        engine: Arc<dyn ResourceEngine>,
        manifest: Manifest,
        ingress: Option<Manifest>,
        target_version: impl Into<String>,
    ) -> Self {
        Self {
            store,
            engine,
            manifest,
            ingress,
            target_version: target_version.into(),
        }
    }

    /// Runs one reconciliation pass for `key`
    pub async fn reconcile(&self, key: &InstallKey) -> Result<ReconcileOutcome, ControllerError> {
        debug!(namespace = %key.namespace, name = %key.name, "Reconciling Install");

        let Some(install) = self.store.get(key).await? else {
            self.remove(key).await;
            return Ok(ReconcileOutcome::Removed);
        };

        if status::is_up_to_date(&install, &self.target_version) {
            info!(
                namespace = %key.namespace,
                name = %key.name,
                version = %self.target_version,
                "Install is up to date, skipping"
            );
            return Ok(ReconcileOutcome::UpToDate);
        }

        let pipeline = self.pipeline_for(key, &install)?;

        if let Some(hostname) = install.hostname() {
            let ingress = self
                .ingress
                .as_ref()
                .ok_or_else(|| ControllerError::MissingIngressTemplates(key.to_string()))?;
            ingress
                .transform(&pipeline)?
                .apply_all(self.engine.as_ref())
                .await?;
            info!(
                namespace = %key.namespace,
                name = %key.name,
                hostname,
                "Applied ingress resources"
            );
        }

        let applied = self.manifest.transform(&pipeline)?;
        applied.apply_all(self.engine.as_ref()).await?;

        let new_status = status::installed(&self.target_version, &applied);
        self.store.update_status(key, &new_status).await?;

        info!(
            namespace = %key.namespace,
            name = %key.name,
            version = %self.target_version,
            resources = applied.len(),
            "Installed pipeline resources"
        );
        Ok(ReconcileOutcome::Installed {
            resources: applied.len(),
        })
    }

    /// Transformers parametrizing the templates for one Install
    fn pipeline_for(&self, key: &InstallKey, install: &Install) -> Result<Pipeline, ControllerError> {
        let owner = install
            .controller_owner_ref(&())
            .ok_or_else(|| ControllerError::InvalidInstall(format!("{key} has no uid")))?;

        let mut pipeline = Pipeline::new()
            .with(InjectOwner::new(owner))
            .with(InjectNamespace::new(&key.namespace));
        if let Some(hostname) = install.hostname() {
            pipeline.push(InjectHostname::new(hostname));
            pipeline.push(InjectEnv::new(HOST_NAME_ENV, hostname));
        }
        Ok(pipeline)
    }

    /// Deletes the primary resources scoped to the namespace of a vanished Install.
    ///
    /// Failures are logged only; owner references let the garbage collector
    /// finish whatever is left.
    async fn remove(&self, key: &InstallKey) {
        info!(
            namespace = %key.namespace,
            name = %key.name,
            "Install not found, deleting its resources"
        );

        let scoped = match self
            .manifest
            .transform(&Pipeline::new().with(InjectNamespace::new(&key.namespace)))
        {
            Ok(scoped) => scoped,
            Err(e) => {
                warn!(namespace = %key.namespace, name = %key.name, "Failed to scope resources for deletion: {}", e);
                return;
            }
        };

        if let Err(e) = scoped
            .delete_all(self.engine.as_ref(), DeletePropagation::Foreground)
            .await
        {
            warn!(namespace = %key.namespace, name = %key.name, "Failed to delete resources: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "reconciler_test.rs"]
mod tests;
