//! Main controller implementation.
//!
//! This module contains the `Controller` struct that loads the templates,
//! wires the reconciler to the cluster and starts the watchers.

use crate::auto_install;
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::store::KubeInstallStore;
use crate::watcher::{Context, Watcher};
use crds::Install;
use k8s_openapi::api::apps::v1::Deployment;
use kube::{Api, Client};
use manifest::{KubeEngine, Manifest, ManifestError};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Main controller for Install management.
pub struct Controller {
    install_watcher: JoinHandle<Result<(), ControllerError>>,
    deletion_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its watchers.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing Install Controller");

        let manifest = Manifest::load(&config.primary_source())?;
        let ingress = load_ingress(&config)?;

        let kube_client = Client::try_default().await?;
        let engine = KubeEngine::new(kube_client.clone()).await?;
        let store = Arc::new(KubeInstallStore::new(kube_client.clone()));

        let reconciler = Arc::new(Reconciler::new(
            Arc::<KubeInstallStore>::clone(&store),
            Arc::new(engine),
            manifest,
            ingress,
            config.target_version.clone(),
        ));

        if config.auto_install {
            let namespace = config.namespace.clone();
            tokio::spawn(async move {
                if let Err(e) = auto_install::ensure_default_install(store.as_ref(), &namespace).await {
                    error!("Failed to create default Install: {}", e);
                }
            });
        }

        let install_api: Api<Install> = Api::namespaced(kube_client.clone(), &config.namespace);
        let deployment_api: Api<Deployment> = Api::namespaced(kube_client, &config.namespace);
        let context = Arc::new(Context::new(reconciler, config.namespace.clone()));
        let watcher = Arc::new(Watcher::new(context, install_api, deployment_api));

        let install_watcher = {
            let watcher = Arc::clone(&watcher);
            tokio::spawn(async move { watcher.watch_installs().await })
        };
        let deletion_watcher = tokio::spawn(async move { watcher.watch_deletions().await });

        Ok(Self {
            install_watcher,
            deletion_watcher,
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Install Controller running");

        // Wait for either watcher to exit (they should run forever)
        tokio::select! {
            result = &mut self.install_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Install watcher panicked: {}", e)))??;
            }
            result = &mut self.deletion_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Install deletion watcher panicked: {}", e)))??;
            }
        }

        Ok(())
    }
}

/// Ingress templates are optional until an Install asks for a hostname
fn load_ingress(config: &ControllerConfig) -> Result<Option<Manifest>, ControllerError> {
    match Manifest::load(&config.ingress_source()) {
        Ok(ingress) => Ok(Some(ingress)),
        Err(ManifestError::SourceNotFound(path)) => {
            warn!(
                "Ingress templates not found at {}; Installs with a hostname will fail",
                path.display()
            );
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
