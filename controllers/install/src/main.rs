//! Install Controller
//!
//! Installs the pipeline engine into a namespace when an `Install` object
//! appears there:
//! - applies the bundled templates, owned by the Install object
//! - optionally exposes it under `spec.hostname` through an ingress
//! - records the installed version and resources in the Install status
//! - removes the resources again when the Install is deleted

mod auto_install;
mod backoff;
mod config;
mod controller;
mod error;
mod reconciler;
mod status;
mod store;
mod watcher;
#[cfg(test)]
mod test_utils;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "install_controller=info,manifest=info".into()),
        )
        .init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("A rustls crypto provider was already installed");
    }

    info!("Starting Install Controller");

    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  Resource directory: {} (recursive: {})", config.resource_dir.display(), config.recursive);
    info!("  Ingress directory: {}", config.ingress_dir.display());
    info!("  Target version: {}", config.target_version);
    info!("  Namespace: {}", config.namespace);
    info!("  Auto install: {}", config.auto_install);

    // Initialize and run controller
    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
