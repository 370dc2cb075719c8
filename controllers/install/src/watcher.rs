//! Kubernetes resource watchers.
//!
//! Install objects and the Deployments they own are driven through
//! `kube_runtime::Controller`, which handles reconnection, debouncing and at
//! most one in-flight pass per object. Install events only trigger a pass
//! when the object generation changes or the object is recreated, so the
//! controller's own status writes do not wake it. The controller never
//! reconciles an object that has left its cache, so deletions are picked up
//! by a separate raw watch and routed into the same pass entrypoint.

use crate::backoff::{FibonacciBackoff, KeyedBackoff};
use crate::error::ControllerError;
use crate::reconciler::{ReconcileOutcome, Reconciler};
use crate::store::InstallKey;
use crds::Install;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use kube::Api;
use kube_runtime::controller::{Action, Config as RuntimeConfig};
use kube_runtime::{reflector, watcher, Controller, WatchStreamExt};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

type PassLock = Arc<tokio::sync::Mutex<()>>;

/// State shared by every reconcile invocation
pub struct Context {
    reconciler: Arc<Reconciler>,
    namespace: String,
    backoffs: Mutex<KeyedBackoff<InstallKey>>,
    passes: Mutex<HashMap<InstallKey, PassLock>>,
}

impl Context {
    /// Creates a context for Installs in `namespace`
    pub fn new(reconciler: Arc<Reconciler>, namespace: impl Into<String>) -> Self {
        Self {
            reconciler,
            namespace: namespace.into(),
            backoffs: Mutex::new(KeyedBackoff::new(FibonacciBackoff::default())),
            passes: Mutex::new(HashMap::new()),
        }
    }

    fn key_for(&self, install: &Install) -> Option<InstallKey> {
        InstallKey::from_install(install, &self.namespace)
    }

    /// Runs one pass for `key`.
    ///
    /// Passes for the same key are serialized across the controller and the
    /// deletion watch. A successful pass clears the key's backoff.
    pub async fn run_pass(&self, key: &InstallKey) -> Result<ReconcileOutcome, ControllerError> {
        let lock = self.pass_lock(key);
        let outcome = {
            let _guard = lock.lock().await;
            self.reconciler.reconcile(key).await
        };
        self.release_pass_lock(key, lock);

        if outcome.is_ok() {
            self.reset_backoff(key);
        }
        outcome
    }

    fn pass_lock(&self, key: &InstallKey) -> PassLock {
        let mut passes = self.passes.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(passes.entry(key.clone()).or_default())
    }

    fn release_pass_lock(&self, key: &InstallKey, lock: PassLock) {
        let mut passes = self.passes.lock().unwrap_or_else(PoisonError::into_inner);
        // Held only by the map and this caller: nobody is waiting on it
        if Arc::strong_count(&lock) == 2 {
            passes.remove(key);
        }
    }

    fn next_backoff(&self, key: InstallKey) -> Duration {
        self.backoffs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_backoff(key)
    }

    fn reset_backoff(&self, key: &InstallKey) {
        self.backoffs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset(key);
    }
}

/// Hash of what makes an Install worth a pass: its spec generation and uid.
///
/// The uid is included so a deleted and recreated Install, which starts over
/// at generation 1, still triggers.
fn spec_revision(install: &Install) -> Option<u64> {
    let generation = install.metadata.generation?;
    let mut hasher = DefaultHasher::new();
    (install.metadata.uid.as_deref(), generation).hash(&mut hasher);
    Some(hasher.finish())
}

async fn reconcile(install: Arc<Install>, ctx: Arc<Context>) -> Result<Action, ControllerError> {
    let key = ctx
        .key_for(&install)
        .ok_or_else(|| ControllerError::InvalidInstall("Install has no name".to_string()))?;

    let outcome = ctx.run_pass(&key).await?;
    debug!(namespace = %key.namespace, name = %key.name, ?outcome, "Reconcile finished");
    Ok(Action::await_change())
}

fn error_policy(install: Arc<Install>, error: &ControllerError, ctx: Arc<Context>) -> Action {
    let Some(key) = ctx.key_for(&install) else {
        error!("Reconciliation error for unnamed Install: {}", error);
        return Action::requeue(Duration::from_secs(60));
    };

    let delay = ctx.next_backoff(key.clone());
    error!(
        namespace = %key.namespace,
        name = %key.name,
        "Reconciliation failed, retrying in {}s: {}",
        delay.as_secs(),
        error
    );
    Action::requeue(delay)
}

/// Watches Install objects in one namespace.
pub struct Watcher {
    context: Arc<Context>,
    install_api: Api<Install>,
    deployment_api: Api<Deployment>,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(context: Arc<Context>, install_api: Api<Install>, deployment_api: Api<Deployment>) -> Self {
        Self {
            context,
            install_api,
            deployment_api,
        }
    }

    /// Reconciles Installs on spec changes and on changes to owned Deployments.
    pub async fn watch_installs(&self) -> Result<(), ControllerError> {
        info!("Starting Install watcher");

        // Debounce batches the burst of events an install pass causes
        let runtime_config = RuntimeConfig::default()
            .debounce(Duration::from_secs(1))
            .concurrency(3);

        let (reader, writer) = reflector::store();
        let installs = watcher(self.install_api.clone(), watcher::Config::default())
            .default_backoff()
            .reflect(writer)
            .applied_objects()
            .predicate_filter(spec_revision);

        Controller::for_stream(installs, reader)
            .owns(self.deployment_api.clone(), watcher::Config::default())
            .with_config(runtime_config)
            .run(reconcile, error_policy, Arc::clone(&self.context))
            .for_each(|res| async move {
                if let Err(e) = res {
                    error!("Install controller error: {}", e);
                }
            })
            .await;

        Ok(())
    }

    /// Routes Install deletions into a pass, which then removes the installed
    /// resources.
    pub async fn watch_deletions(&self) -> Result<(), ControllerError> {
        info!("Starting Install deletion watcher");

        let mut events = watcher(self.install_api.clone(), watcher::Config::default())
            .default_backoff()
            .boxed();

        while let Some(event) = events.next().await {
            match event {
                Ok(watcher::Event::Delete(install)) => {
                    let Some(key) = self.context.key_for(&install) else {
                        continue;
                    };
                    info!(namespace = %key.namespace, name = %key.name, "Install deleted");
                    if let Err(e) = self.context.run_pass(&key).await {
                        error!(namespace = %key.namespace, name = %key.name, "Failed to clean up deleted Install: {}", e);
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("Install deletion watch error: {}", e),
            }
        }

        Err(ControllerError::Watch(
            "Install deletion stream ended".to_string(),
        ))
    }
}
