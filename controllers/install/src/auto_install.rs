//! Default Install creation at startup.

use crate::error::ControllerError;
use crate::store::{InstallStore, StoreError};
use crds::{Install, InstallSpec};
use tracing::info;

/// Name of the Install created when none exists
pub const AUTO_INSTALL_NAME: &str = "auto-install";

/// Creates `auto-install` in `namespace` unless an Install already exists there.
///
/// Returns whether an object was created. Losing a create race to another
/// manager counts as success.
pub async fn ensure_default_install(
    store: &dyn InstallStore,
    namespace: &str,
) -> Result<bool, ControllerError> {
    let existing = store.list(namespace).await?;
    if !existing.is_empty() {
        info!(
            namespace,
            count = existing.len(),
            "Install objects already present, not creating {}",
            AUTO_INSTALL_NAME
        );
        return Ok(false);
    }

    let mut install = Install::new(AUTO_INSTALL_NAME, InstallSpec::default());
    install.metadata.namespace = Some(namespace.to_string());

    match store.create(&install).await {
        Ok(_) => {
            info!(namespace, name = AUTO_INSTALL_NAME, "Created default Install");
            Ok(true)
        }
        Err(StoreError::AlreadyExists(name)) => {
            info!("Default Install {} was created concurrently", name);
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InstallKey, MockInstallStore};
    use crate::test_utils::create_test_install;

    #[tokio::test]
    async fn test_creates_install_in_empty_namespace() {
        let store = MockInstallStore::new();

        let created = ensure_default_install(&store, "tekton-pipelines")
            .await
            .expect("ensure");

        assert!(created);
        let install = store
            .stored(&InstallKey::new("tekton-pipelines", AUTO_INSTALL_NAME))
            .expect("install created");
        assert_eq!(install.spec, InstallSpec::default());
        assert!(install.status.is_none());
    }

    #[tokio::test]
    async fn test_existing_install_is_left_alone() {
        let store = MockInstallStore::new();
        store.add(create_test_install("tekton-pipelines", "custom", None, None));

        let created = ensure_default_install(&store, "tekton-pipelines")
            .await
            .expect("ensure");

        assert!(!created);
        assert!(store
            .stored(&InstallKey::new("tekton-pipelines", AUTO_INSTALL_NAME))
            .is_none());
    }

    #[tokio::test]
    async fn test_installs_in_other_namespaces_do_not_count() {
        let store = MockInstallStore::new();
        store.add(create_test_install("ops", "demo", None, None));

        let created = ensure_default_install(&store, "tekton-pipelines")
            .await
            .expect("ensure");
        assert!(created);
    }

    #[tokio::test]
    async fn test_lost_create_race_is_success() {
        let store = MockInstallStore::new();
        store.conflict_on_create();

        let created = ensure_default_install(&store, "tekton-pipelines")
            .await
            .expect("conflict is not an error");
        assert!(!created);
    }
}
