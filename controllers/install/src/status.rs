//! Install status derivation.

use crds::{Install, InstallStatus};
use manifest::WorkingSet;

/// Whether `install` already records a completed install of `target_version`.
///
/// Both halves must hold. Spec changes on an up-to-date object, such as a new
/// hostname, do not trigger another install.
pub fn is_up_to_date(install: &Install, target_version: &str) -> bool {
    install
        .status
        .as_ref()
        .is_some_and(|status| status.version == target_version && status.resources.is_some())
}

/// Status recorded after `applied` was installed successfully
pub fn installed(target_version: &str, applied: &WorkingSet) -> InstallStatus {
    InstallStatus {
        version: target_version.to_string(),
        resources: Some(applied.descriptors()),
    }
}
