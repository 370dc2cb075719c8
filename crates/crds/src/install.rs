//! Install CRD
//!
//! Requests installation of the pipeline engine into the namespace the
//! object lives in. The controller records what it applied in the status.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired state of an Install
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[kube(
    group = "operator.tekton.dev",
    version = "v1alpha1",
    kind = "Install",
    namespaced,
    status = "InstallStatus",
    printcolumn = r#"{"name":"Version", "type":"string", "jsonPath":".status.version"}"#,
    printcolumn = r#"{"name":"Hostname", "type":"string", "jsonPath":".spec.hostname"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct InstallSpec {
    /// Public hostname for the pipeline ingress.
    ///
    /// When set, the ingress templates are installed with this host and every
    /// deployment receives a `HOST_NAME` environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

/// What the controller last installed
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstallStatus {
    /// Last successfully installed version
    #[serde(default)]
    pub version: String,

    /// One descriptor per applied resource (`namespace/name : group/version/kind`).
    ///
    /// Absent until the first successful install.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<String>>,
}

impl Install {
    /// Configured hostname, ignoring empty strings.
    pub fn hostname(&self) -> Option<&str> {
        self.spec
            .hostname
            .as_deref()
            .filter(|host| !host.is_empty())
    }
}
