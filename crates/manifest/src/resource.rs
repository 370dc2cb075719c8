//! Helpers for working with untyped resource objects.

use kube::api::DynamicObject;
use kube::core::{GroupVersionKind, TypeMeta};

/// Kinds that live outside any namespace.
///
/// Namespace and owner injection leave these untouched: a namespaced owner
/// cannot own a cluster-scoped object.
const CLUSTER_SCOPED_KINDS: &[&str] = &[
    "apiservice",
    "certificatesigningrequest",
    "clusterrole",
    "clusterrolebinding",
    "componentstatus",
    "customresourcedefinition",
    "meshpolicy",
    "mutatingwebhookconfiguration",
    "namespace",
    "node",
    "persistentvolume",
    "podsecuritypolicy",
    "priorityclass",
    "selfsubjectaccessreview",
    "selfsubjectrulesreview",
    "storageclass",
    "subjectaccessreview",
    "tokenreview",
    "validatingwebhookconfiguration",
    "volumeattachment",
];

/// Kind of the resource, or an empty string when `kind` is missing.
pub fn kind(resource: &DynamicObject) -> &str {
    resource
        .types
        .as_ref()
        .map(|t| t.kind.as_str())
        .unwrap_or("")
}

/// Whether `kind` names a cluster-scoped resource (case-insensitive).
pub fn is_cluster_scoped(kind: &str) -> bool {
    CLUSTER_SCOPED_KINDS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(kind))
}

/// Group/version/kind of the resource.
///
/// "apps/v1" splits into group "apps" and version "v1"; a bare "v1" is the
/// core group.
pub fn gvk(resource: &DynamicObject) -> Option<GroupVersionKind> {
    resource.types.as_ref().map(gvk_from_type_meta)
}

fn gvk_from_type_meta(tm: &TypeMeta) -> GroupVersionKind {
    let (group, version) = match tm.api_version.rsplit_once('/') {
        Some((g, v)) => (g, v),
        None => ("", tm.api_version.as_str()),
    };
    GroupVersionKind::gvk(group, version, &tm.kind)
}

/// Short name for log lines and error messages (`Kind/namespace/name`).
pub fn display_name(resource: &DynamicObject) -> String {
    let name = resource.metadata.name.as_deref().unwrap_or("unnamed");
    match resource.metadata.namespace.as_deref() {
        Some(ns) => format!("{}/{}/{}", kind(resource), ns, name),
        None => format!("{}/{}", kind(resource), name),
    }
}

/// Status descriptor: `namespace/name : group/version/kind`.
///
/// Core-group resources omit the group segment.
pub fn descriptor(resource: &DynamicObject) -> String {
    let namespace = resource.metadata.namespace.as_deref().unwrap_or("");
    let name = resource.metadata.name.as_deref().unwrap_or("");
    let type_path = match gvk(resource) {
        Some(gvk) if gvk.group.is_empty() => format!("{}/{}", gvk.version, gvk.kind),
        Some(gvk) => format!("{}/{}/{}", gvk.group, gvk.version, gvk.kind),
        None => String::new(),
    };
    format!("{namespace}/{name} : {type_path}")
}
