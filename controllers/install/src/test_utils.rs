//! Test utilities for unit testing the reconciler
//!
//! This module provides helpers for creating test data and setting up test scenarios.

use crate::reconciler::Reconciler;
use crate::store::MockInstallStore;
use crds::{Install, InstallSpec, InstallStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::DynamicObject;
use manifest::{Manifest, MockEngine};
use serde_json::{json, Value};
use std::sync::Arc;

pub const TARGET_VERSION: &str = "v0.3.1";

/// Helper to create a test Install as the API server would return it
pub fn create_test_install(
    namespace: &str,
    name: &str,
    hostname: Option<&str>,
    status: Option<InstallStatus>,
) -> Install {
    Install {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(format!("{namespace}-{name}-uid")),
            ..Default::default()
        },
        spec: InstallSpec {
            hostname: hostname.map(str::to_string),
        },
        status,
    }
}

/// Status of an Install already at `version`
pub fn installed_status(version: &str) -> InstallStatus {
    InstallStatus {
        version: version.to_string(),
        resources: Some(vec![
            "ops/tekton-pipelines-controller : apps/v1/Deployment".to_string(),
        ]),
    }
}

fn object(value: Value) -> DynamicObject {
    serde_json::from_value(value).expect("valid test object")
}

/// Primary templates: service account, cluster binding, config, two deployments
pub fn primary_templates() -> Manifest {
    Manifest::from_resources(vec![
        object(json!({
            "apiVersion": "v1",
            "kind": "ServiceAccount",
            "metadata": { "name": "tekton-pipelines-controller", "namespace": "tekton-pipelines" }
        })),
        object(json!({
            "apiVersion": "rbac.authorization.k8s.io/v1",
            "kind": "ClusterRoleBinding",
            "metadata": { "name": "tekton-pipelines-controller-admin" },
            "roleRef": {
                "apiGroup": "rbac.authorization.k8s.io",
                "kind": "ClusterRole",
                "name": "tekton-pipelines-admin"
            },
            "subjects": [{
                "kind": "ServiceAccount",
                "name": "tekton-pipelines-controller",
                "namespace": "tekton-pipelines"
            }]
        })),
        object(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": { "name": "config-defaults", "namespace": "tekton-pipelines" },
            "data": { "default-timeout-minutes": "60" }
        })),
        object(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": { "name": "tekton-pipelines-controller", "namespace": "tekton-pipelines" },
            "spec": {
                "replicas": 1,
                "template": {
                    "spec": {
                        "serviceAccountName": "tekton-pipelines-controller",
                        "containers": [{
                            "name": "tekton-pipelines-controller",
                            "image": "gcr.io/tekton-releases/controller:v0.3.1",
                            "env": [{ "name": "SYSTEM_NAMESPACE", "value": "tekton-pipelines" }]
                        }]
                    }
                }
            }
        })),
        object(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": { "name": "tekton-pipelines-webhook", "namespace": "tekton-pipelines" },
            "spec": {
                "template": {
                    "spec": {
                        "containers": [
                            { "name": "webhook", "image": "gcr.io/tekton-releases/webhook:v0.3.1" },
                            { "name": "proxy", "image": "gcr.io/tekton-releases/proxy:v0.3.1" }
                        ]
                    }
                }
            }
        })),
    ])
}

/// Ingress templates: one ingress routing to the dashboard
pub fn ingress_templates() -> Manifest {
    Manifest::from_resources(vec![object(json!({
        "apiVersion": "networking.k8s.io/v1",
        "kind": "Ingress",
        "metadata": { "name": "tekton-dashboard", "namespace": "tekton-pipelines" },
        "spec": {
            "rules": [{
                "host": "dashboard.local",
                "http": {
                    "paths": [{
                        "path": "/",
                        "pathType": "Prefix",
                        "backend": { "service": { "name": "tekton-dashboard", "port": { "number": 9097 } } }
                    }]
                }
            }]
        }
    }))])
}

/// Helper to create a reconciler over mocks, with ingress templates loaded
pub fn create_test_reconciler(store: &MockInstallStore, engine: &MockEngine) -> Reconciler {
    Reconciler::new(
        Arc::new(store.clone()),
        Arc::new(engine.clone()),
        primary_templates(),
        Some(ingress_templates()),
        TARGET_VERSION,
    )
}
