//! Namespace injection

use super::{field_mut, KindSelector, Transformer};
use crate::error::TransformError;
use crate::resource;
use kube::api::DynamicObject;
use serde_json::Value;

/// Stamps resources with the install namespace.
///
/// Cluster-scoped kinds keep an empty namespace. A ClusterRoleBinding has its
/// declared `subjects[].namespace` rewritten instead, so bindings to the
/// operator's service accounts follow the install.
#[derive(Debug, Clone)]
pub struct InjectNamespace {
    namespace: String,
}

impl InjectNamespace {
    /// Moves namespaced resources into `namespace`
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    fn rewrite_subjects(&self, resource: &mut DynamicObject) -> Result<(), TransformError> {
        let name = resource::display_name(resource);
        let subjects = match field_mut(&mut resource.data, &["subjects"], &name) {
            Ok(subjects) => subjects,
            // Bindings without subjects are legal
            Err(TransformError::MissingField { .. }) => return Ok(()),
            Err(e) => return Err(e),
        };
        let subjects = subjects
            .as_array_mut()
            .ok_or_else(|| TransformError::UnexpectedShape {
                resource: name.clone(),
                path: "subjects".to_string(),
                expected: "a list",
            })?;

        for subject in subjects.iter_mut() {
            let subject = subject
                .as_object_mut()
                .ok_or_else(|| TransformError::UnexpectedShape {
                    resource: name.clone(),
                    path: "subjects[]".to_string(),
                    expected: "an object",
                })?;
            if let Some(ns) = subject.get_mut("namespace") {
                *ns = Value::String(self.namespace.clone());
            }
        }
        Ok(())
    }
}

impl Transformer for InjectNamespace {
    fn name(&self) -> &'static str {
        "inject-namespace"
    }

    fn selector(&self) -> KindSelector {
        KindSelector::Any
    }

    fn transform(&self, resource: &mut DynamicObject) -> Result<(), TransformError> {
        let kind = resource::kind(resource);
        if kind.eq_ignore_ascii_case("clusterrolebinding") {
            return self.rewrite_subjects(resource);
        }
        if resource::is_cluster_scoped(kind) {
            return Ok(());
        }
        resource.metadata.namespace = Some(self.namespace.clone());
        Ok(())
    }
}
