//! Container environment injection

use super::{field_mut, KindSelector, Transformer};
use crate::error::TransformError;
use crate::resource;
use kube::api::DynamicObject;
use serde_json::{json, Map, Value};

/// Upserts one environment variable into every container of a Deployment.
///
/// Entries with a matching name get the new value (any `valueFrom` is
/// dropped); containers without the entry get it appended once.
#[derive(Debug, Clone)]
pub struct InjectEnv {
    name: String,
    value: String,
}

impl InjectEnv {
    /// Sets env var `name` to `value` in every deployment container
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    fn upsert(&self, container: &mut Map<String, Value>, resource: &str) -> Result<(), TransformError> {
        let env = container
            .entry("env")
            .or_insert_with(|| Value::Array(Vec::new()));
        let env = env.as_array_mut().ok_or_else(|| TransformError::UnexpectedShape {
            resource: resource.to_string(),
            path: "spec.template.spec.containers[].env".to_string(),
            expected: "a list",
        })?;

        let mut found = false;
        for entry in env.iter_mut() {
            let entry = entry
                .as_object_mut()
                .ok_or_else(|| TransformError::UnexpectedShape {
                    resource: resource.to_string(),
                    path: "spec.template.spec.containers[].env[]".to_string(),
                    expected: "an object",
                })?;
            if entry.get("name").and_then(Value::as_str) == Some(self.name.as_str()) {
                entry.remove("valueFrom");
                entry.insert("value".to_string(), Value::String(self.value.clone()));
                found = true;
            }
        }

        if !found {
            env.push(json!({ "name": self.name, "value": self.value }));
        }
        Ok(())
    }
}

impl Transformer for InjectEnv {
    fn name(&self) -> &'static str {
        "inject-env"
    }

    fn selector(&self) -> KindSelector {
        KindSelector::Kind("deployment")
    }

    fn transform(&self, resource: &mut DynamicObject) -> Result<(), TransformError> {
        let name = resource::display_name(resource);
        let containers = field_mut(
            &mut resource.data,
            &["spec", "template", "spec", "containers"],
            &name,
        )?
        .as_array_mut()
        .ok_or_else(|| TransformError::UnexpectedShape {
            resource: name.clone(),
            path: "spec.template.spec.containers".to_string(),
            expected: "a list",
        })?;

        for container in containers.iter_mut() {
            let container = container
                .as_object_mut()
                .ok_or_else(|| TransformError::UnexpectedShape {
                    resource: name.clone(),
                    path: "spec.template.spec.containers[]".to_string(),
                    expected: "an object",
                })?;
            self.upsert(container, &name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployment(env: Option<Value>) -> DynamicObject {
        let mut container = json!({ "name": "controller", "image": "tekton/controller:v0.3.1" });
        if let Some(env) = env {
            container["env"] = env;
        }
        serde_json::from_value(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": { "name": "tekton-pipelines-controller" },
            "spec": {
                "template": {
                    "spec": {
                        "containers": [container, { "name": "sidecar", "image": "busybox" }]
                    }
                }
            }
        }))
        .expect("valid object")
    }

    fn host_entries(deploy: &DynamicObject, container: usize) -> Vec<Value> {
        deploy.data["spec"]["template"]["spec"]["containers"][container]["env"]
            .as_array()
            .expect("env list")
            .iter()
            .filter(|e| e["name"] == json!("HOST_NAME"))
            .cloned()
            .collect()
    }

    #[test]
    fn test_existing_entry_is_updated_in_place() {
        let mut deploy = deployment(Some(json!([
            { "name": "SYSTEM_NAMESPACE", "value": "tekton-pipelines" },
            { "name": "HOST_NAME", "value": "old.example.com" }
        ])));

        let transformer = InjectEnv::new("HOST_NAME", "pipelines.example.com");
        transformer.transform(&mut deploy).expect("transform");
        transformer.transform(&mut deploy).expect("transform again");

        let entries = host_entries(&deploy, 0);
        assert_eq!(entries, vec![json!({ "name": "HOST_NAME", "value": "pipelines.example.com" })]);
        let env = deploy.data["spec"]["template"]["spec"]["containers"][0]["env"]
            .as_array()
            .expect("env list");
        assert_eq!(env.len(), 2);
        assert_eq!(env[0]["name"], json!("SYSTEM_NAMESPACE"));
    }

    #[test]
    fn test_missing_entry_is_appended_once() {
        let mut deploy = deployment(Some(json!([
            { "name": "SYSTEM_NAMESPACE", "value": "tekton-pipelines" }
        ])));

        let transformer = InjectEnv::new("HOST_NAME", "pipelines.example.com");
        transformer.transform(&mut deploy).expect("transform");
        transformer.transform(&mut deploy).expect("transform again");

        assert_eq!(host_entries(&deploy, 0).len(), 1);
        // Containers without an env list get one
        assert_eq!(host_entries(&deploy, 1).len(), 1);
    }

    #[test]
    fn test_value_from_is_replaced() {
        let mut deploy = deployment(Some(json!([
            { "name": "HOST_NAME", "valueFrom": { "fieldRef": { "fieldPath": "status.podIP" } } }
        ])));
        InjectEnv::new("HOST_NAME", "pipelines.example.com")
            .transform(&mut deploy)
            .expect("transform");
        assert_eq!(
            host_entries(&deploy, 0),
            vec![json!({ "name": "HOST_NAME", "value": "pipelines.example.com" })]
        );
    }

    #[test]
    fn test_missing_containers_fails() {
        let mut deploy: DynamicObject = serde_json::from_value(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": { "name": "broken" },
            "spec": { "template": { "spec": {} } }
        }))
        .expect("valid object");

        let err = InjectEnv::new("HOST_NAME", "pipelines.example.com")
            .transform(&mut deploy)
            .expect_err("containers required");
        assert_eq!(
            err,
            TransformError::MissingField {
                resource: "Deployment/broken".to_string(),
                path: "spec.template.spec.containers".to_string(),
            }
        );
    }
}
