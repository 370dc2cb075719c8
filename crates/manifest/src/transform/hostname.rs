//! Ingress hostname injection

use super::{field_mut, KindSelector, Transformer};
use crate::error::TransformError;
use crate::resource;
use kube::api::DynamicObject;
use serde_json::Value;

/// Overwrites the host of every Ingress rule that declares one.
#[derive(Debug, Clone)]
pub struct InjectHostname {
    hostname: String,
}

impl InjectHostname {
    /// Rewrites ingress rule hosts to `hostname`
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
        }
    }
}

impl Transformer for InjectHostname {
    fn name(&self) -> &'static str {
        "inject-hostname"
    }

    fn selector(&self) -> KindSelector {
        KindSelector::Kind("ingress")
    }

    fn transform(&self, resource: &mut DynamicObject) -> Result<(), TransformError> {
        let name = resource::display_name(resource);
        let rules = field_mut(&mut resource.data, &["spec", "rules"], &name)?
            .as_array_mut()
            .ok_or_else(|| TransformError::UnexpectedShape {
                resource: name.clone(),
                path: "spec.rules".to_string(),
                expected: "a list",
            })?;

        for rule in rules.iter_mut() {
            let rule = rule
                .as_object_mut()
                .ok_or_else(|| TransformError::UnexpectedShape {
                    resource: name.clone(),
                    path: "spec.rules[]".to_string(),
                    expected: "an object",
                })?;
            if let Some(host) = rule.get_mut("host") {
                *host = Value::String(self.hostname.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ingress() -> DynamicObject {
        serde_json::from_value(json!({
            "apiVersion": "networking.k8s.io/v1",
            "kind": "Ingress",
            "metadata": { "name": "dashboard" },
            "spec": {
                "rules": [
                    { "host": "placeholder.local", "http": { "paths": [] } },
                    { "http": { "paths": [] } }
                ]
            }
        }))
        .expect("valid object")
    }

    #[test]
    fn test_declared_hosts_are_overwritten() {
        let mut ing = ingress();
        InjectHostname::new("pipelines.example.com")
            .transform(&mut ing)
            .expect("transform");

        assert_eq!(ing.data["spec"]["rules"][0]["host"], json!("pipelines.example.com"));
        // Rules without a host stay catch-all rules
        assert!(ing.data["spec"]["rules"][1].get("host").is_none());
    }

    #[test]
    fn test_hostname_injection_is_idempotent() {
        let transformer = InjectHostname::new("pipelines.example.com");

        let mut once = ingress();
        transformer.transform(&mut once).expect("transform");

        let mut twice = ingress();
        transformer.transform(&mut twice).expect("transform");
        transformer.transform(&mut twice).expect("transform again");

        assert_eq!(once.data, twice.data);
    }

    #[test]
    fn test_missing_rules_fails() {
        let mut ing: DynamicObject = serde_json::from_value(json!({
            "apiVersion": "networking.k8s.io/v1",
            "kind": "Ingress",
            "metadata": { "name": "dashboard" },
            "spec": { "defaultBackend": {} }
        }))
        .expect("valid object");

        let err = InjectHostname::new("pipelines.example.com")
            .transform(&mut ing)
            .expect_err("missing rules");
        assert!(matches!(err, TransformError::MissingField { ref path, .. } if path == "spec.rules"));
    }

    #[test]
    fn test_non_list_rules_fails() {
        let mut ing: DynamicObject = serde_json::from_value(json!({
            "apiVersion": "networking.k8s.io/v1",
            "kind": "Ingress",
            "metadata": { "name": "dashboard" },
            "spec": { "rules": { "host": "placeholder.local" } }
        }))
        .expect("valid object");

        let err = InjectHostname::new("pipelines.example.com")
            .transform(&mut ing)
            .expect_err("rules must be a list");
        assert!(matches!(err, TransformError::UnexpectedShape { .. }));
    }
}
