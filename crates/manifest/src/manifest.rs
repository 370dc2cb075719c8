//! Manifest façade
//!
//! A [`Manifest`] is an immutable, ordered template set. It is loaded once and
//! shared by every reconciliation; each pass asks for its own [`WorkingSet`],
//! transforms that copy, and applies it. Two installs reconciling at the same
//! time therefore never see each other's parametrization.

use crate::engine::{DeletePropagation, ResourceEngine};
use crate::error::ManifestError;
use crate::loader::{self, TemplateSource};
use crate::resource;
use crate::transform::Pipeline;
use kube::api::DynamicObject;
use std::sync::Arc;
use tracing::{debug, info};

/// Immutable, ordered template set
#[derive(Debug, Clone)]
pub struct Manifest {
    templates: Arc<[DynamicObject]>,
}

impl Manifest {
    /// Loads templates from a file or directory
    pub fn load(source: &TemplateSource) -> Result<Self, ManifestError> {
        let templates = loader::load(source)?;
        info!(
            "Loaded {} template(s) from {}",
            templates.len(),
            source.path.display()
        );
        Ok(Self::from_resources(templates))
    }

    /// Wraps already-parsed templates
    pub fn from_resources(templates: Vec<DynamicObject>) -> Self {
        Self {
            templates: templates.into(),
        }
    }

    /// Templates in apply order
    pub fn resources(&self) -> &[DynamicObject] {
        &self.templates
    }

    /// Number of resources
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// True when there are no resources
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Private, mutable copy of the templates
    pub fn working_copy(&self) -> WorkingSet {
        WorkingSet {
            resources: self.templates.to_vec(),
        }
    }

    /// Copies the templates and runs `pipeline` over the copy
    pub fn transform(&self, pipeline: &Pipeline) -> Result<WorkingSet, ManifestError> {
        let mut working = self.working_copy();
        working.transform(pipeline)?;
        Ok(working)
    }
}

/// Per-reconciliation copy of a manifest
#[derive(Debug, Clone)]
pub struct WorkingSet {
    resources: Vec<DynamicObject>,
}

impl WorkingSet {
    /// Resources in template order
    pub fn resources(&self) -> &[DynamicObject] {
        &self.resources
    }

    /// Number of resources
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// True when there are no resources
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Runs `pipeline` over every resource in order.
    ///
    /// Stops at the first failure; resources before it stay transformed.
    pub fn transform(&mut self, pipeline: &Pipeline) -> Result<(), ManifestError> {
        for resource in &mut self.resources {
            pipeline.apply(resource)?;
        }
        debug!(
            "Transformed {} resource(s) with [{}]",
            self.resources.len(),
            pipeline.names().join(", ")
        );
        Ok(())
    }

    /// Applies every resource in order, stopping at the first failure
    pub async fn apply_all(&self, engine: &dyn ResourceEngine) -> Result<(), ManifestError> {
        for resource in &self.resources {
            debug!("Applying {}", resource::display_name(resource));
            engine.apply(resource).await?;
        }
        Ok(())
    }

    /// Deletes every resource in reverse order.
    ///
    /// Resources that are already gone count as deleted.
    pub async fn delete_all(
        &self,
        engine: &dyn ResourceEngine,
        propagation: DeletePropagation,
    ) -> Result<(), ManifestError> {
        for resource in self.resources.iter().rev() {
            match engine.delete(resource, propagation).await {
                Ok(()) => debug!("Deleted {}", resource::display_name(resource)),
                Err(e) if e.is_not_found() => {
                    debug!("{} already gone", resource::display_name(resource));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// One status descriptor per resource, in order
    pub fn descriptors(&self) -> Vec<String> {
        self.resources.iter().map(resource::descriptor).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{EngineCall, MockEngine};
    use crate::transform::{InjectEnv, InjectHostname, InjectNamespace};
    use serde_json::json;
    use std::path::Path;

    fn pipeline_fixtures() -> Manifest {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/pipeline");
        Manifest::load(&TemplateSource::new(dir, false)).expect("fixtures load")
    }

    #[test]
    fn test_transform_never_touches_templates() {
        let manifest = pipeline_fixtures();
        let before: Vec<_> = manifest.resources().to_vec();

        let ops = manifest
            .transform(&Pipeline::new().with(InjectNamespace::new("ops")))
            .expect("transform");
        let dev = manifest
            .transform(&Pipeline::new().with(InjectNamespace::new("dev")))
            .expect("transform");

        assert_eq!(ops.resources()[0].metadata.namespace.as_deref(), Some("ops"));
        assert_eq!(dev.resources()[0].metadata.namespace.as_deref(), Some("dev"));
        for (template, original) in manifest.resources().iter().zip(&before) {
            assert_eq!(template.metadata, original.metadata);
            assert_eq!(template.data, original.data);
        }
    }

    #[test]
    fn test_transform_stops_at_first_failure() {
        let broken: DynamicObject = serde_json::from_value(json!({
            "apiVersion": "networking.k8s.io/v1",
            "kind": "Ingress",
            "metadata": { "name": "broken" },
            "spec": {}
        }))
        .expect("valid object");
        let manifest = Manifest::from_resources(vec![broken]);

        let result = manifest.transform(
            &Pipeline::new()
                .with(InjectHostname::new("pipelines.example.com"))
                .with(InjectEnv::new("HOST_NAME", "pipelines.example.com")),
        );
        assert!(matches!(
            result,
            Err(ManifestError::Transform { transformer: "inject-hostname", .. })
        ));
    }

    #[tokio::test]
    async fn test_apply_all_in_order() {
        let manifest = pipeline_fixtures();
        let engine = MockEngine::new();

        manifest
            .working_copy()
            .apply_all(&engine)
            .await
            .expect("apply");

        let applied: Vec<_> = engine
            .applied()
            .iter()
            .map(resource::display_name)
            .collect();
        let expected: Vec<_> = manifest.resources().iter().map(resource::display_name).collect();
        assert_eq!(applied, expected);
    }

    #[tokio::test]
    async fn test_apply_all_stops_at_first_failure() {
        let manifest = pipeline_fixtures();
        let engine = MockEngine::new();
        engine.fail_apply_of("tekton-pipelines-controller-admin");

        let err = manifest
            .working_copy()
            .apply_all(&engine)
            .await
            .expect_err("apply must fail");
        assert!(matches!(err, ManifestError::Engine(_)));
        // Only the service account made it before the failing binding
        assert_eq!(engine.applied().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_all_reverse_order_tolerates_missing() {
        let manifest = pipeline_fixtures();
        let engine = MockEngine::new();
        engine.mark_missing("tekton-pipelines-webhook");

        manifest
            .working_copy()
            .delete_all(&engine, DeletePropagation::Foreground)
            .await
            .expect("delete");

        let calls = engine.calls();
        let deleted: Vec<_> = calls
            .iter()
            .map(|call| match call {
                EngineCall::Delete { resource, propagation } => {
                    assert_eq!(*propagation, DeletePropagation::Foreground);
                    resource.metadata.name.clone().unwrap_or_default()
                }
                EngineCall::Apply(_) => panic!("unexpected apply"),
            })
            .collect();
        assert_eq!(
            deleted,
            vec![
                "tekton-pipelines-webhook",
                "tekton-pipelines-controller",
                "tekton-pipelines-controller-admin",
                "tekton-pipelines-controller",
            ]
        );
    }

    #[test]
    fn test_descriptors_follow_transformed_namespace() {
        let manifest = pipeline_fixtures();
        let working = manifest
            .transform(&Pipeline::new().with(InjectNamespace::new("ops")))
            .expect("transform");
        assert_eq!(
            working.descriptors(),
            vec![
                "ops/tekton-pipelines-controller : v1/ServiceAccount",
                "/tekton-pipelines-controller-admin : rbac.authorization.k8s.io/v1/ClusterRoleBinding",
                "ops/tekton-pipelines-controller : apps/v1/Deployment",
                "ops/tekton-pipelines-webhook : apps/v1/Deployment",
            ]
        );
    }
}
