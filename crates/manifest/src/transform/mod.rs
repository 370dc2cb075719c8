//! Transformer pipeline
//!
//! A transformer rewrites one resource object in place. Each transformer
//! declares which kinds it targets through a [`KindSelector`]; the pipeline
//! only hands it matching resources, so every other kind passes through
//! untouched.
//!
//! Transformers must be idempotent: the same template set is transformed on
//! every reconciliation, and running a transformer over its own output must
//! not change it further.

mod env;
mod hostname;
mod namespace;
mod owner;

pub use env::InjectEnv;
pub use hostname::InjectHostname;
pub use namespace::InjectNamespace;
pub use owner::InjectOwner;

use crate::error::{ManifestError, TransformError};
use crate::resource;
use kube::api::DynamicObject;
use serde_json::Value;
use std::fmt;
use tracing::trace;

/// Which resource kinds a transformer applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindSelector {
    /// Every resource
    Any,
    /// Every resource except well-known cluster-scoped kinds
    Namespaced,
    /// Resources of one kind, compared case-insensitively
    Kind(&'static str),
}

impl KindSelector {
    /// Whether a resource of `kind` is selected
    pub fn matches(&self, kind: &str) -> bool {
        match self {
            KindSelector::Any => true,
            KindSelector::Namespaced => !resource::is_cluster_scoped(kind),
            KindSelector::Kind(wanted) => wanted.eq_ignore_ascii_case(kind),
        }
    }
}

/// A pure, idempotent rewrite of one resource object
pub trait Transformer: Send + Sync + fmt::Debug {
    /// Name used in logs and errors
    fn name(&self) -> &'static str;

    /// Kinds this transformer applies to
    fn selector(&self) -> KindSelector;

    /// Rewrite `resource`. Only called for resources matching [`Self::selector`].
    fn transform(&self, resource: &mut DynamicObject) -> Result<(), TransformError>;
}

/// An ordered list of transformers applied to each resource
#[derive(Debug, Default)]
pub struct Pipeline {
    transformers: Vec<Box<dyn Transformer>>,
}

impl Pipeline {
    /// Creates an empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a transformer, builder style
    #[must_use]
    pub fn with(mut self, transformer: impl Transformer + 'static) -> Self {
        self.push(transformer);
        self
    }

    /// Appends a transformer
    pub fn push(&mut self, transformer: impl Transformer + 'static) {
        self.transformers.push(Box::new(transformer));
    }

    /// Transformer names in execution order
    pub fn names(&self) -> Vec<&'static str> {
        self.transformers.iter().map(|t| t.name()).collect()
    }

    /// Number of transformers
    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    /// True when the pipeline has no transformers
    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    /// Runs every matching transformer over `resource`, stopping at the first failure
    pub fn apply(&self, resource: &mut DynamicObject) -> Result<(), ManifestError> {
        for transformer in &self.transformers {
            let kind = resource::kind(resource);
            if !transformer.selector().matches(kind) {
                trace!("{} skips {}", transformer.name(), resource::display_name(resource));
                continue;
            }
            transformer
                .transform(resource)
                .map_err(|source| ManifestError::Transform {
                    transformer: transformer.name(),
                    source,
                })?;
        }
        Ok(())
    }
}

/// Walks `path` from `root`, requiring every segment to be an object key.
///
/// `resource_name` only feeds error messages.
pub(crate) fn field_mut<'a>(
    root: &'a mut Value,
    path: &[&str],
    resource_name: &str,
) -> Result<&'a mut Value, TransformError> {
    let mut current = root;
    for (depth, segment) in path.iter().enumerate() {
        let here = path[..depth].join(".");
        let map = current
            .as_object_mut()
            .ok_or_else(|| TransformError::UnexpectedShape {
                resource: resource_name.to_string(),
                path: if here.is_empty() { "<root>".to_string() } else { here },
                expected: "an object",
            })?;
        current = map
            .get_mut(*segment)
            .ok_or_else(|| TransformError::MissingField {
                resource: resource_name.to_string(),
                path: path[..=depth].join("."),
            })?;
    }
    Ok(current)
}
