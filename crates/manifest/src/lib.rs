//! Resource manifests for the pipeline operator
//!
//! Loads an ordered set of Kubernetes resource templates, parametrizes a
//! private copy of them for one install, and applies or deletes that copy.
//!
//! # Example
//!
//! ```no_run
//! use manifest::{KubeEngine, Manifest, Pipeline, TemplateSource};
//! use manifest::transform::{InjectEnv, InjectNamespace};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let engine = KubeEngine::new(client).await?;
//!
//! let templates = Manifest::load(&TemplateSource::new("deploy/resources/v0.3.1", false))?;
//! let pipeline = Pipeline::new()
//!     .with(InjectNamespace::new("ops"))
//!     .with(InjectEnv::new("HOST_NAME", "pipelines.example.com"));
//!
//! templates.transform(&pipeline)?.apply_all(&engine).await?;
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod resource;
pub mod transform;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use engine::{DeletePropagation, KubeEngine, ResourceEngine};
pub use error::{EngineError, ManifestError, TransformError};
pub use loader::TemplateSource;
pub use manifest::{Manifest, WorkingSet};
pub use transform::{KindSelector, Pipeline, Transformer};
#[cfg(any(test, feature = "test-util"))]
pub use mock::{EngineCall, MockEngine};
