//! Startup configuration.
//!
//! Everything is read once from environment variables into a
//! [`ControllerConfig`] that is handed to the constructors that need it.

use crate::error::ControllerError;
use manifest::TemplateSource;
use std::path::PathBuf;

/// Pipeline engine version shipped with this controller
pub const DEFAULT_TARGET_VERSION: &str = "v0.3.1";

/// Settings fixed for the lifetime of the process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Primary template directory
    pub resource_dir: PathBuf,
    /// Ingress template directory, used when an Install sets a hostname
    pub ingress_dir: PathBuf,
    /// Load `resource_dir` recursively
    pub recursive: bool,
    /// Create a default Install when none exists
    pub auto_install: bool,
    /// Version recorded in Install status after a successful apply
    pub target_version: String,
    /// Namespace whose Install objects are watched
    pub namespace: String,
}

impl ControllerConfig {
    /// Reads configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which returns a variable's value
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let target_version = lookup("TARGET_VERSION")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_TARGET_VERSION.to_string());

        let resource_dir = lookup("RESOURCE_DIR")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("deploy/resources").join(&target_version));
        let ingress_dir = lookup("INGRESS_DIR")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("deploy/resources/ingress"));

        let recursive = parse_bool("RECURSIVE", lookup("RECURSIVE"))?;
        let auto_install = parse_bool("AUTO_INSTALL", lookup("AUTO_INSTALL"))?;

        let namespace = lookup("WATCH_NAMESPACE")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "default".to_string());

        Ok(Self {
            resource_dir,
            ingress_dir,
            recursive,
            auto_install,
            target_version,
            namespace,
        })
    }

    /// Template source for the primary resources
    pub fn primary_source(&self) -> TemplateSource {
        TemplateSource::new(&self.resource_dir, self.recursive)
    }

    /// Template source for the ingress resources (always recursive)
    pub fn ingress_source(&self) -> TemplateSource {
        TemplateSource::new(&self.ingress_dir, true)
    }
}

fn parse_bool(key: &str, value: Option<String>) -> Result<bool, ControllerError> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "0" | "no" => Ok(false),
        "true" | "1" | "yes" => Ok(true),
        other => Err(ControllerError::InvalidConfig(format!(
            "{key} must be a boolean, got {other:?}"
        ))),
    }
}
