//! Template loading
//!
//! Reads a file or a directory of YAML/JSON documents into resource objects,
//! in lexical path order so the resulting manifest is deterministic.

use crate::error::ManifestError;
use kube::api::DynamicObject;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const TEMPLATE_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Where a template set is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSource {
    /// Template file or directory
    pub path: PathBuf,
    /// Descend into subdirectories
    pub recursive: bool,
}

impl TemplateSource {
    /// Source reading templates at `path`
    pub fn new(path: impl Into<PathBuf>, recursive: bool) -> Self {
        Self {
            path: path.into(),
            recursive,
        }
    }
}

/// Loads every resource declared under `source`, in file order then document order
pub fn load(source: &TemplateSource) -> Result<Vec<DynamicObject>, ManifestError> {
    if !source.path.exists() {
        return Err(ManifestError::SourceNotFound(source.path.clone()));
    }

    let mut files = Vec::new();
    if source.path.is_dir() {
        collect_files(&source.path, source.recursive, &mut files)?;
    } else {
        files.push(source.path.clone());
    }

    let mut resources = Vec::new();
    for file in &files {
        let contents = fs::read_to_string(file).map_err(|source| ManifestError::Io {
            path: file.clone(),
            source,
        })?;
        let parsed = parse_documents(file, &contents)?;
        debug!("Loaded {} resource(s) from {}", parsed.len(), file.display());
        resources.extend(parsed);
    }
    Ok(resources)
}

fn collect_files(dir: &Path, recursive: bool, out: &mut Vec<PathBuf>) -> Result<(), ManifestError> {
    let entries = fs::read_dir(dir).map_err(|source| ManifestError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths = entries
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| ManifestError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    paths.sort();

    for path in paths {
        if path.is_dir() {
            if recursive {
                collect_files(&path, recursive, out)?;
            }
        } else if is_template(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn is_template(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| TEMPLATE_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
}

/// Splits a multi-document file and converts each non-empty document
pub(crate) fn parse_documents(path: &Path, contents: &str) -> Result<Vec<DynamicObject>, ManifestError> {
    let mut resources = Vec::new();

    for (index, document) in serde_yaml::Deserializer::from_str(contents).enumerate() {
        let value = serde_yaml::Value::deserialize(document).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if value.is_null() {
            continue;
        }

        let resource: DynamicObject =
            serde_yaml::from_value(value).map_err(|source| ManifestError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        validate(&resource).map_err(|reason| ManifestError::InvalidResource {
            path: path.to_path_buf(),
            index,
            reason,
        })?;
        resources.push(resource);
    }
    Ok(resources)
}

fn validate(resource: &DynamicObject) -> Result<(), String> {
    let types = resource
        .types
        .as_ref()
        .ok_or_else(|| "missing apiVersion or kind".to_string())?;
    if types.api_version.is_empty() {
        return Err("empty apiVersion".to_string());
    }
    if types.kind.is_empty() {
        return Err("empty kind".to_string());
    }
    if resource.metadata.name.as_deref().is_none_or(str::is_empty) {
        return Err("missing metadata.name".to_string());
    }
    Ok(())
}
