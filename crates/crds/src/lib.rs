//! Pipeline Operator CRD Definitions
//!
//! Kubernetes Custom Resource Definitions consumed by the install controller.

pub mod install;

pub use install::*;
