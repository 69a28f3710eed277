//! StorageCohort API
//!
//! Types for the `StorageCohort` custom resource (`scp.openebs.io/v1alpha1`),
//! a group of storage nodes managed together under one cohort manager, plus
//! the helpers consumers of the resource need.
//!
//! # Modules
//!
//! - [`crd`]: The resource schema and its status conditions
//! - [`health`]: Interpretation of cohort conditions
//! - [`selector`]: Node selection by label selector
//! - [`validation`]: Admission-style checks
//! - [`manifest`]: Loading cohorts from YAML documents
//! - [`client`]: Reading cohorts from a cluster
//! - [`error`]: Error types and handling

pub mod client;
pub mod crd;
pub mod error;
pub mod health;
pub mod manifest;
pub mod selector;
pub mod validation;

// Re-export commonly used types
pub use crd::{
    CohortCondition, CohortConditionType, CohortNodeCondition, ComponentCondition,
    ComponentStatus, Condition, ConditionStatus, StorageCohort, StorageCohortList,
    StorageCohortSpec, StorageCohortStatus,
};

pub use client::{get_cohort, list_cohorts, CohortScope};
pub use error::{Error, Result};
pub use health::CohortHealth;
pub use manifest::{load_cohorts, parse_cohorts};
pub use validation::{FieldIssue, Severity, ValidationReport, Validator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
