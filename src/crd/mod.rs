//! Custom Resource Definitions
//!
//! - StorageCohort: a group of storage nodes under one cohort manager
//! - Condition: typed status conditions shared by cohort, manager and nodes

pub mod condition;
pub mod storage_cohort;

pub use condition::*;
pub use storage_cohort::*;
