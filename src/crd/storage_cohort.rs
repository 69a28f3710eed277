//! StorageCohort CRD
//!
//! Represents a group of storage nodes managed together under one cohort
//! manager. The spec selects the member nodes and names the default
//! provisioner; the status is written by the cohort operator or cohort
//! manager and carries per-component conditions.

use chrono::{DateTime, Utc};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::core::ObjectList;
use kube::{CustomResource, CustomResourceExt, Resource};
use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::condition::{self, CohortCondition, CohortConditionType, ComponentCondition};
use crate::error::Result;

// =============================================================================
// StorageCohort CRD
// =============================================================================

/// StorageCohort groups storage nodes that are managed together by a single
/// cohort manager and share a default provisioner.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "scp.openebs.io",
    version = "v1alpha1",
    kind = "StorageCohort",
    plural = "storagecohorts",
    shortname = "cohort",
    status = "StorageCohortStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name": "Provisioner", "type": "string", "jsonPath": ".spec.defaultStorageProvisioner"}"#,
    printcolumn = r#"{"name": "Ready", "type": "string", "description": "Ready condition reported by the first component; see the health field of `storage-cohort get` for all components", "jsonPath": ".status.components[0].cohortCondition[?(@.type==\"Ready\")].status"}"#,
    printcolumn = r#"{"name": "Schedulable", "type": "string", "description": "Schedulable condition reported by the first component; see the health field of `storage-cohort get` for all components", "jsonPath": ".status.components[0].cohortCondition[?(@.type==\"Schedulable\")].status"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#,
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct StorageCohortSpec {
    /// Restricts the nodes considered part of the cohort.
    /// When absent every node is eligible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<LabelSelector>,

    /// Details about the cohort manager responsible for managing the cohort.
    /// Any document shape is accepted and preserved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "any_document_schema")]
    pub cohort_manager: Option<serde_json::Value>,

    /// Provisioner used for pools or volumes that do not name one,
    /// e.g. "openebs.io/scp-lvm-provisioner"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_storage_provisioner: Option<String>,
}

/// The list form of the resource as returned by the API server
pub type StorageCohortList = ObjectList<StorageCohort>;

// =============================================================================
// Status
// =============================================================================

/// Most recently observed status of the cohort
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageCohortStatus {
    /// Conditions of the components the cohort is comprised of
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ComponentStatus>,

    /// Capabilities the cohort consists of
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "open_object_schema")]
    pub capabilities: Option<Capabilities>,
}

/// Open capability document, keyed by capability name
pub type Capabilities = BTreeMap<String, serde_json::Value>;

/// Conditions of one cohort component.
///
/// Only `cohort_condition` is meant for placement decisions; the manager
/// and node conditions are for monitoring and troubleshooting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStatus {
    /// Observed cohort conditions. The cohort is fully functional only when
    /// both Ready and Schedulable are True.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cohort_condition: Vec<CohortCondition>,

    /// Observed cohort manager conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cohort_manager_condition: Vec<ComponentCondition>,

    /// Observed conditions of the cohort's individual nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_condition: Vec<CohortNodeCondition>,
}

/// Latest status information for one node of the cohort
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CohortNodeCondition {
    /// Name of the node, a DNS label such as "virtual-node-1"
    #[serde(default)]
    pub name: String,

    /// Observed node conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub condition: Vec<ComponentCondition>,
}

// =============================================================================
// Schema Helpers
// =============================================================================

fn any_document_schema(_: &mut SchemaGenerator) -> Schema {
    let mut schema = SchemaObject::default();
    schema.extensions.insert(
        "x-kubernetes-preserve-unknown-fields".to_string(),
        serde_json::Value::Bool(true),
    );
    Schema::Object(schema)
}

fn open_object_schema(gen: &mut SchemaGenerator) -> Schema {
    let mut schema = any_document_schema(gen).into_object();
    schema.instance_type = Some(InstanceType::Object.into());
    Schema::Object(schema)
}

// =============================================================================
// Implementations
// =============================================================================

impl StorageCohort {
    /// Get the cohort name
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or("unknown")
    }

    /// Get the default provisioner, if one is set
    pub fn default_provisioner(&self) -> Option<&str> {
        self.spec.default_storage_provisioner.as_deref()
    }

    /// All cohort-level conditions across every component
    pub fn cohort_conditions(&self) -> impl Iterator<Item = &CohortCondition> {
        self.status
            .iter()
            .flat_map(|s| s.components.iter())
            .flat_map(|c| c.cohort_condition.iter())
    }

    /// Conditions reported for a node, across every component
    pub fn node_conditions<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a ComponentCondition> {
        self.status
            .iter()
            .flat_map(|s| s.components.iter())
            .flat_map(|c| c.node_condition.iter())
            .filter(move |n| n.name == node)
            .flat_map(|n| n.condition.iter())
    }

    /// Distinct names of the nodes that have reported conditions
    pub fn node_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .status
            .iter()
            .flat_map(|s| s.components.iter())
            .flat_map(|c| c.node_condition.iter())
            .map(|n| n.name.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Mutable access to the status, creating an empty one if needed
    pub fn status_mut(&mut self) -> &mut StorageCohortStatus {
        self.status.get_or_insert_with(StorageCohortStatus::default)
    }
}

impl StorageCohortStatus {
    /// Get a component by position, growing the sequence if it is shorter
    pub fn component_mut(&mut self, index: usize) -> &mut ComponentStatus {
        if self.components.len() <= index {
            self.components.resize_with(index + 1, ComponentStatus::default);
        }
        &mut self.components[index]
    }

    /// Number of components
    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}

impl ComponentStatus {
    /// Record an observed cohort condition
    pub fn set_cohort_condition(&mut self, condition: CohortCondition, now: DateTime<Utc>) -> bool {
        condition::observe(&mut self.cohort_condition, condition, now)
    }

    /// Record an observed cohort manager condition
    pub fn set_cohort_manager_condition(
        &mut self,
        condition: ComponentCondition,
        now: DateTime<Utc>,
    ) -> bool {
        condition::observe(&mut self.cohort_manager_condition, condition, now)
    }

    /// Record an observed condition of a node, adding the node if needed
    pub fn set_node_condition(
        &mut self,
        node: &str,
        condition: ComponentCondition,
        now: DateTime<Utc>,
    ) -> bool {
        let index = match self.node_condition.iter().position(|n| n.name == node) {
            Some(index) => index,
            None => {
                self.node_condition.push(CohortNodeCondition {
                    name: node.to_string(),
                    condition: Vec::new(),
                });
                self.node_condition.len() - 1
            }
        };
        condition::observe(&mut self.node_condition[index].condition, condition, now)
    }

    /// Get the cohort condition of the given type
    pub fn cohort_condition(&self, r#type: CohortConditionType) -> Option<&CohortCondition> {
        condition::find(&self.cohort_condition, &r#type)
    }
}

// =============================================================================
// CRD Manifest
// =============================================================================

/// The CustomResourceDefinition for StorageCohort
pub fn crd() -> CustomResourceDefinition {
    let mut crd = StorageCohort::crd();
    // not set by the derive
    crd.spec.names.list_kind = Some(format!("{}List", StorageCohort::kind(&())));
    crd
}

/// The CustomResourceDefinition rendered as YAML
pub fn crd_yaml() -> Result<String> {
    Ok(serde_yaml::to_string(&crd())?)
}
