//! Read-only access to StorageCohort resources in a cluster

use kube::api::{Api, ListParams};
use kube::Client;
use tracing::{debug, info};

use crate::crd::{StorageCohort, StorageCohortList};
use crate::error::{Error, Result};

/// Which namespaces to read cohorts from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CohortScope {
    /// A single namespace
    Namespace(String),
    /// Every namespace
    All,
}

impl CohortScope {
    fn api(&self, client: Client) -> Api<StorageCohort> {
        match self {
            CohortScope::Namespace(ns) => Api::namespaced(client, ns),
            CohortScope::All => Api::all(client),
        }
    }
}

impl std::fmt::Display for CohortScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CohortScope::Namespace(ns) => write!(f, "namespace {}", ns),
            CohortScope::All => write!(f, "all namespaces"),
        }
    }
}

/// List the cohorts visible in the given scope
pub async fn list_cohorts(client: Client, scope: &CohortScope) -> Result<StorageCohortList> {
    let cohorts = scope.api(client).list(&ListParams::default()).await?;
    info!("Listed {} storage cohort(s) in {}", cohorts.items.len(), scope);
    Ok(cohorts)
}

/// Fetch one cohort by name
pub async fn get_cohort(client: Client, namespace: &str, name: &str) -> Result<StorageCohort> {
    let api: Api<StorageCohort> = Api::namespaced(client, namespace);
    debug!("Fetching storage cohort {}/{}", namespace, name);
    api.get_opt(name).await?.ok_or_else(|| Error::ResourceNotFound {
        kind: "StorageCohort".to_string(),
        name: format!("{}/{}", namespace, name),
    })
}
