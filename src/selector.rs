//! Node selection
//!
//! Evaluates a cohort's `nodeSelector` against node labels. An absent or
//! empty selector selects every node; otherwise `matchLabels` and every
//! `matchExpressions` requirement must hold.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::crd::StorageCohort;
use crate::error::{Error, Result};

/// Label selector operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorOperator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

impl FromStr for SelectorOperator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "In" => Ok(SelectorOperator::In),
            "NotIn" => Ok(SelectorOperator::NotIn),
            "Exists" => Ok(SelectorOperator::Exists),
            "DoesNotExist" => Ok(SelectorOperator::DoesNotExist),
            other => Err(Error::InvalidSelector(format!("unknown operator {:?}", other))),
        }
    }
}

impl std::fmt::Display for SelectorOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectorOperator::In => write!(f, "In"),
            SelectorOperator::NotIn => write!(f, "NotIn"),
            SelectorOperator::Exists => write!(f, "Exists"),
            SelectorOperator::DoesNotExist => write!(f, "DoesNotExist"),
        }
    }
}

/// Check that a requirement is well formed and return its operator.
pub fn check_requirement(requirement: &LabelSelectorRequirement) -> Result<SelectorOperator> {
    let operator: SelectorOperator = requirement.operator.parse()?;
    let has_values = requirement.values.as_ref().is_some_and(|v| !v.is_empty());
    match operator {
        SelectorOperator::In | SelectorOperator::NotIn if !has_values => Err(Error::InvalidSelector(
            format!("{} on key {:?} requires values", operator, requirement.key),
        )),
        SelectorOperator::Exists | SelectorOperator::DoesNotExist if has_values => {
            Err(Error::InvalidSelector(format!(
                "{} on key {:?} must not have values",
                operator, requirement.key
            )))
        }
        _ => Ok(operator),
    }
}

/// Whether the selector selects a node with the given labels.
///
/// Every requirement is checked before any label is compared, so a
/// malformed selector is an error for every node.
pub fn selects(selector: Option<&LabelSelector>, labels: &BTreeMap<String, String>) -> Result<bool> {
    let Some(selector) = selector else {
        return Ok(true);
    };

    let requirements = selector
        .match_expressions
        .iter()
        .flatten()
        .map(|r| check_requirement(r).map(|operator| (r, operator)))
        .collect::<Result<Vec<_>>>()?;

    if let Some(match_labels) = &selector.match_labels {
        if match_labels.iter().any(|(k, v)| labels.get(k) != Some(v)) {
            return Ok(false);
        }
    }

    Ok(requirements.into_iter().all(|(requirement, operator)| {
        let value = labels.get(&requirement.key);
        let values = requirement.values.as_deref().unwrap_or_default();
        match operator {
            SelectorOperator::In => value.is_some_and(|v| values.contains(v)),
            SelectorOperator::NotIn => value.map_or(true, |v| !values.contains(v)),
            SelectorOperator::Exists => value.is_some(),
            SelectorOperator::DoesNotExist => value.is_none(),
        }
    }))
}

impl StorageCohort {
    /// Whether a node with the given labels belongs to this cohort
    pub fn selects_node(&self, labels: &BTreeMap<String, String>) -> Result<bool> {
        selects(self.spec.node_selector.as_ref(), labels)
    }
}
