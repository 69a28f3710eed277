//! Cohort health
//!
//! Interprets the cohort-level conditions of a [`StorageCohort`]. Ready and
//! Schedulable are independent flags; a cohort is fully functional only when
//! both are True. A cohort that is Ready but not Schedulable is healthy but
//! must not receive new placements.

use crate::crd::{CohortConditionType, ConditionStatus, StorageCohort, StorageCohortStatus};

/// Interpreted health of a cohort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CohortHealth {
    /// Ready and Schedulable are both True
    FullyFunctional,
    /// Ready is True but Schedulable is not
    NotSchedulable,
    /// Ready is False
    NotReady,
    /// Ready was never reported or is Unknown
    Unknown,
}

impl CohortHealth {
    /// Evaluate a cohort status.
    ///
    /// A condition type is True only when it is reported at least once and
    /// every component reporting it says True.
    pub fn evaluate(status: Option<&StorageCohortStatus>) -> Self {
        let ready = condition_status(status, CohortConditionType::Ready);
        let schedulable = condition_status(status, CohortConditionType::Schedulable);
        Self::from_flags(ready, schedulable)
    }

    pub fn from_flags(ready: ConditionStatus, schedulable: ConditionStatus) -> Self {
        match (ready, schedulable) {
            (ConditionStatus::True, ConditionStatus::True) => CohortHealth::FullyFunctional,
            (ConditionStatus::True, _) => CohortHealth::NotSchedulable,
            (ConditionStatus::False, _) => CohortHealth::NotReady,
            (ConditionStatus::Unknown, _) => CohortHealth::Unknown,
        }
    }

    pub fn is_fully_functional(self) -> bool {
        self == CohortHealth::FullyFunctional
    }

    /// Whether the cohort may receive new placements
    pub fn is_schedulable(self) -> bool {
        self.is_fully_functional()
    }
}

impl std::fmt::Display for CohortHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CohortHealth::FullyFunctional => write!(f, "FullyFunctional"),
            CohortHealth::NotSchedulable => write!(f, "NotSchedulable"),
            CohortHealth::NotReady => write!(f, "NotReady"),
            CohortHealth::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Combined status of one cohort condition type across all components
pub fn condition_status(
    status: Option<&StorageCohortStatus>,
    r#type: CohortConditionType,
) -> ConditionStatus {
    ConditionStatus::all_of(
        status
            .into_iter()
            .flat_map(|s| s.components.iter())
            .flat_map(|c| c.cohort_condition.iter())
            .filter(|c| c.r#type == r#type)
            .map(|c| c.status),
    )
}

/// Combined status of every condition reported for a node
pub fn node_status(cohort: &StorageCohort, node: &str) -> ConditionStatus {
    ConditionStatus::all_of(cohort.node_conditions(node).map(|c| c.status))
}

impl StorageCohort {
    /// Interpreted health of this cohort
    pub fn health(&self) -> CohortHealth {
        CohortHealth::evaluate(self.status.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{CohortCondition, ComponentCondition, ComponentStatus, StorageCohortSpec};
    use chrono::Utc;

    fn cohort_with(components: Vec<Vec<(CohortConditionType, ConditionStatus)>>) -> StorageCohort {
        let mut cohort = StorageCohort::new("cohort", StorageCohortSpec::default());
        let now = Utc::now();
        for (index, conditions) in components.into_iter().enumerate() {
            let component = cohort.status_mut().component_mut(index);
            for (r#type, status) in conditions {
                component.set_cohort_condition(CohortCondition::new(r#type, status), now);
            }
        }
        cohort
    }

    #[test]
    fn test_fully_functional() {
        let cohort = cohort_with(vec![vec![
            (CohortConditionType::Ready, ConditionStatus::True),
            (CohortConditionType::Schedulable, ConditionStatus::True),
        ]]);
        assert_eq!(cohort.health(), CohortHealth::FullyFunctional);
        assert!(cohort.health().is_schedulable());
    }

    #[test]
    fn test_ready_but_not_schedulable() {
        let cohort = cohort_with(vec![vec![
            (CohortConditionType::Ready, ConditionStatus::True),
            (CohortConditionType::Schedulable, ConditionStatus::False),
        ]]);
        assert_eq!(cohort.health(), CohortHealth::NotSchedulable);
        assert!(!cohort.health().is_fully_functional());
    }

    #[test]
    fn test_ready_from_document() {
        let doc = serde_json::json!({
            "apiVersion": "scp.openebs.io/v1alpha1",
            "kind": "StorageCohort",
            "metadata": {"name": "doc"},
            "spec": {},
            "status": {"components": [{"cohortCondition": [
                {"type": "Ready", "status": "True"},
                {"type": "Schedulable", "status": "False"}
            ]}]},
        });
        let cohort: StorageCohort = serde_json::from_value(doc).unwrap();
        assert_eq!(cohort.health(), CohortHealth::NotSchedulable);
    }

    #[test]
    fn test_missing_schedulable_is_not_functional() {
        let cohort = cohort_with(vec![vec![(CohortConditionType::Ready, ConditionStatus::True)]]);
        assert_eq!(cohort.health(), CohortHealth::NotSchedulable);
    }

    #[test]
    fn test_not_ready_and_unknown() {
        let cohort = cohort_with(vec![vec![
            (CohortConditionType::Ready, ConditionStatus::False),
            (CohortConditionType::Schedulable, ConditionStatus::True),
        ]]);
        assert_eq!(cohort.health(), CohortHealth::NotReady);

        let cohort = cohort_with(vec![vec![(
            CohortConditionType::Ready,
            ConditionStatus::Unknown,
        )]]);
        assert_eq!(cohort.health(), CohortHealth::Unknown);

        let bare = StorageCohort::new("bare", StorageCohortSpec::default());
        assert_eq!(bare.health(), CohortHealth::Unknown);
    }

    #[test]
    fn test_disagreeing_components() {
        let cohort = cohort_with(vec![
            vec![
                (CohortConditionType::Ready, ConditionStatus::True),
                (CohortConditionType::Schedulable, ConditionStatus::True),
            ],
            vec![(CohortConditionType::Schedulable, ConditionStatus::False)],
        ]);
        assert_eq!(
            condition_status(cohort.status.as_ref(), CohortConditionType::Schedulable),
            ConditionStatus::False
        );
        assert_eq!(cohort.health(), CohortHealth::NotSchedulable);
    }

    #[test]
    fn test_node_status() {
        let mut cohort = StorageCohort::new("cohort", StorageCohortSpec::default());
        let now = Utc::now();
        cohort.status_mut().components.push(ComponentStatus::default());
        let component = cohort.status_mut().component_mut(0);
        component.set_node_condition("node-1", ComponentCondition::new("Ready", ConditionStatus::True), now);
        component.set_node_condition("node-2", ComponentCondition::new("Ready", ConditionStatus::True), now);
        component.set_node_condition(
            "node-2",
            ComponentCondition::new("Reachable", ConditionStatus::False),
            now,
        );

        assert_eq!(node_status(&cohort, "node-1"), ConditionStatus::True);
        assert_eq!(node_status(&cohort, "node-2"), ConditionStatus::False);
        assert_eq!(node_status(&cohort, "node-3"), ConditionStatus::Unknown);
    }
}
