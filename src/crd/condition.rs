//! Status conditions
//!
//! A condition is a typed tri-state flag with heartbeat and transition
//! timestamps. Cohort-level conditions use the closed [`CohortConditionType`]
//! enumeration, component and node conditions use free-form string types;
//! both share the [`Condition`] record.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// =============================================================================
// Condition Status
// =============================================================================

/// Condition status values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    pub fn is_true(self) -> bool {
        self == ConditionStatus::True
    }

    /// Combine several observations of the same flag.
    ///
    /// No observation at all is `Unknown`, a single `False` wins over
    /// everything, then a single `Unknown`; only a unanimous `True` is `True`.
    pub fn all_of<I>(statuses: I) -> ConditionStatus
    where
        I: IntoIterator<Item = ConditionStatus>,
    {
        let mut seen = false;
        let mut unknown = false;
        for status in statuses {
            seen = true;
            match status {
                ConditionStatus::False => return ConditionStatus::False,
                ConditionStatus::Unknown => unknown = true,
                ConditionStatus::True => {}
            }
        }
        if !seen || unknown {
            ConditionStatus::Unknown
        } else {
            ConditionStatus::True
        }
    }
}

impl From<bool> for ConditionStatus {
    fn from(value: bool) -> Self {
        if value {
            ConditionStatus::True
        } else {
            ConditionStatus::False
        }
    }
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConditionStatus::True => write!(f, "True"),
            ConditionStatus::False => write!(f, "False"),
            ConditionStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

// =============================================================================
// Cohort Condition Types
// =============================================================================

/// Condition types valid at cohort level.
///
/// The set is closed: any other value fails to deserialize, and the
/// generated CRD schema carries the same enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum CohortConditionType {
    /// The cohort is healthy and ready to perform its task
    Ready,
    /// The cohort is healthy and eligible for placement
    Schedulable,
}

impl std::fmt::Display for CohortConditionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CohortConditionType::Ready => write!(f, "Ready"),
            CohortConditionType::Schedulable => write!(f, "Schedulable"),
        }
    }
}

// =============================================================================
// Condition Record
// =============================================================================

/// A typed, timestamped condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition<T> {
    /// Type of condition
    pub r#type: T,

    /// Status of the condition, one of True, False, Unknown
    pub status: ConditionStatus,

    /// Last time the condition was observed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub last_heartbeat_time: Option<DateTime<Utc>>,

    /// Last time the condition status changed value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub last_transition_time: Option<DateTime<Utc>>,

    /// Brief reason for the last transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human readable details about the last transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Condition of the cohort as a whole
pub type CohortCondition = Condition<CohortConditionType>;

/// Condition of a cohort manager or of an individual node
pub type ComponentCondition = Condition<String>;

impl<T> Condition<T> {
    /// A condition without timestamps; they are stamped by [`observe`].
    pub fn new(r#type: impl Into<T>, status: ConditionStatus) -> Self {
        Self {
            r#type: r#type.into(),
            status,
            last_heartbeat_time: None,
            last_transition_time: None,
            reason: None,
            message: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_true(&self) -> bool {
        self.status.is_true()
    }
}

// =============================================================================
// Bookkeeping
// =============================================================================

/// Find the condition of the given type.
pub fn find<'a, T, K>(conditions: &'a [Condition<T>], r#type: &K) -> Option<&'a Condition<T>>
where
    T: PartialEq<K>,
    K: ?Sized,
{
    conditions.iter().find(|c| c.r#type == *r#type)
}

/// Record an observation of a condition.
///
/// The heartbeat is stamped with `now` on every observation. The transition
/// time moves only when the status value differs from what was recorded (or
/// when the type is seen for the first time). Reason and message are taken
/// from the observation. Returns `true` when the status transitioned.
pub fn observe<T>(conditions: &mut Vec<Condition<T>>, observed: Condition<T>, now: DateTime<Utc>) -> bool
where
    T: PartialEq,
{
    match conditions.iter_mut().find(|c| c.r#type == observed.r#type) {
        Some(existing) => {
            let transitioned = existing.status != observed.status;
            existing.last_heartbeat_time = Some(now);
            if transitioned || existing.last_transition_time.is_none() {
                existing.last_transition_time = Some(now);
            }
            existing.status = observed.status;
            existing.reason = observed.reason;
            existing.message = observed.message;
            transitioned
        }
        None => {
            conditions.push(Condition {
                last_heartbeat_time: Some(now),
                last_transition_time: Some(now),
                ..observed
            });
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_all_of() {
        use ConditionStatus::*;
        assert_eq!(ConditionStatus::all_of(std::iter::empty()), Unknown);
        assert_eq!(ConditionStatus::all_of([True, True]), True);
        assert_eq!(ConditionStatus::all_of([True, Unknown]), Unknown);
        assert_eq!(ConditionStatus::all_of([Unknown, False, True]), False);
    }

    #[test]
    fn test_first_observation_stamps_both() {
        let mut conditions = Vec::new();
        let changed = observe(
            &mut conditions,
            CohortCondition::new(CohortConditionType::Ready, ConditionStatus::True),
            t0(),
        );
        assert!(changed);
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].last_heartbeat_time, Some(t0()));
        assert_eq!(conditions[0].last_transition_time, Some(t0()));
    }

    #[test]
    fn test_heartbeat_without_transition() {
        let mut conditions = Vec::new();
        observe(
            &mut conditions,
            CohortCondition::new(CohortConditionType::Ready, ConditionStatus::True),
            t0(),
        );

        let later = t0() + Duration::seconds(30);
        let changed = observe(
            &mut conditions,
            CohortCondition::new(CohortConditionType::Ready, ConditionStatus::True)
                .with_reason("StillHealthy"),
            later,
        );

        assert!(!changed);
        assert_eq!(conditions[0].last_heartbeat_time, Some(later));
        assert_eq!(conditions[0].last_transition_time, Some(t0()));
        assert_eq!(conditions[0].reason.as_deref(), Some("StillHealthy"));
    }

    #[test]
    fn test_transition_moves_both_timestamps() {
        let mut conditions = Vec::new();
        observe(
            &mut conditions,
            ComponentCondition::new("DiskPressure", ConditionStatus::False),
            t0(),
        );

        let later = t0() + Duration::minutes(5);
        let changed = observe(
            &mut conditions,
            ComponentCondition::new("DiskPressure", ConditionStatus::True)
                .with_message("pool is 95% full"),
            later,
        );

        assert!(changed);
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].status, ConditionStatus::True);
        assert_eq!(conditions[0].last_transition_time, Some(later));
        assert_eq!(conditions[0].last_heartbeat_time, Some(later));
    }

    #[test]
    fn test_independent_types() {
        let mut conditions = Vec::new();
        observe(
            &mut conditions,
            CohortCondition::new(CohortConditionType::Ready, ConditionStatus::True),
            t0(),
        );
        observe(
            &mut conditions,
            CohortCondition::new(CohortConditionType::Schedulable, ConditionStatus::False),
            t0(),
        );

        assert_eq!(conditions.len(), 2);
        let ready = find(&conditions, &CohortConditionType::Ready).unwrap();
        assert!(ready.is_true());
        let schedulable = find(&conditions, &CohortConditionType::Schedulable).unwrap();
        assert!(!schedulable.is_true());
    }

    #[test]
    fn test_find_component_by_str() {
        let conditions = vec![ComponentCondition::new("Reachable", ConditionStatus::Unknown)];
        assert!(find(&conditions, "Reachable").is_some());
        assert!(find(&conditions, "Missing").is_none());
    }

    #[test]
    fn test_cohort_condition_type_is_closed() {
        let ok: CohortConditionType = serde_json::from_str(r#""Schedulable""#).unwrap();
        assert_eq!(ok, CohortConditionType::Schedulable);
        assert!(serde_json::from_str::<CohortConditionType>(r#""Degraded""#).is_err());
    }

    #[test]
    fn test_condition_wire_format() {
        let condition = CohortCondition {
            last_heartbeat_time: Some(t0()),
            ..CohortCondition::new(CohortConditionType::Ready, ConditionStatus::True)
        };
        let json = serde_json::to_value(&condition).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "Ready",
                "status": "True",
                "lastHeartbeatTime": "2021-06-01T12:00:00Z"
            })
        );
    }
}
