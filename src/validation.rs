//! Admission-style validation
//!
//! The schema itself enforces field presence only. These checks cover what an
//! admission layer is expected to enforce on top of it: node names must be DNS
//! labels, condition lists must not repeat a type, selector requirements must
//! be well formed. A provisioner outside the known set is only a warning.

use std::collections::{BTreeSet, HashSet};
use tracing::debug;

use crate::crd::{Condition, StorageCohort};
use crate::error::{Error, Result};
use crate::selector::check_requirement;

/// LVM-backed provisioner
pub const LVM_PROVISIONER: &str = "openebs.io/scp-lvm-provisioner";

/// Raw device provisioner
pub const DEVICE_PROVISIONER: &str = "openebs.io/scp-device-provisioner";

const DNS_LABEL_MAX_LEN: usize = 63;

// =============================================================================
// Issues
// =============================================================================

/// Severity of a validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A finding attached to a field path such as
/// `status.components[0].nodeCondition[1].name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub path: String,
    pub severity: Severity,
    pub message: String,
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.path, self.message)
    }
}

/// All findings for one cohort
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub name: String,
    pub issues: Vec<FieldIssue>,
}

impl ValidationReport {
    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.issues.push(FieldIssue {
            path: path.into(),
            severity: Severity::Error,
            message: message.into(),
        });
    }

    fn warning(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.issues.push(FieldIssue {
            path: path.into(),
            severity: Severity::Warning,
            message: message.into(),
        });
    }

    pub fn errors(&self) -> impl Iterator<Item = &FieldIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &FieldIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    /// No error-level findings
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    /// Fail with the error-level findings, or hand the report back
    pub fn into_result(self) -> Result<Self> {
        if self.is_valid() {
            return Ok(self);
        }
        Err(Error::Validation {
            name: self.name,
            issues: self
                .issues
                .into_iter()
                .filter(|i| i.severity == Severity::Error)
                .collect(),
        })
    }
}

// =============================================================================
// Validator
// =============================================================================

/// Validates StorageCohort resources
#[derive(Debug, Clone)]
pub struct Validator {
    known_provisioners: BTreeSet<String>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new([LVM_PROVISIONER, DEVICE_PROVISIONER])
    }
}

impl Validator {
    /// Create a validator that recognises the given provisioners
    pub fn new<I, S>(known_provisioners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known_provisioners: known_provisioners.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_known_provisioner(&self, provisioner: &str) -> bool {
        self.known_provisioners.contains(provisioner)
    }

    /// Run every check against a cohort
    pub fn validate(&self, cohort: &StorageCohort) -> ValidationReport {
        let mut report = ValidationReport {
            name: cohort.name().to_string(),
            issues: Vec::new(),
        };

        self.validate_spec(cohort, &mut report);
        validate_status(cohort, &mut report);

        debug!(
            "Validated cohort {}: {} error(s), {} warning(s)",
            report.name,
            report.errors().count(),
            report.warnings().count()
        );
        report
    }

    fn validate_spec(&self, cohort: &StorageCohort, report: &mut ValidationReport) {
        if let Some(provisioner) = cohort.default_provisioner() {
            let path = "spec.defaultStorageProvisioner";
            if provisioner.trim().is_empty() {
                report.error(path, "must not be empty when set");
            } else if !self.is_known_provisioner(provisioner) {
                report.warning(path, format!("provisioner {:?} is not recognised", provisioner));
            }
        }

        if let Some(selector) = &cohort.spec.node_selector {
            for (i, requirement) in selector.match_expressions.iter().flatten().enumerate() {
                if let Err(e) = check_requirement(requirement) {
                    report.error(format!("spec.nodeSelector.matchExpressions[{}]", i), e.to_string());
                }
            }
        }
    }
}

fn validate_status(cohort: &StorageCohort, report: &mut ValidationReport) {
    let Some(status) = &cohort.status else {
        return;
    };

    for (c, component) in status.components.iter().enumerate() {
        let base = format!("status.components[{}]", c);

        check_conditions(
            &component.cohort_condition,
            &format!("{}.cohortCondition", base),
            report,
        );
        check_conditions(
            &component.cohort_manager_condition,
            &format!("{}.cohortManagerCondition", base),
            report,
        );
        check_type_names(
            &component.cohort_manager_condition,
            &format!("{}.cohortManagerCondition", base),
            report,
        );

        let mut seen_nodes = HashSet::new();
        for (n, node) in component.node_condition.iter().enumerate() {
            let path = format!("{}.nodeCondition[{}]", base, n);
            if let Err(reason) = check_dns_label(&node.name) {
                report.error(format!("{}.name", path), reason);
            }
            if !seen_nodes.insert(node.name.as_str()) {
                report.warning(
                    format!("{}.name", path),
                    format!("node {:?} is listed more than once", node.name),
                );
            }
            let conditions_path = format!("{}.condition", path);
            check_conditions(&node.condition, &conditions_path, report);
            check_type_names(&node.condition, &conditions_path, report);
        }
    }
}

fn check_conditions<T>(conditions: &[Condition<T>], path: &str, report: &mut ValidationReport)
where
    T: PartialEq + std::fmt::Display,
{
    for (i, condition) in conditions.iter().enumerate() {
        if conditions[..i].iter().any(|c| c.r#type == condition.r#type) {
            report.error(
                format!("{}[{}].type", path, i),
                format!("duplicate condition type {}", condition.r#type),
            );
        }
        if let (Some(heartbeat), Some(transition)) =
            (condition.last_heartbeat_time, condition.last_transition_time)
        {
            if transition > heartbeat {
                report.warning(
                    format!("{}[{}].lastTransitionTime", path, i),
                    "later than lastHeartbeatTime",
                );
            }
        }
    }
}

fn check_type_names(conditions: &[Condition<String>], path: &str, report: &mut ValidationReport) {
    for (i, condition) in conditions.iter().enumerate() {
        if condition.r#type.trim().is_empty() {
            report.error(format!("{}[{}].type", path, i), "must not be empty");
        }
    }
}

/// Check a name against the DNS-1123 label rules.
pub fn check_dns_label(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("must not be empty".to_string());
    }
    if name.len() > DNS_LABEL_MAX_LEN {
        return Err(format!("must be no more than {} characters", DNS_LABEL_MAX_LEN));
    }
    let valid_char = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-';
    let bytes = name.as_bytes();
    if !bytes.iter().all(|&b| valid_char(b)) || bytes[0] == b'-' || bytes[bytes.len() - 1] == b'-' {
        return Err(format!(
            "{:?} must consist of lower case alphanumeric characters or '-', \
             and must start and end with an alphanumeric character",
            name
        ));
    }
    Ok(())
}
