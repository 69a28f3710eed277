//! Loading StorageCohort documents
//!
//! Reads YAML (or JSON) streams that may hold several documents. Documents
//! of any other kind are skipped so a cohort can be checked straight from a
//! mixed manifest.

use kube::Resource;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

use crate::crd::StorageCohort;
use crate::error::Result;

/// Parse every StorageCohort document in a YAML stream
pub fn parse_cohorts(input: &str) -> Result<Vec<StorageCohort>> {
    let kind = StorageCohort::kind(&());
    let mut cohorts = Vec::new();

    for (index, document) in serde_yaml::Deserializer::from_str(input).enumerate() {
        let value = serde_yaml::Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        match value.get("kind").and_then(|k| k.as_str()) {
            Some(k) if k == kind => {
                cohorts.push(serde_yaml::from_value(value)?);
            }
            other => {
                warn!("Skipping document {} of kind {:?}", index, other);
            }
        }
    }

    Ok(cohorts)
}

/// Read every StorageCohort document from a file
pub fn load_cohorts(path: &Path) -> Result<Vec<StorageCohort>> {
    let input = std::fs::read_to_string(path)?;
    let cohorts = parse_cohorts(&input)?;
    debug!("Loaded {} cohort(s) from {}", cohorts.len(), path.display());
    Ok(cohorts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::health::CohortHealth;
    use assert_matches::assert_matches;
    use std::io::Write;

    const MIXED: &str = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: unrelated
---
apiVersion: scp.openebs.io/v1alpha1
kind: StorageCohort
metadata:
  name: cohort-a
  namespace: openebs
spec:
  defaultStorageProvisioner: openebs.io/scp-lvm-provisioner
  cohortManager:
    endpoint: http://cohort-manager:9500
status:
  components:
    - cohortCondition:
        - type: Ready
          status: "True"
          lastHeartbeatTime: "2021-06-01T12:00:00Z"
          lastTransitionTime: "2021-06-01T11:00:00Z"
        - type: Schedulable
          status: "True"
---
apiVersion: scp.openebs.io/v1alpha1
kind: StorageCohort
metadata:
  name: cohort-b
spec: {}
"#;

    #[test]
    fn test_parse_mixed_stream() {
        let cohorts = parse_cohorts(MIXED).unwrap();
        assert_eq!(cohorts.len(), 2);
        assert_eq!(cohorts[0].name(), "cohort-a");
        assert_eq!(cohorts[0].health(), CohortHealth::FullyFunctional);
        assert_eq!(
            cohorts[0].spec.cohort_manager.as_ref().unwrap()["endpoint"],
            "http://cohort-manager:9500"
        );
        assert_eq!(cohorts[1].name(), "cohort-b");
        assert_eq!(cohorts[1].health(), CohortHealth::Unknown);
    }

    #[test]
    fn test_bad_condition_type_fails() {
        let input = r#"
apiVersion: scp.openebs.io/v1alpha1
kind: StorageCohort
metadata:
  name: bad
spec: {}
status:
  components:
    - cohortCondition:
        - type: Degraded
          status: "True"
"#;
        assert_matches!(parse_cohorts(input), Err(Error::YamlParse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MIXED.as_bytes()).unwrap();
        let cohorts = load_cohorts(file.path()).unwrap();
        assert_eq!(cohorts.len(), 2);

        let missing = file.path().with_extension("missing");
        assert_matches!(load_cohorts(&missing), Err(Error::Io(_)));
    }
}
