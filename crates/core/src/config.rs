//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services. The
//! binaries read environment variables; nothing in this crate does so during request handling.

use crate::dosing::DosingPolicy;
use crate::labs::LabCatalogue;
use crate::medication::Frequency;
use crate::validation::parse_time_of_day;
use crate::{CoreError, CoreResult};
use chrono::Duration;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    policy: DosingPolicy,
    catalogue: LabCatalogue,
}

impl CoreConfig {
    pub fn new(policy: DosingPolicy, catalogue: LabCatalogue) -> Self {
        Self { policy, catalogue }
    }

    /// Default policy and the built-in lab catalogue.
    pub fn builtin() -> CoreResult<Self> {
        Ok(Self::new(DosingPolicy::default(), LabCatalogue::builtin()?))
    }

    /// Resolve configuration from optional file overrides.
    ///
    /// `policy_file` and `catalogue_file` usually come from `HACCARE_POLICY_FILE` and
    /// `HACCARE_LAB_CATALOGUE`. Absent values fall back to the defaults.
    pub fn resolve(policy_file: Option<PathBuf>, catalogue_file: Option<PathBuf>) -> CoreResult<Self> {
        let policy = match non_empty_path(policy_file) {
            Some(path) => load_policy(&path)?,
            None => DosingPolicy::default(),
        };
        let catalogue = match non_empty_path(catalogue_file) {
            Some(path) => LabCatalogue::load(&path)?,
            None => LabCatalogue::builtin()?,
        };

        tracing::debug!(
            lab_tests = catalogue.len(),
            early_window_minutes = policy.early_window().num_minutes(),
            "resolved core configuration"
        );

        Ok(Self::new(policy, catalogue))
    }

    pub fn policy(&self) -> &DosingPolicy {
        &self.policy
    }

    pub fn catalogue(&self) -> &LabCatalogue {
        &self.catalogue
    }
}

fn non_empty_path(path: Option<PathBuf>) -> Option<PathBuf> {
    path.filter(|p| !p.as_os_str().is_empty())
}

/// Policy file schema. Every field is optional; omitted fields keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PolicyFileWire {
    early_window_minutes: Option<i64>,
    default_minimum_interval_minutes: Option<i64>,
    default_admin_time: Option<String>,
    #[serde(default)]
    minimum_intervals: BTreeMap<String, i64>,
}

/// Load a YAML policy file on top of the default policy.
pub fn load_policy(path: &Path) -> CoreResult<DosingPolicy> {
    let text = std::fs::read_to_string(path).map_err(CoreError::FileRead)?;
    parse_policy(&text)
}

/// Parse YAML policy overrides on top of the default policy.
///
/// ```yaml
/// early_window_minutes: 45
/// default_admin_time: "09:00"
/// minimum_intervals:
///   Once daily: 1260
///   Every 6 hours: 270
/// ```
pub fn parse_policy(yaml_text: &str) -> CoreResult<DosingPolicy> {
    let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
    let wire: PolicyFileWire = match serde_path_to_error::deserialize(deserializer) {
        Ok(parsed) => parsed,
        Err(err) => {
            let path = err.path().to_string();
            return Err(CoreError::Policy(format!(
                "policy schema mismatch at {path}: {}",
                err.into_inner()
            )));
        }
    };

    let mut policy = DosingPolicy::default();

    if let Some(minutes) = wire.early_window_minutes {
        policy = policy.with_early_window(non_negative_minutes("early_window_minutes", minutes)?);
    }
    if let Some(minutes) = wire.default_minimum_interval_minutes {
        policy = policy.with_default_minimum_interval(non_negative_minutes(
            "default_minimum_interval_minutes",
            minutes,
        )?);
    }
    if let Some(time) = wire.default_admin_time {
        policy = policy.with_default_admin_time(parse_time_of_day(&time)?);
    }
    for (label, minutes) in wire.minimum_intervals {
        let frequency = Frequency::parse(&label);
        let interval = non_negative_minutes(&label, minutes)?;
        if let Some(nominal) = frequency.nominal_interval() {
            if interval >= nominal {
                tracing::warn!(
                    frequency = %frequency,
                    minutes,
                    "minimum interval is not shorter than the nominal dosing interval"
                );
            }
        }
        policy = policy.with_minimum_interval(&frequency, interval);
    }

    Ok(policy)
}

fn non_negative_minutes(field: &str, minutes: i64) -> CoreResult<Duration> {
    if !(0..=7 * 24 * 60).contains(&minutes) {
        return Err(CoreError::Policy(format!(
            "{field}: minutes must be between 0 and 10080, got {minutes}"
        )));
    }
    Ok(Duration::minutes(minutes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_policy_file_keeps_defaults() {
        let policy = parse_policy("{}").expect("parse");
        assert_eq!(policy, DosingPolicy::default());
    }

    #[test]
    fn policy_overrides_are_applied() {
        let yaml = r#"
early_window_minutes: 45
default_minimum_interval_minutes: 300
default_admin_time: "09:30"
minimum_intervals:
  Every 6 hours: 270
  every 3 hours: 120
"#;
        let policy = parse_policy(yaml).expect("parse");
        assert_eq!(policy.early_window(), Duration::minutes(45));
        assert_eq!(policy.default_minimum_interval(), Duration::minutes(300));
        assert_eq!(policy.default_admin_time().to_string(), "09:30:00");
        assert_eq!(
            policy.minimum_interval(&Frequency::EveryHours(6)),
            Duration::minutes(270)
        );
        assert_eq!(
            policy.minimum_interval(&Frequency::EveryHours(3)),
            Duration::minutes(120)
        );
        assert_eq!(
            policy.minimum_interval(&Frequency::OnceDaily),
            Duration::hours(20)
        );
    }

    #[test]
    fn policy_rejects_unknown_keys() {
        let err = parse_policy("early_window: 10\n").expect_err("unknown key");
        assert!(matches!(err, CoreError::Policy(msg) if msg.contains("early_window")));
    }

    #[test]
    fn policy_rejects_negative_minutes() {
        let err = parse_policy("early_window_minutes: -5\n").expect_err("negative");
        assert!(matches!(err, CoreError::Policy(_)));
    }

    #[test]
    fn policy_rejects_bad_admin_time() {
        let err = parse_policy("default_admin_time: \"8 o'clock\"\n").expect_err("bad time");
        assert!(matches!(err, CoreError::InvalidTimeOfDay(_)));
    }

    #[test]
    fn resolve_uses_files_when_given() {
        let mut policy = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(policy, "early_window_minutes: 15").expect("write policy");
        let mut catalogue = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            catalogue,
            "tests:\n  - code: K\n    operator: between\n    low: 3.5\n    high: 5.0"
        )
        .expect("write catalogue");

        let cfg = CoreConfig::resolve(
            Some(policy.path().to_path_buf()),
            Some(catalogue.path().to_path_buf()),
        )
        .expect("resolve");
        assert_eq!(cfg.policy().early_window(), Duration::minutes(15));
        assert_eq!(cfg.catalogue().len(), 1);
    }

    #[test]
    fn resolve_defaults_without_files() {
        let cfg = CoreConfig::resolve(None, Some(PathBuf::new())).expect("resolve");
        assert_eq!(cfg.policy(), &DosingPolicy::default());
        assert!(cfg.catalogue().get("K").is_some());
    }

    #[test]
    fn resolve_reports_missing_files() {
        let err = CoreConfig::resolve(Some(PathBuf::from("/nonexistent/policy.yaml")), None)
            .expect_err("missing file");
        assert!(matches!(err, CoreError::FileRead(_)));
    }
}
