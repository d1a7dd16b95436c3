//! Lab result service.
//!
//! Results carry a flag derived from the catalogue range and the patient's sex. The flag is
//! recomputed on every value change, so a stored result never disagrees with its inputs.

use super::medication::require_patient;
use crate::clinician::Clinician;
use crate::config::CoreConfig;
use crate::labs::{classify, LabFlag};
use crate::medication::Patient;
use crate::store::{Collection, RecordStore, Records, Scope};
use crate::{CoreResult, Timestamp};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// A stored lab result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabResult {
    pub id: Uuid,
    pub patient_id: String,
    /// Catalogue code, upper-cased.
    pub test_code: String,
    pub test_name: String,
    pub units: String,
    pub value: Option<f64>,
    pub flag: LabFlag,
    pub entered_by: Clinician,
    pub entered_at: Timestamp,
    #[serde(default)]
    pub acknowledged_by: Option<Clinician>,
    #[serde(default)]
    pub acknowledged_at: Option<Timestamp>,
}

impl LabResult {
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged_at.is_some()
    }
}

#[derive(Clone)]
pub struct LabService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn RecordStore>,
}

impl LabService {
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn RecordStore>) -> Self {
        Self { cfg, store }
    }

    /// Record a new result for the scoped patient.
    ///
    /// # Errors
    ///
    /// - `CoreError::UnknownLabTest` if the code is not in the catalogue.
    /// - `CoreError::NotFound` if the patient does not exist.
    pub fn record_result(
        &self,
        scope: &Scope,
        test_code: &str,
        value: Option<f64>,
        entered_by: &Clinician,
        now: Timestamp,
    ) -> CoreResult<LabResult> {
        let patient = self.patient(scope)?;
        let range = self.cfg.catalogue().require(test_code)?;

        let result = LabResult {
            id: Uuid::new_v4(),
            patient_id: patient.id.clone(),
            test_code: range.test_code.to_ascii_uppercase(),
            test_name: range.name.clone(),
            units: range.units.clone(),
            value,
            flag: classify(value, range, patient.sex),
            entered_by: entered_by.clone(),
            entered_at: now,
            acknowledged_by: None,
            acknowledged_at: None,
        };

        self.results(scope).insert(&result.id.to_string(), &result)?;
        log_flag(scope, &result, "lab result recorded");
        Ok(result)
    }

    /// Replace the value of a result and re-derive its flag.
    ///
    /// A changed value needs review again, so any acknowledgement is cleared.
    pub fn update_value(
        &self,
        scope: &Scope,
        lab_id: &str,
        value: Option<f64>,
        entered_by: &Clinician,
        now: Timestamp,
    ) -> CoreResult<LabResult> {
        let patient = self.patient(scope)?;
        let mut result: LabResult = self.results(scope).require(lab_id)?;
        let range = self.cfg.catalogue().require(&result.test_code)?;

        result.value = value;
        result.flag = classify(value, range, patient.sex);
        result.entered_by = entered_by.clone();
        result.entered_at = now;
        result.acknowledged_by = None;
        result.acknowledged_at = None;

        self.results(scope).update(lab_id, &result)?;
        log_flag(scope, &result, "lab result updated");
        Ok(result)
    }

    /// Mark a result as reviewed. Acknowledging twice keeps the first acknowledgement.
    pub fn acknowledge(
        &self,
        scope: &Scope,
        lab_id: &str,
        clinician: &Clinician,
        now: Timestamp,
    ) -> CoreResult<LabResult> {
        require_patient(scope)?;
        let mut result: LabResult = self.results(scope).require(lab_id)?;
        if result.is_acknowledged() {
            tracing::debug!(lab = lab_id, "lab result already acknowledged");
            return Ok(result);
        }

        result.acknowledged_by = Some(clinician.clone());
        result.acknowledged_at = Some(now);
        self.results(scope).update(lab_id, &result)?;

        tracing::info!(
            tenant = scope.tenant_id(),
            lab = lab_id,
            user = %clinician.user_id,
            "lab result acknowledged"
        );
        Ok(result)
    }

    pub fn list_results(&self, scope: &Scope) -> CoreResult<Vec<LabResult>> {
        require_patient(scope)?;
        let mut results: Vec<LabResult> = self.results(scope).list()?;
        results.sort_by_key(|r| r.entered_at);
        Ok(results)
    }

    fn patient(&self, scope: &Scope) -> CoreResult<Patient> {
        let patient_id = require_patient(scope)?;
        let tenant = scope.tenant_only();
        Records::new(self.store.as_ref(), &tenant, Collection::Patients).require(patient_id)
    }

    fn results<'a>(&'a self, scope: &'a Scope) -> Records<'a> {
        Records::new(self.store.as_ref(), scope, Collection::LabResults)
    }
}

fn log_flag(scope: &Scope, result: &LabResult, message: &str) {
    if result.flag.is_critical() {
        tracing::warn!(
            tenant = scope.tenant_id(),
            lab = %result.id,
            test = %result.test_code,
            flag = %result.flag,
            "{message}: critical value"
        );
    } else {
        tracing::info!(
            tenant = scope.tenant_id(),
            lab = %result.id,
            test = %result.test_code,
            flag = %result.flag,
            "{message}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MedicationService;
    use crate::store::InMemoryStore;
    use crate::CoreError;
    use chrono::DateTime;
    use haccare_types::Sex;

    fn at(s: &str) -> Timestamp {
        DateTime::parse_from_rfc3339(s).expect("valid timestamp")
    }

    fn nurse() -> Clinician {
        Clinician::new("u-1", "Nurse Joy", "nurse").expect("valid clinician")
    }

    fn setup(sex: Sex) -> (LabService, Scope) {
        let cfg = Arc::new(CoreConfig::builtin().expect("config"));
        let store: Arc<dyn RecordStore> = Arc::new(InMemoryStore::new());
        let meds = MedicationService::new(cfg.clone(), store.clone());
        let tenant = Scope::tenant("sim-ward").expect("valid tenant");
        let patient = meds
            .register_patient(&tenant, "PT000001", "Alan Turing", sex)
            .expect("register");
        let scope = tenant.patient(&patient.id).expect("scope");
        (LabService::new(cfg, store), scope)
    }

    #[test]
    fn record_result_flags_from_catalogue() {
        let (labs, scope) = setup(Sex::Male);
        let result = labs
            .record_result(&scope, "k", Some(6.8), &nurse(), at("2026-03-01T08:00:00Z"))
            .expect("record");
        assert_eq!(result.test_code, "K");
        assert_eq!(result.flag, LabFlag::CriticalHigh);
        assert!(!result.is_acknowledged());
    }

    #[test]
    fn sex_specific_ranges_use_patient_sex() {
        let (male, male_scope) = setup(Sex::Male);
        let (female, female_scope) = setup(Sex::Female);
        let now = at("2026-03-01T08:00:00Z");
        // Haemoglobin 125 g/L: low for a male, normal for a female.
        let m = male
            .record_result(&male_scope, "HGB", Some(125.0), &nurse(), now)
            .expect("record");
        let f = female
            .record_result(&female_scope, "HGB", Some(125.0), &nurse(), now)
            .expect("record");
        assert_eq!(m.flag, LabFlag::AbnormalLow);
        assert_eq!(f.flag, LabFlag::Normal);
    }

    #[test]
    fn unknown_test_code_is_rejected() {
        let (labs, scope) = setup(Sex::Unknown);
        let err = labs
            .record_result(&scope, "XYZ", Some(1.0), &nurse(), at("2026-03-01T08:00:00Z"))
            .expect_err("unknown test");
        assert!(matches!(err, CoreError::UnknownLabTest(_)));
    }

    #[test]
    fn update_value_reflags_and_clears_acknowledgement() {
        let (labs, scope) = setup(Sex::Unknown);
        let result = labs
            .record_result(&scope, "K", Some(6.8), &nurse(), at("2026-03-01T08:00:00Z"))
            .expect("record");
        let id = result.id.to_string();
        labs.acknowledge(&scope, &id, &nurse(), at("2026-03-01T08:10:00Z"))
            .expect("ack");

        let updated = labs
            .update_value(&scope, &id, Some(4.2), &nurse(), at("2026-03-01T09:00:00Z"))
            .expect("update");
        assert_eq!(updated.flag, LabFlag::Normal);
        assert!(!updated.is_acknowledged());

        let cleared = labs
            .update_value(&scope, &id, None, &nurse(), at("2026-03-01T09:05:00Z"))
            .expect("update");
        assert_eq!(cleared.flag, LabFlag::Normal);
        assert_eq!(cleared.value, None);
    }

    #[test]
    fn acknowledge_keeps_first_reviewer() {
        let (labs, scope) = setup(Sex::Unknown);
        let result = labs
            .record_result(&scope, "NA", Some(150.0), &nurse(), at("2026-03-01T08:00:00Z"))
            .expect("record");
        let id = result.id.to_string();
        let first = labs
            .acknowledge(&scope, &id, &nurse(), at("2026-03-01T08:10:00Z"))
            .expect("ack");
        let instructor =
            Clinician::new("u-2", "Dr Who", "instructor").expect("valid clinician");
        let second = labs
            .acknowledge(&scope, &id, &instructor, at("2026-03-01T09:00:00Z"))
            .expect("ack again");
        assert_eq!(first, second);
        assert_eq!(
            second.acknowledged_at,
            Some(at("2026-03-01T08:10:00Z"))
        );
        assert_eq!(labs.list_results(&scope).expect("list").len(), 1);
    }

    #[test]
    fn acknowledge_missing_result_is_not_found() {
        let (labs, scope) = setup(Sex::Unknown);
        let err = labs
            .acknowledge(&scope, "nope", &nurse(), at("2026-03-01T08:00:00Z"))
            .expect_err("missing");
        assert!(matches!(err, CoreError::NotFound { .. }));
    }
}
