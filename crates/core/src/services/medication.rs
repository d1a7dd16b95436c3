//! Medication administration record (MAR) service.
//!
//! Applies the BCMA rules around the record store:
//!
//! - registering patients and medication orders,
//! - recomputing `next_due` after every administration and every schedule edit,
//! - appending one [`AdministrationEvent`] per accepted administration attempt.
//!
//! Administration events are append-only; nothing here updates or deletes them. Concurrent
//! administrations of the same medication must be serialised by the caller (the hosted backend
//! does this with a uniqueness constraint); this service does not guarantee at-most-once.

use crate::bcma::{verify_administration, CheckResults, Override, ScanInput};
use crate::clinician::Clinician;
use crate::config::CoreConfig;
use crate::medication::{Frequency, Medication, MedicationCategory, Patient};
use crate::schedule::compute_next_due;
use crate::store::{Collection, RecordStore, Records, Scope};
use crate::{CoreError, CoreResult, Timestamp};
use chrono::{NaiveDate, NaiveTime};
use haccare_types::{NonEmptyText, Sex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// One accepted administration, as written to the MAR.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdministrationEvent {
    pub id: Uuid,
    pub tenant_id: String,
    pub patient_id: String,
    pub medication_id: String,
    pub administered_by: Clinician,
    pub administered_at: Timestamp,
    pub scanned_patient_code: String,
    pub scanned_medication_code: String,
    pub checks: CheckResults,
    pub overrides: Vec<Override>,
    pub warnings: Vec<String>,
    pub notes: Option<String>,
}

/// Input for [`MedicationService::add_medication`].
#[derive(Clone, Debug)]
pub struct NewMedication {
    pub name: NonEmptyText,
    pub dosage: NonEmptyText,
    pub route: NonEmptyText,
    pub frequency: Frequency,
    pub category: MedicationCategory,
    pub admin_times: Vec<NaiveTime>,
    pub start_date: Option<NaiveDate>,
}

/// Input for [`MedicationService::administer`].
#[derive(Clone, Debug, Default)]
pub struct AdministrationRequest {
    pub scan: ScanInput,
    pub notes: Option<String>,
}

/// Outcome of an accepted administration.
#[derive(Clone, Debug, PartialEq)]
pub struct AdministrationOutcome {
    pub event: AdministrationEvent,
    pub next_due: Option<Timestamp>,
}

/// Service for patients, medication orders and administrations.
#[derive(Clone)]
pub struct MedicationService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn RecordStore>,
}

impl MedicationService {
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn RecordStore>) -> Self {
        Self { cfg, store }
    }

    /// Register a patient in a tenant.
    pub fn register_patient(
        &self,
        scope: &Scope,
        patient_number: &str,
        name: &str,
        sex: Sex,
    ) -> CoreResult<Patient> {
        let patient = Patient {
            id: Uuid::new_v4().to_string(),
            patient_number: NonEmptyText::new(patient_number)?,
            name: NonEmptyText::new(name)?,
            sex,
        };
        let tenant = scope.tenant_only();
        Records::new(self.store.as_ref(), &tenant, Collection::Patients)
            .insert(&patient.id, &patient)?;

        tracing::info!(tenant = scope.tenant_id(), patient = %patient.id, "registered patient");
        Ok(patient)
    }

    /// Load a patient of the scope's tenant.
    pub fn patient(&self, scope: &Scope, patient_id: &str) -> CoreResult<Patient> {
        let tenant = scope.tenant_only();
        Records::new(self.store.as_ref(), &tenant, Collection::Patients).require(patient_id)
    }

    /// Add a medication order and compute its first `next_due`.
    ///
    /// `scope` must be narrowed to the patient.
    pub fn add_medication(
        &self,
        scope: &Scope,
        new: NewMedication,
        now: Timestamp,
    ) -> CoreResult<Medication> {
        let patient_id = require_patient(scope)?;
        self.patient(scope, patient_id)?;

        let mut medication = Medication {
            id: Uuid::new_v4().to_string(),
            patient_id: patient_id.to_string(),
            name: new.name,
            dosage: new.dosage,
            route: new.route,
            frequency: new.frequency,
            category: new.category,
            admin_times: new.admin_times,
            start_date: new.start_date,
            last_administered: None,
            next_due: None,
        };
        medication.next_due = Some(self.next_due_for(&medication, now));

        self.medications(scope).insert(&medication.id, &medication)?;
        tracing::info!(
            tenant = scope.tenant_id(),
            medication = %medication.id,
            frequency = %medication.frequency,
            "added medication"
        );
        Ok(medication)
    }

    pub fn medication(&self, scope: &Scope, medication_id: &str) -> CoreResult<Medication> {
        require_patient(scope)?;
        self.medications(scope).require(medication_id)
    }

    pub fn list_medications(&self, scope: &Scope) -> CoreResult<Vec<Medication>> {
        require_patient(scope)?;
        self.medications(scope).list()
    }

    /// Edit frequency and/or admin times; `next_due` is recomputed.
    pub fn update_schedule(
        &self,
        scope: &Scope,
        medication_id: &str,
        frequency: Option<Frequency>,
        admin_times: Option<Vec<NaiveTime>>,
        now: Timestamp,
    ) -> CoreResult<Medication> {
        let mut medication = self.medication(scope, medication_id)?;
        if let Some(frequency) = frequency {
            medication.frequency = frequency;
        }
        if let Some(admin_times) = admin_times {
            medication.admin_times = admin_times;
        }
        medication.next_due = Some(self.next_due_for(&medication, now));

        self.medications(scope).update(&medication.id, &medication)?;
        tracing::info!(
            tenant = scope.tenant_id(),
            medication = %medication.id,
            "updated medication schedule"
        );
        Ok(medication)
    }

    /// Verify and record one administration attempt.
    ///
    /// # Errors
    ///
    /// - `CoreError::AdministrationRejected` if any check failed without an override; nothing is
    ///   written in that case.
    /// - `CoreError::NotFound` if the patient or medication does not exist in the scope.
    pub fn administer(
        &self,
        scope: &Scope,
        medication_id: &str,
        clinician: &Clinician,
        request: AdministrationRequest,
        now: Timestamp,
    ) -> CoreResult<AdministrationOutcome> {
        let patient_id = require_patient(scope)?;
        let patient = self.patient(scope, patient_id)?;
        let mut medication = self.medication(scope, medication_id)?;

        let verification = verify_administration(
            &patient,
            &medication,
            &request.scan,
            now,
            self.cfg.policy(),
        );

        if !verification.is_valid {
            tracing::warn!(
                tenant = scope.tenant_id(),
                medication = %medication.id,
                user = %clinician.user_id,
                errors = ?verification.errors,
                "administration rejected"
            );
            return Err(CoreError::AdministrationRejected(verification.errors));
        }

        let event = AdministrationEvent {
            id: Uuid::new_v4(),
            tenant_id: scope.tenant_id().to_string(),
            patient_id: patient.id.clone(),
            medication_id: medication.id.clone(),
            administered_by: clinician.clone(),
            administered_at: now,
            scanned_patient_code: request.scan.scanned_patient_code.trim().to_string(),
            scanned_medication_code: request.scan.scanned_medication_code.trim().to_string(),
            checks: verification.checks,
            overrides: request
                .scan
                .overrides
                .into_iter()
                .filter(|o| verification.overridden.contains(&o.check))
                .collect(),
            warnings: verification.warnings,
            notes: request
                .notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        };

        // The order is advanced before the event is appended: a failed append rolls the order
        // back, so a stale `last_administered` never sits beside a recorded dose.
        let previous = medication.clone();
        medication.last_administered = Some(now);
        medication.next_due = Some(self.next_due_after_dose(&medication, now));
        self.medications(scope).update(&medication.id, &medication)?;

        if let Err(err) = self
            .administrations(scope)
            .insert(&event.id.to_string(), &event)
        {
            if let Err(restore) = self.medications(scope).update(&previous.id, &previous) {
                tracing::error!(
                    tenant = scope.tenant_id(),
                    medication = %previous.id,
                    error = %restore,
                    "failed to restore medication after rejected administration write"
                );
            }
            return Err(err);
        }

        tracing::info!(
            tenant = scope.tenant_id(),
            medication = %medication.id,
            event = %event.id,
            overrides = event.overrides.len(),
            "administration recorded"
        );

        Ok(AdministrationOutcome {
            event,
            next_due: medication.next_due,
        })
    }

    /// Administration history, oldest first. Optionally filtered to one medication.
    pub fn list_administrations(
        &self,
        scope: &Scope,
        medication_id: Option<&str>,
    ) -> CoreResult<Vec<AdministrationEvent>> {
        require_patient(scope)?;
        let mut events: Vec<AdministrationEvent> = self.administrations(scope).list()?;
        if let Some(id) = medication_id {
            events.retain(|e| e.medication_id == id);
        }
        events.sort_by_key(|e| e.administered_at);
        Ok(events)
    }

    fn next_due_for(&self, medication: &Medication, now: Timestamp) -> Timestamp {
        compute_next_due(
            &medication.frequency,
            medication.start_date,
            &medication.admin_times,
            now,
            self.cfg.policy(),
        )
    }

    /// After a dose the current slot is consumed: schedule from the end of the minimum
    /// interval so a dose given just before its slot does not leave that slot due again.
    fn next_due_after_dose(&self, medication: &Medication, now: Timestamp) -> Timestamp {
        if matches!(
            medication.frequency,
            Frequency::AsNeeded | Frequency::Continuous
        ) {
            return now;
        }
        let floor = now + self.cfg.policy().minimum_interval(&medication.frequency);
        self.next_due_for(medication, floor)
    }

    fn medications<'a>(&'a self, scope: &'a Scope) -> Records<'a> {
        Records::new(self.store.as_ref(), scope, Collection::Medications)
    }

    fn administrations<'a>(&'a self, scope: &'a Scope) -> Records<'a> {
        Records::new(self.store.as_ref(), scope, Collection::MedicationAdministrations)
    }
}

pub(crate) fn require_patient(scope: &Scope) -> CoreResult<&str> {
    scope
        .patient_id()
        .ok_or_else(|| CoreError::InvalidInput("operation requires a patient scope".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode::{derive_medication_code, derive_patient_code};
    use crate::bcma::Check;
    use crate::store::InMemoryStore;
    use chrono::{DateTime, Duration};

    fn at(s: &str) -> Timestamp {
        DateTime::parse_from_rfc3339(s).expect("valid timestamp")
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    fn service() -> MedicationService {
        let cfg = Arc::new(CoreConfig::builtin().expect("config"));
        MedicationService::new(cfg, Arc::new(InMemoryStore::new()))
    }

    fn nurse() -> Clinician {
        Clinician::new("u-1", "Nurse Joy", "nurse").expect("valid clinician")
    }

    fn order(frequency: Frequency, times: Vec<NaiveTime>) -> NewMedication {
        NewMedication {
            name: NonEmptyText::new("Paracetamol").expect("valid"),
            dosage: NonEmptyText::new("1 g").expect("valid"),
            route: NonEmptyText::new("Oral").expect("valid"),
            frequency,
            category: MedicationCategory::Scheduled,
            admin_times: times,
            start_date: None,
        }
    }

    fn scan_for(patient: &Patient, medication: &Medication) -> ScanInput {
        ScanInput {
            scanned_patient_code: derive_patient_code(patient.patient_number.as_str()),
            scanned_medication_code: derive_medication_code(
                medication.name.as_str(),
                &medication.id,
            ),
            confirmed_dose: Some(medication.dosage.to_string()),
            confirmed_route: Some(medication.route.to_string()),
            overrides: vec![],
        }
    }

    struct Fixture {
        svc: MedicationService,
        scope: Scope,
        patient: Patient,
        medication: Medication,
    }

    fn fixture(now: Timestamp) -> Fixture {
        let svc = service();
        let tenant = Scope::tenant("sim-ward").expect("valid tenant");
        let patient = svc
            .register_patient(&tenant, "PT123456", "Ada Lovelace", Sex::Female)
            .expect("register patient");
        let scope = tenant.patient(&patient.id).expect("patient scope");
        let medication = svc
            .add_medication(
                &scope,
                order(Frequency::EveryHours(6), vec![hm(6, 0)]),
                now,
            )
            .expect("add medication");
        Fixture {
            svc,
            scope,
            patient,
            medication,
        }
    }

    #[test]
    fn add_medication_computes_next_due() {
        let f = fixture(at("2026-03-01T07:00:00Z"));
        assert_eq!(f.medication.next_due, Some(at("2026-03-01T12:00:00Z")));
    }

    #[test]
    fn add_medication_requires_known_patient() {
        let svc = service();
        let scope = Scope::tenant("sim-ward")
            .and_then(|s| s.patient("ghost"))
            .expect("scope");
        let err = svc
            .add_medication(&scope, order(Frequency::OnceDaily, vec![]), at("2026-03-01T07:00:00Z"))
            .expect_err("unknown patient");
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn administer_records_event_and_recomputes_next_due() {
        let now = at("2026-03-01T12:05:00Z");
        let f = fixture(at("2026-03-01T07:00:00Z"));
        let request = AdministrationRequest {
            scan: scan_for(&f.patient, &f.medication),
            notes: Some("  tolerated well ".into()),
        };

        let outcome = f
            .svc
            .administer(&f.scope, &f.medication.id, &nurse(), request, now)
            .expect("administer");

        assert!(outcome.event.checks.all_passed());
        assert_eq!(outcome.event.notes.as_deref(), Some("tolerated well"));
        // 12:05 + 4h minimum interval = 16:05, next slot 18:00.
        assert_eq!(outcome.next_due, Some(at("2026-03-01T18:00:00Z")));

        let stored = f
            .svc
            .medication(&f.scope, &f.medication.id)
            .expect("reload medication");
        assert_eq!(stored.last_administered, Some(now));
        assert_eq!(stored.next_due, outcome.next_due);

        let history = f
            .svc
            .list_administrations(&f.scope, Some(&f.medication.id))
            .expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].administered_by.user_id.as_str(), "u-1");
    }

    #[test]
    fn early_dose_does_not_leave_its_slot_due() {
        let f = fixture(at("2026-03-01T07:00:00Z"));
        let now = at("2026-03-01T11:50:00Z");
        let outcome = f
            .svc
            .administer(
                &f.scope,
                &f.medication.id,
                &nurse(),
                AdministrationRequest {
                    scan: scan_for(&f.patient, &f.medication),
                    notes: None,
                },
                now,
            )
            .expect("administer");
        assert!(outcome
            .event
            .warnings
            .iter()
            .any(|w| w.contains("Administering early")));
        assert_eq!(outcome.next_due, Some(at("2026-03-01T18:00:00Z")));
    }

    #[test]
    fn second_dose_too_soon_is_rejected_and_not_stored() {
        let f = fixture(at("2026-03-01T07:00:00Z"));
        let first = at("2026-03-01T12:00:00Z");
        f.svc
            .administer(
                &f.scope,
                &f.medication.id,
                &nurse(),
                AdministrationRequest {
                    scan: scan_for(&f.patient, &f.medication),
                    notes: None,
                },
                first,
            )
            .expect("first dose");

        let err = f
            .svc
            .administer(
                &f.scope,
                &f.medication.id,
                &nurse(),
                AdministrationRequest {
                    scan: scan_for(&f.patient, &f.medication),
                    notes: None,
                },
                first + Duration::hours(1),
            )
            .expect_err("too soon");
        assert!(matches!(err, CoreError::AdministrationRejected(ref errors)
            if errors.iter().any(|e| e.contains("Too soon"))));

        let history = f.svc.list_administrations(&f.scope, None).expect("history");
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn override_allows_early_repeat_and_is_recorded() {
        let f = fixture(at("2026-03-01T07:00:00Z"));
        let first = at("2026-03-01T12:00:00Z");
        let nurse = nurse();
        f.svc
            .administer(
                &f.scope,
                &f.medication.id,
                &nurse,
                AdministrationRequest {
                    scan: scan_for(&f.patient, &f.medication),
                    notes: None,
                },
                first,
            )
            .expect("first dose");

        let mut scan = scan_for(&f.patient, &f.medication);
        scan.overrides = vec![
            Override {
                check: Check::Time,
                reason: NonEmptyText::new("Prescriber ordered stat repeat").expect("valid"),
            },
            Override {
                check: Check::Route,
                reason: NonEmptyText::new("not needed").expect("valid"),
            },
        ];
        let outcome = f
            .svc
            .administer(
                &f.scope,
                &f.medication.id,
                &nurse,
                AdministrationRequest { scan, notes: None },
                first + Duration::hours(2),
            )
            .expect("overridden dose");
        assert!(!outcome.event.checks.time);
        assert_eq!(outcome.event.overrides.len(), 1);
        assert_eq!(outcome.event.overrides[0].check, Check::Time);

        let history = f.svc.list_administrations(&f.scope, None).expect("history");
        assert_eq!(history.len(), 2);
        assert!(history[0].administered_at < history[1].administered_at);
    }

    #[test]
    fn update_schedule_recomputes_next_due() {
        let f = fixture(at("2026-03-01T07:00:00Z"));
        let updated = f
            .svc
            .update_schedule(
                &f.scope,
                &f.medication.id,
                Some(Frequency::OnceDaily),
                Some(vec![hm(21, 0)]),
                at("2026-03-01T13:00:00Z"),
            )
            .expect("update schedule");
        assert_eq!(updated.frequency, Frequency::OnceDaily);
        assert_eq!(updated.next_due, Some(at("2026-03-01T21:00:00Z")));
    }

    #[test]
    fn prn_medication_is_always_eligible() {
        let f = fixture(at("2026-03-01T07:00:00Z"));
        let mut prn = order(Frequency::AsNeeded, vec![]);
        prn.category = MedicationCategory::Prn;
        let med = f
            .svc
            .add_medication(&f.scope, prn, at("2026-03-01T07:00:00Z"))
            .expect("add prn");

        for minutes in [0, 5] {
            let now = at("2026-03-01T08:00:00Z") + Duration::minutes(minutes);
            f.svc
                .administer(
                    &f.scope,
                    &med.id,
                    &nurse(),
                    AdministrationRequest {
                        scan: scan_for(&f.patient, &med),
                        notes: None,
                    },
                    now,
                )
                .expect("prn dose");
        }
    }

    #[test]
    fn prn_frequency_without_category_allows_repeat_doses() {
        let f = fixture(at("2026-03-01T07:00:00Z"));
        let med = f
            .svc
            .add_medication(
                &f.scope,
                order(Frequency::AsNeeded, vec![]),
                at("2026-03-01T07:00:00Z"),
            )
            .expect("add prn");
        assert_eq!(med.category, MedicationCategory::Scheduled);

        for hour in ["08", "09"] {
            f.svc
                .administer(
                    &f.scope,
                    &med.id,
                    &nurse(),
                    AdministrationRequest {
                        scan: scan_for(&f.patient, &med),
                        notes: None,
                    },
                    at(&format!("2026-03-01T{hour}:00:00Z")),
                )
                .expect("prn dose");
        }
        let history = f
            .svc
            .list_administrations(&f.scope, Some(&med.id))
            .expect("history");
        assert_eq!(history.len(), 2);
    }

    /// Delegates to an in-memory store but refuses administration writes.
    struct FailingAdministrations(InMemoryStore);

    impl RecordStore for FailingAdministrations {
        fn insert(
            &self,
            scope: &Scope,
            collection: Collection,
            id: &str,
            record: serde_json::Value,
        ) -> CoreResult<()> {
            if collection == Collection::MedicationAdministrations {
                return Err(CoreError::StoreUnavailable("administrations offline".into()));
            }
            self.0.insert(scope, collection, id, record)
        }

        fn get(
            &self,
            scope: &Scope,
            collection: Collection,
            id: &str,
        ) -> CoreResult<Option<serde_json::Value>> {
            self.0.get(scope, collection, id)
        }

        fn update(
            &self,
            scope: &Scope,
            collection: Collection,
            id: &str,
            record: serde_json::Value,
        ) -> CoreResult<()> {
            self.0.update(scope, collection, id, record)
        }

        fn delete(&self, scope: &Scope, collection: Collection, id: &str) -> CoreResult<bool> {
            self.0.delete(scope, collection, id)
        }

        fn list(&self, scope: &Scope, collection: Collection) -> CoreResult<Vec<serde_json::Value>> {
            self.0.list(scope, collection)
        }
    }

    #[test]
    fn failed_event_write_leaves_medication_unchanged() {
        let cfg = Arc::new(CoreConfig::builtin().expect("config"));
        let svc = MedicationService::new(cfg, Arc::new(FailingAdministrations(InMemoryStore::new())));
        let tenant = Scope::tenant("sim-ward").expect("valid tenant");
        let patient = svc
            .register_patient(&tenant, "PT123456", "Ada Lovelace", Sex::Female)
            .expect("register patient");
        let scope = tenant.patient(&patient.id).expect("patient scope");
        let medication = svc
            .add_medication(
                &scope,
                order(Frequency::EveryHours(6), vec![hm(6, 0)]),
                at("2026-03-01T07:00:00Z"),
            )
            .expect("add medication");

        let err = svc
            .administer(
                &scope,
                &medication.id,
                &nurse(),
                AdministrationRequest {
                    scan: scan_for(&patient, &medication),
                    notes: None,
                },
                at("2026-03-01T12:00:00Z"),
            )
            .expect_err("event write fails");
        assert!(matches!(err, CoreError::StoreUnavailable(_)));

        let stored = svc.medication(&scope, &medication.id).expect("reload");
        assert_eq!(stored.last_administered, None);
        assert_eq!(stored.next_due, medication.next_due);
    }

    #[test]
    fn tenant_scope_cannot_list_administrations() {
        let f = fixture(at("2026-03-01T07:00:00Z"));
        let err = f
            .svc
            .list_administrations(&f.scope.tenant_only(), None)
            .expect_err("needs patient scope");
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }
}
