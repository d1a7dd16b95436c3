//! Barcode medication administration (BCMA) verification.
//!
//! Combines the barcode resolver and the dosing guard into the five-rights check run before a
//! dose is recorded: right patient, right medication, right dose, right route, right time.
//! Failed checks block unless the nurse records an override reason for that check; overridden
//! failures are downgraded to warnings and kept on the administration record.

use crate::barcode::{check_scan, ScanVerification};
use crate::dosing::{DosingPolicy, TimingDecision};
use crate::medication::{Medication, Patient};
use crate::Timestamp;
use haccare_types::NonEmptyText;
use serde::{Deserialize, Serialize};

/// One of the five rights.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Check {
    Patient,
    Medication,
    Dose,
    Route,
    Time,
}

impl std::str::FromStr for Check {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patient" => Ok(Check::Patient),
            "medication" => Ok(Check::Medication),
            "dose" => Ok(Check::Dose),
            "route" => Ok(Check::Route),
            "time" => Ok(Check::Time),
            other => Err(format!("unknown check: {other}")),
        }
    }
}

/// Per-check outcome as stored on the administration record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResults {
    pub patient: bool,
    pub medication: bool,
    pub dose: bool,
    pub route: bool,
    pub time: bool,
}

impl CheckResults {
    pub fn all_passed(&self) -> bool {
        self.patient && self.medication && self.dose && self.route && self.time
    }
}

/// A nurse-recorded reason to proceed despite a failed check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Override {
    pub check: Check,
    pub reason: NonEmptyText,
}

/// What was scanned and confirmed at the bedside.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanInput {
    pub scanned_patient_code: String,
    pub scanned_medication_code: String,
    pub confirmed_dose: Option<String>,
    pub confirmed_route: Option<String>,
    pub overrides: Vec<Override>,
}

/// Result of [`verify_administration`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BcmaVerification {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub checks: CheckResults,
    pub timing: TimingDecision,
    /// Checks that failed but were overridden.
    pub overridden: Vec<Check>,
}

/// Run the five-rights check for one administration attempt.
pub fn verify_administration(
    patient: &Patient,
    medication: &Medication,
    scan: &ScanInput,
    now: Timestamp,
    policy: &DosingPolicy,
) -> BcmaVerification {
    let mut checks = CheckResults::default();
    let mut failures: Vec<(Check, String)> = Vec::new();
    let mut warnings = Vec::new();

    let mut patient_scan = ScanVerification::default();
    checks.patient = check_scan(&scan.scanned_patient_code, patient, &mut patient_scan);
    let mut medication_scan = ScanVerification::default();
    checks.medication =
        check_scan(&scan.scanned_medication_code, medication, &mut medication_scan);
    for (check, result) in [
        (Check::Patient, patient_scan),
        (Check::Medication, medication_scan),
    ] {
        warnings.extend(result.warnings);
        failures.extend(result.errors.into_iter().map(|e| (check, e)));
    }

    checks.dose = confirm(
        Check::Dose,
        scan.confirmed_dose.as_deref(),
        &medication.dosage,
        &mut failures,
    );
    checks.route = confirm(
        Check::Route,
        scan.confirmed_route.as_deref(),
        &medication.route,
        &mut failures,
    );

    let timing = policy.validate_timing(
        now,
        medication.next_due,
        medication.last_administered,
        &medication.frequency,
        medication.category,
    );
    checks.time = timing.is_ok();
    match timing.reason() {
        Some(reason) if timing.is_ok() => warnings.push(reason),
        Some(reason) => failures.push((Check::Time, reason)),
        None => {}
    }

    let mut errors = Vec::new();
    let mut overridden = Vec::new();
    for (check, message) in failures {
        match scan.overrides.iter().find(|o| o.check == check) {
            Some(o) => {
                if !overridden.contains(&check) {
                    overridden.push(check);
                }
                warnings.push(format!("{message} (overridden: {})", o.reason));
            }
            None => errors.push(message),
        }
    }

    BcmaVerification {
        is_valid: errors.is_empty(),
        errors,
        warnings,
        checks,
        timing,
        overridden,
    }
}

fn confirm(
    check: Check,
    confirmed: Option<&str>,
    ordered: &NonEmptyText,
    failures: &mut Vec<(Check, String)>,
) -> bool {
    let label = match check {
        Check::Dose => "Dose",
        _ => "Route",
    };
    match confirmed.map(str::trim).filter(|c| !c.is_empty()) {
        None => {
            failures.push((check, format!("{label} not confirmed")));
            false
        }
        Some(value) if ordered.eq_loose(value) => true,
        Some(value) => {
            failures.push((
                check,
                format!("{label} '{value}' does not match the order ({ordered})"),
            ));
            false
        }
    }
}
