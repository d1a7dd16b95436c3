//! Wire types for the REST surface.
//!
//! Timestamps travel as RFC 3339 strings and times of day as `HH:MM`; parsing into domain types
//! happens in the server, so a malformed value is reported as a 400 rather than a JSON error.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Error body for every non-2xx response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

// Barcodes

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PatientCodeReq {
    pub patient_number: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MedicationCodeReq {
    pub name: String,
    pub id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CodeRes {
    pub code: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PatientDto {
    pub id: String,
    pub patient_number: String,
    pub name: String,
    #[serde(default)]
    pub sex: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MedicationDto {
    pub id: String,
    #[serde(default)]
    pub patient_id: String,
    pub name: String,
    pub dosage: String,
    pub route: String,
    pub frequency: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub admin_times: Vec<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub last_administered: Option<String>,
    #[serde(default)]
    pub next_due: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MatchReq {
    pub scanned_patient_code: String,
    pub scanned_medication_code: String,
    pub patient: PatientDto,
    pub medication: MedicationDto,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScanVerificationRes {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

// Dosing

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TimingReq {
    pub frequency: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub next_due: Option<String>,
    #[serde(default)]
    pub last_administered: Option<String>,
    /// Defaults to the server clock.
    #[serde(default)]
    pub now: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TimingRes {
    pub is_valid: bool,
    /// One of `unconstrained`, `on_time`, `early`, `too_soon`.
    pub decision: String,
    pub is_warning: bool,
    #[serde(default)]
    pub within_window: Option<bool>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NextDueReq {
    pub frequency: String,
    #[serde(default)]
    pub admin_times: Vec<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub now: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NextDueRes {
    pub next_due: String,
}

// Labs

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LabFlagReq {
    pub test_code: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub sex: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LabFlagRes {
    pub test_code: String,
    pub flag: String,
    pub is_critical: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LabTestDto {
    pub code: String,
    pub name: String,
    pub category: String,
    pub units: String,
    pub operator: String,
    pub low: Option<f64>,
    pub high: Option<f64>,
    pub critical_low: Option<f64>,
    pub critical_high: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LabTestsRes {
    pub tests: Vec<LabTestDto>,
}

// Tenant records

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RegisterPatientReq {
    pub patient_number: String,
    pub name: String,
    #[serde(default)]
    pub sex: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AddMedicationReq {
    pub name: String,
    pub dosage: String,
    pub route: String,
    pub frequency: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub admin_times: Vec<String>,
    #[serde(default)]
    pub start_date: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListMedicationsRes {
    pub medications: Vec<MedicationDto>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UpdateScheduleReq {
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub admin_times: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OverrideDto {
    /// One of `patient`, `medication`, `dose`, `route`, `time`.
    pub check: String,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AdministerReq {
    pub scanned_patient_code: String,
    pub scanned_medication_code: String,
    #[serde(default)]
    pub confirmed_dose: Option<String>,
    #[serde(default)]
    pub confirmed_route: Option<String>,
    #[serde(default)]
    pub overrides: Vec<OverrideDto>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CheckResultsDto {
    pub patient: bool,
    pub medication: bool,
    pub dose: bool,
    pub route: bool,
    pub time: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AdministrationDto {
    pub id: String,
    pub medication_id: String,
    pub administered_by: String,
    pub administered_by_name: String,
    pub administered_at: String,
    pub checks: CheckResultsDto,
    pub overrides: Vec<OverrideDto>,
    pub warnings: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AdministerRes {
    pub administration: AdministrationDto,
    #[serde(default)]
    pub next_due: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListAdministrationsRes {
    pub administrations: Vec<AdministrationDto>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecordLabReq {
    pub test_code: String,
    #[serde(default)]
    pub value: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UpdateLabReq {
    #[serde(default)]
    pub value: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LabResultDto {
    pub id: String,
    pub patient_id: String,
    pub test_code: String,
    pub test_name: String,
    pub units: String,
    pub value: Option<f64>,
    pub flag: String,
    pub entered_by: String,
    pub entered_at: String,
    #[serde(default)]
    pub acknowledged_by: Option<String>,
    #[serde(default)]
    pub acknowledged_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListLabResultsRes {
    pub results: Vec<LabResultDto>,
}
