//! Translation between wire DTOs and core domain types.

use api_shared::dto;
use chrono::{NaiveTime, SecondsFormat};
use haccare_core::bcma::{Check, CheckResults, Override};
use haccare_core::dosing::TimingDecision;
use haccare_core::labs::ReferenceRange;
use haccare_core::medication::{Frequency, Medication, MedicationCategory, Patient};
use haccare_core::services::{AdministrationEvent, LabResult};
use haccare_core::validation::{now, parse_date, parse_optional_timestamp, parse_time_of_day};
use haccare_core::{CoreError, CoreResult, NonEmptyText, Sex, Timestamp};

pub fn format_timestamp(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Caller-supplied `now`, or the server clock.
pub fn now_or(value: Option<&str>) -> CoreResult<Timestamp> {
    Ok(parse_optional_timestamp(value)?.unwrap_or_else(now))
}

pub fn parse_times(values: &[String]) -> CoreResult<Vec<NaiveTime>> {
    values.iter().map(|v| parse_time_of_day(v)).collect()
}

pub fn parse_category(value: Option<&str>) -> CoreResult<MedicationCategory> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(MedicationCategory::default()),
        Some(v) => MedicationCategory::parse(v)
            .ok_or_else(|| CoreError::InvalidInput(format!("unknown medication category: {v}"))),
    }
}

pub fn parse_sex(value: Option<&str>) -> Sex {
    value.map(Sex::parse_lenient).unwrap_or_default()
}

pub fn patient_from_dto(dto: dto::PatientDto) -> CoreResult<Patient> {
    Ok(Patient {
        id: dto.id,
        patient_number: NonEmptyText::new(dto.patient_number)?,
        name: NonEmptyText::new(dto.name)?,
        sex: parse_sex(dto.sex.as_deref()),
    })
}

pub fn patient_dto(patient: &Patient) -> dto::PatientDto {
    dto::PatientDto {
        id: patient.id.clone(),
        patient_number: patient.patient_number.to_string(),
        name: patient.name.to_string(),
        sex: Some(patient.sex.as_str().to_string()),
    }
}

pub fn medication_from_dto(dto: dto::MedicationDto) -> CoreResult<Medication> {
    Ok(Medication {
        id: dto.id,
        patient_id: dto.patient_id,
        name: NonEmptyText::new(dto.name)?,
        dosage: NonEmptyText::new(dto.dosage)?,
        route: NonEmptyText::new(dto.route)?,
        frequency: Frequency::parse(&dto.frequency),
        category: parse_category(dto.category.as_deref())?,
        admin_times: parse_times(&dto.admin_times)?,
        start_date: dto.start_date.as_deref().map(parse_date).transpose()?,
        last_administered: parse_optional_timestamp(dto.last_administered.as_deref())?,
        next_due: parse_optional_timestamp(dto.next_due.as_deref())?,
    })
}

pub fn medication_dto(medication: &Medication) -> dto::MedicationDto {
    dto::MedicationDto {
        id: medication.id.clone(),
        patient_id: medication.patient_id.clone(),
        name: medication.name.to_string(),
        dosage: medication.dosage.to_string(),
        route: medication.route.to_string(),
        frequency: medication.frequency.label(),
        category: serde_json::to_value(medication.category)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string)),
        admin_times: medication.admin_times.iter().copied().map(format_time).collect(),
        start_date: medication.start_date.map(|d| d.to_string()),
        last_administered: medication.last_administered.map(format_timestamp),
        next_due: medication.next_due.map(format_timestamp),
    }
}

pub fn timing_res(decision: &TimingDecision) -> dto::TimingRes {
    let (label, within_window) = match decision {
        TimingDecision::Unconstrained => ("unconstrained", None),
        TimingDecision::OnTime => ("on_time", None),
        TimingDecision::Early { within_window, .. } => ("early", Some(*within_window)),
        TimingDecision::TooSoon { .. } => ("too_soon", None),
    };
    dto::TimingRes {
        is_valid: decision.is_ok(),
        decision: label.into(),
        is_warning: decision.is_warning(),
        within_window,
        reason: decision.reason(),
    }
}

pub fn override_from_dto(dto: dto::OverrideDto) -> CoreResult<Override> {
    let check: Check = dto.check.parse().map_err(CoreError::InvalidInput)?;
    Ok(Override {
        check,
        reason: NonEmptyText::new(dto.reason)?,
    })
}

fn override_dto(o: &Override) -> dto::OverrideDto {
    dto::OverrideDto {
        check: serde_json::to_value(o.check)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default(),
        reason: o.reason.to_string(),
    }
}

fn checks_dto(checks: &CheckResults) -> dto::CheckResultsDto {
    dto::CheckResultsDto {
        patient: checks.patient,
        medication: checks.medication,
        dose: checks.dose,
        route: checks.route,
        time: checks.time,
    }
}

pub fn administration_dto(event: &AdministrationEvent) -> dto::AdministrationDto {
    dto::AdministrationDto {
        id: event.id.to_string(),
        medication_id: event.medication_id.clone(),
        administered_by: event.administered_by.user_id.to_string(),
        administered_by_name: event.administered_by.name.to_string(),
        administered_at: format_timestamp(event.administered_at),
        checks: checks_dto(&event.checks),
        overrides: event.overrides.iter().map(override_dto).collect(),
        warnings: event.warnings.clone(),
        notes: event.notes.clone(),
    }
}

pub fn lab_result_dto(result: &LabResult) -> dto::LabResultDto {
    dto::LabResultDto {
        id: result.id.to_string(),
        patient_id: result.patient_id.clone(),
        test_code: result.test_code.clone(),
        test_name: result.test_name.clone(),
        units: result.units.clone(),
        value: result.value,
        flag: result.flag.as_str().into(),
        entered_by: result.entered_by.user_id.to_string(),
        entered_at: format_timestamp(result.entered_at),
        acknowledged_by: result
            .acknowledged_by
            .as_ref()
            .map(|c| c.user_id.to_string()),
        acknowledged_at: result.acknowledged_at.map(format_timestamp),
    }
}

pub fn lab_test_dto(range: &ReferenceRange) -> dto::LabTestDto {
    let bounds = range.effective_bounds(Sex::Unknown);
    dto::LabTestDto {
        code: range.test_code.clone(),
        name: range.name.clone(),
        category: range.category.clone(),
        units: range.units.clone(),
        operator: range.operator.as_str().into(),
        low: bounds.low,
        high: bounds.high,
        critical_low: range.critical_low,
        critical_high: range.critical_high,
    }
}
