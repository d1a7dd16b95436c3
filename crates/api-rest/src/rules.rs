//! Stateless rule endpoints: barcodes, dosing and lab flags.
//!
//! These evaluate the clinical rules against records supplied in the request body, for forms
//! that hold the records client-side.

use crate::convert;
use crate::error::ApiError;
use crate::AppState;
use api_shared::{dto, HealthService};
use axum::extract::State;
use axum::response::Json;
use haccare_core::barcode::{derive_medication_code, derive_patient_code, verify_scan};
use haccare_core::labs::classify;
use haccare_core::medication::Frequency;
use haccare_core::schedule::compute_next_due;
use haccare_core::validation::{parse_date, parse_optional_timestamp};

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = dto::HealthRes)
    )
)]
/// Health check endpoint, used by monitoring and load balancers.
#[axum::debug_handler]
pub async fn health(State(_state): State<AppState>) -> Json<dto::HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/barcodes/patient",
    request_body = dto::PatientCodeReq,
    responses(
        (status = 200, description = "Compact wristband code", body = dto::CodeRes),
        (status = 401, description = "Unauthorised", body = dto::ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn patient_code(
    State(_state): State<AppState>,
    Json(req): Json<dto::PatientCodeReq>,
) -> Json<dto::CodeRes> {
    Json(dto::CodeRes {
        code: derive_patient_code(&req.patient_number),
    })
}

#[utoipa::path(
    post,
    path = "/barcodes/medication",
    request_body = dto::MedicationCodeReq,
    responses(
        (status = 200, description = "Compact medication label code", body = dto::CodeRes),
        (status = 401, description = "Unauthorised", body = dto::ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn medication_code(
    State(_state): State<AppState>,
    Json(req): Json<dto::MedicationCodeReq>,
) -> Json<dto::CodeRes> {
    Json(dto::CodeRes {
        code: derive_medication_code(&req.name, &req.id),
    })
}

#[utoipa::path(
    post,
    path = "/barcodes/match",
    request_body = dto::MatchReq,
    responses(
        (status = 200, description = "Scan verification result", body = dto::ScanVerificationRes),
        (status = 400, description = "Bad request", body = dto::ErrorRes)
    )
)]
/// Verify a patient scan and a medication scan against the selected records.
///
/// A mismatch is a normal 200 response with `is_valid = false`.
#[axum::debug_handler]
pub async fn match_scan(
    State(_state): State<AppState>,
    Json(req): Json<dto::MatchReq>,
) -> Result<Json<dto::ScanVerificationRes>, ApiError> {
    let patient = convert::patient_from_dto(req.patient)?;
    let medication = convert::medication_from_dto(req.medication)?;
    let result = verify_scan(
        &req.scanned_patient_code,
        &patient,
        &req.scanned_medication_code,
        &medication,
    );
    Ok(Json(dto::ScanVerificationRes {
        is_valid: result.is_valid,
        errors: result.errors,
        warnings: result.warnings,
    }))
}

#[utoipa::path(
    post,
    path = "/dosing/timing",
    request_body = dto::TimingReq,
    responses(
        (status = 200, description = "Timing decision", body = dto::TimingRes),
        (status = 400, description = "Bad request", body = dto::ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn check_timing(
    State(state): State<AppState>,
    Json(req): Json<dto::TimingReq>,
) -> Result<Json<dto::TimingRes>, ApiError> {
    let now = convert::now_or(req.now.as_deref())?;
    let next_due = parse_optional_timestamp(req.next_due.as_deref())?;
    let last = parse_optional_timestamp(req.last_administered.as_deref())?;
    let category = convert::parse_category(req.category.as_deref())?;

    let decision = state.cfg.policy().validate_timing(
        now,
        next_due,
        last,
        &Frequency::parse(&req.frequency),
        category,
    );
    Ok(Json(convert::timing_res(&decision)))
}

#[utoipa::path(
    post,
    path = "/dosing/next-due",
    request_body = dto::NextDueReq,
    responses(
        (status = 200, description = "Next due time", body = dto::NextDueRes),
        (status = 400, description = "Bad request", body = dto::ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn next_due(
    State(state): State<AppState>,
    Json(req): Json<dto::NextDueReq>,
) -> Result<Json<dto::NextDueRes>, ApiError> {
    let now = convert::now_or(req.now.as_deref())?;
    let admin_times = convert::parse_times(&req.admin_times)?;
    let start_date = req.start_date.as_deref().map(parse_date).transpose()?;

    let due = compute_next_due(
        &Frequency::parse(&req.frequency),
        start_date,
        &admin_times,
        now,
        state.cfg.policy(),
    );
    Ok(Json(dto::NextDueRes {
        next_due: convert::format_timestamp(due),
    }))
}

#[utoipa::path(
    post,
    path = "/labs/flag",
    request_body = dto::LabFlagReq,
    responses(
        (status = 200, description = "Lab flag", body = dto::LabFlagRes),
        (status = 400, description = "Unknown test code", body = dto::ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn lab_flag(
    State(state): State<AppState>,
    Json(req): Json<dto::LabFlagReq>,
) -> Result<Json<dto::LabFlagRes>, ApiError> {
    let range = state.cfg.catalogue().require(&req.test_code)?;
    let flag = classify(req.value, range, convert::parse_sex(req.sex.as_deref()));
    Ok(Json(dto::LabFlagRes {
        test_code: range.test_code.clone(),
        flag: flag.as_str().into(),
        is_critical: flag.is_critical(),
    }))
}

#[utoipa::path(
    get,
    path = "/labs/tests",
    responses(
        (status = 200, description = "Lab reference range catalogue", body = dto::LabTestsRes)
    )
)]
#[axum::debug_handler]
pub async fn lab_tests(State(state): State<AppState>) -> Json<dto::LabTestsRes> {
    Json(dto::LabTestsRes {
        tests: state
            .cfg
            .catalogue()
            .iter()
            .map(convert::lab_test_dto)
            .collect(),
    })
}
