//! Tenant-scoped record endpoints: patients, medication orders, administrations and lab results.
//!
//! Writes require the clinician identity headers. Every handler builds its service from the
//! shared configuration and store, then maps the outcome through [`ApiError`].

use crate::convert;
use crate::error::ApiError;
use crate::identity::Actor;
use crate::AppState;
use api_shared::dto;
use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::Json;
use haccare_core::bcma::ScanInput;
use haccare_core::medication::Frequency;
use haccare_core::services::{
    AdministrationRequest, LabService, MedicationService, NewMedication,
};
use haccare_core::store::Scope;
use haccare_core::validation::{now, parse_date};
use haccare_core::{CoreResult, NonEmptyText};

fn medication_service(state: &AppState) -> MedicationService {
    MedicationService::new(state.cfg.clone(), state.store.clone())
}

fn lab_service(state: &AppState) -> LabService {
    LabService::new(state.cfg.clone(), state.store.clone())
}

fn patient_scope(tenant: &str, patient: &str) -> CoreResult<Scope> {
    Scope::tenant(tenant)?.patient(patient)
}

#[utoipa::path(
    post,
    path = "/tenants/{tenant}/patients",
    request_body = dto::RegisterPatientReq,
    params(("tenant" = String, Path, description = "Tenant identifier")),
    responses(
        (status = 201, description = "Patient registered", body = dto::PatientDto),
        (status = 400, description = "Bad request", body = dto::ErrorRes),
        (status = 401, description = "Unauthorised", body = dto::ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn register_patient(
    State(state): State<AppState>,
    AxumPath(tenant): AxumPath<String>,
    Actor(_clinician): Actor,
    Json(req): Json<dto::RegisterPatientReq>,
) -> Result<(StatusCode, Json<dto::PatientDto>), ApiError> {
    let scope = Scope::tenant(&tenant)?;
    let patient = medication_service(&state).register_patient(
        &scope,
        &req.patient_number,
        &req.name,
        convert::parse_sex(req.sex.as_deref()),
    )?;
    Ok((StatusCode::CREATED, Json(convert::patient_dto(&patient))))
}

#[utoipa::path(
    post,
    path = "/tenants/{tenant}/patients/{patient}/medications",
    request_body = dto::AddMedicationReq,
    params(
        ("tenant" = String, Path, description = "Tenant identifier"),
        ("patient" = String, Path, description = "Patient record id")
    ),
    responses(
        (status = 201, description = "Medication added", body = dto::MedicationDto),
        (status = 400, description = "Bad request", body = dto::ErrorRes),
        (status = 404, description = "Patient not found", body = dto::ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn add_medication(
    State(state): State<AppState>,
    AxumPath((tenant, patient)): AxumPath<(String, String)>,
    Actor(_clinician): Actor,
    Json(req): Json<dto::AddMedicationReq>,
) -> Result<(StatusCode, Json<dto::MedicationDto>), ApiError> {
    let scope = patient_scope(&tenant, &patient)?;
    let new = NewMedication {
        name: NonEmptyText::new(&req.name)?,
        dosage: NonEmptyText::new(&req.dosage)?,
        route: NonEmptyText::new(&req.route)?,
        frequency: Frequency::parse(&req.frequency),
        category: convert::parse_category(req.category.as_deref())?,
        admin_times: convert::parse_times(&req.admin_times)?,
        start_date: req.start_date.as_deref().map(parse_date).transpose()?,
    };
    let medication = medication_service(&state).add_medication(&scope, new, now())?;
    Ok((StatusCode::CREATED, Json(convert::medication_dto(&medication))))
}

#[utoipa::path(
    get,
    path = "/tenants/{tenant}/patients/{patient}/medications",
    params(
        ("tenant" = String, Path, description = "Tenant identifier"),
        ("patient" = String, Path, description = "Patient record id")
    ),
    responses(
        (status = 200, description = "Medication orders with their next-due times", body = dto::ListMedicationsRes),
        (status = 400, description = "Bad request", body = dto::ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn list_medications(
    State(state): State<AppState>,
    AxumPath((tenant, patient)): AxumPath<(String, String)>,
) -> Result<Json<dto::ListMedicationsRes>, ApiError> {
    let scope = patient_scope(&tenant, &patient)?;
    let medications = medication_service(&state).list_medications(&scope)?;
    Ok(Json(dto::ListMedicationsRes {
        medications: medications.iter().map(convert::medication_dto).collect(),
    }))
}

#[utoipa::path(
    put,
    path = "/tenants/{tenant}/patients/{patient}/medications/{medication}/schedule",
    request_body = dto::UpdateScheduleReq,
    params(
        ("tenant" = String, Path, description = "Tenant identifier"),
        ("patient" = String, Path, description = "Patient record id"),
        ("medication" = String, Path, description = "Medication id")
    ),
    responses(
        (status = 200, description = "Schedule updated", body = dto::MedicationDto),
        (status = 400, description = "Bad request", body = dto::ErrorRes),
        (status = 404, description = "Medication not found", body = dto::ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn update_schedule(
    State(state): State<AppState>,
    AxumPath((tenant, patient, medication)): AxumPath<(String, String, String)>,
    Actor(_clinician): Actor,
    Json(req): Json<dto::UpdateScheduleReq>,
) -> Result<Json<dto::MedicationDto>, ApiError> {
    let scope = patient_scope(&tenant, &patient)?;
    let frequency = req.frequency.as_deref().map(Frequency::parse);
    let admin_times = req
        .admin_times
        .as_deref()
        .map(convert::parse_times)
        .transpose()?;
    let updated = medication_service(&state).update_schedule(
        &scope,
        &medication,
        frequency,
        admin_times,
        now(),
    )?;
    Ok(Json(convert::medication_dto(&updated)))
}

#[utoipa::path(
    post,
    path = "/tenants/{tenant}/patients/{patient}/medications/{medication}/administrations",
    request_body = dto::AdministerReq,
    params(
        ("tenant" = String, Path, description = "Tenant identifier"),
        ("patient" = String, Path, description = "Patient record id"),
        ("medication" = String, Path, description = "Medication id")
    ),
    responses(
        (status = 201, description = "Administration recorded", body = dto::AdministerRes),
        (status = 400, description = "Bad request", body = dto::ErrorRes),
        (status = 401, description = "Unauthorised", body = dto::ErrorRes),
        (status = 404, description = "Medication not found", body = dto::ErrorRes),
        (status = 422, description = "Administration rejected", body = dto::ErrorRes)
    )
)]
/// Verify the five rights and record an administration.
///
/// A failed verification returns 422 with one entry per failed check and records nothing.
#[axum::debug_handler]
pub async fn administer(
    State(state): State<AppState>,
    AxumPath((tenant, patient, medication)): AxumPath<(String, String, String)>,
    Actor(clinician): Actor,
    Json(req): Json<dto::AdministerReq>,
) -> Result<(StatusCode, Json<dto::AdministerRes>), ApiError> {
    let scope = patient_scope(&tenant, &patient)?;
    let overrides = req
        .overrides
        .into_iter()
        .map(convert::override_from_dto)
        .collect::<CoreResult<Vec<_>>>()?;
    let request = AdministrationRequest {
        scan: ScanInput {
            scanned_patient_code: req.scanned_patient_code,
            scanned_medication_code: req.scanned_medication_code,
            confirmed_dose: req.confirmed_dose,
            confirmed_route: req.confirmed_route,
            overrides,
        },
        notes: req.notes,
    };

    let outcome =
        medication_service(&state).administer(&scope, &medication, &clinician, request, now())?;
    Ok((
        StatusCode::CREATED,
        Json(dto::AdministerRes {
            administration: convert::administration_dto(&outcome.event),
            next_due: outcome.next_due.map(convert::format_timestamp),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/tenants/{tenant}/patients/{patient}/medications/{medication}/administrations",
    params(
        ("tenant" = String, Path, description = "Tenant identifier"),
        ("patient" = String, Path, description = "Patient record id"),
        ("medication" = String, Path, description = "Medication id")
    ),
    responses(
        (status = 200, description = "Administration history", body = dto::ListAdministrationsRes),
        (status = 400, description = "Bad request", body = dto::ErrorRes),
        (status = 404, description = "Medication not found", body = dto::ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn list_administrations(
    State(state): State<AppState>,
    AxumPath((tenant, patient, medication)): AxumPath<(String, String, String)>,
) -> Result<Json<dto::ListAdministrationsRes>, ApiError> {
    let scope = patient_scope(&tenant, &patient)?;
    let service = medication_service(&state);
    service.medication(&scope, &medication)?;
    let events = service.list_administrations(&scope, Some(&medication))?;
    Ok(Json(dto::ListAdministrationsRes {
        administrations: events.iter().map(convert::administration_dto).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/tenants/{tenant}/patients/{patient}/labs",
    request_body = dto::RecordLabReq,
    params(
        ("tenant" = String, Path, description = "Tenant identifier"),
        ("patient" = String, Path, description = "Patient record id")
    ),
    responses(
        (status = 201, description = "Lab result recorded", body = dto::LabResultDto),
        (status = 400, description = "Bad request", body = dto::ErrorRes),
        (status = 404, description = "Patient not found", body = dto::ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn record_lab(
    State(state): State<AppState>,
    AxumPath((tenant, patient)): AxumPath<(String, String)>,
    Actor(clinician): Actor,
    Json(req): Json<dto::RecordLabReq>,
) -> Result<(StatusCode, Json<dto::LabResultDto>), ApiError> {
    let scope = patient_scope(&tenant, &patient)?;
    let result =
        lab_service(&state).record_result(&scope, &req.test_code, req.value, &clinician, now())?;
    Ok((StatusCode::CREATED, Json(convert::lab_result_dto(&result))))
}

#[utoipa::path(
    get,
    path = "/tenants/{tenant}/patients/{patient}/labs",
    params(
        ("tenant" = String, Path, description = "Tenant identifier"),
        ("patient" = String, Path, description = "Patient record id")
    ),
    responses(
        (status = 200, description = "Lab results, oldest first", body = dto::ListLabResultsRes),
        (status = 400, description = "Bad request", body = dto::ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn list_labs(
    State(state): State<AppState>,
    AxumPath((tenant, patient)): AxumPath<(String, String)>,
) -> Result<Json<dto::ListLabResultsRes>, ApiError> {
    let scope = patient_scope(&tenant, &patient)?;
    let results = lab_service(&state).list_results(&scope)?;
    Ok(Json(dto::ListLabResultsRes {
        results: results.iter().map(convert::lab_result_dto).collect(),
    }))
}

#[utoipa::path(
    put,
    path = "/tenants/{tenant}/patients/{patient}/labs/{lab}",
    request_body = dto::UpdateLabReq,
    params(
        ("tenant" = String, Path, description = "Tenant identifier"),
        ("patient" = String, Path, description = "Patient record id"),
        ("lab" = String, Path, description = "Lab result id")
    ),
    responses(
        (status = 200, description = "Lab value updated and re-flagged", body = dto::LabResultDto),
        (status = 404, description = "Lab result not found", body = dto::ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn update_lab(
    State(state): State<AppState>,
    AxumPath((tenant, patient, lab)): AxumPath<(String, String, String)>,
    Actor(clinician): Actor,
    Json(req): Json<dto::UpdateLabReq>,
) -> Result<Json<dto::LabResultDto>, ApiError> {
    let scope = patient_scope(&tenant, &patient)?;
    let result = lab_service(&state).update_value(&scope, &lab, req.value, &clinician, now())?;
    Ok(Json(convert::lab_result_dto(&result)))
}

#[utoipa::path(
    post,
    path = "/tenants/{tenant}/patients/{patient}/labs/{lab}/acknowledge",
    params(
        ("tenant" = String, Path, description = "Tenant identifier"),
        ("patient" = String, Path, description = "Patient record id"),
        ("lab" = String, Path, description = "Lab result id")
    ),
    responses(
        (status = 200, description = "Lab result acknowledged", body = dto::LabResultDto),
        (status = 404, description = "Lab result not found", body = dto::ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn acknowledge_lab(
    State(state): State<AppState>,
    AxumPath((tenant, patient, lab)): AxumPath<(String, String, String)>,
    Actor(clinician): Actor,
) -> Result<Json<dto::LabResultDto>, ApiError> {
    let scope = patient_scope(&tenant, &patient)?;
    let result = lab_service(&state).acknowledge(&scope, &lab, &clinician, now())?;
    Ok(Json(convert::lab_result_dto(&result)))
}
