//! # API REST
//!
//! REST API implementation for hacCare.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, identity headers)
//!
//! Uses `api-shared` for wire types and `haccare-core` for every clinical rule.

#![warn(rust_2018_idioms)]

mod convert;
mod error;
mod identity;
mod records;
mod rules;

use api_shared::dto;
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use haccare_core::store::{InMemoryStore, RecordStore};
use haccare_core::CoreConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use error::ApiError;

/// Application state for the REST API server.
///
/// Shared by every handler: the resolved core configuration, the record store and the
/// optional API key.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<CoreConfig>,
    pub store: Arc<dyn RecordStore>,
    pub api_key: Option<String>,
}

/// Environment variable holding the listen address.
pub const REST_ADDR_ENV: &str = "HACCARE_REST_ADDR";
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

impl AppState {
    /// Resolve state from the process environment.
    ///
    /// # Environment Variables
    /// - `HACCARE_POLICY_FILE`: YAML dosing policy overrides (optional)
    /// - `HACCARE_LAB_CATALOGUE`: YAML lab reference range catalogue (optional)
    /// - `API_KEY`: required `x-api-key` value (optional; unset disables the check)
    ///
    /// Records are held in memory for the life of the process.
    pub fn from_env() -> anyhow::Result<Self> {
        let cfg = CoreConfig::resolve(
            std::env::var_os("HACCARE_POLICY_FILE").map(PathBuf::from),
            std::env::var_os("HACCARE_LAB_CATALOGUE").map(PathBuf::from),
        )?;
        let api_key = std::env::var("API_KEY").ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!("API_KEY not set; REST endpoints are unauthenticated");
        }

        Ok(Self {
            cfg: Arc::new(cfg),
            store: Arc::new(InMemoryStore::new()),
            api_key,
        })
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        rules::health,
        rules::patient_code,
        rules::medication_code,
        rules::match_scan,
        rules::check_timing,
        rules::next_due,
        rules::lab_flag,
        rules::lab_tests,
        records::register_patient,
        records::add_medication,
        records::list_medications,
        records::update_schedule,
        records::administer,
        records::list_administrations,
        records::record_lab,
        records::list_labs,
        records::update_lab,
        records::acknowledge_lab,
    ),
    components(schemas(
        dto::HealthRes,
        dto::ErrorRes,
        dto::PatientCodeReq,
        dto::MedicationCodeReq,
        dto::CodeRes,
        dto::PatientDto,
        dto::MedicationDto,
        dto::MatchReq,
        dto::ScanVerificationRes,
        dto::TimingReq,
        dto::TimingRes,
        dto::NextDueReq,
        dto::NextDueRes,
        dto::LabFlagReq,
        dto::LabFlagRes,
        dto::LabTestDto,
        dto::LabTestsRes,
        dto::RegisterPatientReq,
        dto::AddMedicationReq,
        dto::ListMedicationsRes,
        dto::UpdateScheduleReq,
        dto::OverrideDto,
        dto::AdministerReq,
        dto::CheckResultsDto,
        dto::AdministrationDto,
        dto::AdministerRes,
        dto::ListAdministrationsRes,
        dto::RecordLabReq,
        dto::UpdateLabReq,
        dto::LabResultDto,
        dto::ListLabResultsRes,
    ))
)]
pub struct ApiDoc;

/// Build the application router.
///
/// `/health` and the Swagger UI are open; everything else sits behind the API key check when a
/// key is configured.
pub fn router(state: AppState) -> Router {
    let tenant_patient = "/tenants/:tenant/patients/:patient";

    let api = Router::new()
        .route("/barcodes/patient", post(rules::patient_code))
        .route("/barcodes/medication", post(rules::medication_code))
        .route("/barcodes/match", post(rules::match_scan))
        .route("/dosing/timing", post(rules::check_timing))
        .route("/dosing/next-due", post(rules::next_due))
        .route("/labs/flag", post(rules::lab_flag))
        .route("/labs/tests", get(rules::lab_tests))
        .route("/tenants/:tenant/patients", post(records::register_patient))
        .route(
            &format!("{tenant_patient}/medications"),
            post(records::add_medication).get(records::list_medications),
        )
        .route(
            &format!("{tenant_patient}/medications/:medication/schedule"),
            put(records::update_schedule),
        )
        .route(
            &format!("{tenant_patient}/medications/:medication/administrations"),
            post(records::administer).get(records::list_administrations),
        )
        .route(
            &format!("{tenant_patient}/labs"),
            post(records::record_lab).get(records::list_labs),
        )
        .route(&format!("{tenant_patient}/labs/:lab"), put(records::update_lab))
        .route(
            &format!("{tenant_patient}/labs/:lab/acknowledge"),
            post(records::acknowledge_lab),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            identity::require_api_key,
        ));

    Router::new()
        .route("/health", get(rules::health))
        .merge(api)
        .merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use haccare_core::barcode::{derive_medication_code, derive_patient_code};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(api_key: Option<&str>) -> Router {
        router(AppState {
            cfg: Arc::new(CoreConfig::builtin().expect("config")),
            store: Arc::new(InMemoryStore::new()),
            api_key: api_key.map(str::to_string),
        })
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-user-id", "u-1")
            .header("x-user-name", "Nurse Joy")
            .header("x-user-role", "nurse");
        let body = match body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    #[tokio::test]
    async fn health_is_open_even_with_api_key() {
        let app = app(Some("secret"));
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], json!(true));
    }

    #[tokio::test]
    async fn api_key_is_enforced_when_configured() {
        let app = app(Some("secret"));
        let (status, _) = send(&app, "GET", "/labs/tests", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/labs/tests")
                    .header("x-api-key", "secret")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn barcode_endpoints_derive_and_match_codes() {
        let app = app(None);
        let (status, body) = send(
            &app,
            "POST",
            "/barcodes/patient",
            Some(json!({"patient_number": "pt12345"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], json!(derive_patient_code("pt12345")));

        let (status, body) = send(
            &app,
            "POST",
            "/barcodes/match",
            Some(json!({
                "scanned_patient_code": "PT-p1",
                "scanned_medication_code": "wrong",
                "patient": {"id": "p1", "patient_number": "PT12345", "name": "Ada"},
                "medication": {
                    "id": "m1", "name": "Paracetamol", "dosage": "1 g",
                    "route": "Oral", "frequency": "Once daily"
                }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_valid"], json!(false));
        assert_eq!(body["errors"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["warnings"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn dosing_endpoints_apply_policy() {
        let app = app(None);
        let (status, body) = send(
            &app,
            "POST",
            "/dosing/timing",
            Some(json!({
                "frequency": "Every 6 hours",
                "next_due": "2026-03-01T12:00:00Z",
                "last_administered": "2026-03-01T06:00:00Z",
                "now": "2026-03-01T11:50:00Z"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["decision"], json!("early"));
        assert_eq!(body["within_window"], json!(true));

        let (status, body) = send(
            &app,
            "POST",
            "/dosing/next-due",
            Some(json!({
                "frequency": "Twice daily",
                "admin_times": ["08:00", "20:00"],
                "now": "2026-03-01T09:00:00Z"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["next_due"], json!("2026-03-01T20:00:00Z"));

        let (status, _) = send(
            &app,
            "POST",
            "/dosing/timing",
            Some(json!({"frequency": "Once daily", "now": "yesterday"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn lab_flag_endpoint_classifies_and_rejects_unknown_codes() {
        let app = app(None);
        let (status, body) = send(
            &app,
            "POST",
            "/labs/flag",
            Some(json!({"test_code": "k", "value": 2.1})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["flag"], json!("critical_low"));
        assert_eq!(body["is_critical"], json!(true));

        let (status, _) = send(
            &app,
            "POST",
            "/labs/flag",
            Some(json!({"test_code": "NOPE", "value": 1.0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn administration_flow_records_and_rejects() {
        let app = app(None);
        let (status, patient) = send(
            &app,
            "POST",
            "/tenants/sim-ward/patients",
            Some(json!({"patient_number": "PT000042", "name": "Ada Lovelace", "sex": "female"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let patient_id = patient["id"].as_str().expect("patient id").to_string();
        let base = format!("/tenants/sim-ward/patients/{patient_id}");

        let (status, medication) = send(
            &app,
            "POST",
            &format!("{base}/medications"),
            Some(json!({
                "name": "Ibuprofen", "dosage": "400 mg", "route": "Oral",
                "frequency": "As needed (PRN)", "category": "prn"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let medication_id = medication["id"].as_str().expect("medication id").to_string();
        let administrations = format!("{base}/medications/{medication_id}/administrations");

        let scan = json!({
            "scanned_patient_code": derive_patient_code("PT000042"),
            "scanned_medication_code": derive_medication_code("Ibuprofen", &medication_id),
            "confirmed_dose": "400 mg",
            "confirmed_route": "oral"
        });
        let (status, body) = send(&app, "POST", &administrations, Some(scan)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["administration"]["administered_by"], json!("u-1"));
        assert_eq!(body["administration"]["checks"]["time"], json!(true));

        let (status, body) = send(
            &app,
            "POST",
            &administrations,
            Some(json!({
                "scanned_patient_code": "PT99999999",
                "scanned_medication_code": derive_medication_code("Ibuprofen", &medication_id)
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"].as_array().map(Vec::len), Some(3));

        let (status, body) = send(&app, "GET", &administrations, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["administrations"].as_array().map(Vec::len), Some(1));

        let (status, _) = send(
            &app,
            "GET",
            &format!("{base}/medications/missing/administrations"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, "GET", &format!("{base}/medications"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["medications"][0]["id"], json!(medication_id));
        assert_eq!(body["medications"][0]["category"], json!("prn"));
    }

    #[tokio::test]
    async fn prn_frequency_without_category_accepts_repeat_doses() {
        let app = app(None);
        let (_, patient) = send(
            &app,
            "POST",
            "/tenants/sim-ward/patients",
            Some(json!({"patient_number": "PT000044", "name": "Grace Hopper"})),
        )
        .await;
        let base = format!(
            "/tenants/sim-ward/patients/{}",
            patient["id"].as_str().expect("patient id")
        );

        let (status, medication) = send(
            &app,
            "POST",
            &format!("{base}/medications"),
            Some(json!({
                "name": "Ondansetron", "dosage": "4 mg", "route": "IV",
                "frequency": "As needed (PRN)"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let medication_id = medication["id"].as_str().expect("medication id").to_string();
        let administrations = format!("{base}/medications/{medication_id}/administrations");
        let scan = json!({
            "scanned_patient_code": derive_patient_code("PT000044"),
            "scanned_medication_code": derive_medication_code("Ondansetron", &medication_id),
            "confirmed_dose": "4 mg",
            "confirmed_route": "IV"
        });

        for _ in 0..2 {
            let (status, body) = send(&app, "POST", &administrations, Some(scan.clone())).await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
        }
        let (_, body) = send(&app, "GET", &administrations, None).await;
        assert_eq!(body["administrations"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn writes_require_identity_headers() {
        let app = app(None);
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/tenants/sim-ward/patients")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({"patient_number": "PT1", "name": "A"}).to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn lab_results_are_flagged_and_acknowledged() {
        let app = app(None);
        let (_, patient) = send(
            &app,
            "POST",
            "/tenants/sim-ward/patients",
            Some(json!({"patient_number": "PT000043", "name": "Alan Turing", "sex": "male"})),
        )
        .await;
        let base = format!(
            "/tenants/sim-ward/patients/{}",
            patient["id"].as_str().expect("patient id")
        );

        let (status, lab) = send(
            &app,
            "POST",
            &format!("{base}/labs"),
            Some(json!({"test_code": "HGB", "value": 125.0})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(lab["flag"], json!("abnormal_low"));
        let lab_id = lab["id"].as_str().expect("lab id").to_string();

        let (status, acked) = send(
            &app,
            "POST",
            &format!("{base}/labs/{lab_id}/acknowledge"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(acked["acknowledged_by"], json!("u-1"));

        let (status, updated) = send(
            &app,
            "PUT",
            &format!("{base}/labs/{lab_id}"),
            Some(json!({"value": 140.0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["flag"], json!("normal"));
        assert_eq!(updated["acknowledged_by"], Value::Null);

        let (status, listed) = send(&app, "GET", &format!("{base}/labs"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed["results"].as_array().map(Vec::len), Some(1));
        assert_eq!(listed["results"][0]["flag"], json!("normal"));

        let (status, _) = send(
            &app,
            "POST",
            &format!("{base}/labs/missing/acknowledge"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
