//! Request identity: the API key gate and the acting clinician.

use crate::error::ApiError;
use crate::AppState;
use api_shared::auth;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use haccare_core::clinician::Clinician;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Middleware rejecting requests whose `x-api-key` does not match the configured key.
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = header(req.headers(), API_KEY_HEADER);
    auth::validate_api_key(provided, state.api_key.as_deref())?;
    Ok(next.run(req).await)
}

/// The clinician performing a write, taken from the identity headers set by the auth proxy.
///
/// `x-user-id` is required. The display name falls back to the id and the role to `nurse`.
pub struct Actor(pub Clinician);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(&parts.headers, USER_ID_HEADER)
            .ok_or_else(|| ApiError::unauthorized("Missing x-user-id header"))?;
        let name = header(&parts.headers, USER_NAME_HEADER).unwrap_or(user_id);
        let role = header(&parts.headers, USER_ROLE_HEADER).unwrap_or("nurse");
        let clinician = Clinician::new(user_id, name, role)?;
        Ok(Actor(clinician))
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
