use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::json;

use super::hasher::CredentialHasher;
use super::resolver::{IdentityError, IdentityResolver, PersonalData, TenantAccountStore};

/// Router builder exposing tenant resolution for the analyst workflow.
pub fn identity_router<S, H>(resolver: Arc<IdentityResolver<S, H>>) -> Router
where
    S: TenantAccountStore + 'static,
    H: CredentialHasher + 'static,
{
    Router::new()
        .route("/api/v1/tenants/resolutions", post(resolve_handler::<S, H>))
        .with_state(resolver)
}

pub(crate) async fn resolve_handler<S, H>(
    State(resolver): State<Arc<IdentityResolver<S, H>>>,
    axum::Json(data): axum::Json<PersonalData>,
) -> Response
where
    S: TenantAccountStore + 'static,
    H: CredentialHasher + 'static,
{
    match resolver.resolve_or_create(data) {
        Ok(resolved) => {
            let status = if resolved.is_new {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, axum::Json(resolved)).into_response()
        }
        Err(err @ IdentityError::EmailAlreadyRegistered) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(err @ IdentityError::Creation(_)) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
