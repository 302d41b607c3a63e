use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::audit::AuditLog;
use super::domain::{
    AccountId, Actor, ActorRole, AgencyId, GuaranteeId, GuaranteeSubmission, PropertySnapshot,
    TenantSnapshot,
};
use super::repository::GuaranteeRepository;
use super::service::{LifecycleService, TransitionError, TransitionNotifier};

/// Router builder exposing the lifecycle operations. Authentication happens
/// upstream; callers declare the acting identity in the request body.
pub fn lifecycle_router<G, A, N>(service: Arc<LifecycleService<G, A, N>>) -> Router
where
    G: GuaranteeRepository + 'static,
    A: AuditLog + 'static,
    N: TransitionNotifier + 'static,
{
    Router::new()
        .route("/api/v1/guarantees", post(submit_handler::<G, A, N>))
        .route(
            "/api/v1/guarantees/expire-due",
            post(expire_due_handler::<G, A, N>),
        )
        .route("/api/v1/guarantees/:id", get(get_handler::<G, A, N>))
        .route(
            "/api/v1/guarantees/:id/audit",
            get(audit_trail_handler::<G, A, N>),
        )
        .route(
            "/api/v1/guarantees/:id/review-terms",
            post(review_terms_handler::<G, A, N>),
        )
        .route(
            "/api/v1/guarantees/:id/approve",
            post(approve_handler::<G, A, N>),
        )
        .route(
            "/api/v1/guarantees/:id/reject",
            post(reject_handler::<G, A, N>),
        )
        .route(
            "/api/v1/guarantees/:id/send-to-finance",
            post(send_to_finance_handler::<G, A, N>),
        )
        .route(
            "/api/v1/guarantees/:id/payment-link",
            post(payment_link_handler::<G, A, N>),
        )
        .route(
            "/api/v1/guarantees/:id/payment-proof",
            post(payment_proof_handler::<G, A, N>),
        )
        .route(
            "/api/v1/guarantees/:id/confirm-payment",
            post(confirm_payment_handler::<G, A, N>),
        )
        .route(
            "/api/v1/guarantees/:id/send-for-signature",
            post(send_for_signature_handler::<G, A, N>),
        )
        .route(
            "/api/v1/guarantees/:id/activate",
            post(activate_handler::<G, A, N>),
        )
        .route(
            "/api/v1/guarantees/:id/expire",
            post(expire_handler::<G, A, N>),
        )
        .route(
            "/api/v1/guarantees/:id/link-tenant",
            post(link_tenant_handler::<G, A, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActorPayload {
    pub actor_id: Option<String>,
    pub actor_name: String,
    pub role: ActorRole,
}

impl ActorPayload {
    fn into_actor(self) -> Actor {
        Actor {
            id: self.actor_id.map(AccountId),
            display_name: self.actor_name,
            role: self.role,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitBody {
    actor: ActorPayload,
    tenant: TenantSnapshot,
    property: PropertySnapshot,
    agency_id: String,
    created_by: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewTermsBody {
    actor: ActorPayload,
    credit_score: Option<u16>,
    applied_rate: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApproveBody {
    actor: ActorPayload,
    applied_rate: Option<f32>,
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RejectBody {
    actor: ActorPayload,
    reason: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaymentLinkBody {
    actor: ActorPayload,
    link: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActorBody {
    actor: ActorPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExpireBody {
    actor: ActorPayload,
    as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExpireDueBody {
    as_of: Option<DateTime<Utc>>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LinkTenantBody {
    actor: ActorPayload,
    account_id: String,
}

fn error_response(err: TransitionError) -> Response {
    let status = match &err {
        TransitionError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        TransitionError::Forbidden { .. } => StatusCode::FORBIDDEN,
        TransitionError::InvalidTransition { .. } | TransitionError::Conflict => {
            StatusCode::CONFLICT
        }
        TransitionError::NotFound => StatusCode::NOT_FOUND,
        TransitionError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn submit_handler<G, A, N>(
    State(service): State<Arc<LifecycleService<G, A, N>>>,
    axum::Json(body): axum::Json<SubmitBody>,
) -> Response
where
    G: GuaranteeRepository + 'static,
    A: AuditLog + 'static,
    N: TransitionNotifier + 'static,
{
    let actor = body.actor.into_actor();
    let submission = GuaranteeSubmission {
        tenant: body.tenant,
        property: body.property,
        agency_id: AgencyId(body.agency_id),
        created_by: AccountId(body.created_by),
    };
    match service.submit(submission, &actor) {
        Ok(record) => {
            (StatusCode::CREATED, axum::Json(record.request.view())).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_handler<G, A, N>(
    State(service): State<Arc<LifecycleService<G, A, N>>>,
    Path(id): Path<String>,
) -> Response
where
    G: GuaranteeRepository + 'static,
    A: AuditLog + 'static,
    N: TransitionNotifier + 'static,
{
    match service.get(&GuaranteeId(id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.request.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn audit_trail_handler<G, A, N>(
    State(service): State<Arc<LifecycleService<G, A, N>>>,
    Path(id): Path<String>,
) -> Response
where
    G: GuaranteeRepository + 'static,
    A: AuditLog + 'static,
    N: TransitionNotifier + 'static,
{
    match service.audit_trail(&GuaranteeId(id)) {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn review_terms_handler<G, A, N>(
    State(service): State<Arc<LifecycleService<G, A, N>>>,
    Path(id): Path<String>,
    axum::Json(body): axum::Json<ReviewTermsBody>,
) -> Response
where
    G: GuaranteeRepository + 'static,
    A: AuditLog + 'static,
    N: TransitionNotifier + 'static,
{
    let actor = body.actor.into_actor();
    match service.set_review_terms(&GuaranteeId(id), &actor, body.credit_score, body.applied_rate)
    {
        Ok(record) => (StatusCode::OK, axum::Json(record.request.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn approve_handler<G, A, N>(
    State(service): State<Arc<LifecycleService<G, A, N>>>,
    Path(id): Path<String>,
    axum::Json(body): axum::Json<ApproveBody>,
) -> Response
where
    G: GuaranteeRepository + 'static,
    A: AuditLog + 'static,
    N: TransitionNotifier + 'static,
{
    let actor = body.actor.into_actor();
    match service.approve(&GuaranteeId(id), &actor, body.applied_rate, body.notes) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reject_handler<G, A, N>(
    State(service): State<Arc<LifecycleService<G, A, N>>>,
    Path(id): Path<String>,
    axum::Json(body): axum::Json<RejectBody>,
) -> Response
where
    G: GuaranteeRepository + 'static,
    A: AuditLog + 'static,
    N: TransitionNotifier + 'static,
{
    let actor = body.actor.into_actor();
    match service.reject(&GuaranteeId(id), &actor, &body.reason) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn send_to_finance_handler<G, A, N>(
    State(service): State<Arc<LifecycleService<G, A, N>>>,
    Path(id): Path<String>,
    axum::Json(body): axum::Json<ActorBody>,
) -> Response
where
    G: GuaranteeRepository + 'static,
    A: AuditLog + 'static,
    N: TransitionNotifier + 'static,
{
    let actor = body.actor.into_actor();
    match service.send_to_finance(&GuaranteeId(id), &actor) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn payment_link_handler<G, A, N>(
    State(service): State<Arc<LifecycleService<G, A, N>>>,
    Path(id): Path<String>,
    axum::Json(body): axum::Json<PaymentLinkBody>,
) -> Response
where
    G: GuaranteeRepository + 'static,
    A: AuditLog + 'static,
    N: TransitionNotifier + 'static,
{
    let actor = body.actor.into_actor();
    match service.attach_payment_link(&GuaranteeId(id), &actor, &body.link) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn payment_proof_handler<G, A, N>(
    State(service): State<Arc<LifecycleService<G, A, N>>>,
    Path(id): Path<String>,
    axum::Json(body): axum::Json<ActorBody>,
) -> Response
where
    G: GuaranteeRepository + 'static,
    A: AuditLog + 'static,
    N: TransitionNotifier + 'static,
{
    let actor = body.actor.into_actor();
    match service.submit_proof(&GuaranteeId(id), &actor) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn confirm_payment_handler<G, A, N>(
    State(service): State<Arc<LifecycleService<G, A, N>>>,
    Path(id): Path<String>,
    axum::Json(body): axum::Json<ActorBody>,
) -> Response
where
    G: GuaranteeRepository + 'static,
    A: AuditLog + 'static,
    N: TransitionNotifier + 'static,
{
    let actor = body.actor.into_actor();
    match service.confirm_payment(&GuaranteeId(id), &actor) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn send_for_signature_handler<G, A, N>(
    State(service): State<Arc<LifecycleService<G, A, N>>>,
    Path(id): Path<String>,
    axum::Json(body): axum::Json<ActorBody>,
) -> Response
where
    G: GuaranteeRepository + 'static,
    A: AuditLog + 'static,
    N: TransitionNotifier + 'static,
{
    let actor = body.actor.into_actor();
    match service.send_for_signature(&GuaranteeId(id), &actor) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn activate_handler<G, A, N>(
    State(service): State<Arc<LifecycleService<G, A, N>>>,
    Path(id): Path<String>,
    axum::Json(body): axum::Json<ActorBody>,
) -> Response
where
    G: GuaranteeRepository + 'static,
    A: AuditLog + 'static,
    N: TransitionNotifier + 'static,
{
    let actor = body.actor.into_actor();
    match service.activate(&GuaranteeId(id), &actor) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn expire_handler<G, A, N>(
    State(service): State<Arc<LifecycleService<G, A, N>>>,
    Path(id): Path<String>,
    axum::Json(body): axum::Json<ExpireBody>,
) -> Response
where
    G: GuaranteeRepository + 'static,
    A: AuditLog + 'static,
    N: TransitionNotifier + 'static,
{
    let actor = body.actor.into_actor();
    let as_of = body.as_of.unwrap_or_else(Utc::now);
    match service.expire(&GuaranteeId(id), &actor, as_of) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn expire_due_handler<G, A, N>(
    State(service): State<Arc<LifecycleService<G, A, N>>>,
    axum::Json(body): axum::Json<ExpireDueBody>,
) -> Response
where
    G: GuaranteeRepository + 'static,
    A: AuditLog + 'static,
    N: TransitionNotifier + 'static,
{
    let as_of = body.as_of.unwrap_or_else(Utc::now);
    let limit = body.limit.unwrap_or(100);
    match service.expire_due(as_of, limit) {
        Ok(outcomes) => (StatusCode::OK, axum::Json(outcomes)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn link_tenant_handler<G, A, N>(
    State(service): State<Arc<LifecycleService<G, A, N>>>,
    Path(id): Path<String>,
    axum::Json(body): axum::Json<LinkTenantBody>,
) -> Response
where
    G: GuaranteeRepository + 'static,
    A: AuditLog + 'static,
    N: TransitionNotifier + 'static,
{
    let actor = body.actor.into_actor();
    match service.link_tenant_account(&GuaranteeId(id), &actor, AccountId(body.account_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.request.view())).into_response(),
        Err(err) => error_response(err),
    }
}
