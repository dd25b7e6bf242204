//! JSON API over the request lifecycle engine.
//!
//! Endpoints:
//! - `GET  /api/v1/chains`: registered approval chains
//! - `POST /api/v1/requests`: submit a request
//! - `GET  /api/v1/requests`: list requests by filter
//! - `GET  /api/v1/requests/{id}`: fetch one request
//! - `POST /api/v1/requests/{id}/approve`: approve the current step
//! - `POST /api/v1/requests/{id}/reject`: reject at the current step
//! - `POST /api/v1/requests/{id}/forward`: forward to the next role
//! - `GET  /api/v1/roles/{role}/pending`: open requests awaiting a role
//! - `GET  /api/v1/roles/{role}/notifications`: notifications addressed to a role
//! - `POST /api/v1/notifications/{id}/read`: dismiss a notification
//! - `GET  /api/v1/users/{user_id}/inbox`: notifications for every role a user holds
//! - `GET  /api/v1/summary`: dashboard counts
//!
//! The acting user and role travel in the request body; there is no session.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use campusdesk_core::audit::AuditContext;
use campusdesk_core::chains::ChainDefinition;
use campusdesk_core::domain::notification::{Notification, NotificationId};
use campusdesk_core::domain::request::{Actor, Payload, Request, RequestId, Submitter};
use campusdesk_core::errors::{ApplicationError, InterfaceError, LifecycleError};
use campusdesk_core::lifecycle::{LifecycleEngine, TransitionKind};
use campusdesk_core::notifications::{inbox_for, StaticRoleDirectory};
use campusdesk_core::projection::DashboardSummary;
use campusdesk_core::store::{NotificationStore, RequestFilter, RequestStore};

pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// A backend that can hold both requests and notifications.
pub trait LifecycleStore: RequestStore + NotificationStore {}

impl<T: RequestStore + NotificationStore> LifecycleStore for T {}

#[derive(Clone)]
pub struct ApiState {
    engine: LifecycleEngine<dyn LifecycleStore>,
    directory: Arc<StaticRoleDirectory>,
}

impl ApiState {
    pub fn new(engine: LifecycleEngine<dyn LifecycleStore>, directory: StaticRoleDirectory) -> Self {
        Self { engine, directory: Arc::new(directory) }
    }

    fn store(&self) -> &dyn LifecycleStore {
        self.engine.store().as_ref()
    }
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    pub request_type: String,
    #[serde(default)]
    pub payload: Payload,
    pub user_id: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionBody {
    pub user_id: String,
    pub name: Option<String>,
    pub role: String,
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DismissResponse {
    pub id: NotificationId,
    pub read: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
    pub correlation_id: String,
}

#[derive(Debug)]
pub struct ApiError(InterfaceError);

impl ApiError {
    fn lifecycle(error: LifecycleError, correlation_id: &str) -> Self {
        Self(ApplicationError::from(error).into_interface(correlation_id))
    }

    fn bad_request(message: impl Into<String>, correlation_id: &str) -> Self {
        Self(InterfaceError::BadRequest {
            message: message.into(),
            correlation_id: correlation_id.to_string(),
        })
    }

    fn not_found(message: impl Into<String>, correlation_id: &str) -> Self {
        Self(InterfaceError::NotFound {
            message: message.into(),
            correlation_id: correlation_id.to_string(),
        })
    }

    fn status(&self) -> StatusCode {
        match self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::Forbidden { .. } => StatusCode::FORBIDDEN,
            InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(
                event_name = "api.request.failed",
                correlation_id = %self.0.correlation_id(),
                status = status.as_u16(),
                error = %self.0,
                "request failed"
            );
        }

        let body = ErrorBody {
            error: self.0.user_message().to_string(),
            detail: self.0.message().to_string(),
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/chains", get(list_chains))
        .route("/api/v1/requests", post(create_request).get(list_requests))
        .route("/api/v1/requests/{id}", get(get_request))
        .route("/api/v1/requests/{id}/approve", post(approve_request))
        .route("/api/v1/requests/{id}/reject", post(reject_request))
        .route("/api/v1/requests/{id}/forward", post(forward_request))
        .route("/api/v1/roles/{role}/pending", get(pending_for_role))
        .route("/api/v1/roles/{role}/notifications", get(role_notifications))
        .route("/api/v1/notifications/{id}/read", post(dismiss_notification))
        .route("/api/v1/users/{user_id}/inbox", get(user_inbox))
        .route("/api/v1/summary", get(summary))
        .with_state(state)
}

fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn list_chains(State(state): State<ApiState>) -> Json<Vec<ChainDefinition>> {
    Json(state.engine.chains().definitions().cloned().collect())
}

async fn create_request(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<CreateRequestBody>,
) -> Result<(StatusCode, Json<Request>), ApiError> {
    let correlation_id = correlation_id(&headers);
    let user_id = body.user_id.trim();
    if user_id.is_empty() {
        return Err(ApiError::bad_request("user_id is required", &correlation_id));
    }

    let name = body.name.as_deref().map(str::trim).filter(|name| !name.is_empty());
    let submitter = Submitter::new(user_id, name.unwrap_or(user_id));
    let audit = AuditContext::new(correlation_id.clone(), user_id);

    let request = state
        .engine
        .create_with_context(&body.request_type, body.payload, &submitter, &audit)
        .await
        .map_err(|error| ApiError::lifecycle(error, &correlation_id))?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn list_requests(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(filter): Query<RequestFilter>,
) -> Result<Json<Vec<Request>>, ApiError> {
    let correlation_id = correlation_id(&headers);
    state
        .engine
        .list(&filter)
        .await
        .map(Json)
        .map_err(|error| ApiError::lifecycle(error, &correlation_id))
}

async fn get_request(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Request>, ApiError> {
    let correlation_id = correlation_id(&headers);
    state
        .engine
        .get(&RequestId::from(id))
        .await
        .map(Json)
        .map_err(|error| ApiError::lifecycle(error, &correlation_id))
}

async fn approve_request(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<TransitionBody>,
) -> Result<Json<Request>, ApiError> {
    transition(&state, &headers, id, body, TransitionKind::Approve).await
}

async fn reject_request(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<TransitionBody>,
) -> Result<Json<Request>, ApiError> {
    transition(&state, &headers, id, body, TransitionKind::Reject).await
}

async fn forward_request(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<TransitionBody>,
) -> Result<Json<Request>, ApiError> {
    transition(&state, &headers, id, body, TransitionKind::Forward).await
}

async fn transition(
    state: &ApiState,
    headers: &HeaderMap,
    id: String,
    body: TransitionBody,
    kind: TransitionKind,
) -> Result<Json<Request>, ApiError> {
    let correlation_id = correlation_id(headers);
    let user_id = body.user_id.trim();
    let role = body.role.trim();
    if user_id.is_empty() || role.is_empty() {
        return Err(ApiError::bad_request("user_id and role are required", &correlation_id));
    }

    let name = body.name.as_deref().map(str::trim).filter(|name| !name.is_empty());
    let actor = Actor::new(user_id, name.unwrap_or(user_id), role);
    let audit = AuditContext::new(correlation_id.clone(), user_id);

    state
        .engine
        .apply(&RequestId::from(id), kind, &actor, body.comment.as_deref(), &audit)
        .await
        .map(Json)
        .map_err(|error| ApiError::lifecycle(error, &correlation_id))
}

async fn pending_for_role(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(role): Path<String>,
) -> Result<Json<Vec<Request>>, ApiError> {
    let correlation_id = correlation_id(&headers);
    state
        .engine
        .list_pending_for(role.trim())
        .await
        .map(Json)
        .map_err(|error| ApiError::lifecycle(error, &correlation_id))
}

async fn role_notifications(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(role): Path<String>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let correlation_id = correlation_id(&headers);
    state
        .store()
        .list_for_role(role.trim(), query.unread_only)
        .await
        .map(Json)
        .map_err(|error| ApiError::lifecycle(error.into(), &correlation_id))
}

async fn dismiss_notification(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DismissResponse>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let id = NotificationId::from(id.as_str());
    let found = state
        .store()
        .mark_read(&id)
        .await
        .map_err(|error| ApiError::lifecycle(error.into(), &correlation_id))?;

    if !found {
        return Err(ApiError::not_found(format!("notification `{id}` was not found"), &correlation_id));
    }
    Ok(Json(DismissResponse { id, read: true }))
}

async fn user_inbox(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let correlation_id = correlation_id(&headers);
    inbox_for(state.store(), state.directory.as_ref(), user_id.trim(), query.unread_only)
        .await
        .map(Json)
        .map_err(|error| ApiError::lifecycle(error.into(), &correlation_id))
}

async fn summary(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<DashboardSummary>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let requests = state
        .engine
        .list(&RequestFilter::default())
        .await
        .map_err(|error| ApiError::lifecycle(error, &correlation_id))?;
    Ok(Json(DashboardSummary::from_requests(&requests)))
}
