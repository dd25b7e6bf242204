use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::request::{Request, RequestId, RequestStatus};
use crate::errors::LifecycleError;
use crate::lifecycle::transition::TransitionKind;

/// What happened to a request, as seen by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEventKind {
    RequestCreated,
    RequestRefused,
    TransitionApplied,
    TransitionRefused,
}

impl LifecycleEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestCreated => "lifecycle.request_created",
            Self::RequestRefused => "lifecycle.request_refused",
            Self::TransitionApplied => "lifecycle.transition_applied",
            Self::TransitionRefused => "lifecycle.transition_refused",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOutcome {
    Success,
    Rejected,
    Failed,
}

impl AuditOutcome {
    /// Store outages are failures; every other refusal is the caller's doing.
    pub fn of_error(error: &LifecycleError) -> Self {
        match error {
            LifecycleError::StoreUnavailable(_) => Self::Failed,
            _ => Self::Rejected,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditContext {
    pub correlation_id: String,
    pub actor: String,
}

impl AuditContext {
    pub fn new(correlation_id: impl Into<String>, actor: impl Into<String>) -> Self {
        Self { correlation_id: correlation_id.into(), actor: actor.into() }
    }

    pub fn generated(actor: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4().to_string(), actor)
    }
}

/// The attempted action on an existing request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionFacts {
    pub action: TransitionKind,
    pub acting_role: String,
    /// Set only when the transition was applied.
    pub from: Option<RequestStatus>,
    pub to: Option<RequestStatus>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refusal {
    pub error_class: String,
    pub message: String,
}

impl From<&LifecycleError> for Refusal {
    fn from(error: &LifecycleError) -> Self {
        Self { error_class: error.error_class().to_string(), message: error.to_string() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub kind: LifecycleEventKind,
    pub correlation_id: String,
    pub actor: String,
    pub outcome: AuditOutcome,
    /// Absent when a submission was refused before an id was allocated.
    pub request_id: Option<RequestId>,
    pub request_type: Option<String>,
    pub transition: Option<TransitionFacts>,
    /// Version written by the event, for successful mutations.
    pub version: Option<u64>,
    pub refusal: Option<Refusal>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    fn blank(kind: LifecycleEventKind, outcome: AuditOutcome, context: &AuditContext) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            kind,
            correlation_id: context.correlation_id.clone(),
            actor: context.actor.clone(),
            outcome,
            request_id: None,
            request_type: None,
            transition: None,
            version: None,
            refusal: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn request_created(request: &Request, context: &AuditContext) -> Self {
        Self {
            request_id: Some(request.id.clone()),
            request_type: Some(request.request_type.clone()),
            version: Some(request.version),
            ..Self::blank(LifecycleEventKind::RequestCreated, AuditOutcome::Success, context)
        }
    }

    pub fn request_refused(
        request_type: &str,
        error: &LifecycleError,
        context: &AuditContext,
    ) -> Self {
        Self {
            request_type: Some(request_type.to_string()),
            refusal: Some(error.into()),
            ..Self::blank(LifecycleEventKind::RequestRefused, AuditOutcome::of_error(error), context)
        }
    }

    pub fn transition_applied(
        request: &Request,
        action: TransitionKind,
        acting_role: &str,
        from: RequestStatus,
        context: &AuditContext,
    ) -> Self {
        Self {
            request_id: Some(request.id.clone()),
            request_type: Some(request.request_type.clone()),
            transition: Some(TransitionFacts {
                action,
                acting_role: acting_role.to_string(),
                from: Some(from),
                to: Some(request.status),
            }),
            version: Some(request.version),
            ..Self::blank(LifecycleEventKind::TransitionApplied, AuditOutcome::Success, context)
        }
    }

    pub fn transition_refused(
        request_id: &RequestId,
        action: TransitionKind,
        acting_role: &str,
        error: &LifecycleError,
        context: &AuditContext,
    ) -> Self {
        Self {
            request_id: Some(request_id.clone()),
            transition: Some(TransitionFacts {
                action,
                acting_role: acting_role.to_string(),
                from: None,
                to: None,
            }),
            refusal: Some(error.into()),
            ..Self::blank(
                LifecycleEventKind::TransitionRefused,
                AuditOutcome::of_error(error),
                context,
            )
        }
    }
}

pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn emit(&self, _event: AuditEvent) {}
}

#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
