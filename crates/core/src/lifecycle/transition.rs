//! Pure lifecycle rules.
//!
//! Nothing here touches storage. [`open_request`] builds a fresh request from a
//! chain definition and [`apply_transition`] advances one in place; both either
//! succeed completely or leave their input untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chains::{validate_payload, ChainDefinition};
use crate::domain::request::{
    Actor, ApprovalStep, HistoryAction, Payload, Request, RequestId, RequestStatus, StepStatus,
    Submitter,
};
use crate::errors::{LifecycleError, UnauthorizedReason};
use crate::history;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Approve,
    Reject,
    Forward,
}

impl TransitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Forward => "forward",
        }
    }

    pub fn step_status(&self) -> StepStatus {
        match self {
            Self::Approve => StepStatus::Approved,
            Self::Reject => StepStatus::Rejected,
            Self::Forward => StepStatus::Forwarded,
        }
    }

    pub fn history_action(&self) -> HistoryAction {
        match self {
            Self::Approve => HistoryAction::Approved,
            Self::Reject => HistoryAction::Rejected,
            Self::Forward => HistoryAction::Forwarded,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub kind: TransitionKind,
    pub from: RequestStatus,
    pub to: RequestStatus,
    pub acted_role: String,
    pub next_role: Option<String>,
}

pub fn normalize_comment(comment: Option<&str>) -> Option<String> {
    comment.map(str::trim).filter(|text| !text.is_empty()).map(str::to_string)
}

/// Overall status as a function of the approval flow.
pub fn derive_status(flow: &[ApprovalStep], chain: &ChainDefinition) -> RequestStatus {
    if flow.iter().any(|step| step.status == StepStatus::Rejected) {
        return RequestStatus::Rejected;
    }

    match flow.iter().position(|step| step.status == StepStatus::Pending) {
        None => chain.final_status,
        Some(0) => RequestStatus::Pending,
        Some(index) => match flow[index - 1].status {
            StepStatus::Forwarded => RequestStatus::Forwarded,
            _ => chain.advance_status,
        },
    }
}

pub fn open_request(
    id: RequestId,
    chain: &ChainDefinition,
    payload: Payload,
    submitter: &Submitter,
    at: DateTime<Utc>,
) -> Result<Request, LifecycleError> {
    let problems = validate_payload(&chain.fields, &payload);
    if !problems.is_empty() {
        return Err(LifecycleError::InvalidPayload {
            request_type: chain.request_type.clone(),
            problems,
        });
    }

    let approval_flow: Vec<ApprovalStep> = chain.roles.iter().map(ApprovalStep::pending).collect();
    let mut request = Request {
        id,
        request_type: chain.request_type.clone(),
        payload,
        status: derive_status(&approval_flow, chain),
        current_approver_role: Some(chain.first_role().to_string()),
        approval_flow,
        created_by: submitter.user_id.clone(),
        created_by_name: submitter.name.clone(),
        created_at: at,
        updated_at: at,
        history: Vec::new(),
        version: 1,
    };
    history::record(&mut request, HistoryAction::Created, &submitter.user_id, None, None, at);

    Ok(request)
}

pub fn apply_transition(
    request: &mut Request,
    chain: &ChainDefinition,
    kind: TransitionKind,
    actor: &Actor,
    comment: Option<&str>,
    at: DateTime<Utc>,
) -> Result<TransitionOutcome, LifecycleError> {
    let terminal = || {
        LifecycleError::Unauthorized(UnauthorizedReason::Terminal { status: request.status })
    };

    if request.is_terminal() {
        return Err(terminal());
    }

    let expected = request.current_approver_role.clone().ok_or_else(terminal)?;
    if actor.role != expected {
        return Err(LifecycleError::Unauthorized(UnauthorizedReason::RoleMismatch {
            expected,
            acting: actor.role.clone(),
        }));
    }

    let index = request
        .pending_step_index()
        .filter(|&index| request.approval_flow[index].role == expected)
        .ok_or_else(terminal)?;

    if kind == TransitionKind::Forward {
        if !chain.allows_forward {
            return Err(LifecycleError::Unauthorized(UnauthorizedReason::ForwardNotPermitted {
                request_type: request.request_type.clone(),
            }));
        }
        if index + 1 >= request.approval_flow.len() {
            return Err(LifecycleError::Unauthorized(UnauthorizedReason::NoLaterStep {
                role: expected,
            }));
        }
    }

    let comment = normalize_comment(comment);
    let from = request.status;

    let step = &mut request.approval_flow[index];
    step.status = kind.step_status();
    step.timestamp = Some(at);
    step.comment = comment.clone();

    let next_role = match kind {
        TransitionKind::Reject => None,
        TransitionKind::Approve | TransitionKind::Forward => {
            request.approval_flow.get(index + 1).map(|step| step.role.clone())
        }
    };

    request.current_approver_role = next_role.clone();
    request.status = derive_status(&request.approval_flow, chain);
    request.updated_at = at;
    request.version += 1;
    history::record(
        request,
        kind.history_action(),
        &actor.user_id,
        Some(&actor.role),
        comment,
        at,
    );

    Ok(TransitionOutcome { kind, from, to: request.status, acted_role: expected, next_role })
}

/// Structural checks every stored request must satisfy. Returns the first
/// violation found.
pub fn check_invariants(request: &Request, chain: &ChainDefinition) -> Result<(), String> {
    let flow_roles: Vec<&str> = request.approval_flow.iter().map(|step| step.role.as_str()).collect();
    let chain_roles: Vec<&str> = chain.roles.iter().map(String::as_str).collect();
    if flow_roles != chain_roles {
        return Err(format!("approval flow roles {flow_roles:?} differ from chain {chain_roles:?}"));
    }

    let pending: Vec<&ApprovalStep> =
        request.approval_flow.iter().filter(|step| step.status == StepStatus::Pending).collect();

    let expected_role = if request.is_terminal() { None } else { pending.first().map(|step| step.role.as_str()) };
    if request.current_approver_role.as_deref() != expected_role {
        return Err(format!(
            "current approver {:?} does not match first pending step {expected_role:?}",
            request.current_approver_role
        ));
    }

    let acted = request.approval_flow.iter().filter(|step| step.status != StepStatus::Pending).count();
    if request.history.len() != acted + 1 {
        return Err(format!(
            "history has {} entries but {acted} steps were acted on",
            request.history.len()
        ));
    }

    let derived = derive_status(&request.approval_flow, chain);
    if request.status != derived {
        return Err(format!("status {} does not match derived {derived}", request.status));
    }

    Ok(())
}
