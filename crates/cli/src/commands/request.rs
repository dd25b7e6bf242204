//! Operator access to the lifecycle engine against the configured database.

use clap::Args;
use serde_json::Value;

use campusdesk_core::domain::request::{Actor, Payload, Request, RequestId, Submitter};
use campusdesk_core::errors::LifecycleError;
use campusdesk_core::history::last_action;
use campusdesk_core::lifecycle::{LifecycleEngine, TransitionKind};
use campusdesk_db::SqlStore;

use crate::commands::{with_engine, CommandResult};

#[derive(Debug, Clone, Args)]
pub struct ActorArgs {
    #[arg(help = "Request identifier, e.g. REQ-000001")]
    pub id: String,
    #[arg(long = "user", help = "Acting user id")]
    pub user_id: String,
    #[arg(long, help = "Acting user display name (defaults to the user id)")]
    pub name: Option<String>,
    #[arg(long, help = "Role the user is acting in")]
    pub role: String,
    #[arg(long, help = "Optional comment recorded in the history")]
    pub comment: Option<String>,
}

impl ActorArgs {
    fn actor(&self) -> Actor {
        let name = self.name.clone().unwrap_or_else(|| self.user_id.clone());
        Actor::new(self.user_id.clone(), name, self.role.clone())
    }
}

pub fn submit(request_type: &str, payload: &str, user_id: &str, name: Option<&str>) -> CommandResult {
    let payload = match parse_payload(request_type, payload) {
        Ok(payload) => payload,
        Err(error) => return CommandResult::lifecycle_failure("submit", &error),
    };
    let submitter = Submitter::new(user_id, name.unwrap_or(user_id));
    let request_type = request_type.to_string();

    with_engine("submit", |engine| async move {
        let request = engine.create(&request_type, payload, &submitter).await?;
        Ok(request_result("submit", format!("created {}", request.id), &request))
    })
}

pub fn transition(kind: TransitionKind, args: &ActorArgs) -> CommandResult {
    let command = kind.as_str();
    let args = args.clone();

    with_engine(command, move |engine| async move { apply(engine, kind, args).await })
}

pub fn show(id: &str) -> CommandResult {
    let id = RequestId::from(id);
    with_engine("show", |engine| async move {
        let request = engine.get(&id).await?;
        let message = match last_action(&request) {
            Some(action) => {
                format!("{} is {} (last action: {})", request.id, request.status, action.as_str())
            }
            None => format!("{} is {}", request.id, request.status),
        };
        Ok(request_result("show", message, &request))
    })
}

pub fn pending(role: &str) -> CommandResult {
    let role = role.to_string();
    with_engine("pending", |engine| async move { pending_for(engine, role).await })
}

async fn apply(
    engine: LifecycleEngine<SqlStore>,
    kind: TransitionKind,
    args: ActorArgs,
) -> Result<CommandResult, LifecycleError> {
    let id = RequestId::from(args.id.as_str());
    let actor = args.actor();
    let comment = args.comment.as_deref();

    let request = match kind {
        TransitionKind::Approve => engine.approve(&id, &actor, comment).await?,
        TransitionKind::Reject => engine.reject(&id, &actor, comment).await?,
        TransitionKind::Forward => engine.forward(&id, &actor, comment).await?,
    };
    let message = match request.current_approver_role.as_deref() {
        Some(role) => format!("{} is {} and awaits {role}", request.id, request.status),
        None => format!("{} is {}", request.id, request.status),
    };
    Ok(request_result(kind.as_str(), message, &request))
}

async fn pending_for(
    engine: LifecycleEngine<SqlStore>,
    role: String,
) -> Result<CommandResult, LifecycleError> {
    let requests = engine.list_pending_for(&role).await?;
    let data = serde_json::to_value(&requests).unwrap_or(Value::Null);
    Ok(CommandResult::success_with_data(
        "pending",
        format!("{} request(s) awaiting {role}", requests.len()),
        Some(data),
    ))
}

fn parse_payload(request_type: &str, raw: &str) -> Result<Payload, LifecycleError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(invalid(request_type, "payload must be a JSON object".to_string())),
        Err(error) => Err(invalid(request_type, format!("payload is not valid JSON: {error}"))),
    }
}

fn invalid(request_type: &str, problem: String) -> LifecycleError {
    LifecycleError::InvalidPayload { request_type: request_type.to_string(), problems: vec![problem] }
}

fn request_result(command: &str, message: String, request: &Request) -> CommandResult {
    CommandResult::success_with_data(command, message, serde_json::to_value(request).ok())
}
