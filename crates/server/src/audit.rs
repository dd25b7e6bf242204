use campusdesk_core::audit::{AuditEvent, AuditOutcome, AuditSink};
use tracing::{error, info, warn};

/// Forwards lifecycle audit events to the process log.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        let request_id = event.request_id.as_ref().map(|id| id.0.as_str()).unwrap_or("unknown");
        let request_type = event.request_type.as_deref().unwrap_or("unknown");
        let action = event.transition.as_ref().map(|t| t.action.as_str()).unwrap_or("create");
        let role = event.transition.as_ref().map(|t| t.acting_role.as_str()).unwrap_or("-");

        match event.outcome {
            AuditOutcome::Success => {
                let from = event.transition.as_ref().and_then(|t| t.from).map(|s| s.as_str());
                let to = event.transition.as_ref().and_then(|t| t.to).map(|s| s.as_str());
                info!(
                    event_name = event.kind.as_str(),
                    correlation_id = %event.correlation_id,
                    request_id = %request_id,
                    request_type = %request_type,
                    actor = %event.actor,
                    action = %action,
                    role = %role,
                    from = from.unwrap_or("-"),
                    to = to.unwrap_or("-"),
                    version = event.version.unwrap_or_default(),
                    "lifecycle event recorded"
                )
            }
            AuditOutcome::Rejected => warn!(
                event_name = event.kind.as_str(),
                correlation_id = %event.correlation_id,
                request_id = %request_id,
                request_type = %request_type,
                actor = %event.actor,
                action = %action,
                role = %role,
                error_class = event.refusal.as_ref().map(|r| r.error_class.as_str()).unwrap_or("-"),
                error = event.refusal.as_ref().map(|r| r.message.as_str()).unwrap_or("-"),
                "lifecycle operation refused"
            ),
            AuditOutcome::Failed => error!(
                event_name = event.kind.as_str(),
                correlation_id = %event.correlation_id,
                request_id = %request_id,
                actor = %event.actor,
                action = %action,
                error = event.refusal.as_ref().map(|r| r.message.as_str()).unwrap_or("-"),
                "lifecycle operation failed"
            ),
        }
    }
}
