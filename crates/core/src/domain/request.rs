use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Type-specific request fields. The lifecycle engine only validates the shape
/// declared by the chain; everything else is carried through untouched.
pub type Payload = serde_json::Map<String, serde_json::Value>;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Forwarded,
    Approved,
    Rejected,
    Ordered,
    Received,
    Closed,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 7] = [
        Self::Pending,
        Self::Forwarded,
        Self::Approved,
        Self::Rejected,
        Self::Ordered,
        Self::Received,
        Self::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Forwarded => "forwarded",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Ordered => "ordered",
            Self::Received => "received",
            Self::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "forwarded" => Some(Self::Forwarded),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "ordered" => Some(Self::Ordered),
            "received" => Some(Self::Received),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Forwarded)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Approved,
    Rejected,
    Forwarded,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Forwarded => "forwarded",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStep {
    pub role: String,
    pub status: StepStatus,
    pub timestamp: Option<DateTime<Utc>>,
    pub comment: Option<String>,
}

impl ApprovalStep {
    pub fn pending(role: impl Into<String>) -> Self {
        Self { role: role.into(), status: StepStatus::Pending, timestamp: None, comment: None }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Created,
    Approved,
    Rejected,
    Forwarded,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Forwarded => "forwarded",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub action: HistoryAction,
    pub by: String,
    pub role: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub comment: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submitter {
    pub user_id: String,
    pub name: String,
}

impl Submitter {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), name: name.into() }
    }
}

/// The acting identity for a lifecycle operation: which user, holding which role.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub name: String,
    pub role: String,
}

impl Actor {
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self { user_id: user_id.into(), name: name.into(), role: role.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub request_type: String,
    pub payload: Payload,
    pub status: RequestStatus,
    pub current_approver_role: Option<String>,
    pub approval_flow: Vec<ApprovalStep>,
    pub created_by: String,
    pub created_by_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub history: Vec<HistoryEntry>,
    pub version: u64,
}

impl Request {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Index of the first step still awaiting action, if any.
    pub fn pending_step_index(&self) -> Option<usize> {
        self.approval_flow.iter().position(|step| step.status == StepStatus::Pending)
    }

    pub fn title(&self) -> Option<&str> {
        ["title", "item_name", "applicant_name", "subject"]
            .iter()
            .find_map(|key| self.payload.get(*key).and_then(serde_json::Value::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::{RequestStatus, StepStatus};

    #[test]
    fn terminal_statuses_exclude_pending_and_forwarded() {
        let terminal: Vec<_> =
            RequestStatus::ALL.iter().filter(|status| status.is_terminal()).collect();

        assert_eq!(terminal.len(), 5);
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(!RequestStatus::Forwarded.is_terminal());
        assert!(RequestStatus::Ordered.is_terminal());
    }

    #[test]
    fn status_strings_parse_back() {
        for status in RequestStatus::ALL {
            assert_eq!(RequestStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RequestStatus::parse(" Approved "), Some(RequestStatus::Approved));
        assert_eq!(RequestStatus::parse("archived"), None);
    }

    #[test]
    fn step_status_serializes_snake_case() {
        let encoded = serde_json::to_string(&StepStatus::Forwarded).expect("serialize");
        assert_eq!(encoded, "\"forwarded\"");
    }
}
