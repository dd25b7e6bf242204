use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::request::RequestId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub String);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NotificationId {
    fn from(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}

/// A role-broadcast notice. Addressed to a role, never to a resolved user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_role: String,
    pub title: String,
    pub message: String,
    pub related_request_id: RequestId,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

/// A notification decided on by the engine but not yet stored. The store
/// assigns its id in the same write that persists the transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationDraft {
    pub recipient_role: String,
    pub title: String,
    pub message: String,
    pub related_request_id: RequestId,
    pub created_at: DateTime<Utc>,
}

impl NotificationDraft {
    pub fn issue(self, id: NotificationId) -> Notification {
        Notification {
            id,
            recipient_role: self.recipient_role,
            title: self.title,
            message: self.message,
            related_request_id: self.related_request_id,
            created_at: self.created_at,
            read: false,
        }
    }
}
