//! Role-broadcast notifications.
//!
//! The engine only decides *which role* hears about a transition. Turning a
//! role into concrete users happens at read time through a [`RoleDirectory`].

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::domain::notification::{Notification, NotificationDraft};
use crate::domain::request::{HistoryAction, Request};
use crate::store::{NotificationStore, StoreError};

/// Builds the notification for a request that just changed state, or `None`
/// when nobody is left to act on it.
pub fn for_transition(
    request: &Request,
    action: HistoryAction,
    actor_name: &str,
    at: DateTime<Utc>,
) -> Option<NotificationDraft> {
    let recipient_role = request.current_approver_role.clone()?;
    let subject = describe(request);

    let (title, message) = match action {
        HistoryAction::Created => (
            format!("New {} awaiting review", humanize(&request.request_type)),
            format!("{actor_name} submitted {subject}. It is waiting for {recipient_role}."),
        ),
        HistoryAction::Approved => (
            format!("{} approved, now with you", humanize(&request.request_type)),
            format!("{actor_name} approved {subject}. It now needs action from {recipient_role}."),
        ),
        HistoryAction::Forwarded => (
            format!("{} forwarded to you", humanize(&request.request_type)),
            format!("{actor_name} forwarded {subject} to {recipient_role}."),
        ),
        HistoryAction::Rejected => return None,
    };

    Some(NotificationDraft {
        recipient_role,
        title,
        message,
        related_request_id: request.id.clone(),
        created_at: at,
    })
}

fn describe(request: &Request) -> String {
    match request.title() {
        Some(title) => format!("\"{title}\" ({})", request.id),
        None => format!("request {}", request.id),
    }
}

fn humanize(request_type: &str) -> String {
    let spaced = request_type.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => spaced,
    }
}

/// Resolves role holders when notifications are delivered.
pub trait RoleDirectory: Send + Sync {
    fn holders_of(&self, role: &str) -> Vec<String>;
    fn roles_of(&self, user_id: &str) -> Vec<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StaticRoleDirectory {
    holders: BTreeMap<String, BTreeSet<String>>,
}

impl StaticRoleDirectory {
    pub fn new(assignments: &BTreeMap<String, Vec<String>>) -> Self {
        let holders = assignments
            .iter()
            .map(|(role, users)| (role.clone(), users.iter().cloned().collect()))
            .collect();
        Self { holders }
    }
}

impl RoleDirectory for StaticRoleDirectory {
    fn holders_of(&self, role: &str) -> Vec<String> {
        self.holders.get(role).map(|users| users.iter().cloned().collect()).unwrap_or_default()
    }

    fn roles_of(&self, user_id: &str) -> Vec<String> {
        self.holders
            .iter()
            .filter(|(_, users)| users.contains(user_id))
            .map(|(role, _)| role.clone())
            .collect()
    }
}

/// Collects every notification addressed to a role `user_id` currently holds,
/// newest first.
pub async fn inbox_for<S, D>(
    store: &S,
    directory: &D,
    user_id: &str,
    unread_only: bool,
) -> Result<Vec<Notification>, StoreError>
where
    S: NotificationStore + ?Sized,
    D: RoleDirectory + ?Sized,
{
    let mut inbox = Vec::new();
    for role in directory.roles_of(user_id) {
        inbox.extend(store.list_for_role(&role, unread_only).await?);
    }
    inbox.sort_by(|left, right| {
        right.created_at.cmp(&left.created_at).then_with(|| left.id.cmp(&right.id))
    });
    Ok(inbox)
}
