use chrono::{DateTime, Utc};

use crate::domain::request::{HistoryAction, HistoryEntry, Request};

/// Appends one audit entry to the request's embedded history.
///
/// Entries are never edited or removed; this is the only function that writes
/// to `Request::history`.
pub fn record(
    request: &mut Request,
    action: HistoryAction,
    by: &str,
    role: Option<&str>,
    comment: Option<String>,
    at: DateTime<Utc>,
) {
    request.history.push(HistoryEntry {
        action,
        by: by.to_string(),
        role: role.map(str::to_string),
        timestamp: at,
        comment,
    });
}

/// True when `after` keeps every entry of `before` unchanged and in order.
pub fn is_append_only(before: &[HistoryEntry], after: &[HistoryEntry]) -> bool {
    after.len() >= before.len() && after[..before.len()] == *before
}

pub fn last_action(request: &Request) -> Option<HistoryAction> {
    request.history.last().map(|entry| entry.action)
}
