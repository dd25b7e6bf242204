//! Persistence ports for the lifecycle engine.
//!
//! Adapters live in `campusdesk-db`. Every write that touches a request goes
//! through [`RequestStore::insert`] or [`RequestStore::commit`], which persist
//! the request and its notification together or not at all. Notification ids
//! are assigned inside that write, so a refused commit consumes none.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::notification::{Notification, NotificationDraft, NotificationId};
use crate::domain::request::{Request, RequestId, RequestStatus};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("request `{request_id}` is at version {actual:?}, expected {expected}")]
    VersionConflict { request_id: RequestId, expected: u64, actual: Option<u64> },
    #[error("stored record could not be decoded: {0}")]
    Decode(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFilter {
    pub submitter: Option<String>,
    pub request_type: Option<String>,
    pub status: Option<RequestStatus>,
    pub pending_on: Option<String>,
}

impl RequestFilter {
    pub fn pending_on(role: impl Into<String>) -> Self {
        Self { pending_on: Some(role.into()), ..Self::default() }
    }

    pub fn submitted_by(user_id: impl Into<String>) -> Self {
        Self { submitter: Some(user_id.into()), ..Self::default() }
    }

    pub fn matches(&self, request: &Request) -> bool {
        if let Some(submitter) = &self.submitter {
            if &request.created_by != submitter {
                return false;
            }
        }

        if let Some(request_type) = &self.request_type {
            if !request.request_type.eq_ignore_ascii_case(request_type.trim()) {
                return false;
            }
        }

        if let Some(status) = self.status {
            if request.status != status {
                return false;
            }
        }

        if let Some(role) = &self.pending_on {
            if request.is_terminal() || request.current_approver_role.as_deref() != Some(role) {
                return false;
            }
        }

        true
    }
}

#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn next_request_id(&self) -> Result<RequestId, StoreError>;

    async fn insert(
        &self,
        request: Request,
        notification: Option<NotificationDraft>,
    ) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, StoreError>;

    async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, StoreError>;

    /// Overwrites the stored request only if it is still at `expected_version`.
    async fn commit(
        &self,
        request: Request,
        expected_version: u64,
        notification: Option<NotificationDraft>,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn list_for_role(
        &self,
        role: &str,
        unread_only: bool,
    ) -> Result<Vec<Notification>, StoreError>;

    async fn mark_read(&self, id: &NotificationId) -> Result<bool, StoreError>;
}
