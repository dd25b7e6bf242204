use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use campusdesk_core::domain::notification::{Notification, NotificationDraft, NotificationId};
use campusdesk_core::domain::request::{Request, RequestId};
use campusdesk_core::store::{NotificationStore, RequestFilter, RequestStore, StoreError};

use super::RepositoryError;
use crate::document::{join, DocumentStore};

const REQUESTS: &str = "requests";
const REQUEST_INDEX: &str = "request_index";
const NOTIFICATIONS: &str = "notifications";

/// Request and notification storage on top of any [`DocumentStore`].
///
/// Requests live at `requests/<request_type>/<id>`, notifications at
/// `notifications/<id>`. `request_index/<id>` holds each request's type so a
/// lookup touches a single record. Conditional commits are serialized through
/// a process-local lock, then written with a single root-level `update`.
///
/// Records this store did not write are skipped when listing.
pub struct DocumentRequestStore<D: ?Sized> {
    documents: Arc<D>,
    commit_lock: Mutex<()>,
}

impl<D> DocumentRequestStore<D>
where
    D: DocumentStore + ?Sized,
{
    pub fn new(documents: Arc<D>) -> Self {
        Self { documents, commit_lock: Mutex::new(()) }
    }

    pub fn documents(&self) -> &Arc<D> {
        &self.documents
    }

    async fn all_requests(&self) -> Result<Vec<Request>, RepositoryError> {
        let Some(collections) = self.documents.read(REQUESTS).await? else {
            return Ok(Vec::new());
        };

        Ok(object_entries(collections)
            .into_iter()
            .flat_map(|(_, collection)| object_entries(collection))
            .filter_map(|(_, record)| decode::<Request>(record).ok())
            .collect())
    }

    async fn stored_request(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError> {
        let Some(indexed) = self.documents.read(&join(REQUEST_INDEX, &id.0)).await? else {
            return Ok(None);
        };
        let Value::String(request_type) = indexed else {
            return Err(RepositoryError::Decode(format!("index entry for `{id}` is not a type")));
        };

        let path = join(&join(REQUESTS, &request_type), &id.0);
        match self.documents.read(&path).await? {
            Some(record) => decode(record).map(Some),
            None => Ok(None),
        }
    }

    async fn issue(
        &self,
        draft: Option<NotificationDraft>,
    ) -> Result<Option<Notification>, RepositoryError> {
        let Some(draft) = draft else {
            return Ok(None);
        };
        let key = self.documents.append(NOTIFICATIONS).await?;
        Ok(Some(draft.issue(NotificationId(format!("NTF-{key}")))))
    }

    fn request_path(request: &Request) -> String {
        join(&join(REQUESTS, &request.request_type), &request.id.0)
    }

    fn changes(
        request: &Request,
        notification: Option<&Notification>,
    ) -> Result<Map<String, Value>, RepositoryError> {
        let mut fields = Map::new();
        fields.insert(Self::request_path(request), encode(request)?);
        fields.insert(join(REQUEST_INDEX, &request.id.0), Value::String(request.request_type.clone()));
        if let Some(notification) = notification {
            fields.insert(join(NOTIFICATIONS, &notification.id.0), encode(notification)?);
        }
        Ok(fields)
    }
}

fn object_entries(value: Value) -> Vec<(String, Value)> {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        _ => Vec::new(),
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value, RepositoryError> {
    serde_json::to_value(value).map_err(|error| RepositoryError::Decode(error.to_string()))
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, RepositoryError> {
    serde_json::from_value(value).map_err(|error| RepositoryError::Decode(error.to_string()))
}

#[async_trait]
impl<D> RequestStore for DocumentRequestStore<D>
where
    D: DocumentStore + ?Sized,
{
    async fn next_request_id(&self) -> Result<RequestId, StoreError> {
        let key = self.documents.append(REQUESTS).await.map_err(RepositoryError::from)?;
        Ok(RequestId(format!("REQ-{key}")))
    }

    async fn insert(
        &self,
        request: Request,
        notification: Option<NotificationDraft>,
    ) -> Result<(), StoreError> {
        let _guard = self.commit_lock.lock().await;
        let notification = self.issue(notification).await?;
        let fields = Self::changes(&request, notification.as_ref())?;
        self.documents.update("", fields).await.map_err(RepositoryError::from)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, StoreError> {
        Ok(self.stored_request(id).await?)
    }

    async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, StoreError> {
        let mut requests: Vec<Request> =
            self.all_requests().await?.into_iter().filter(|request| filter.matches(request)).collect();
        requests.sort_by(|left, right| {
            left.created_at.cmp(&right.created_at).then_with(|| left.id.cmp(&right.id))
        });
        Ok(requests)
    }

    async fn commit(
        &self,
        request: Request,
        expected_version: u64,
        notification: Option<NotificationDraft>,
    ) -> Result<(), StoreError> {
        let _guard = self.commit_lock.lock().await;

        let actual = self.stored_request(&request.id).await?.map(|stored| stored.version);
        if actual != Some(expected_version) {
            return Err(StoreError::VersionConflict {
                request_id: request.id.clone(),
                expected: expected_version,
                actual,
            });
        }

        let notification = self.issue(notification).await?;
        let fields = Self::changes(&request, notification.as_ref())?;
        self.documents.update("", fields).await.map_err(RepositoryError::from)?;
        Ok(())
    }
}

#[async_trait]
impl<D> NotificationStore for DocumentRequestStore<D>
where
    D: DocumentStore + ?Sized,
{
    async fn list_for_role(
        &self,
        role: &str,
        unread_only: bool,
    ) -> Result<Vec<Notification>, StoreError> {
        let Some(stored) = self.documents.read(NOTIFICATIONS).await.map_err(RepositoryError::from)?
        else {
            return Ok(Vec::new());
        };

        let mut notifications: Vec<Notification> = object_entries(stored)
            .into_iter()
            .filter_map(|(_, record)| decode::<Notification>(record).ok())
            .filter(|notification| {
                notification.recipient_role == role && (!unread_only || !notification.read)
            })
            .collect();
        notifications.sort_by(|left, right| {
            right.created_at.cmp(&left.created_at).then_with(|| right.id.cmp(&left.id))
        });
        Ok(notifications)
    }

    async fn mark_read(&self, id: &NotificationId) -> Result<bool, StoreError> {
        let _guard = self.commit_lock.lock().await;
        let path = join(NOTIFICATIONS, &id.0);
        if self.documents.read(&path).await.map_err(RepositoryError::from)?.is_none() {
            return Ok(false);
        }

        let mut fields = Map::new();
        fields.insert("read".to_string(), Value::Bool(true));
        self.documents.update(&path, fields).await.map_err(RepositoryError::from)?;
        Ok(true)
    }
}
