use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

use campusdesk_core::domain::notification::{Notification, NotificationDraft, NotificationId};
use campusdesk_core::domain::request::{Request, RequestId, RequestStatus};
use campusdesk_core::store::{NotificationStore, RequestFilter, RequestStore, StoreError};

use super::RepositoryError;
use crate::DbPool;

const REQUEST_COLUMNS: &str = "id, request_type, status, current_approver_role, payload_json,
    approval_flow_json, history_json, created_by, created_by_name, created_at, updated_at, version";

pub struct SqlStore {
    pool: DbPool,
}

impl SqlStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn stored_version(&self, id: &RequestId) -> Result<Option<u64>, RepositoryError> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM lifecycle_request WHERE id = ?")
                .bind(&id.0)
                .fetch_optional(&self.pool)
                .await?;
        Ok(version.map(|value| value.max(0) as u64))
    }
}

async fn next_in_sequence(
    conn: &mut sqlx::SqliteConnection,
    name: &str,
) -> Result<i64, RepositoryError> {
    let value: i64 = sqlx::query_scalar(
        "INSERT INTO lifecycle_sequence (name, value) VALUES (?, 1)
         ON CONFLICT(name) DO UPDATE SET value = value + 1
         RETURNING value",
    )
    .bind(name)
    .fetch_one(conn)
    .await?;
    Ok(value)
}

fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{column}: {error}")))
}

fn parse_json<T: serde::de::DeserializeOwned>(column: &str, raw: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(raw).map_err(|error| RepositoryError::Decode(format!("{column}: {error}")))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|error| RepositoryError::Decode(error.to_string()))
}

fn row_to_request(row: &SqliteRow) -> Result<Request, RepositoryError> {
    let id: String = row.try_get("id")?;
    let status_str: String = row.try_get("status")?;
    let payload_json: String = row.try_get("payload_json")?;
    let flow_json: String = row.try_get("approval_flow_json")?;
    let history_json: String = row.try_get("history_json")?;
    let created_at_str: String = row.try_get("created_at")?;
    let updated_at_str: String = row.try_get("updated_at")?;
    let version: i64 = row.try_get("version")?;

    let status = RequestStatus::parse(&status_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown request status `{status_str}`")))?;

    Ok(Request {
        id: RequestId(id),
        request_type: row.try_get("request_type")?,
        payload: parse_json("payload_json", &payload_json)?,
        status,
        current_approver_role: row.try_get("current_approver_role")?,
        approval_flow: parse_json("approval_flow_json", &flow_json)?,
        created_by: row.try_get("created_by")?,
        created_by_name: row.try_get("created_by_name")?,
        created_at: parse_timestamp("created_at", &created_at_str)?,
        updated_at: parse_timestamp("updated_at", &updated_at_str)?,
        history: parse_json("history_json", &history_json)?,
        version: version.max(0) as u64,
    })
}

fn row_to_notification(row: &SqliteRow) -> Result<Notification, RepositoryError> {
    let created_at_str: String = row.try_get("created_at")?;
    let read: i64 = row.try_get("read")?;

    Ok(Notification {
        id: NotificationId(row.try_get("id")?),
        recipient_role: row.try_get("recipient_role")?,
        title: row.try_get("title")?,
        message: row.try_get("message")?,
        related_request_id: RequestId(row.try_get("related_request_id")?),
        created_at: parse_timestamp("created_at", &created_at_str)?,
        read: read != 0,
    })
}

/// Numbers and stores a notification on the caller's transaction.
async fn insert_notification(
    conn: &mut sqlx::SqliteConnection,
    draft: NotificationDraft,
) -> Result<(), RepositoryError> {
    let sequence = next_in_sequence(&mut *conn, "notification").await?;
    let notification = draft.issue(NotificationId(format!("NTF-{sequence:06}")));
    sqlx::query(
        "INSERT INTO lifecycle_notification
            (id, recipient_role, title, message, related_request_id, created_at, read)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&notification.id.0)
    .bind(&notification.recipient_role)
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(&notification.related_request_id.0)
    .bind(notification.created_at.to_rfc3339())
    .bind(i64::from(notification.read))
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl RequestStore for SqlStore {
    async fn next_request_id(&self) -> Result<RequestId, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        let value = next_in_sequence(&mut conn, "request").await?;
        Ok(RequestId(format!("REQ-{value:06}")))
    }

    async fn insert(
        &self,
        request: Request,
        notification: Option<NotificationDraft>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        sqlx::query(
            "INSERT INTO lifecycle_request
                (id, request_type, status, current_approver_role, payload_json,
                 approval_flow_json, history_json, created_by, created_by_name,
                 created_at, updated_at, version)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id.0)
        .bind(&request.request_type)
        .bind(request.status.as_str())
        .bind(&request.current_approver_role)
        .bind(to_json(&request.payload)?)
        .bind(to_json(&request.approval_flow)?)
        .bind(to_json(&request.history)?)
        .bind(&request.created_by)
        .bind(&request.created_by_name)
        .bind(request.created_at.to_rfc3339())
        .bind(request.updated_at.to_rfc3339())
        .bind(request.version as i64)
        .execute(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;

        if let Some(draft) = notification {
            insert_notification(&mut tx, draft).await?;
        }

        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, StoreError> {
        let row = sqlx::query(&format!("SELECT {REQUEST_COLUMNS} FROM lifecycle_request WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        match row {
            Some(ref r) => Ok(Some(row_to_request(r)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, StoreError> {
        let mut query: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {REQUEST_COLUMNS} FROM lifecycle_request WHERE 1 = 1"));

        if let Some(submitter) = &filter.submitter {
            query.push(" AND created_by = ").push_bind(submitter.clone());
        }
        if let Some(request_type) = &filter.request_type {
            query.push(" AND LOWER(request_type) = ").push_bind(request_type.trim().to_ascii_lowercase());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(role) = &filter.pending_on {
            query
                .push(" AND current_approver_role = ")
                .push_bind(role.clone())
                .push(" AND status IN ('pending', 'forwarded')");
        }
        query.push(" ORDER BY created_at ASC, id ASC");

        let rows = query.build().fetch_all(&self.pool).await.map_err(RepositoryError::from)?;
        let requests = rows.iter().map(row_to_request).collect::<Result<Vec<_>, _>>()?;
        Ok(requests)
    }

    async fn commit(
        &self,
        request: Request,
        expected_version: u64,
        notification: Option<NotificationDraft>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let updated = sqlx::query(
            "UPDATE lifecycle_request
             SET status = ?, current_approver_role = ?, payload_json = ?,
                 approval_flow_json = ?, history_json = ?, updated_at = ?, version = ?
             WHERE id = ? AND version = ?",
        )
        .bind(request.status.as_str())
        .bind(&request.current_approver_role)
        .bind(to_json(&request.payload)?)
        .bind(to_json(&request.approval_flow)?)
        .bind(to_json(&request.history)?)
        .bind(request.updated_at.to_rfc3339())
        .bind(request.version as i64)
        .bind(&request.id.0)
        .bind(expected_version as i64)
        .execute(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(RepositoryError::from)?;
            let actual = self.stored_version(&request.id).await?;
            return Err(StoreError::VersionConflict {
                request_id: request.id,
                expected: expected_version,
                actual,
            });
        }

        if let Some(draft) = notification {
            insert_notification(&mut tx, draft).await?;
        }

        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for SqlStore {
    async fn list_for_role(
        &self,
        role: &str,
        unread_only: bool,
    ) -> Result<Vec<Notification>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, recipient_role, title, message, related_request_id, created_at, read
             FROM lifecycle_notification
             WHERE recipient_role = ? AND (? = 0 OR read = 0)
             ORDER BY created_at DESC, id DESC",
        )
        .bind(role)
        .bind(i64::from(unread_only))
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        let notifications = rows.iter().map(row_to_notification).collect::<Result<Vec<_>, _>>()?;
        Ok(notifications)
    }

    async fn mark_read(&self, id: &NotificationId) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE lifecycle_notification SET read = 1 WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
        Ok(result.rows_affected() > 0)
    }
}
