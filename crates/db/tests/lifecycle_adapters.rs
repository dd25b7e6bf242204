//! Lifecycle scenarios run against every store adapter.

use std::sync::Arc;

use serde_json::json;

use campusdesk_core::audit::InMemoryAuditSink;
use campusdesk_core::chains::ChainRegistry;
use campusdesk_core::domain::request::{
    Actor, HistoryAction, Payload, RequestStatus, StepStatus, Submitter,
};
use campusdesk_core::errors::{LifecycleError, UnauthorizedReason};
use campusdesk_core::history::is_append_only;
use campusdesk_core::lifecycle::{check_invariants, LifecycleEngine};
use campusdesk_core::store::{NotificationStore, RequestStore};
use campusdesk_db::{
    connect_with_settings, migrations, DocumentRequestStore, InMemoryDocumentStore, SqlStore,
};

type TestResult = Result<(), String>;

trait LifecycleStore: RequestStore + NotificationStore {}
impl<T: RequestStore + NotificationStore> LifecycleStore for T {}

async fn sql_store() -> Arc<SqlStore> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("run migrations");
    Arc::new(SqlStore::new(pool))
}

fn document_store() -> Arc<DocumentRequestStore<InMemoryDocumentStore>> {
    Arc::new(DocumentRequestStore::new(Arc::new(InMemoryDocumentStore::new())))
}

fn engine<S: LifecycleStore + 'static>(store: Arc<S>) -> LifecycleEngine<S> {
    LifecycleEngine::new(Arc::new(ChainRegistry::with_defaults()), store)
        .with_audit_sink(Arc::new(InMemoryAuditSink::default()))
}

fn book_order_payload() -> Payload {
    json!({ "title": "Data Structures in C", "quantity": 10, "estimated_cost": "3250.00" })
        .as_object()
        .cloned()
        .expect("object payload")
}

fn submitter() -> Submitter {
    Submitter::new("u-lib-7", "Meera Iyer")
}

fn actor(role: &str) -> Actor {
    Actor::new(format!("u-{role}"), format!("{role} desk"), role)
}

async fn create_approve_approve<S: LifecycleStore + 'static>(store: Arc<S>) -> TestResult {
    let engine = engine(store.clone());
    let chain = engine.chain_for("book_order").map_err(|e| e.to_string())?.clone();

    // Scenario 1.
    let created = engine
        .create("book_order", book_order_payload(), &submitter())
        .await
        .map_err(|e| e.to_string())?;
    let fetched = engine.get(&created.id).await.map_err(|e| e.to_string())?;
    if fetched != created {
        return Err("get after create should return the created record".into());
    }
    if engine.get(&created.id).await.map_err(|e| e.to_string())? != fetched {
        return Err("repeated get should be idempotent".into());
    }
    let roles: Vec<&str> = fetched.approval_flow.iter().map(|step| step.role.as_str()).collect();
    if roles != ["asst_store", "registrar"] {
        return Err(format!("unexpected flow roles {roles:?}"));
    }
    if fetched.status != RequestStatus::Pending
        || fetched.current_approver_role.as_deref() != Some("asst_store")
        || fetched.history.len() != 1
        || fetched.history[0].action != HistoryAction::Created
        || fetched.history[0].by != "u-lib-7"
    {
        return Err(format!("unexpected created record {fetched:?}"));
    }

    // Scenario 2.
    let approved = engine
        .approve(&created.id, &actor("asst_store"), Some("in stock budget"))
        .await
        .map_err(|e| e.to_string())?;
    if approved.approval_flow[0].status != StepStatus::Approved
        || approved.current_approver_role.as_deref() != Some("registrar")
        || approved.status.is_terminal()
        || approved.history.len() != 2
    {
        return Err(format!("unexpected record after first approval {approved:?}"));
    }
    let registrar_inbox = store.list_for_role("registrar", true).await.map_err(|e| e.to_string())?;
    if registrar_inbox.len() != 1 || registrar_inbox[0].related_request_id != created.id {
        return Err(format!("registrar should have one notification, got {registrar_inbox:?}"));
    }

    // Scenario 3.
    let finished = engine
        .approve(&created.id, &actor("registrar"), None)
        .await
        .map_err(|e| e.to_string())?;
    if finished.status != RequestStatus::Approved
        || finished.current_approver_role.is_some()
        || finished.history.len() != 3
    {
        return Err(format!("unexpected final record {finished:?}"));
    }
    if !is_append_only(&approved.history, &finished.history) {
        return Err("history must only grow".into());
    }
    let registrar_after = store.list_for_role("registrar", false).await.map_err(|e| e.to_string())?;
    if registrar_after.len() != 1 {
        return Err("terminal approval must not notify anyone".into());
    }
    check_invariants(&finished, &chain)?;

    for role in ["asst_store", "registrar"] {
        let actor = actor(role);
        let attempts = [
            engine.approve(&created.id, &actor, None).await,
            engine.reject(&created.id, &actor, Some("reconsidered")).await,
            engine.forward(&created.id, &actor, None).await,
        ];
        for attempt in attempts {
            match attempt {
                Err(LifecycleError::Unauthorized(UnauthorizedReason::Terminal {
                    status: RequestStatus::Approved,
                })) => {}
                other => return Err(format!("approved request must stay final, got {other:?}")),
            }
        }
    }
    if engine.get(&created.id).await.map_err(|e| e.to_string())? != finished {
        return Err("refused transitions must leave the record untouched".into());
    }
    Ok(())
}

async fn wrong_role_and_rejection<S: LifecycleStore + 'static>(store: Arc<S>) -> TestResult {
    let engine = engine(store);

    // Scenario 4.
    let request = engine
        .create("book_order", book_order_payload(), &submitter())
        .await
        .map_err(|e| e.to_string())?;
    match engine.reject(&request.id, &actor("registrar"), Some("too early")).await {
        Err(LifecycleError::Unauthorized(UnauthorizedReason::RoleMismatch { .. })) => {}
        other => return Err(format!("expected role mismatch, got {other:?}")),
    }
    let unchanged = engine.get(&request.id).await.map_err(|e| e.to_string())?;
    if unchanged != request {
        return Err("refused transition must not change the record".into());
    }

    // Scenario 5.
    let fresh = engine
        .create("book_order", book_order_payload(), &submitter())
        .await
        .map_err(|e| e.to_string())?;
    let rejected = engine
        .reject(&fresh.id, &actor("asst_store"), Some("duplicate"))
        .await
        .map_err(|e| e.to_string())?;
    if rejected.status != RequestStatus::Rejected
        || rejected.current_approver_role.is_some()
        || rejected.approval_flow[0].status != StepStatus::Rejected
    {
        return Err(format!("unexpected rejected record {rejected:?}"));
    }
    for role in ["asst_store", "registrar"] {
        match engine.approve(&fresh.id, &actor(role), None).await {
            Err(LifecycleError::Unauthorized(UnauthorizedReason::Terminal { .. })) => {}
            other => return Err(format!("approve after rejection should fail, got {other:?}")),
        }
    }
    if engine.list_pending_for("asst_store").await.map_err(|e| e.to_string())?.len() != 1 {
        return Err("only the untouched request should still wait on asst_store".into());
    }
    Ok(())
}

async fn concurrent_approvals<S: LifecycleStore + 'static>(store: Arc<S>) -> TestResult {
    let engine = engine(store);
    let request = engine
        .create("book_order", book_order_payload(), &submitter())
        .await
        .map_err(|e| e.to_string())?;

    // Scenario 6.
    let left_engine = engine.clone();
    let right_engine = engine.clone();
    let left_id = request.id.clone();
    let right_id = request.id.clone();
    let left = tokio::spawn(async move {
        left_engine.approve(&left_id, &actor("asst_store"), Some("left")).await
    });
    let right = tokio::spawn(async move {
        right_engine.approve(&right_id, &actor("asst_store"), Some("right")).await
    });
    let results = [
        left.await.map_err(|e| e.to_string())?,
        right.await.map_err(|e| e.to_string())?,
    ];

    let successes = results.iter().filter(|result| result.is_ok()).count();
    if successes != 1 {
        return Err(format!("exactly one approval should win, got {results:?}"));
    }
    for result in &results {
        if let Err(error) = result {
            if !matches!(error, LifecycleError::Conflict { .. } | LifecycleError::Unauthorized(_)) {
                return Err(format!("loser should fail cleanly, got {error:?}"));
            }
        }
    }

    let stored = engine.get(&request.id).await.map_err(|e| e.to_string())?;
    if stored.history.len() != 2 || stored.version != 2 {
        return Err(format!("exactly one transition should be recorded, got {stored:?}"));
    }
    Ok(())
}

async fn forward_and_listing<S: LifecycleStore + 'static>(store: Arc<S>) -> TestResult {
    let engine = engine(store.clone());
    let application = engine
        .create(
            "teacher_application",
            json!({
                "applicant_name": "Dr. P. Varghese",
                "department": "Physics",
                "position": "Lecturer"
            })
            .as_object()
            .cloned()
            .unwrap_or_default(),
            &Submitter::new("u-staff-4", "Office Desk"),
        )
        .await
        .map_err(|e| e.to_string())?;

    let forwarded = engine
        .forward(&application.id, &actor("hod"), Some("   "))
        .await
        .map_err(|e| e.to_string())?;
    if forwarded.status != RequestStatus::Forwarded
        || forwarded.approval_flow[0].status != StepStatus::Forwarded
        || forwarded.history[1].action != HistoryAction::Forwarded
        || forwarded.history[1].comment.is_some()
    {
        return Err(format!("unexpected forwarded record {forwarded:?}"));
    }

    let pending = engine.list_pending_for("registrar").await.map_err(|e| e.to_string())?;
    if pending.iter().map(|r| &r.id).collect::<Vec<_>>() != vec![&application.id] {
        return Err(format!("registrar queue should hold the forwarded application, got {pending:?}"));
    }

    match engine.forward(&application.id, &actor("registrar"), None).await {
        Err(LifecycleError::Unauthorized(UnauthorizedReason::NoLaterStep { .. })) => {}
        other => return Err(format!("forward from last step should fail, got {other:?}")),
    }

    let timing = engine
        .create(
            "timing_request",
            json!({
                "title": "Lab hours",
                "requested_timing": "09:00-19:00",
                "effective_from": "2026-12-01"
            })
            .as_object()
            .cloned()
            .unwrap_or_default(),
            &submitter(),
        )
        .await
        .map_err(|e| e.to_string())?;
    match engine.forward(&timing.id, &actor("registrar"), None).await {
        Err(LifecycleError::Unauthorized(UnauthorizedReason::ForwardNotPermitted { .. })) => {}
        other => return Err(format!("timing requests cannot be forwarded, got {other:?}")),
    }

    let registrar_notes = store.list_for_role("registrar", false).await.map_err(|e| e.to_string())?;
    if registrar_notes.len() != 2 {
        return Err(format!("registrar should hear about forward and timing request, got {registrar_notes:?}"));
    }
    Ok(())
}

#[tokio::test]
async fn sqlite_store_walks_a_book_order_to_approval() -> TestResult {
    create_approve_approve(sql_store().await).await
}

#[tokio::test]
async fn document_store_walks_a_book_order_to_approval() -> TestResult {
    create_approve_approve(document_store()).await
}

#[tokio::test]
async fn sqlite_store_refuses_wrong_role_and_freezes_rejections() -> TestResult {
    wrong_role_and_rejection(sql_store().await).await
}

#[tokio::test]
async fn document_store_refuses_wrong_role_and_freezes_rejections() -> TestResult {
    wrong_role_and_rejection(document_store()).await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sqlite_store_applies_concurrent_approvals_once() -> TestResult {
    concurrent_approvals(sql_store().await).await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn document_store_applies_concurrent_approvals_once() -> TestResult {
    concurrent_approvals(document_store()).await
}

#[tokio::test]
async fn sqlite_store_forwards_and_lists_pending_work() -> TestResult {
    forward_and_listing(sql_store().await).await
}

#[tokio::test]
async fn document_store_forwards_and_lists_pending_work() -> TestResult {
    forward_and_listing(document_store()).await
}
