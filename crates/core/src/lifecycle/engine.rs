use std::sync::Arc;

use chrono::Utc;

use crate::audit::{AuditContext, AuditEvent, AuditSink, NoopAuditSink};
use crate::chains::{ChainDefinition, ChainRegistry};
use crate::domain::request::{
    Actor, HistoryAction, Payload, Request, RequestId, RequestStatus, Submitter,
};
use crate::errors::LifecycleError;
use crate::lifecycle::transition::{apply_transition, open_request, TransitionKind};
use crate::notifications;
use crate::store::{RequestFilter, RequestStore};

/// Drives requests through their approval chains.
///
/// Every mutation is read, applied in memory, then committed against the
/// version that was read. A competing writer makes the commit fail with
/// [`LifecycleError::Conflict`] and nothing is persisted.
pub struct LifecycleEngine<S: ?Sized> {
    chains: Arc<ChainRegistry>,
    audit: Arc<dyn AuditSink>,
    store: Arc<S>,
}

impl<S: ?Sized> Clone for LifecycleEngine<S> {
    fn clone(&self) -> Self {
        Self { chains: self.chains.clone(), audit: self.audit.clone(), store: self.store.clone() }
    }
}

impl<S> LifecycleEngine<S>
where
    S: RequestStore + ?Sized,
{
    pub fn new(chains: Arc<ChainRegistry>, store: Arc<S>) -> Self {
        Self { chains, audit: Arc::new(NoopAuditSink), store }
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn chains(&self) -> &ChainRegistry {
        &self.chains
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn chain_for(&self, request_type: &str) -> Result<&ChainDefinition, LifecycleError> {
        self.chains.chain_for(request_type)
    }

    pub async fn create(
        &self,
        request_type: &str,
        payload: Payload,
        submitter: &Submitter,
    ) -> Result<Request, LifecycleError> {
        self.create_with_context(
            request_type,
            payload,
            submitter,
            &AuditContext::generated(submitter.user_id.clone()),
        )
        .await
    }

    pub async fn create_with_context(
        &self,
        request_type: &str,
        payload: Payload,
        submitter: &Submitter,
        audit: &AuditContext,
    ) -> Result<Request, LifecycleError> {
        let result = self.open(request_type, payload, submitter).await;
        match &result {
            Ok(request) => self.audit.emit(AuditEvent::request_created(request, audit)),
            Err(error) => self.audit.emit(AuditEvent::request_refused(request_type, error, audit)),
        }
        result
    }

    async fn open(
        &self,
        request_type: &str,
        payload: Payload,
        submitter: &Submitter,
    ) -> Result<Request, LifecycleError> {
        let chain = self.chains.chain_for(request_type)?;
        let now = Utc::now();

        // Validate before allocating an id so rejected submissions leave no gaps.
        let draft = open_request(RequestId(String::new()), chain, payload, submitter, now)?;
        let id = self.store.next_request_id().await?;
        let request = Request { id, ..draft };

        let notification =
            notifications::for_transition(&request, HistoryAction::Created, &submitter.name, now);

        self.store.insert(request.clone(), notification).await?;
        Ok(request)
    }

    pub async fn get(&self, id: &RequestId) -> Result<Request, LifecycleError> {
        self.store.find_by_id(id).await?.ok_or_else(|| LifecycleError::NotFound(id.clone()))
    }

    pub async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, LifecycleError> {
        Ok(self.store.list(filter).await?)
    }

    pub async fn list_pending_for(&self, role: &str) -> Result<Vec<Request>, LifecycleError> {
        self.list(&RequestFilter::pending_on(role.trim())).await
    }

    pub async fn approve(
        &self,
        id: &RequestId,
        actor: &Actor,
        comment: Option<&str>,
    ) -> Result<Request, LifecycleError> {
        self.apply(id, TransitionKind::Approve, actor, comment, &context_for(actor)).await
    }

    pub async fn reject(
        &self,
        id: &RequestId,
        actor: &Actor,
        comment: Option<&str>,
    ) -> Result<Request, LifecycleError> {
        self.apply(id, TransitionKind::Reject, actor, comment, &context_for(actor)).await
    }

    pub async fn forward(
        &self,
        id: &RequestId,
        actor: &Actor,
        comment: Option<&str>,
    ) -> Result<Request, LifecycleError> {
        self.apply(id, TransitionKind::Forward, actor, comment, &context_for(actor)).await
    }

    /// Applies one transition and records its audit event under `audit`.
    pub async fn apply(
        &self,
        id: &RequestId,
        kind: TransitionKind,
        actor: &Actor,
        comment: Option<&str>,
        audit: &AuditContext,
    ) -> Result<Request, LifecycleError> {
        let result = self.transition(id, kind, actor, comment).await;
        match &result {
            Ok((request, from)) => self.audit.emit(AuditEvent::transition_applied(
                request,
                kind,
                &actor.role,
                *from,
                audit,
            )),
            Err(error) => self.audit.emit(AuditEvent::transition_refused(
                id,
                kind,
                &actor.role,
                error,
                audit,
            )),
        }
        result.map(|(request, _)| request)
    }

    async fn transition(
        &self,
        id: &RequestId,
        kind: TransitionKind,
        actor: &Actor,
        comment: Option<&str>,
    ) -> Result<(Request, RequestStatus), LifecycleError> {
        let current = self.get(id).await?;
        let chain = self.chains.chain_for(&current.request_type)?;
        let expected_version = current.version;
        let now = Utc::now();

        let mut next = current;
        let outcome = apply_transition(&mut next, chain, kind, actor, comment, now)?;

        let notification = match (&outcome.next_role, kind) {
            (Some(_), TransitionKind::Approve | TransitionKind::Forward) => {
                notifications::for_transition(
                    &next,
                    kind.history_action(),
                    &actor.name,
                    now,
                )
            }
            _ => None,
        };

        self.store.commit(next.clone(), expected_version, notification).await?;
        Ok((next, outcome.from))
    }
}

fn context_for(actor: &Actor) -> AuditContext {
    AuditContext::generated(actor.user_id.clone())
}
