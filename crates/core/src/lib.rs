pub mod audit;
pub mod chains;
pub mod config;
pub mod domain;
pub mod errors;
pub mod history;
pub mod lifecycle;
pub mod notifications;
pub mod projection;
pub mod store;

pub use audit::{
    AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink, LifecycleEventKind,
    NoopAuditSink,
};
pub use chains::{ChainConfigError, ChainDefinition, ChainRegistry, FieldKind, FieldRule};
pub use domain::notification::{Notification, NotificationId};
pub use domain::request::{
    Actor, ApprovalStep, HistoryAction, HistoryEntry, Payload, Request, RequestId, RequestStatus,
    StepStatus, Submitter,
};
pub use errors::{ApplicationError, InterfaceError, LifecycleError, UnauthorizedReason};
pub use lifecycle::{LifecycleEngine, TransitionKind, TransitionOutcome};
pub use notifications::{inbox_for, RoleDirectory, StaticRoleDirectory};
pub use projection::DashboardSummary;
pub use store::{NotificationStore, RequestFilter, RequestStore, StoreError};
