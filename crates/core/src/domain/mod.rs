pub mod notification;
pub mod request;

pub use notification::{Notification, NotificationId};
pub use request::{
    Actor, ApprovalStep, HistoryAction, HistoryEntry, Payload, Request, RequestId,
    RequestStatus, StepStatus, Submitter,
};
