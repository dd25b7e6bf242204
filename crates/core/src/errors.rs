use thiserror::Error;

use crate::domain::request::{RequestId, RequestStatus};
use crate::store::StoreError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UnauthorizedReason {
    #[error("role `{acting}` cannot act while the request awaits `{expected}`")]
    RoleMismatch { expected: String, acting: String },
    #[error("request is already {status} and accepts no further action")]
    Terminal { status: RequestStatus },
    #[error("request type `{request_type}` does not allow forwarding")]
    ForwardNotPermitted { request_type: String },
    #[error("role `{role}` is the last approver and has no later step to forward to")]
    NoLaterStep { role: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("unknown request type `{0}`")]
    UnknownRequestType(String),
    #[error("invalid payload for `{request_type}`: {}", problems.join("; "))]
    InvalidPayload { request_type: String, problems: Vec<String> },
    #[error("request `{0}` was not found")]
    NotFound(RequestId),
    #[error("unauthorized: {0}")]
    Unauthorized(UnauthorizedReason),
    #[error("request `{request_id}` was modified concurrently; reload and retry")]
    Conflict { request_id: RequestId },
    #[error("request store unavailable: {0}")]
    StoreUnavailable(String),
}

impl LifecycleError {
    /// Whether repeating the same call could succeed without changing inputs.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::Conflict { .. })
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::UnknownRequestType(_) => "unknown_request_type",
            Self::InvalidPayload { .. } => "invalid_payload",
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::Conflict { .. } => "conflict",
            Self::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

impl From<StoreError> for LifecycleError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::VersionConflict { request_id, .. } => Self::Conflict { request_id },
            StoreError::Unavailable(message) | StoreError::Decode(message) => {
                Self::StoreUnavailable(message)
            }
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check the form fields and try again."
            }
            Self::NotFound { .. } => "The requested record does not exist.",
            Self::Forbidden { .. } => "Your role cannot perform this action on the request.",
            Self::Conflict { .. } => {
                "Someone else updated this request first. Reload it and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::NotFound { message, .. }
            | Self::Forbidden { message, .. }
            | Self::Conflict { message, .. }
            | Self::ServiceUnavailable { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Lifecycle(error) => {
                let message = error.to_string();
                match error {
                    LifecycleError::UnknownRequestType(_)
                    | LifecycleError::InvalidPayload { .. } => {
                        Self::BadRequest { message, correlation_id }
                    }
                    LifecycleError::NotFound(_) => Self::NotFound { message, correlation_id },
                    LifecycleError::Unauthorized(_) => Self::Forbidden { message, correlation_id },
                    LifecycleError::Conflict { .. } => Self::Conflict { message, correlation_id },
                    LifecycleError::StoreUnavailable(_) => {
                        Self::ServiceUnavailable { message, correlation_id }
                    }
                }
            }
            ApplicationError::Configuration(message) => Self::Internal { message, correlation_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::request::{RequestId, RequestStatus};
    use crate::errors::{ApplicationError, InterfaceError, LifecycleError, UnauthorizedReason};
    use crate::store::StoreError;

    #[test]
    fn invalid_payload_maps_to_bad_request_interface_error() {
        let interface = ApplicationError::from(LifecycleError::InvalidPayload {
            request_type: "book_order".to_owned(),
            problems: vec!["missing required field `title`".to_owned()],
        })
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ref message,
            } if correlation_id == "req-1" && message.contains("`title`")
        ));
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check the form fields and try again."
        );
    }

    #[test]
    fn unauthorized_maps_to_forbidden() {
        let interface = ApplicationError::from(LifecycleError::Unauthorized(
            UnauthorizedReason::Terminal { status: RequestStatus::Rejected },
        ))
        .into_interface("req-2");

        assert!(matches!(interface, InterfaceError::Forbidden { .. }));
        assert!(interface.message().contains("already rejected"));
        assert_eq!(interface.correlation_id(), "req-2");
    }

    #[test]
    fn store_unavailable_maps_to_service_unavailable() {
        let interface = ApplicationError::from(LifecycleError::StoreUnavailable(
            "database lock timeout".to_owned(),
        ))
        .into_interface("req-3");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn version_conflict_becomes_retryable_conflict() {
        let request_id = RequestId("REQ-1".to_owned());
        let error = LifecycleError::from(StoreError::VersionConflict {
            request_id: request_id.clone(),
            expected: 2,
            actual: Some(3),
        });

        assert_eq!(error, LifecycleError::Conflict { request_id });
        assert!(error.is_retryable());
        assert_eq!(error.error_class(), "conflict");

        let interface = ApplicationError::from(error).into_interface("req-4");
        assert!(matches!(interface, InterfaceError::Conflict { .. }));
    }

    #[test]
    fn not_found_and_unauthorized_are_not_retryable() {
        assert!(!LifecycleError::NotFound(RequestId("REQ-404".to_owned())).is_retryable());
        assert!(!LifecycleError::Unauthorized(UnauthorizedReason::RoleMismatch {
            expected: "registrar".to_owned(),
            acting: "hod".to_owned(),
        })
        .is_retryable());
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface =
            ApplicationError::Configuration("invalid chain table".to_owned()).into_interface("req-5");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
