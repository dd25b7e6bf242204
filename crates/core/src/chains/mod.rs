//! Approval chain definitions.
//!
//! Each request type maps to an ordered list of approver roles plus the
//! statuses the lifecycle engine should use while walking that list. Chains are
//! loaded once at startup and shared read-only afterwards.

pub mod payload;

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::request::RequestStatus;
use crate::errors::LifecycleError;

pub use payload::{validate_payload, FieldKind, FieldRule};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDefinition {
    pub request_type: String,
    pub roles: Vec<String>,
    #[serde(default = "default_final_status")]
    pub final_status: RequestStatus,
    #[serde(default = "default_advance_status")]
    pub advance_status: RequestStatus,
    #[serde(default)]
    pub allows_forward: bool,
    #[serde(default)]
    pub fields: Vec<FieldRule>,
}

fn default_final_status() -> RequestStatus {
    RequestStatus::Approved
}

fn default_advance_status() -> RequestStatus {
    RequestStatus::Pending
}

impl ChainDefinition {
    pub fn new(request_type: impl Into<String>, roles: &[&str]) -> Self {
        Self {
            request_type: request_type.into(),
            roles: roles.iter().map(|role| role.to_string()).collect(),
            final_status: default_final_status(),
            advance_status: default_advance_status(),
            allows_forward: false,
            fields: Vec::new(),
        }
    }

    pub fn with_final_status(mut self, status: RequestStatus) -> Self {
        self.final_status = status;
        self
    }

    pub fn with_advance_status(mut self, status: RequestStatus) -> Self {
        self.advance_status = status;
        self
    }

    pub fn with_forwarding(mut self) -> Self {
        self.allows_forward = true;
        self
    }

    pub fn with_field(mut self, rule: FieldRule) -> Self {
        self.fields.push(rule);
        self
    }

    pub fn first_role(&self) -> &str {
        self.roles.first().map(String::as_str).unwrap_or_default()
    }

    fn validate(&self) -> Result<(), ChainConfigError> {
        let request_type = self.request_type.trim();
        if request_type.is_empty() {
            return Err(ChainConfigError::BlankRequestType);
        }

        if self.roles.is_empty() {
            return Err(ChainConfigError::EmptyChain { request_type: request_type.to_string() });
        }

        let mut seen = HashSet::new();
        for role in &self.roles {
            if role.trim().is_empty() {
                return Err(ChainConfigError::BlankRole { request_type: request_type.to_string() });
            }
            if !seen.insert(role.as_str()) {
                return Err(ChainConfigError::DuplicateRole {
                    request_type: request_type.to_string(),
                    role: role.clone(),
                });
            }
        }

        if !self.final_status.is_terminal() || self.final_status == RequestStatus::Rejected {
            return Err(ChainConfigError::InvalidFinalStatus {
                request_type: request_type.to_string(),
                status: self.final_status,
            });
        }

        if self.advance_status.is_terminal() {
            return Err(ChainConfigError::InvalidAdvanceStatus {
                request_type: request_type.to_string(),
                status: self.advance_status,
            });
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChainConfigError {
    #[error("chain request_type must not be blank")]
    BlankRequestType,
    #[error("chain `{request_type}` must list at least one approver role")]
    EmptyChain { request_type: String },
    #[error("chain `{request_type}` contains a blank role")]
    BlankRole { request_type: String },
    #[error("chain `{request_type}` lists role `{role}` more than once")]
    DuplicateRole { request_type: String, role: String },
    #[error("chain `{request_type}` final_status `{status}` must be approved|ordered|received|closed")]
    InvalidFinalStatus { request_type: String, status: RequestStatus },
    #[error("chain `{request_type}` advance_status `{status}` must be pending|forwarded")]
    InvalidAdvanceStatus { request_type: String, status: RequestStatus },
    #[error("request type `{0}` is defined more than once")]
    DuplicateRequestType(String),
}

/// Read-only lookup table from request type to chain definition.
#[derive(Clone, Debug, Default)]
pub struct ChainRegistry {
    chains: BTreeMap<String, ChainDefinition>,
}

impl ChainRegistry {
    pub fn new(definitions: Vec<ChainDefinition>) -> Result<Self, ChainConfigError> {
        let mut chains = BTreeMap::new();
        for definition in definitions {
            definition.validate()?;
            let key = normalize_type(&definition.request_type);
            if chains.contains_key(&key) {
                return Err(ChainConfigError::DuplicateRequestType(definition.request_type));
            }
            chains.insert(key, definition);
        }
        Ok(Self { chains })
    }

    /// The built-in table. It is checked by `ChainRegistry::new` in tests
    /// rather than at runtime, so this never degrades to an empty registry.
    pub fn with_defaults() -> Self {
        let chains = default_chains()
            .into_iter()
            .map(|definition| (normalize_type(&definition.request_type), definition))
            .collect();
        Self { chains }
    }

    pub fn chain_for(&self, request_type: &str) -> Result<&ChainDefinition, LifecycleError> {
        self.chains
            .get(&normalize_type(request_type))
            .ok_or_else(|| LifecycleError::UnknownRequestType(request_type.to_string()))
    }

    pub fn roles_for(&self, request_type: &str) -> Result<&[String], LifecycleError> {
        self.chain_for(request_type).map(|chain| chain.roles.as_slice())
    }

    pub fn definitions(&self) -> impl Iterator<Item = &ChainDefinition> {
        self.chains.values()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

fn normalize_type(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

/// The chain table used when configuration declares none.
pub fn default_chains() -> Vec<ChainDefinition> {
    use FieldKind::{Date, Decimal, Integer, Text};

    vec![
        ChainDefinition::new("book_order", &["asst_store", "registrar"])
            .with_forwarding()
            .with_field(FieldRule::required("title", Text))
            .with_field(FieldRule::required("quantity", Integer).positive())
            .with_field(FieldRule::optional("estimated_cost", Decimal).positive()),
        ChainDefinition::new("library_purchase", &["asst_librarian", "registrar", "principal"])
            .with_final_status(RequestStatus::Ordered)
            .with_forwarding()
            .with_field(FieldRule::required("title", Text))
            .with_field(FieldRule::required("quantity", Integer).positive())
            .with_field(FieldRule::required("estimated_cost", Decimal).positive()),
        ChainDefinition::new("timing_request", &["registrar", "principal"])
            .with_field(FieldRule::required("title", Text))
            .with_field(FieldRule::required("requested_timing", Text))
            .with_field(FieldRule::required("effective_from", Date)),
        ChainDefinition::new("teacher_application", &["hod", "registrar"])
            .with_forwarding()
            .with_field(FieldRule::required("applicant_name", Text))
            .with_field(FieldRule::required("department", Text))
            .with_field(FieldRule::required("position", Text)),
        ChainDefinition::new("equipment_request", &["lab_assistant", "hod", "registrar"])
            .with_field(FieldRule::required("item_name", Text))
            .with_field(FieldRule::required("quantity", Integer).positive())
            .with_field(FieldRule::optional("estimated_cost", Decimal).positive()),
        ChainDefinition::new("stock_request", &["workshop_instructor", "registrar"])
            .with_final_status(RequestStatus::Received)
            .with_field(FieldRule::required("item_name", Text))
            .with_field(FieldRule::required("quantity", Integer).positive()),
        ChainDefinition::new("facility_request", &["hod", "registrar", "principal"])
            .with_final_status(RequestStatus::Closed)
            .with_advance_status(RequestStatus::Forwarded)
            .with_field(FieldRule::required("title", Text))
            .with_field(FieldRule::required("location", Text))
            .with_field(FieldRule::optional("estimated_cost", Decimal).positive()),
    ]
}
