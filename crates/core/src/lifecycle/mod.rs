//! Request lifecycle: pure transition rules plus the async engine that
//! persists them.

pub mod engine;
pub mod transition;

pub use engine::LifecycleEngine;
pub use transition::{
    apply_transition, check_invariants, derive_status, normalize_comment, open_request,
    TransitionKind, TransitionOutcome,
};
