//! OCR Core - Session model and progress strategies for Open Code Review
//!
//! This crate turns an OCR session directory into derived workflow progress
//! and renders that progress as terminal frames. It never writes to a
//! session: every value is reconstructed from the artifacts on disk on each
//! pass.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod artifacts;
pub mod detector;
pub mod error;
pub mod locator;
pub mod model;
pub mod registry;
pub mod render;
pub mod strategy;

// Re-exports for convenience
pub use detector::{
    detect_active_workflows, detect_workflow_type, has_both_workflows_active, is_session_active,
};
pub use error::{ParseKindError, StateFileError, StateFileResult};
pub use locator::find_latest_active_session;
pub use model::{
    AgentStatus, MapRunInfo, MapState, PhaseInfo, PhaseProgress, PhaseStatus, ReviewState,
    ReviewerStatus, RoundInfo, SessionStatus, StateJson, WorkflowKind, WorkflowState,
};
pub use registry::StrategyRegistry;
pub use render::{Frame, FrameKind};
pub use strategy::{MapStrategy, ReviewStrategy, Strategy};
