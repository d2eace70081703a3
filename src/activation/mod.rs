//! Module activation
//!
//! Everything that turns an activation request into a live module: the
//! registry that records claims and completions, and the orchestrator that
//! drives the sequences.

pub mod orchestrator;
pub mod registry;

pub use orchestrator::ActivationOrchestrator;
pub use registry::{ActivationRegistry, ActivationStatus};
