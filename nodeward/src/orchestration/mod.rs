//! Orchestration facade.
//!
//! [`NodeOrchestrator`] is the only type front ends need. It serializes
//! node switches, mining toggles and stops through one ordered queue, runs
//! update checks beside it, and translates every component error into an
//! [`OrchestrationError`].

mod error;
mod mining;
mod orchestrator;

pub use error::{MiningError, OrchestrationError, OrchestrationResult};
pub use mining::MiningState;
pub use orchestrator::{NodeOrchestrator, OrchestratorParts};
