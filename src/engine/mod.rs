//! Validation engine module.
//!
//! Provides the generic check executor, run orchestration and result
//! collection.

pub mod executor;
pub mod orchestrator;
pub mod result;
