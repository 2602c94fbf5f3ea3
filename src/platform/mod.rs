//! Platform abstraction layer.
//!
//! The only two ways a check touches the outside world:
//! - Local text artifacts (`artifact`)
//! - HTTP endpoints (`probe`)
//!
//! Both sit behind traits so the engine can run against mocks.

pub mod artifact;
pub mod probe;
