//! CLI module for argument parsing, stop signals and terminal output.

pub mod args;
pub mod output;
pub mod signal;
