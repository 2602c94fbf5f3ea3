//! Integration tests for verigate.
//!
//! These tests drive whole runs against mock artifacts and endpoints, plus a
//! few against the real filesystem and a loopback HTTP server.

pub mod full_run_tests;
