//! Integration test suite for SVI
//!
//! End-to-end tests driving the library entry points ([`svi_cli::cli::run`])
//! and the `svi` binary against temporary directories.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **scenarios**: sample sources injected into sample outputs
//! - **hierarchy**: source ordering and override semantics
//! - **secrets**: secret sources, redaction and the once-per-run fetch
//! - **patterns**: glob expansion of sources and outputs
//! - **cli**: binary arguments, environment variables and exit codes

mod common;

mod cli;
mod hierarchy;
mod patterns;
mod scenarios;
mod secrets;
