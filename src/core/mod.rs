//! Core types for SVI
//!
//! This module holds the error taxonomy shared by every other module and the
//! helpers that turn a failed run into a user-facing message and exit status.
//!
//! # Modules
//!
//! ## `error` - Error Handling
//!
//! - [`SviError`] - Enumerated error types covering all fatal failure modes
//! - [`ErrorContext`] - User-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error to user-friendly format
//! - [`exit_code_for`] - Map a failure to the process exit status
//!
//! # Error Handling Pattern
//!
//! ```rust
//! use svi_cli::core::{SviError, user_friendly_error};
//! use anyhow::Result;
//!
//! fn example_operation() -> Result<String> {
//!     Err(SviError::FunctionNotFound { name: "rot13".to_string() }.into())
//! }
//!
//! if let Err(e) = example_operation() {
//!     let friendly = user_friendly_error(e);
//!     assert!(friendly.to_string().contains("rot13"));
//! }
//! ```

pub mod error;

pub use error::{
    ErrorContext, SviError, exit_code_for, find_svi_error, is_cancellation, user_friendly_error,
};
