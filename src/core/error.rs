//! Error handling for SVI
//!
//! This module provides the error taxonomy and user-friendly error reporting for
//! the injector. The error system follows two principles:
//! 1. **Strongly-typed errors** for precise handling in code
//! 2. **User-friendly messages** with actionable suggestions for pipeline logs
//!
//! # Architecture
//!
//! - [`SviError`] - Enumerated error types for every fatal failure of a run
//! - [`ErrorContext`] - Wrapper that adds details and a suggestion for display
//!
//! # Error Categories
//!
//! - **Parsing**: [`SviError::JsonParse`], [`SviError::UnsupportedLeaf`],
//!   [`SviError::UnsupportedInjectionType`]
//! - **Schema**: [`SviError::MissingProperty`]
//! - **Catalog construction**: [`SviError::KeyCollision`], [`SviError::FunctionNotFound`]
//! - **Secrets**: [`SviError::SecretFetch`], [`SviError::SecretNotFound`],
//!   [`SviError::SecretKeyNotFound`], [`SviError::SecretStoreNotConfigured`]
//! - **I/O**: [`SviError::FileSystemError`], [`SviError::InvalidPath`],
//!   [`SviError::RemoteFetch`]
//! - **Run control**: [`SviError::Cancelled`]
//!
//! Recursion between keys and references to undefined keys are not errors: the
//! resolver substitutes a sentinel or leaves the token untouched and logs it.
//!
//! # Examples
//!
//! ```rust,no_run
//! use svi_cli::core::{SviError, user_friendly_error};
//!
//! let error = SviError::KeyCollision { key: "db.password".to_string() };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // Shows colored error with suggestions
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use crate::constants::{EXIT_CANCELLED, EXIT_FAILURE};

/// The main error type for SVI operations
///
/// Each variant carries the context (source, key, path) needed to diagnose the
/// failure from a pipeline log without re-running in verbose mode.
#[derive(Error, Debug, Clone)]
pub enum SviError {
    /// A source document is not valid JSON
    #[error("Failed to parse JSON source '{source_name}': {reason}")]
    JsonParse {
        /// Path or URL of the source document
        source_name: String,
        /// Parser message including line and column
        reason: String,
    },

    /// A JSON node that cannot be flattened into a single value
    #[error("Unsupported {kind} value at key '{key}' in source '{source_name}'")]
    UnsupportedLeaf {
        /// Path or URL of the source document
        source_name: String,
        /// Flat key of the offending node
        key: String,
        /// JSON kind of the node (e.g. "array")
        kind: String,
    },

    /// A typed object declares a `type` this tool does not know
    #[error("'{type_name}' is not a supported injection type (key '{key}')")]
    UnsupportedInjectionType {
        /// Flat key of the typed object
        key: String,
        /// Declared type
        type_name: String,
    },

    /// A typed object is missing a property its type requires
    #[error("'{property}' is required for {type_name} (key '{key}')")]
    MissingProperty {
        /// Flat key of the typed object
        key: String,
        /// Declared type
        type_name: String,
        /// Name of the missing property
        property: String,
    },

    /// The same key is defined as both a variable and a secret
    #[error("Key '{key}' is defined both as a variable and as a secret")]
    KeyCollision {
        /// Colliding flat key
        key: String,
    },

    /// A `value | function` expression names an unregistered function
    #[error("Function '{name}' not found")]
    FunctionNotFound {
        /// Function name as written
        name: String,
    },

    /// A registered function rejected its input
    #[error("Function '{name}' failed: {reason}")]
    FunctionFailed {
        /// Function name
        name: String,
        /// Failure description
        reason: String,
    },

    /// A secret reference was found but no secret store was configured
    #[error("Secret '{secret_id}' is referenced but no secret store is configured")]
    SecretStoreNotConfigured {
        /// Secret id or ARN
        secret_id: String,
    },

    /// The secret store has no secret with the given id
    #[error("Secret '{secret_id}' not found in secret store")]
    SecretNotFound {
        /// Secret id or ARN
        secret_id: String,
    },

    /// The secret exists but its dictionary lacks the requested key
    #[error("Key '{key}' not found inside secret '{secret_id}'")]
    SecretKeyNotFound {
        /// Secret id or ARN
        secret_id: String,
        /// Requested key inside the secret dictionary
        key: String,
    },

    /// The secret store failed while fetching
    #[error("Failed to fetch secret '{secret_id}': {reason}")]
    SecretFetch {
        /// Secret id or ARN
        secret_id: String,
        /// Store failure description
        reason: String,
    },

    /// A filesystem operation failed
    #[error("File system error: {operation} ({path})")]
    FileSystemError {
        /// Operation that failed (e.g. "read", "rename")
        operation: String,
        /// Affected path
        path: String,
    },

    /// A path argument does not point to an existing file or directory
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath {
        /// Path as given
        path: String,
        /// Why it was rejected
        reason: String,
    },

    /// Fetching a remote source failed
    #[error("Failed to fetch remote source '{url}': {reason}")]
    RemoteFetch {
        /// Requested URL without header fragment
        url: String,
        /// Transport or status failure
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// The run-scoped cancellation signal fired
    #[error("Operation cancelled")]
    Cancelled,

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

/// Error context wrapper that adds a suggestion and details to an [`SviError`]
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying SVI error
    pub error: SviError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: SviError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// - Error message: red and bold
    /// - Details: yellow
    /// - Suggestion: green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Find the [`SviError`] carried by `error`, either as a context layer or as a
/// cause further down the source chain.
#[must_use]
pub fn find_svi_error(error: &anyhow::Error) -> Option<&SviError> {
    error
        .downcast_ref::<SviError>()
        .or_else(|| error.chain().find_map(|cause| cause.downcast_ref::<SviError>()))
}

/// Returns `true` when the failure is [`SviError::Cancelled`].
#[must_use]
pub fn is_cancellation(error: &anyhow::Error) -> bool {
    matches!(find_svi_error(error), Some(SviError::Cancelled))
}

/// Maps a run failure to the process exit status.
///
/// Cancellation is reported distinctly from every other failure so pipeline
/// steps can tell an interrupted run from a broken one.
#[must_use]
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    if is_cancellation(error) {
        EXIT_CANCELLED
    } else {
        EXIT_FAILURE
    }
}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognizes [`SviError`] anywhere in the chain and [`std::io::Error`] at the
/// root; everything else is rendered generically with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let chain = render_chain(&error);

    if let Some(svi_error) = find_svi_error(&error) {
        let ctx = create_error_context(svi_error.clone());
        return match (ctx.details.is_none(), chain) {
            (true, Some(chain)) => ctx.with_details(chain),
            (_, _) => ctx,
        };
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(SviError::FileSystemError {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check file ownership and permissions of the output files")
                .with_details(
                    "SVI rewrites output files in place and needs write access to their directory",
                );
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(SviError::FileSystemError {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    let mut message = error.to_string();
    if let Some(chain) = chain {
        message.push_str("\n\n");
        message.push_str(&chain);
    }

    ErrorContext::new(SviError::Other {
        message,
    })
}

fn render_chain(error: &anyhow::Error) -> Option<String> {
    let causes: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if causes.is_empty() {
        return None;
    }

    let mut message = String::from("Caused by:");
    for (i, cause) in causes.iter().enumerate() {
        message.push_str(&format!("\n  {}: {}", i + 1, cause));
    }
    Some(message)
}

/// Map each [`SviError`] variant to an [`ErrorContext`] with a tailored suggestion.
fn create_error_context(error: SviError) -> ErrorContext {
    match &error {
        SviError::JsonParse {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Validate the source with a JSON linter; only comments and trailing commas are tolerated"),
        SviError::UnsupportedLeaf {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Sources must be nested objects of scalars; replace arrays with objects keyed by name",
        ),
        SviError::UnsupportedInjectionType {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Supported types are 'aws-sm-dictionary' and 'composite'"),
        SviError::MissingProperty {
            type_name,
            ..
        } => {
            let hint = match type_name.as_str() {
                "aws-sm-dictionary" => "aws-sm-dictionary requires 'secretId' and 'key'",
                "composite" => "composite requires 'value'",
                _ => "Check the required properties of the declared type",
            };
            ErrorContext::new(error).with_suggestion(hint)
        }
        SviError::KeyCollision {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Rename the key in either the variable or the secret sources")
            .with_details("A key may be defined in several files of one category, but never in both categories"),
        SviError::FunctionNotFound {
            ..
        } => ErrorContext::new(error).with_suggestion("Available functions: base64"),
        SviError::SecretStoreNotConfigured {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Pass --secret-store <FILE> or set SVI_SECRET_STORE"),
        SviError::SecretNotFound {
            ..
        }
        | SviError::SecretKeyNotFound {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check the 'secretId' and 'key' properties against the secret store"),
        SviError::InvalidPath {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Paths without '*' must be existing files; glob patterns must live in an existing directory",
        ),
        SviError::RemoteFetch {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Check the URL and any headers passed via the '#headers=' fragment",
        ),
        SviError::Cancelled => ErrorContext::new(error)
            .with_details("The run was interrupted; output files that had not finished were left untouched"),
        _ => ErrorContext::new(error),
    }
}
