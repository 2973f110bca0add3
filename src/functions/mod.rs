//! Named value-transform functions.
//!
//! Functions are stateless string transforms looked up by case-insensitive
//! name. They are invoked through two grammars handled by
//! [`FunctionProcessor`]:
//!
//! - whole-value expressions inside source values, `#{world | base64}`
//! - the deprecated inline form inside output files, `#{ref | base64}`
//!
//! # Built-in Functions
//!
//! | Name     | Aliases    | Behavior                                  |
//! |----------|------------|-------------------------------------------|
//! | `base64` | `tobase64` | UTF-8 bytes encoded with standard base64  |
//!
//! # Example
//!
//! ```rust
//! use svi_cli::functions::FunctionRegistry;
//!
//! let registry = FunctionRegistry::with_builtins();
//! assert_eq!(registry.apply("BASE64", "world").unwrap(), "d29ybGQ=");
//! assert!(registry.apply("rot13", "world").is_err());
//! ```

mod processor;

pub use processor::FunctionProcessor;

use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::core::SviError;

/// A stateless transform applicable to a value.
pub trait ValueFunction: Send + Sync {
    /// Canonical name, matched case-insensitively.
    fn name(&self) -> &str;

    /// Additional names the function answers to.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// Transform `input`.
    fn apply(&self, input: &str) -> Result<String>;
}

/// `base64`: standard base64 of the UTF-8 bytes of the input.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Function;

impl ValueFunction for Base64Function {
    fn name(&self) -> &str {
        "base64"
    }

    fn aliases(&self) -> &[&str] {
        &["tobase64"]
    }

    fn apply(&self, input: &str) -> Result<String> {
        Ok(STANDARD.encode(input.as_bytes()))
    }
}

/// Case-insensitive lookup table of [`ValueFunction`]s.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn ValueFunction>>,
}

impl FunctionRegistry {
    /// Registry without any function.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in function registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(Base64Function));
        registry
    }

    /// Register `function` under its name and aliases, replacing earlier entries.
    pub fn register(&mut self, function: Arc<dyn ValueFunction>) {
        for alias in function.aliases() {
            self.functions.insert(alias.to_ascii_lowercase(), Arc::clone(&function));
        }
        self.functions.insert(function.name().to_ascii_lowercase(), function);
    }

    /// Look up a function by case-insensitive name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn ValueFunction>, SviError> {
        let normalized = name.trim().to_ascii_lowercase();
        self.functions.get(&normalized).cloned().ok_or_else(|| SviError::FunctionNotFound {
            name: name.trim().to_string(),
        })
    }

    /// Look up `name` and apply it to `input`.
    pub fn apply(&self, name: &str, input: &str) -> Result<String> {
        let function = self.get(name)?;
        function.apply(input).map_err(|e| {
            SviError::FunctionFailed {
                name: function.name().to_string(),
                reason: format!("{e:#}"),
            }
            .into()
        })
    }

    /// Registered names (canonical and aliases), sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry").field("functions", &self.names()).finish()
    }
}
