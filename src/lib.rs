//! SVI - Sharp Value Injector
//!
//! SVI injects configuration values into arbitrary text files used in CI/CD
//! pipelines. A hierarchy of JSON variable and secret sources is flattened into
//! one catalog of dotted keys, references between values are resolved, and
//! every `#{key}` token in the output files is replaced in place.
//!
//! # Pipeline
//!
//! ```text
//! sources ─▶ flatten ─▶ resolver ─▶ Catalog ─▶ substitution (one task per output file)
//!                          │                        │
//!                      functions              ResolvedValueCache
//! ```
//!
//! 1. [`source`] expands path arguments (files, `dir/pattern` globs, URLs)
//!    into documents, in argument order.
//! 2. [`flatten`] turns each JSON document into flat `a.b.c` keys.
//! 3. [`resolver`] merges the documents (later sources win), fails on keys
//!    defined as both variable and secret, resolves `#{key}` references with
//!    cycle detection and applies whole-value functions.
//! 4. [`substitution`] rewrites the output files concurrently, sharing one
//!    [`cache::ResolvedValueCache`] so every key is materialized once per run.
//!
//! # Value Types
//!
//! Variable leaves are always plain text. Secret sources may also contain
//! typed objects such as
//! `{"type": "aws-sm-dictionary", "secretId": "prod/db", "key": "password"}`,
//! which are looked up through a [`injection::SecretStore`]. Values derived
//! from secrets are never written to the logs.
//!
//! # Library Use
//!
//! ```rust,no_run
//! use svi_cli::cli::run;
//! use svi_cli::config::RunConfig;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = RunConfig {
//!     outputs: vec!["deploy/*.yml".to_string()],
//!     variable_sources: vec!["config/base.json".to_string(), "config/prod.json".to_string()],
//!     ..RunConfig::default()
//! };
//! let summary = run(&config, CancellationToken::new()).await?;
//! println!("rewrote {} files", summary.files);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod flatten;
pub mod functions;
pub mod injection;
pub mod resolver;
pub mod source;
pub mod substitution;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
