//! Global constants used throughout the SVI codebase.
//!
//! This module contains default tokens, environment variable names, exit
//! codes and parallelism parameters that are used across multiple modules.
//! Defining them centrally keeps magic values discoverable.

/// Default opening token for `#{key}` style placeholders.
pub const DEFAULT_OPENING_TOKEN: &str = "#{";

/// Default closing token for `#{key}` style placeholders.
pub const DEFAULT_CLOSING_TOKEN: &str = "}";

/// Suffix of the sibling file an output is rewritten into before the
/// final rename replaces the original.
pub const INJECTED_FILE_SUFFIX: &str = ".injected";

/// Exit status for any uncaught failure.
pub const EXIT_FAILURE: i32 = 1;

/// Exit status for a run stopped through the cancellation signal.
pub const EXIT_CANCELLED: i32 = 2;

/// Minimum number of parallel output-file tasks regardless of CPU count.
///
/// Substitution is I/O bound, so a floor of 10 keeps throughput reasonable
/// even on single-core CI runners.
pub const MIN_PARALLELISM: usize = 10;

/// Multiplier applied to CPU core count for default parallelism.
pub const PARALLELISM_CORE_MULTIPLIER: usize = 2;

/// Default CPU core count when detection fails.
pub const FALLBACK_CORE_COUNT: usize = 4;

/// Environment variable names backing the CLI options.
pub mod env {
    /// Output files or `dir/pattern` globs, `;` separated.
    pub const OUTPUT: &str = "SVI_OUTPUT";
    /// Variable sources, `;` separated.
    pub const INPUT: &str = "SVI_INPUT";
    /// Secret sources, `;` separated.
    pub const SECRETS: &str = "SVI_SECRETS";
    /// Whether glob directories are walked recursively.
    pub const RECURSE_SUBDIRECTORIES: &str = "SVI_RECURSE_SUBDIRECTORIES";
    /// Whether glob patterns ignore case.
    pub const IGNORE_CASE: &str = "SVI_IGNORE_CASE";
    /// Opening token override.
    pub const OPENING: &str = "SVI_OPENING";
    /// Closing token override.
    pub const CLOSING: &str = "SVI_CLOSING";
    /// JSON file backing the bundled secret store.
    pub const SECRET_STORE: &str = "SVI_SECRET_STORE";
    /// Bound on concurrent output-file tasks.
    pub const MAX_PARALLEL: &str = "SVI_MAX_PARALLEL";
    /// Minimum log level.
    pub const LOG_LEVEL: &str = "SVI_LOG_LEVEL";
}

/// Default number of concurrent output-file tasks: `max(10, 2 × cores)`.
pub fn default_parallelism() -> usize {
    let cores = std::thread::available_parallelism()
        .map(std::num::NonZero::get)
        .unwrap_or(FALLBACK_CORE_COUNT);
    std::cmp::max(MIN_PARALLELISM, cores * PARALLELISM_CORE_MULTIPLIER)
}
