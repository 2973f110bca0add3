//! Command-line interface for SVI.
//!
//! `svi` has no subcommands: one invocation is one injection run. Every option
//! can also be supplied through an `SVI_*` environment variable, which is how
//! pipeline steps usually configure it. List-valued variables are `;`
//! separated.
//!
//! # Examples
//!
//! ```bash
//! # Layered variables, later sources win
//! svi -i config/base.json -i config/prod.json deploy/*.yml
//!
//! # Secrets backed by a local store file, custom tokens
//! svi -s secrets.json --secret-store store.json \
//!     --opening-token '${{' --closing-token '}}' k8s/*.yaml
//!
//! # Same run configured through the environment
//! SVI_INPUT='config/base.json;config/prod.json' SVI_OUTPUT='deploy/*.yml' svi
//! ```
//!
//! # Exit Status
//!
//! - `0` every output file was rewritten
//! - `1` any failure; no output is touched if the catalog could not be built
//! - `2` the run was interrupted (SIGINT, SIGTERM)

mod run;

pub use run::{RunSummary, run, run_with_secrets};

use anyhow::Result;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::{RunConfig, TokenPair};
use crate::constants::{DEFAULT_CLOSING_TOKEN, DEFAULT_OPENING_TOKEN, default_parallelism, env};

/// Main CLI application structure for SVI
#[derive(Parser, Debug)]
#[command(
    name = "svi",
    about = "Sharp Value Injector - inject JSON variables and secrets into text files",
    version,
    long_about = "Resolves a hierarchy of JSON variable and secret sources into one flat catalog \
                  and replaces #{key} tokens in the output files in place."
)]
pub struct Cli {
    /// Output files or `dir/pattern` globs rewritten in place.
    #[arg(value_name = "OUTPUT", env = env::OUTPUT, value_delimiter = ';')]
    outputs: Vec<String>,

    /// Variable sources (files, globs or http(s) URLs); later sources win.
    #[arg(short, long = "input", value_name = "SOURCE", env = env::INPUT, value_delimiter = ';')]
    inputs: Vec<String>,

    /// Secret sources (files, globs or http(s) URLs); later sources win.
    #[arg(short, long, value_name = "SOURCE", env = env::SECRETS, value_delimiter = ';')]
    secrets: Vec<String>,

    /// Walk subdirectories when expanding globs.
    #[arg(
        long,
        env = env::RECURSE_SUBDIRECTORIES,
        default_value_t = true,
        action = ArgAction::Set,
        value_name = "BOOL"
    )]
    recurse_subdirectories: bool,

    /// Match glob patterns case-insensitively.
    #[arg(
        long,
        env = env::IGNORE_CASE,
        default_value_t = true,
        action = ArgAction::Set,
        value_name = "BOOL"
    )]
    ignore_case: bool,

    /// Token opening a reference.
    #[arg(long, env = env::OPENING, default_value = DEFAULT_OPENING_TOKEN, allow_hyphen_values = true)]
    opening_token: String,

    /// Token closing a reference.
    #[arg(long, env = env::CLOSING, default_value = DEFAULT_CLOSING_TOKEN, allow_hyphen_values = true)]
    closing_token: String,

    /// JSON file `{secretId: {key: value}}` backing secret references.
    #[arg(long, value_name = "FILE", env = env::SECRET_STORE)]
    secret_store: Option<PathBuf>,

    /// Maximum number of output files processed concurrently.
    ///
    /// Defaults to max(10, 2 × CPU cores).
    #[arg(long, value_name = "N", env = env::MAX_PARALLEL)]
    max_parallel: Option<usize>,

    /// Minimum log level (error, warn, info, debug, trace).
    #[arg(long, env = env::LOG_LEVEL, default_value = "info")]
    log_level: String,

    /// Enable debug logging.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    /// Translate the parsed arguments into a [`RunConfig`].
    ///
    /// Entries are trimmed and empty ones dropped, so `SVI_INPUT='a.json;'`
    /// names a single source.
    pub fn build_config(&self) -> Result<RunConfig> {
        let config = RunConfig {
            outputs: clean(&self.outputs),
            variable_sources: clean(&self.inputs),
            secret_sources: clean(&self.secrets),
            recurse_subdirectories: self.recurse_subdirectories,
            ignore_case: self.ignore_case,
            tokens: TokenPair::new(self.opening_token.as_str(), self.closing_token.as_str())?,
            secret_store: self.secret_store.clone(),
            max_parallel: self.max_parallel.unwrap_or_else(default_parallelism),
        };
        config.validate()?;
        Ok(config)
    }

    /// Log filter directive selected by the verbosity flags.
    #[must_use]
    pub fn log_filter(&self) -> String {
        if self.verbose {
            "debug".to_string()
        } else if self.quiet {
            "error".to_string()
        } else {
            self.log_level.clone()
        }
    }

    /// Install the global tracing subscriber, writing to stderr.
    ///
    /// `RUST_LOG` takes precedence over the command-line level.
    pub fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::try_new(self.log_filter()).unwrap_or_else(|_| EnvFilter::new("info"))
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Execute one run.
    pub async fn execute(self, cancel: CancellationToken) -> Result<()> {
        let config = self.build_config()?;
        debug!("Run configuration: {:?}", config);
        run(&config, cancel).await.map(|_| ())
    }
}

fn clean(values: &[String]) -> Vec<String> {
    values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()).map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SviError, find_svi_error};

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("svi").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["out.yml"]);
        let config = cli.build_config().unwrap();

        assert_eq!(config.outputs, ["out.yml"]);
        assert!(config.variable_sources.is_empty());
        assert!(config.recurse_subdirectories);
        assert!(config.ignore_case);
        assert_eq!(config.tokens, TokenPair::default());
        assert_eq!(config.max_parallel, default_parallelism());
        assert_eq!(cli.log_filter(), "info");
    }

    #[test]
    fn test_repeated_and_delimited_sources() {
        let cli = parse(&["-i", "a.json;b.json", "--input", " c.json ", "-s", "s.json;", "o1;o2"]);
        let config = cli.build_config().unwrap();

        assert_eq!(config.variable_sources, ["a.json", "b.json", "c.json"]);
        assert_eq!(config.secret_sources, ["s.json"]);
        assert_eq!(config.outputs, ["o1", "o2"]);
    }

    #[test]
    fn test_explicit_options() {
        let cli = parse(&[
            "--recurse-subdirectories",
            "false",
            "--ignore-case",
            "false",
            "--opening-token",
            "${{",
            "--closing-token",
            "}}",
            "--max-parallel",
            "3",
            "--secret-store",
            "store.json",
            "-v",
            "out.yml",
        ]);
        let config = cli.build_config().unwrap();

        assert!(!config.recurse_subdirectories);
        assert!(!config.ignore_case);
        assert_eq!(config.tokens.wrap("k"), "${{k}}");
        assert_eq!(config.max_parallel, 3);
        assert_eq!(config.secret_store, Some(PathBuf::from("store.json")));
        assert_eq!(cli.log_filter(), "debug");
    }

    #[test]
    fn test_invalid_configurations() {
        let err = parse(&["--opening-token", "", "out.yml"]).build_config().unwrap_err();
        assert!(matches!(find_svi_error(&err), Some(SviError::ConfigError { .. })));

        let err = parse(&["--max-parallel", "0", "out.yml"]).build_config().unwrap_err();
        assert!(matches!(find_svi_error(&err), Some(SviError::ConfigError { .. })));

        assert!(Cli::try_parse_from(["svi", "-v", "-q", "out.yml"]).is_err());
    }

    #[test]
    fn test_quiet_filter() {
        assert_eq!(parse(&["-q", "out.yml"]).log_filter(), "error");
        assert_eq!(parse(&["--log-level", "warn", "out.yml"]).log_filter(), "warn");
    }
}
