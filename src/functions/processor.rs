//! Function expression grammars.
//!
//! Whole-value expressions are evaluated by the resolver on raw source values:
//! the complete value must be `<open><arg> | <function><close>` with exactly
//! one pipe, otherwise it passes through untouched.
//!
//! Inline expressions are the older form found directly in output files. Any
//! `<open><ref> | <function><close>` substring (whitespace required around the
//! pipe) is replaced by the function applied to the literal `ref` text, with a
//! deprecation warning pointing at the file position.

use anyhow::{Context, Result};
use regex::Regex;
use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use super::FunctionRegistry;

/// Applies registered functions through both expression grammars.
#[derive(Debug, Clone)]
pub struct FunctionProcessor {
    registry: Arc<FunctionRegistry>,
    whole_value: Regex,
    inline: Regex,
}

impl FunctionProcessor {
    /// Build the grammars for the given token pair.
    pub fn new(registry: Arc<FunctionRegistry>, opening: &str, closing: &str) -> Result<Self> {
        let open = regex::escape(opening);
        let close = regex::escape(closing);
        let not_close = negated_class(closing);

        let whole_value = Regex::new(&format!(
            r"(?s)\A{open}\s*(?P<arg>[^|]*?)\s*\|\s*(?P<fun>[^|\s]+)\s*{close}\z"
        ))
        .context("Failed to build whole-value function pattern")?;

        let inline = Regex::new(&format!(
            r"{open}(?P<ref>[^{not_close}|]+?)\s+\|\s+(?P<fun>[^{not_close}|\s]+){close}"
        ))
        .context("Failed to build inline function pattern")?;

        Ok(Self {
            registry,
            whole_value,
            inline,
        })
    }

    /// Evaluate `value` if it is entirely a function expression.
    ///
    /// `key` only feeds logs and error context; the value itself is never
    /// logged since it may be secret material.
    pub fn apply_whole_value<'v>(&self, key: &str, value: &'v str) -> Result<Cow<'v, str>> {
        let Some(captures) = self.whole_value.captures(value) else {
            return Ok(Cow::Borrowed(value));
        };

        let argument = captures.name("arg").map_or("", |m| m.as_str());
        let function = captures.name("fun").map_or("", |m| m.as_str());

        debug!("Applying function {} to value of key {}", function, key);
        let output = self
            .registry
            .apply(function, argument)
            .with_context(|| format!("Failed to evaluate function '{function}' for key '{key}'"))?;

        Ok(Cow::Owned(output))
    }

    /// Replace every inline function expression in `line`.
    ///
    /// `line_number` is 1-based; reported columns are 1-based character offsets.
    pub fn apply_inline<'l>(
        &self,
        line: &'l str,
        path: &Path,
        line_number: usize,
    ) -> Result<Cow<'l, str>> {
        if !self.inline.is_match(line) {
            return Ok(Cow::Borrowed(line));
        }

        let mut output = String::with_capacity(line.len());
        let mut last = 0;

        for captures in self.inline.captures_iter(line) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            let reference = captures.name("ref").map_or("", |m| m.as_str()).trim();
            let function = captures.name("fun").map_or("", |m| m.as_str());
            let column = line[..whole.start()].chars().count() + 1;

            warn!(
                "{}:{}:{}: inline function expression '{}' is deprecated, apply '{}' in the source value instead",
                path.display(),
                line_number,
                column,
                whole.as_str(),
                function
            );

            let replacement = self.registry.apply(function, reference).with_context(|| {
                format!(
                    "Failed to evaluate inline function '{function}' at {}:{line_number}:{column}",
                    path.display()
                )
            })?;

            output.push_str(&line[last..whole.start()]);
            output.push_str(&replacement);
            last = whole.end();
        }

        output.push_str(&line[last..]);
        Ok(Cow::Owned(output))
    }
}

/// Body of a character class excluding every character of `token`.
fn negated_class(token: &str) -> String {
    token.chars().map(|c| regex::escape(&c.to_string())).collect()
}
