//! Shared utilities
//!
//! # Modules
//!
//! - [`cancel`] - Run-scoped cancellation helpers for suspension points
//! - [`fs`] - Async file helpers used by source loading and substitution

pub mod cancel;
pub mod fs;

pub use cancel::{cancellable, ensure_not_cancelled};
pub use fs::{injected_sibling, read_source, replace_file};

/// Render a byte count in binary units, e.g. `1.5KiB`.
///
/// Used only for diagnostics, so two decimals with trailing zeros trimmed are
/// enough.
#[must_use]
pub fn bytes_to_string(value: u64) -> String {
    const UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

    let mut unit = 0;
    let mut scaled = value as f64;
    while scaled >= 1024.0 && unit < UNITS.len() - 1 {
        scaled /= 1024.0;
        unit += 1;
    }

    let rendered = format!("{scaled:.2}");
    let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed}{}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_string() {
        assert_eq!(bytes_to_string(0), "0B");
        assert_eq!(bytes_to_string(512), "512B");
        assert_eq!(bytes_to_string(1024), "1KiB");
        assert_eq!(bytes_to_string(1536), "1.5KiB");
        assert_eq!(bytes_to_string(5 * 1024 * 1024), "5MiB");
    }
}
