//! Relaxed JSON input.
//!
//! Source files are often hand-edited, so `//` and `/* */` comments and
//! trailing commas before `}` or `]` are accepted. They are overwritten with
//! spaces before parsing; line breaks are kept so parse errors still point at
//! the right line and column.

const BLANK: u8 = b' ';

/// Blank comments and trailing commas outside of string literals.
///
/// ```rust
/// use svi_cli::flatten::relax;
///
/// let relaxed = relax(b"{\"a\": 1, // note\n}");
/// let value: serde_json::Value = serde_json::from_slice(&relaxed).unwrap();
/// assert_eq!(value["a"], 1);
/// ```
pub fn relax(json: &[u8]) -> Vec<u8> {
    let mut out = json.to_vec();
    blank_comments(&mut out);
    blank_trailing_commas(&mut out);
    out
}

fn blank_comments(bytes: &mut [u8]) {
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match (b, bytes.get(i + 1).copied()) {
            (b'"', _) => {
                in_string = true;
                i += 1;
            }
            (b'/', Some(b'/')) => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    bytes[i] = BLANK;
                    i += 1;
                }
            }
            (b'/', Some(b'*')) => {
                bytes[i] = BLANK;
                bytes[i + 1] = BLANK;
                i += 2;
                while i < bytes.len() {
                    if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
                        bytes[i] = BLANK;
                        bytes[i + 1] = BLANK;
                        i += 2;
                        break;
                    }
                    if !matches!(bytes[i], b'\n' | b'\r') {
                        bytes[i] = BLANK;
                    }
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
}

fn blank_trailing_commas(bytes: &mut [u8]) {
    let mut in_string = false;
    let mut escaped = false;
    // Last structural byte seen outside strings, so `{,}` stays an error.
    let mut previous = 0u8;

    for i in 0..bytes.len() {
        let b = bytes[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
                previous = b'"';
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b',' if !matches!(previous, b'{' | b'[' | b',') && closes_next(&bytes[i + 1..]) => {
                bytes[i] = BLANK;
                continue;
            }
            _ => {}
        }
        if !b.is_ascii_whitespace() {
            previous = b;
        }
    }
}

fn closes_next(rest: &[u8]) -> bool {
    matches!(
        rest.iter().find(|b| !b.is_ascii_whitespace()),
        Some(b'}' | b']')
    )
}
