//! Best-effort repair of the JSON the model was asked to produce.
//!
//! Generative models wrap JSON in prose or code fences, leave trailing
//! commas, and occasionally emit unquoted keys. The repair pass fixes
//! exactly those three classes, string-aware, and nothing else; output that
//! still does not parse is a malformed response for that attempt.

use serde::de::DeserializeOwned;

use super::error::{OracleError, OracleResult};

/// Parse the expected object out of raw model output, repairing first if a
/// strict parse fails.
pub fn parse_object<T: DeserializeOwned>(raw: &str) -> OracleResult<T> {
    if let Ok(value) = serde_json::from_str::<T>(raw) {
        return Ok(value);
    }

    let repaired = repair(raw).ok_or_else(|| OracleError::malformed("no JSON object found"))?;
    serde_json::from_str::<T>(&repaired)
        .map_err(|err| OracleError::malformed(format!("unparseable after repair: {err}")))
}

/// Run the three repair steps. `None` when no brace-delimited object exists
/// at all.
fn repair(raw: &str) -> Option<String> {
    let extracted = extract_object(raw)?;
    let keyed = quote_bare_keys(extracted);
    Some(strip_trailing_commas(&keyed))
}

/// Slice out the outermost `{ ... }` region.
fn extract_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Remove commas that directly precede a closing brace or bracket, ignoring
/// anything inside string literals.
fn strip_trailing_commas(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in input.chars() {
        if in_string {
            output.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                output.push(c);
            }
            '}' | ']' => {
                // Drop a comma left dangling before the closer.
                while output
                    .trim_end()
                    .ends_with(',')
                {
                    let trimmed_len = output.trim_end().len();
                    output.truncate(trimmed_len - 1);
                }
                output.push(c);
            }
            _ => output.push(c),
        }
    }

    output
}

/// Quote identifiers used as object keys, e.g. `{title: "x"}`. A key
/// position is right after `{` or `,` (outside strings); the identifier is
/// quoted only when a `:` follows it.
fn quote_bare_keys(input: &str) -> String {
    let mut output = String::with_capacity(input.len() + 8);
    let mut in_string = false;
    let mut escaped = false;
    let mut expect_key = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_string {
            output.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                expect_key = false;
                output.push(c);
            }
            '{' | ',' => {
                expect_key = true;
                output.push(c);
            }
            c if c.is_whitespace() => output.push(c),
            c if expect_key && (c.is_ascii_alphabetic() || c == '_') => {
                let mut ident = String::new();
                ident.push(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        ident.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                // Only a key if a colon follows (allowing whitespace).
                let mut lookahead = chars.clone();
                let followed_by_colon = loop {
                    match lookahead.next() {
                        Some(ws) if ws.is_whitespace() => continue,
                        Some(':') => break true,
                        _ => break false,
                    }
                };
                if followed_by_colon {
                    output.push('"');
                    output.push_str(&ident);
                    output.push('"');
                } else {
                    output.push_str(&ident);
                }
                expect_key = false;
            }
            _ => {
                expect_key = false;
                output.push(c);
            }
        }
    }

    output
}
