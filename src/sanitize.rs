//! Player input sanitisation applied before text reaches the oracle or the
//! persistent store.
//!
//! The pass is removal-only and runs to a fixpoint, so it is idempotent by
//! construction: sanitising already-clean text is a no-op and sanitising
//! twice equals sanitising once. Lone surrogate code units cannot exist in a
//! Rust `String` (it is always valid UTF-8), so that class of breakage is
//! ruled out at the type level before this function runs.

/// Tags that are stripped wherever they appear, including a partially typed
/// opener left at the end of the input.
const BLOCKED_TAGS: &[&str] = &[
    "script", "iframe", "object", "embed", "style", "form", "input", "button",
    "textarea", "select", "link", "meta", "base", "svg", "math",
];

/// URL schemes removed from the text (case-insensitive).
const BLOCKED_SCHEMES: &[&str] = &["javascript:", "data:"];

/// Clean raw player text for oracle prompts and storage.
pub fn sanitize(input: &str) -> String {
    let mut current = input.to_string();
    loop {
        // Every pass only removes characters, so the loop terminates once the
        // string stops shrinking.
        let next = sanitize_pass(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn sanitize_pass(input: &str) -> String {
    let stripped = strip_disallowed_chars(input);
    let untagged = strip_blocked_tags(&stripped);
    strip_blocked_schemes(&untagged)
}

/// Drop control characters outside tab/newline/carriage-return and invisible
/// formatting code points that survive copy-paste from rich text sources.
fn strip_disallowed_chars(input: &str) -> String {
    input.chars().filter(|&c| !is_disallowed_char(c)).collect()
}

fn is_disallowed_char(c: char) -> bool {
    if c.is_control() {
        return !matches!(c, '\t' | '\n' | '\r');
    }
    matches!(
        c,
        '\u{00AD}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{FEFF}'
    )
}

/// Remove blocked markup tags. A `<` that does not open a blocked tag (maths,
/// emoticons, plain prose) is preserved.
fn strip_blocked_tags(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if c != '<' {
            output.push(c);
            continue;
        }

        let rest = &input[start + 1..];
        let body = rest.strip_prefix('/').unwrap_or(rest);
        let name: String = body
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .flat_map(|c| c.to_lowercase())
            .collect();

        match tag_match(&name) {
            TagMatch::Exact => {
                // Skip everything up to and including the closing `>`; with no
                // closer the tag runs to the end of the input.
                for (_, tail) in chars.by_ref() {
                    if tail == '>' {
                        break;
                    }
                }
            }
            TagMatch::Prefix if rest[name_span(rest, &name)..].is_empty() => {
                // Partially typed blocked tag at the end of the string.
                break;
            }
            _ => output.push('<'),
        }
    }

    output
}

/// How far into `rest` the (possibly `/`-prefixed) tag name extends.
fn name_span(rest: &str, name: &str) -> usize {
    if rest.starts_with('/') {
        name.len() + 1
    } else {
        name.len()
    }
}

enum TagMatch {
    Exact,
    Prefix,
    None,
}

fn tag_match(name: &str) -> TagMatch {
    if name.is_empty() {
        return TagMatch::None;
    }
    for tag in BLOCKED_TAGS {
        if *tag == name {
            return TagMatch::Exact;
        }
        if tag.starts_with(name) {
            return TagMatch::Prefix;
        }
    }
    TagMatch::None
}

/// Remove blocked URL schemes wherever they occur, ignoring ASCII case.
fn strip_blocked_schemes(input: &str) -> String {
    let mut current = input.to_string();
    for scheme in BLOCKED_SCHEMES {
        current = remove_ascii_ci(&current, scheme);
    }
    current
}

/// Remove every case-insensitive occurrence of an ASCII pattern.
fn remove_ascii_ci(haystack: &str, pattern: &str) -> String {
    debug_assert!(pattern.is_ascii());
    let mut output = String::with_capacity(haystack.len());
    let mut rest = haystack;

    'outer: while !rest.is_empty() {
        if rest.len() >= pattern.len() && rest.is_char_boundary(pattern.len()) {
            let head = &rest[..pattern.len()];
            if head.eq_ignore_ascii_case(pattern) {
                rest = &rest[pattern.len()..];
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        // Unwrap is safe: the loop guard checked non-empty.
        let c = chars.next().expect("non-empty remainder");
        output.push(c);
        rest = chars.as_str();
    }

    output
}
