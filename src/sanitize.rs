// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Input sanitization for submitted text.
//!
//! Sanitization transforms, it never rejects. The result is safe to
//! embed in markup and stable under re-application:
//! `sanitize(sanitize(x)) == sanitize(x)`.

use regex::Regex;
use std::sync::LazyLock;

static HORIZONTAL_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());
static NEWLINE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Entities produced by [`escape_markup`]. An ampersand already opening
/// one of these is left alone, which is what keeps escaping idempotent.
const KNOWN_ENTITIES: [&str; 5] = ["amp;", "lt;", "gt;", "quot;", "#x27;"];

/// Sanitize user input for safe display.
///
/// - Escape markup-significant characters
/// - Remove control characters (except newline, tab)
/// - Collapse runs of horizontal whitespace to a single space
/// - Collapse 3+ consecutive newlines to 2
/// - Trim leading/trailing whitespace
pub fn sanitize(input: &str) -> String {
    let escaped = escape_markup(input);
    let stripped: String = escaped
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();
    let collapsed = HORIZONTAL_WS.replace_all(&stripped, " ");
    let collapsed = NEWLINE_RUNS.replace_all(&collapsed, "\n\n");
    collapsed.trim().to_string()
}

/// Escape `& < > " '` without re-escaping entities a previous pass
/// produced.
fn escape_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for (i, c) in input.char_indices() {
        match c {
            '&' => {
                let rest = &input[i + 1..];
                if KNOWN_ENTITIES.iter().any(|e| rest.starts_with(e)) {
                    out.push('&');
                } else {
                    out.push_str("&amp;");
                }
            }
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
