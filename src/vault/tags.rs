//! Inline `#hashtag` extraction (§4.1): matches `#[A-Za-z][A-Za-z0-9_/-]*`
//! outside fenced code blocks and inline code spans.

use once_cell::sync::Lazy;
use regex::Regex;

static INLINE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#[A-Za-z][A-Za-z0-9_/-]*").expect("valid tag regex"));

/// Strip fenced code blocks (``` ... ```) and inline code spans (`...`)
/// from `body`, replacing their contents with spaces so byte offsets for
/// anything else stay stable. Tags inside either are ignored per §4.1.
fn mask_code(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut in_fence = false;
    for line in body.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.trim_start().starts_with("```") {
            in_fence = !in_fence;
            out.push_str(&blank_keep_newlines(line));
            continue;
        }
        if in_fence {
            out.push_str(&blank_keep_newlines(line));
        } else {
            out.push_str(&mask_inline_code(line));
        }
    }
    out
}

fn blank_keep_newlines(s: &str) -> String {
    s.chars()
        .map(|c| if c == '\n' || c == '\r' { c } else { ' ' })
        .collect()
}

fn mask_inline_code(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_span = false;
    for c in line.chars() {
        if c == '`' {
            in_span = !in_span;
            out.push(' ');
        } else if in_span {
            out.push(' ');
        } else {
            out.push(c);
        }
    }
    out
}

/// Extract the set of inline tags from a document body, ignoring code.
pub fn extract_inline_tags(body: &str) -> Vec<String> {
    let masked = mask_code(body);
    INLINE_TAG
        .find_iter(&masked)
        .map(|m| m.as_str()[1..].to_string())
        .collect()
}

/// Merge frontmatter tags and inline tags into a deduplicated set.
/// Order is irrelevant per §4.1's tie-break rule; a `Vec` sorted for
/// determinism is returned so query results are stable.
pub fn merge_tags(frontmatter_tags: Vec<String>, inline_tags: Vec<String>) -> Vec<String> {
    let mut set: std::collections::BTreeSet<String> = frontmatter_tags.into_iter().collect();
    set.extend(inline_tags);
    set.into_iter().collect()
}
