//! Wiki/markdown/embed link extraction (§4.1).
//!
//! - `[[target]]` / `[[target|display]]` → wiki link.
//! - `![[target]]` / `![[target|display]]` → embed link (same grammar,
//!   preceded by `!`).
//! - `[text](url)` → markdown link, but only when `url` is relative and
//!   has no scheme (stays inside the vault).

use once_cell::sync::Lazy;
use regex::Regex;

use super::model::{normalize_target, Link, LinkKind};

static WIKI_OR_EMBED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\]|]+)(?:\|([^\]]+))?\]\]").expect("valid wiki regex"));

static MARKDOWN_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]*)\]\(([^)\s]+)(?:\s+[^)]*)?\)").expect("valid md regex"));

fn is_external(url: &str) -> bool {
    url.contains("://") || url.starts_with("mailto:") || url.starts_with('#') || url.starts_with("tel:")
}

/// Extract all links out of a (code-aware-masked) document body.
pub fn extract_links(source_path: &str, body: &str) -> Vec<Link> {
    let mut links = Vec::new();

    for caps in WIKI_OR_EMBED.captures_iter(body) {
        let whole = caps.get(0).expect("match 0 always present");
        let is_embed = whole.start() > 0 && body.as_bytes()[whole.start() - 1] == b'!';
        let target_raw = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let display_text = caps.get(2).map(|m| m.as_str().trim().to_string());
        links.push(Link {
            source_path: source_path.to_string(),
            target_path: normalize_target(target_raw),
            link_kind: if is_embed { LinkKind::Embed } else { LinkKind::Wiki },
            display_text,
        });
    }

    for caps in MARKDOWN_LINK.captures_iter(body) {
        let text = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let url = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        if is_external(url) {
            continue;
        }
        links.push(Link {
            source_path: source_path.to_string(),
            target_path: normalize_target(url),
            link_kind: LinkKind::Markdown,
            display_text: if text.is_empty() { None } else { Some(text.to_string()) },
        });
    }

    links
}
