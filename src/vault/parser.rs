//! The pure parse entry point (§4.1): bytes in, `ParsedDocument` or a typed
//! error out. No I/O happens here; callers own reading the file and
//! stat-ing its metadata.

use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

use super::frontmatter::{parse_frontmatter, split_frontmatter, FrontmatterError};
use super::links::extract_links;
use super::model::{normalize_path, Document, Heading, ParsedDocument};
use super::tags::{extract_inline_tags, merge_tags};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unreadable frontmatter: {0}")]
    UnreadableFrontmatter(#[from] FrontmatterError),
    #[error("io error reading {path}: {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Timestamps known at ingest time; the caller supplies them from
/// filesystem metadata so this function stays pure and testable.
#[derive(Debug, Clone, Copy)]
pub struct FileTimestamps {
    pub created_at: i64,
    pub modified_at: i64,
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{digest:x}")
}

fn extract_headings(body: &str) -> Vec<Heading> {
    let mut headings = Vec::new();
    for (idx, line) in body.lines().enumerate() {
        let trimmed = line.trim_start();
        let level = trimmed.chars().take_while(|&c| c == '#').count();
        if level == 0 || level > 6 {
            continue;
        }
        let rest = trimmed[level..].trim_start();
        if rest.is_empty() && level == trimmed.len() {
            // a bare run of `#` with no following space/text isn't a heading
            continue;
        }
        headings.push(Heading {
            level: level as u8,
            text: rest.trim_end().to_string(),
            line: idx + 1,
        });
    }
    headings
}

/// Parse one vault-relative document. `path` must already be
/// vault-relative and forward-slash-normalized by the caller (the walker
/// or watcher); `bytes` is the raw file contents.
pub fn parse(
    path: &str,
    bytes: &[u8],
    timestamps: FileTimestamps,
) -> Result<ParsedDocument, ParseError> {
    let path = normalize_path(path);
    let text = String::from_utf8_lossy(bytes);

    let (fm_block, body) = split_frontmatter(&text).map_err(ParseError::UnreadableFrontmatter)?;
    let frontmatter = match fm_block {
        Some(block) => parse_frontmatter(block).map_err(ParseError::UnreadableFrontmatter)?,
        None => Default::default(),
    };

    let title = frontmatter.get("title").and_then(|v| v.as_str()).map(str::to_string);
    let document_type = frontmatter
        .get("type")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let status = frontmatter.get("status").and_then(|v| v.as_str()).map(str::to_string);
    let priority = frontmatter
        .get("priority")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let frontmatter_tags = frontmatter.get("tags").map(|v| v.as_tag_list()).unwrap_or_default();

    let inline_tags = extract_inline_tags(body);
    let tags = merge_tags(frontmatter_tags, inline_tags);
    let links = extract_links(&path, body);
    let headings = extract_headings(body);

    let document = Document {
        path,
        title,
        document_type,
        status,
        priority,
        frontmatter,
        content_hash: content_hash(bytes),
        size: bytes.len() as u64,
        created_at: timestamps.created_at,
        modified_at: timestamps.modified_at,
        ingested_at: now_unix(),
        stale: false,
        parse_error: None,
        headings,
    };

    Ok(ParsedDocument { document, tags, links })
}

/// Build a degraded row for a file that failed to parse (§7 "ingest-local"
/// errors; Scenario 5 "malformed document does not poison scan"). The row
/// still occupies `path` and carries `stale`/`parse_error` so the file is
/// visible to `query_files` instead of silently vanishing from the vault.
pub fn stale(path: &str, bytes: &[u8], timestamps: FileTimestamps, error: &ParseError) -> ParsedDocument {
    let path = normalize_path(path);
    let document = Document {
        path,
        title: None,
        document_type: None,
        status: None,
        priority: None,
        frontmatter: Default::default(),
        content_hash: content_hash(bytes),
        size: bytes.len() as u64,
        created_at: timestamps.created_at,
        modified_at: timestamps.modified_at,
        ingested_at: now_unix(),
        stale: true,
        parse_error: Some(error.to_string()),
        headings: Vec::new(),
    };
    ParsedDocument { document, tags: Vec::new(), links: Vec::new() }
}
