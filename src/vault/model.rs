//! Shared data model for the vault parser and shadow cache (§3).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Frontmatter is an open-shape mapping (Design Notes: "Dynamic typing of
/// frontmatter"). Well-known keys are projected into typed `Document`
/// fields at the cache boundary; everything else stays here, opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrontmatterValue {
    Null,
    Bool(bool),
    Number(f64),
    Scalar(String),
    Sequence(Vec<FrontmatterValue>),
    Mapping(HashMap<String, FrontmatterValue>),
}

impl FrontmatterValue {
    /// Best-effort projection to a single display string, used when lifting
    /// a frontmatter value into one of the typed `Document` columns.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FrontmatterValue::Scalar(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Project a `tags:` value (scalar, or a sequence of scalars) into a
    /// flat list of tag strings. Non-scalar entries are skipped rather than
    /// failing the whole document.
    pub fn as_tag_list(&self) -> Vec<String> {
        match self {
            FrontmatterValue::Scalar(s) => vec![s.clone()],
            FrontmatterValue::Sequence(items) => items
                .iter()
                .filter_map(FrontmatterValue::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn from_yaml(value: &serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::Null => FrontmatterValue::Null,
            serde_yaml::Value::Bool(b) => FrontmatterValue::Bool(*b),
            serde_yaml::Value::Number(n) => {
                FrontmatterValue::Number(n.as_f64().unwrap_or_default())
            }
            serde_yaml::Value::String(s) => FrontmatterValue::Scalar(s.clone()),
            serde_yaml::Value::Sequence(seq) => {
                FrontmatterValue::Sequence(seq.iter().map(FrontmatterValue::from_yaml).collect())
            }
            serde_yaml::Value::Mapping(map) => {
                let mut out = HashMap::with_capacity(map.len());
                for (k, v) in map {
                    if let Some(key) = k.as_str() {
                        out.insert(key.to_string(), FrontmatterValue::from_yaml(v));
                    }
                }
                FrontmatterValue::Mapping(out)
            }
            serde_yaml::Value::Tagged(tagged) => FrontmatterValue::from_yaml(&tagged.value),
        }
    }
}

pub type Frontmatter = HashMap<String, FrontmatterValue>;

/// A heading extracted from the document body (supplement: §4.1 component
/// table lists "headings" among the parser's extractions; this carries it
/// through).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub line: usize,
}

/// One of the three link shapes named in §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Wiki,
    Markdown,
    Embed,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Wiki => "wiki",
            LinkKind::Markdown => "markdown",
            LinkKind::Embed => "embed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "wiki" => Some(LinkKind::Wiki),
            "markdown" => Some(LinkKind::Markdown),
            "embed" => Some(LinkKind::Embed),
            _ => None,
        }
    }
}

/// A directed reference from `source_path` to `target_path` (I2: the
/// target may dangle).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub source_path: String,
    pub target_path: String,
    pub link_kind: LinkKind,
    pub display_text: Option<String>,
}

/// The canonical unit of the vault (§3). `path` is the unique key,
/// vault-relative, normalized to forward slashes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub path: String,
    pub title: Option<String>,
    pub document_type: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub frontmatter: Frontmatter,
    pub content_hash: String,
    pub size: u64,
    pub created_at: i64,
    pub modified_at: i64,
    pub ingested_at: i64,
    /// I3: set when the file on disk no longer matches `content_hash`, or
    /// when the file failed to parse (§7 "Ingest-local" errors).
    pub stale: bool,
    /// Present when `stale` is due to a parse failure rather than a pending
    /// re-ingest; carries the diagnostic so `query_files` can surface it
    /// (Scenario 5).
    pub parse_error: Option<String>,
    pub headings: Vec<Heading>,
}

/// The output of parsing one file: a document row plus its derived tag and
/// link sets (§4.1 contract).
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub document: Document,
    pub tags: Vec<String>,
    pub links: Vec<Link>,
}

/// Normalize a link/document target into a vault-relative, forward-slash,
/// `.md`-suffixed path, per §4.1's "Key decisions".
pub fn normalize_target(target: &str) -> String {
    let trimmed = target.trim();
    let slashed = trimmed.replace('\\', "/");
    let slashed = slashed.trim_start_matches("./");
    if std::path::Path::new(slashed).extension().is_some() {
        slashed.to_string()
    } else {
        format!("{slashed}.md")
    }
}

/// Normalize a vault-relative document path the same way ingestion does,
/// so lookups and storage agree (I1).
pub fn normalize_path(path: &str) -> String {
    path.trim().replace('\\', "/").to_string()
}
