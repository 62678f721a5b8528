//! Parameter structs for the exposed tool surface (§4.5's minimum set).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const MAX_QUERY_LIMIT: usize = 500;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueryFilesParams {
    /// Filter to documents with this `type` frontmatter value.
    #[serde(default)]
    pub document_type: Option<String>,
    /// Filter to documents with this `status` frontmatter value.
    #[serde(default)]
    pub status: Option<String>,
    /// Filter to documents carrying this tag.
    #[serde(default)]
    pub tag: Option<String>,
    /// Maximum rows to return; must be <= 500.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

#[derive(Debug, Serialize)]
pub struct QueryFilesResult {
    pub documents: Vec<crate::vault::Document>,
    pub total_count: usize,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetFileParams {
    /// Vault-relative path of the document.
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct GetFileResult {
    pub document: crate::vault::Document,
    pub tags: Vec<String>,
    pub links: Vec<crate::vault::Link>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetFileContentParams {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct GetFileContentResult {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchTagsParams {
    pub tag: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchTagsMatch {
    pub document: crate::vault::Document,
    pub matched_tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchTagsResult {
    pub matches: Vec<SearchTagsMatch>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchLinksParams {
    /// Target path to find backlinks for.
    pub target_path: String,
}

#[derive(Debug, Serialize)]
pub struct SearchLinksResult {
    pub backlinks: Vec<crate::vault::Link>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct StatsParams {}

#[derive(Debug, Serialize)]
pub struct StatsResult {
    pub document_count: i64,
    pub tag_count: i64,
    pub link_count: i64,
    pub stale_count: i64,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TriggerWorkflowParams {
    pub workflow_id: String,
    pub input: serde_json::Value,
    /// If false (default), wait for the run to reach a terminal state and
    /// return its result. If true, return the run id immediately.
    #[serde(default)]
    pub r#async: bool,
}

#[derive(Debug, Serialize)]
pub struct TriggerWorkflowResult {
    pub run_id: String,
    pub result: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListWorkflowsParams {}

#[derive(Debug, Serialize)]
pub struct ListWorkflowsResult {
    pub workflow_ids: Vec<String>,
}
