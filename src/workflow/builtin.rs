//! Built-in workflows shipped with Weaver (supplementing §4.4 with two
//! concrete examples the event router can trigger out of the box).

use serde::{Deserialize, Serialize};

use crate::cache::CacheStore;

use super::context::{StepOptions, WorkflowContext};
use super::error::WorkflowError;
use super::registry::{boxed_handler, WorkflowRegistration};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncTagsInput {
    pub document_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncTagsOutput {
    pub document_path: String,
    pub tag_count: usize,
}

/// Re-reads a document's tag set from the cache and reports its size.
/// Grounded as the minimal two-step "read, then report" shape every
/// trigger-on-change workflow is built from.
async fn sync_tags(cache: CacheStore, ctx: WorkflowContext, input: SyncTagsInput) -> Result<SyncTagsOutput, WorkflowError> {
    let path = input.document_path.clone();
    let opts = StepOptions::default();
    let cache_for_step = cache.clone();
    let tags = ctx
        .step("load-tags", opts, move || {
            let cache = cache_for_step.clone();
            let path = path.clone();
            async move { cache.tags_for(path).await.map_err(|e| e.to_string()) }
        })
        .await?;

    Ok(SyncTagsOutput { document_path: input.document_path, tag_count: tags.len() })
}

pub fn sync_tags_workflow(cache: CacheStore) -> WorkflowRegistration {
    WorkflowRegistration {
        id: "sync_tags".to_string(),
        version: 1,
        handler: boxed_handler(move |ctx, input: SyncTagsInput| {
            let cache = cache.clone();
            async move { sync_tags(cache, ctx, input).await }
        }),
        triggers: vec!["on_change".to_string()],
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebuildBacklinksInput {
    pub document_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebuildBacklinksOutput {
    pub document_path: String,
    pub backlink_count: usize,
}

/// Recomputes the backlink count for a document after any edit that could
/// have changed who points at it.
async fn rebuild_backlinks(
    cache: CacheStore,
    ctx: WorkflowContext,
    input: RebuildBacklinksInput,
) -> Result<RebuildBacklinksOutput, WorkflowError> {
    let path = input.document_path.clone();
    let opts = StepOptions::default();
    let cache_for_step = cache.clone();
    let backlinks = ctx
        .step("load-backlinks", opts, move || {
            let cache = cache_for_step.clone();
            let path = path.clone();
            async move { cache.backlinks_to(path).await.map_err(|e| e.to_string()) }
        })
        .await?;

    Ok(RebuildBacklinksOutput { document_path: input.document_path, backlink_count: backlinks.len() })
}

pub fn rebuild_backlinks_workflow(cache: CacheStore) -> WorkflowRegistration {
    WorkflowRegistration {
        id: "rebuild_backlinks".to_string(),
        version: 1,
        handler: boxed_handler(move |ctx, input: RebuildBacklinksInput| {
            let cache = cache.clone();
            async move { rebuild_backlinks(cache, ctx, input).await }
        }),
        triggers: vec!["on_change".to_string(), "on_remove".to_string()],
    }
}
