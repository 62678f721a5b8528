//! `WeaverServer`: the rmcp `ServerHandler` exposing the shadow cache and
//! workflow runtime as MCP tools and resources (§4.5). Structurally this
//! mirrors obsidian-memory's `MemoryServer` — a `#[tool_router]` impl
//! block of thin dispatch methods plus a `#[tool_handler]` `ServerHandler`
//! impl — generalized from a single-vault notes server to Weaver's
//! cache/workflow split.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::{router::tool::ToolRouter, wrapper::Parameters};
use rmcp::model::{
    CallToolResult, Content, Implementation, ListResourcesResult, PaginatedRequestParam,
    ProtocolVersion, ReadResourceRequestParam, ReadResourceResult, ResourceContents,
    ServerCapabilities, ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{tool, tool_handler, tool_router, ErrorData};

use crate::cache::{CacheStore, FileQuery};
use crate::workflow::WorkflowRunner;

use super::paths::resolve_within_vault;
use super::resources;
use super::tools::*;

#[derive(Clone)]
pub struct WeaverServer {
    cache: CacheStore,
    runner: WorkflowRunner,
    vault_root: Arc<PathBuf>,
    tool_router: ToolRouter<Self>,
}

fn to_tool_result<T: serde::Serialize>(value: &T) -> Result<CallToolResult, ErrorData> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn to_mcp_error(message: impl std::fmt::Display) -> ErrorData {
    ErrorData::internal_error(message.to_string(), None)
}

#[tool_router]
impl WeaverServer {
    pub fn new(cache: CacheStore, runner: WorkflowRunner, vault_root: PathBuf) -> Self {
        Self { cache, runner, vault_root: Arc::new(vault_root), tool_router: Self::tool_router() }
    }

    #[tool(description = "List documents matching optional type/status/tag filters. limit must be <= 500.")]
    async fn query_files(&self, params: Parameters<QueryFilesParams>) -> Result<CallToolResult, ErrorData> {
        let p = params.0;
        if p.limit > MAX_QUERY_LIMIT {
            return Err(to_mcp_error(format!("limit {} exceeds the maximum of {}", p.limit, MAX_QUERY_LIMIT)));
        }
        let documents = self
            .cache
            .query_files(FileQuery { document_type: p.document_type, status: p.status, tag: p.tag, limit: p.limit })
            .await
            .map_err(to_mcp_error)?;
        let total_count = documents.len();
        to_tool_result(&QueryFilesResult { documents, total_count })
    }

    #[tool(description = "Get full metadata, tags, and outgoing links for one document by path.")]
    async fn get_file(&self, params: Parameters<GetFileParams>) -> Result<CallToolResult, ErrorData> {
        let path = params.0.path;
        let document = self
            .cache
            .get_document(path.clone())
            .await
            .map_err(to_mcp_error)?
            .ok_or_else(|| to_mcp_error(format!("document not found: {path}")))?;
        let tags = self.cache.tags_for(path.clone()).await.map_err(to_mcp_error)?;
        let links = self.cache.links_from(path).await.map_err(to_mcp_error)?;
        to_tool_result(&GetFileResult { document, tags, links })
    }

    #[tool(description = "Get the raw UTF-8 content of one document by path.")]
    async fn get_file_content(&self, params: Parameters<GetFileContentParams>) -> Result<CallToolResult, ErrorData> {
        let path = params.0.path;
        let absolute = resolve_within_vault(&self.vault_root, &path).map_err(to_mcp_error)?;
        let content = tokio::fs::read_to_string(&absolute)
            .await
            .map_err(|e| to_mcp_error(format!("reading {path}: {e}")))?;
        to_tool_result(&GetFileContentResult { path, content })
    }

    #[tool(description = "Find documents carrying a tag matching an exact or prefix pattern. limit must be <= 500.")]
    async fn search_tags(&self, params: Parameters<SearchTagsParams>) -> Result<CallToolResult, ErrorData> {
        let p = params.0;
        if p.limit > MAX_QUERY_LIMIT {
            return Err(to_mcp_error(format!("limit {} exceeds the maximum of {}", p.limit, MAX_QUERY_LIMIT)));
        }
        let matches = self
            .cache
            .search_tags(p.tag, p.limit)
            .await
            .map_err(to_mcp_error)?
            .into_iter()
            .map(|m| SearchTagsMatch { document: m.document, matched_tags: m.matched_tags })
            .collect();
        to_tool_result(&SearchTagsResult { matches })
    }

    #[tool(description = "Find all documents linking to a target path (backlinks).")]
    async fn search_links(&self, params: Parameters<SearchLinksParams>) -> Result<CallToolResult, ErrorData> {
        let backlinks = self.cache.backlinks_to(params.0.target_path).await.map_err(to_mcp_error)?;
        to_tool_result(&SearchLinksResult { backlinks })
    }

    #[tool(description = "Corpus-level counts: documents, tags, links, stale documents.")]
    async fn stats(&self, _params: Parameters<StatsParams>) -> Result<CallToolResult, ErrorData> {
        let s = self.cache.stats().await.map_err(to_mcp_error)?;
        to_tool_result(&StatsResult {
            document_count: s.document_count,
            tag_count: s.tag_count,
            link_count: s.link_count,
            stale_count: s.stale_count,
        })
    }

    #[tool(description = "Start a registered workflow. If async is false (default), wait for it to finish and return its result.")]
    async fn trigger_workflow(&self, params: Parameters<TriggerWorkflowParams>) -> Result<CallToolResult, ErrorData> {
        let p = params.0;
        let (run_id, rx) = self.runner.start(&p.workflow_id, p.input, None).await.map_err(to_mcp_error)?;
        if p.r#async {
            return to_tool_result(&TriggerWorkflowResult { run_id, result: None });
        }
        let result = rx.await.map_err(|_| to_mcp_error("workflow run was dropped before completion"))?;
        let value = result.map_err(to_mcp_error)?;
        to_tool_result(&TriggerWorkflowResult { run_id, result: Some(value) })
    }

    #[tool(description = "Enumerate registered workflow ids.")]
    async fn list_workflows(&self, _params: Parameters<ListWorkflowsParams>) -> Result<CallToolResult, ErrorData> {
        to_tool_result(&ListWorkflowsResult { workflow_ids: self.runner.registered_workflow_ids() })
    }
}

#[tool_handler]
impl rmcp::ServerHandler for WeaverServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().enable_resources().build(),
            server_info: Implementation { name: "weaver".into(), version: env!("CARGO_PKG_VERSION").into(), ..Default::default() },
            instructions: Some(
                "Weaver MCP server - query and operate on a local markdown knowledge vault.".into(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        let resources = resources::list_resources(&self.cache).await.map_err(to_mcp_error)?;
        Ok(ListResourcesResult { resources, next_cursor: None })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        let content = resources::read_resource(&self.vault_root, &request.uri).await.map_err(to_mcp_error)?;
        Ok(ReadResourceResult { contents: vec![ResourceContents::text(content, request.uri)] })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::parser::{parse, FileTimestamps};
    use crate::workflow::{registry::boxed_handler, WorkflowRegistration, WorkflowRegistry, WorkflowStore};

    fn ts() -> FileTimestamps {
        FileTimestamps { created_at: 1, modified_at: 2 }
    }

    async fn server_with_one_document() -> WeaverServer {
        let cache = CacheStore::open_in_memory();
        cache
            .ingest_document(parse("a.md", b"---\ntags: [x]\n---\n[[b]]", ts()).unwrap())
            .await
            .unwrap();

        let mut registry = WorkflowRegistry::new();
        registry.register(WorkflowRegistration {
            id: "echo".to_string(),
            version: 1,
            handler: boxed_handler(|ctx: crate::workflow::WorkflowContext, input: serde_json::Value| async move {
                ctx.step("echo", crate::workflow::StepOptions::default(), || async { Ok::<_, String>(input.clone()) }).await
            }),
            triggers: vec![],
        });
        let runner = WorkflowRunner::new(registry, WorkflowStore::new(cache.clone()), 4);
        WeaverServer::new(cache, runner, PathBuf::from("/tmp/does-not-matter"))
    }

    #[tokio::test]
    async fn query_files_rejects_a_limit_above_the_maximum() {
        let server = server_with_one_document().await;
        let err = server
            .query_files(Parameters(QueryFilesParams {
                document_type: None,
                status: None,
                tag: None,
                limit: MAX_QUERY_LIMIT + 1,
            }))
            .await
            .unwrap_err();
        assert!(err.message.contains("exceeds the maximum"));
    }

    #[tokio::test]
    async fn query_files_returns_ingested_documents() {
        let server = server_with_one_document().await;
        let result = server
            .query_files(Parameters(QueryFilesParams { document_type: None, status: None, tag: None, limit: 10 }))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn get_file_reports_not_found_for_a_missing_path() {
        let server = server_with_one_document().await;
        let err = server.get_file(Parameters(GetFileParams { path: "missing.md".to_string() })).await.unwrap_err();
        assert!(err.message.contains("not found"));
    }

    #[tokio::test]
    async fn get_file_succeeds_for_an_ingested_path() {
        let server = server_with_one_document().await;
        let result = server.get_file(Parameters(GetFileParams { path: "a.md".to_string() })).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn trigger_workflow_sync_waits_for_the_run_result() {
        let server = server_with_one_document().await;
        let result = server
            .trigger_workflow(Parameters(TriggerWorkflowParams {
                workflow_id: "echo".to_string(),
                input: serde_json::json!({"hello": "world"}),
                r#async: false,
            }))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn trigger_workflow_reports_unknown_workflow_as_an_error() {
        let server = server_with_one_document().await;
        let err = server
            .trigger_workflow(Parameters(TriggerWorkflowParams {
                workflow_id: "does-not-exist".to_string(),
                input: serde_json::json!(null),
                r#async: false,
            }))
            .await
            .unwrap_err();
        assert!(err.message.contains("not registered"));
    }

    #[tokio::test]
    async fn list_workflows_reports_registered_ids() {
        let server = server_with_one_document().await;
        let result = server.list_workflows(Parameters(ListWorkflowsParams {})).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn get_file_content_rejects_a_traversing_path() {
        let dir = tempfile::tempdir().unwrap();
        let vault_root = dir.path().join("vault");
        std::fs::create_dir_all(&vault_root).unwrap();
        std::fs::write(vault_root.join("a.md"), "hello").unwrap();
        std::fs::write(dir.path().join("secret"), "top secret").unwrap();

        let cache = CacheStore::open_in_memory();
        let registry = WorkflowRegistry::new();
        let runner = WorkflowRunner::new(registry, WorkflowStore::new(cache.clone()), 4);
        let server = WeaverServer::new(cache, runner, vault_root);

        let err = server
            .get_file_content(Parameters(GetFileContentParams { path: "../secret".to_string() }))
            .await
            .unwrap_err();
        assert!(err.message.contains("escapes"));
    }
}
