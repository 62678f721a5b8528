//! `vault:///<relative-path>` resource listing/reading (§4.5 "document
//! content delivery").

use std::path::PathBuf;

use rmcp::model::{RawResource, Resource};

use crate::cache::CacheStore;

use super::error::McpSurfaceError;
use super::paths::resolve_within_vault;

pub const RESOURCE_SCHEME: &str = "vault";

pub fn resource_uri(path: &str) -> String {
    format!("{RESOURCE_SCHEME}:///{path}")
}

pub fn path_from_uri(uri: &str) -> Option<String> {
    uri.strip_prefix(&format!("{RESOURCE_SCHEME}:///")).map(str::to_string)
}

pub async fn list_resources(cache: &CacheStore) -> Result<Vec<Resource>, McpSurfaceError> {
    let docs = cache
        .query_files(crate::cache::FileQuery { limit: crate::mcp::tools::MAX_QUERY_LIMIT, ..Default::default() })
        .await?;

    Ok(docs
        .into_iter()
        .map(|doc| {
            let raw = RawResource::new(resource_uri(&doc.path), doc.title.clone().unwrap_or(doc.path.clone()));
            Resource::new(raw, None)
        })
        .collect())
}

pub async fn read_resource(vault_root: &std::path::Path, uri: &str) -> Result<String, McpSurfaceError> {
    let relative = path_from_uri(uri).ok_or_else(|| McpSurfaceError::ResourceNotFound(uri.to_string()))?;
    let absolute: PathBuf = resolve_within_vault(vault_root, &relative)?;
    tokio::fs::read_to_string(&absolute)
        .await
        .map_err(|_| McpSurfaceError::ResourceNotFound(relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_resource_rejects_a_traversing_uri() {
        let dir = tempfile::tempdir().unwrap();
        let vault_root = dir.path();
        std::fs::write(vault_root.join("a.md"), "hello").unwrap();
        let outside = dir.path().parent().unwrap().join("secret");
        std::fs::write(&outside, "top secret").unwrap();

        let err = read_resource(vault_root, "vault:///../secret").await.unwrap_err();
        assert!(matches!(err, McpSurfaceError::PathEscapesVault(_)));

        let ok = read_resource(vault_root, "vault:///a.md").await.unwrap();
        assert_eq!(ok, "hello");
    }
}
