//! Read-side queries backing the MCP tool surface (§4.5).

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::vault::{Document, Heading, Link, LinkKind};

use super::error::CacheError;
use super::store::CacheStore;

fn row_to_document(row: &Row) -> rusqlite::Result<Document> {
    let frontmatter_json: String = row.get("frontmatter")?;
    let headings_json: String = row.get("headings")?;
    let frontmatter = serde_json::from_str(&frontmatter_json).unwrap_or_default();
    let headings: Vec<Heading> = serde_json::from_str(&headings_json).unwrap_or_default();
    let stale: i64 = row.get("stale")?;

    Ok(Document {
        path: row.get("path")?,
        title: row.get("title")?,
        document_type: row.get("document_type")?,
        status: row.get("status")?,
        priority: row.get("priority")?,
        frontmatter,
        content_hash: row.get("content_hash")?,
        size: row.get::<_, i64>("size")? as u64,
        created_at: row.get("created_at")?,
        modified_at: row.get("modified_at")?,
        ingested_at: row.get("ingested_at")?,
        stale: stale != 0,
        parse_error: row.get("parse_error")?,
        headings,
    })
}

fn row_to_link(row: &Row) -> rusqlite::Result<Link> {
    let kind_str: String = row.get("link_kind")?;
    Ok(Link {
        source_path: row.get("source_path")?,
        target_path: row.get("target_path")?,
        link_kind: LinkKind::parse(&kind_str).unwrap_or(LinkKind::Wiki),
        display_text: row.get("display_text")?,
    })
}

/// Filters accepted by `query_files` (§4.5's `query_files` tool).
#[derive(Debug, Clone, Default)]
pub struct FileQuery {
    pub document_type: Option<String>,
    pub status: Option<String>,
    pub tag: Option<String>,
    pub limit: usize,
}

/// One `search_tags` hit: the document plus which of its tags actually
/// matched the pattern (§4.5: `search_tags` returns `{document,
/// matched_tags}`).
#[derive(Debug, Clone)]
pub struct TagMatch {
    pub document: Document,
    pub matched_tags: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub document_count: i64,
    pub tag_count: i64,
    pub link_count: i64,
    pub stale_count: i64,
}

impl CacheStore {
    pub async fn get_document(&self, path: String) -> Result<Option<Document>, CacheError> {
        self.with_conn(move |conn| {
            conn.query_row("SELECT * FROM documents WHERE path = ?1", params![path], row_to_document)
                .optional()
                .map_err(CacheError::from)
        })
        .await
    }

    pub async fn tags_for(&self, path: String) -> Result<Vec<String>, CacheError> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare("SELECT tag FROM tags WHERE document_path = ?1 ORDER BY tag")?;
            let rows = stmt.query_map(params![path], |row| row.get::<_, String>(0))?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    pub async fn links_from(&self, path: String) -> Result<Vec<Link>, CacheError> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare("SELECT * FROM links WHERE source_path = ?1")?;
            let rows = stmt.query_map(params![path], row_to_link)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    pub async fn backlinks_to(&self, path: String) -> Result<Vec<Link>, CacheError> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare("SELECT * FROM links WHERE target_path = ?1")?;
            let rows = stmt.query_map(params![path], row_to_link)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    pub async fn query_files(&self, query: FileQuery) -> Result<Vec<Document>, CacheError> {
        self.with_conn(move |conn| {
            let mut sql = String::from(
                "SELECT DISTINCT d.* FROM documents d LEFT JOIN tags t ON t.document_path = d.path WHERE 1=1",
            );
            let mut bindings: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(dt) = &query.document_type {
                sql.push_str(" AND d.document_type = ?");
                bindings.push(Box::new(dt.clone()));
            }
            if let Some(status) = &query.status {
                sql.push_str(" AND d.status = ?");
                bindings.push(Box::new(status.clone()));
            }
            if let Some(tag) = &query.tag {
                sql.push_str(" AND t.tag = ?");
                bindings.push(Box::new(tag.clone()));
            }
            sql.push_str(" ORDER BY d.path LIMIT ?");
            bindings.push(Box::new(query.limit as i64));

            let mut stmt = conn.prepare(&sql)?;
            let param_refs: Vec<&dyn rusqlite::ToSql> = bindings.iter().map(|b| b.as_ref()).collect();
            let rows = stmt.query_map(param_refs.as_slice(), row_to_document)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    /// Documents carrying a tag that exactly matches `pattern`, or that
    /// starts with it (§4.2/§4.5: "pattern may be exact or prefix").
    pub async fn search_tags(&self, pattern: String, limit: usize) -> Result<Vec<TagMatch>, CacheError> {
        self.with_conn(move |conn| {
            let escaped = pattern.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
            let prefix = format!("{escaped}%");

            let mut doc_stmt = conn.prepare(
                "SELECT DISTINCT d.* FROM documents d
                 JOIN tags t ON t.document_path = d.path
                 WHERE t.tag = ?1 OR t.tag LIKE ?2 ESCAPE '\\'
                 ORDER BY d.path
                 LIMIT ?3",
            )?;
            let documents = doc_stmt
                .query_map(params![pattern, prefix, limit as i64], row_to_document)?
                .collect::<Result<Vec<_>, _>>()?;

            let mut tag_stmt = conn.prepare(
                "SELECT tag FROM tags WHERE document_path = ?1 AND (tag = ?2 OR tag LIKE ?3 ESCAPE '\\') ORDER BY tag",
            )?;
            let mut out = Vec::with_capacity(documents.len());
            for document in documents {
                let matched_tags = tag_stmt
                    .query_map(params![document.path, pattern, prefix], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                out.push(TagMatch { document, matched_tags });
            }
            Ok(out)
        })
        .await
    }

    pub async fn stats(&self) -> Result<CacheStats, CacheError> {
        self.with_conn(|conn| {
            let document_count = conn.query_row("SELECT COUNT(*) FROM documents", [], |r| r.get(0))?;
            let tag_count = conn.query_row("SELECT COUNT(*) FROM tags", [], |r| r.get(0))?;
            let link_count = conn.query_row("SELECT COUNT(*) FROM links", [], |r| r.get(0))?;
            let stale_count =
                conn.query_row("SELECT COUNT(*) FROM documents WHERE stale = 1", [], |r| r.get(0))?;
            Ok(CacheStats { document_count, tag_count, link_count, stale_count })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::parser::{parse, FileTimestamps};

    fn ts() -> FileTimestamps {
        FileTimestamps { created_at: 1, modified_at: 2 }
    }

    #[tokio::test]
    async fn query_files_filters_by_type_and_tag() {
        let store = CacheStore::open_in_memory();
        store
            .ingest_document(parse("a.md", b"---\ntype: project\ntags: [work]\n---\n", ts()).unwrap())
            .await
            .unwrap();
        store
            .ingest_document(parse("b.md", b"---\ntype: journal\ntags: [life]\n---\n", ts()).unwrap())
            .await
            .unwrap();

        let projects = store
            .query_files(FileQuery { document_type: Some("project".into()), limit: 10, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].path, "a.md");

        let work_tagged = store.search_tags("work".to_string(), 10).await.unwrap();
        assert_eq!(work_tagged.len(), 1);
        assert_eq!(work_tagged[0].document.path, "a.md");
        assert_eq!(work_tagged[0].matched_tags, vec!["work".to_string()]);
    }

    #[tokio::test]
    async fn search_tags_matches_by_prefix_as_well_as_exact() {
        let store = CacheStore::open_in_memory();
        store.ingest_document(parse("a.md", b"---\ntags: [project-x]\n---\n", ts()).unwrap()).await.unwrap();
        store.ingest_document(parse("b.md", b"---\ntags: [project-y]\n---\n", ts()).unwrap()).await.unwrap();
        store.ingest_document(parse("c.md", b"---\ntags: [unrelated]\n---\n", ts()).unwrap()).await.unwrap();

        let prefixed = store.search_tags("project".to_string(), 10).await.unwrap();
        let mut paths: Vec<_> = prefixed.iter().map(|m| m.document.path.clone()).collect();
        paths.sort();
        assert_eq!(paths, vec!["a.md".to_string(), "b.md".to_string()]);

        let exact = store.search_tags("project-x".to_string(), 10).await.unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].document.path, "a.md");
    }

    #[tokio::test]
    async fn stats_reflects_ingested_documents() {
        let store = CacheStore::open_in_memory();
        store
            .ingest_document(parse("a.md", b"---\ntags: [x]\n---\n[[b]]", ts()).unwrap())
            .await
            .unwrap();
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.document_count, 1);
        assert_eq!(stats.tag_count, 1);
        assert_eq!(stats.link_count, 1);
    }

    #[tokio::test]
    async fn backlinks_to_finds_incoming_references() {
        let store = CacheStore::open_in_memory();
        store.ingest_document(parse("a.md", b"[[b]]", ts()).unwrap()).await.unwrap();
        let backlinks = store.backlinks_to("b.md".to_string()).await.unwrap();
        assert_eq!(backlinks.len(), 1);
        assert_eq!(backlinks[0].source_path, "a.md");
    }
}
