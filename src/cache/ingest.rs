//! Transactional ingest/removal (§4.2): a document, its tags, and its
//! outgoing links are written atomically. Tags and links use a
//! delete-then-insert strategy each ingest rather than diffing, which is
//! simpler and still correct since the whole set is recomputed from the
//! freshly parsed document every time.

use rusqlite::{params, Connection};

use crate::vault::{Link, ParsedDocument};

use super::error::CacheError;
use super::store::CacheStore;

fn ingest_tx(conn: &Connection, parsed: &ParsedDocument) -> Result<(), CacheError> {
    let doc = &parsed.document;
    let frontmatter_json = serde_json::to_string(&doc.frontmatter)?;
    let headings_json = serde_json::to_string(&doc.headings)?;

    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO documents
            (path, title, document_type, status, priority, frontmatter, content_hash,
             size, created_at, modified_at, ingested_at, stale, parse_error, headings)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(path) DO UPDATE SET
            title = excluded.title,
            document_type = excluded.document_type,
            status = excluded.status,
            priority = excluded.priority,
            frontmatter = excluded.frontmatter,
            content_hash = excluded.content_hash,
            size = excluded.size,
            created_at = excluded.created_at,
            modified_at = excluded.modified_at,
            ingested_at = excluded.ingested_at,
            stale = excluded.stale,
            parse_error = excluded.parse_error,
            headings = excluded.headings",
        params![
            doc.path,
            doc.title,
            doc.document_type,
            doc.status,
            doc.priority,
            frontmatter_json,
            doc.content_hash,
            doc.size as i64,
            doc.created_at,
            doc.modified_at,
            doc.ingested_at,
            doc.stale as i64,
            doc.parse_error,
            headings_json,
        ],
    )?;

    tx.execute("DELETE FROM tags WHERE document_path = ?1", params![doc.path])?;
    for tag in &parsed.tags {
        tx.execute(
            "INSERT OR IGNORE INTO tags (document_path, tag) VALUES (?1, ?2)",
            params![doc.path, tag],
        )?;
    }

    tx.execute("DELETE FROM links WHERE source_path = ?1", params![doc.path])?;
    for link in &parsed.links {
        insert_link(&tx, link)?;
    }

    tx.commit()?;
    Ok(())
}

fn insert_link(conn: &Connection, link: &Link) -> Result<(), CacheError> {
    conn.execute(
        "INSERT INTO links (source_path, target_path, link_kind, display_text)
         VALUES (?1, ?2, ?3, ?4)",
        params![link.source_path, link.target_path, link.link_kind.as_str(), link.display_text],
    )?;
    Ok(())
}

fn remove_tx(conn: &Connection, path: &str) -> Result<(), CacheError> {
    conn.execute("DELETE FROM documents WHERE path = ?1", params![path])?;
    Ok(())
}

impl CacheStore {
    /// Ingest (insert or replace) a freshly parsed document and its
    /// derived tags/links in a single transaction.
    pub async fn ingest_document(&self, parsed: ParsedDocument) -> Result<(), CacheError> {
        self.with_conn(move |conn| ingest_tx(conn, &parsed)).await
    }

    /// Remove a document and (via `ON DELETE CASCADE`) its tags and
    /// outgoing links. Incoming links from other documents are left in
    /// place as dangling references (I2).
    pub async fn remove_document(&self, path: String) -> Result<(), CacheError> {
        self.with_conn(move |conn| remove_tx(conn, &path)).await
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
    async fn ingest_then_reingest_replaces_tags_and_links() {
        let store = CacheStore::open_in_memory();
        let first = parse("a.md", b"---\ntags: [x]\n---\n[[b]]", ts()).unwrap();
        store.ingest_document(first).await.unwrap();

        let second = parse("a.md", b"---\ntags: [y]\n---\nno links here", ts()).unwrap();
        store.ingest_document(second).await.unwrap();

        let doc = store.get_document("a.md".to_string()).await.unwrap().unwrap();
        assert_eq!(doc.frontmatter.get("tags").unwrap().as_tag_list(), vec!["y".to_string()]);

        let tags = store.tags_for("a.md".to_string()).await.unwrap();
        assert_eq!(tags, vec!["y".to_string()]);

        let links = store.links_from("a.md".to_string()).await.unwrap();
        assert!(links.is_empty());
    }

    #[tokio::test]
    async fn remove_document_deletes_row_and_cascades() {
        let store = CacheStore::open_in_memory();
        let parsed = parse("a.md", b"hello", ts()).unwrap();
        store.ingest_document(parsed).await.unwrap();
        store.remove_document("a.md".to_string()).await.unwrap();
        assert!(store.get_document("a.md".to_string()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dangling_link_target_survives_removal_of_only_the_source() {
        let store = CacheStore::open_in_memory();
        let a = parse("a.md", b"[[missing]]", ts()).unwrap();
        store.ingest_document(a).await.unwrap();
        let links = store.links_from("a.md".to_string()).await.unwrap();
        assert_eq!(links[0].target_path, "missing.md");
    }
}
