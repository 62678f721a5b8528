//! Vault lifecycle integration tests.
//!
//! Coverage targets:
//! - Cold start ingest over a real directory tree
//! - Rename handled as remove-old + ingest-new
//! - A malformed document does not poison the rest of the scan
//! - Round-trip / idempotence laws from the testable-properties list

use std::path::Path;

use weaver::cache::{CacheStore, FileQuery};
use weaver::vault::walk::walk_vault;
use weaver::vault::{parse, stale, FileTimestamps};

fn ts() -> FileTimestamps {
    FileTimestamps { created_at: 1, modified_at: 2 }
}

async fn ingest_file(cache: &CacheStore, vault_root: &Path, relative: &str) {
    let absolute = vault_root.join(relative);
    let bytes = std::fs::read(&absolute).unwrap();
    match parse(relative, &bytes, ts()) {
        Ok(parsed) => cache.ingest_document(parsed).await.unwrap(),
        Err(e) => cache.ingest_document(stale(relative, &bytes, ts(), &e)).await.unwrap(),
    }
}

// ============================================================================
// Scenario: Cold start ingest
// ============================================================================

#[tokio::test]
async fn cold_start_ingest_populates_cache_from_a_fresh_vault() {
    let dir = tempfile::tempdir().unwrap();
    let vault_root = dir.path();
    std::fs::create_dir_all(vault_root.join("c")).unwrap();
    std::fs::write(vault_root.join("a.md"), "---\ntags: [x, y]\n---\n[[b]]").unwrap();
    std::fs::write(vault_root.join("b.md"), "#z\n").unwrap();
    std::fs::write(vault_root.join("c/d.md"), "").unwrap();

    let cache = CacheStore::open(&vault_root.join(".weaver-data/cache")).unwrap();
    let data_dir = vault_root.join(".weaver-data");
    for file in walk_vault(vault_root, &data_dir, &["md".to_string()]) {
        ingest_file(&cache, vault_root, &file.relative_path).await;
    }

    let all = cache.query_files(FileQuery { limit: 100, ..Default::default() }).await.unwrap();
    assert_eq!(all.len(), 3);

    let tagged_x = cache.search_tags("x".to_string(), 10).await.unwrap();
    assert_eq!(tagged_x.len(), 1);
    assert_eq!(tagged_x[0].document.path, "a.md");
    assert_eq!(tagged_x[0].matched_tags, vec!["x".to_string()]);

    let backlinks = cache.backlinks_to("b.md".to_string()).await.unwrap();
    assert_eq!(backlinks.len(), 1);
    assert_eq!(backlinks[0].source_path, "a.md");

    let stats = cache.stats().await.unwrap();
    assert_eq!(stats.document_count, 3);
    assert_eq!(stats.tag_count, 3);
    assert_eq!(stats.link_count, 1);
}

// ============================================================================
// Scenario: Rename
// ============================================================================

#[tokio::test]
async fn rename_moves_identity_and_leaves_a_dangling_incoming_link() {
    let dir = tempfile::tempdir().unwrap();
    let vault_root = dir.path();
    std::fs::write(vault_root.join("a.md"), "tags and body").unwrap();
    std::fs::write(vault_root.join("b.md"), "[[a]]").unwrap();

    let cache = CacheStore::open(&vault_root.join(".weaver-data/cache")).unwrap();
    ingest_file(&cache, vault_root, "a.md").await;
    ingest_file(&cache, vault_root, "b.md").await;

    // A rename surfaces to the cache as a `Removed` of the old path and a
    // `Changed` of the new one (§4.3: notify's own rename-pair semantics).
    cache.remove_document("a.md".to_string()).await.unwrap();
    let a2_bytes = std::fs::read(vault_root.join("a.md")).unwrap();
    let parsed = parse("a2.md", &a2_bytes, ts()).unwrap();
    cache.ingest_document(parsed).await.unwrap();

    assert!(cache.get_document("a.md".to_string()).await.unwrap().is_none());
    assert!(cache.get_document("a2.md".to_string()).await.unwrap().is_some());

    // The link from b.md still points at the old path: it dangles rather
    // than silently disappearing or following the rename (I2).
    let backlinks_old = cache.backlinks_to("a.md".to_string()).await.unwrap();
    assert_eq!(backlinks_old.len(), 1);
    assert_eq!(backlinks_old[0].source_path, "b.md");
    let backlinks_new = cache.backlinks_to("a2.md".to_string()).await.unwrap();
    assert!(backlinks_new.is_empty());
}

// ============================================================================
// Scenario: Malformed document does not poison scan
// ============================================================================

#[tokio::test]
async fn malformed_document_is_marked_stale_but_the_rest_of_the_scan_completes() {
    let dir = tempfile::tempdir().unwrap();
    let vault_root = dir.path();
    for i in 0..99 {
        std::fs::write(vault_root.join(format!("note{i}.md")), format!("# Note {i}")).unwrap();
    }
    std::fs::write(vault_root.join("broken.md"), "---\ntitle: unterminated\n").unwrap();

    let cache = CacheStore::open(&vault_root.join(".weaver-data/cache")).unwrap();
    let data_dir = vault_root.join(".weaver-data");
    for file in walk_vault(vault_root, &data_dir, &["md".to_string()]) {
        ingest_file(&cache, vault_root, &file.relative_path).await;
    }

    let all = cache.query_files(FileQuery { limit: 200, ..Default::default() }).await.unwrap();
    assert_eq!(all.len(), 100);

    let broken = cache.get_document("broken.md".to_string()).await.unwrap().unwrap();
    assert!(broken.stale);
    assert!(broken.parse_error.is_some());

    let stats = cache.stats().await.unwrap();
    assert_eq!(stats.document_count, 100);
    assert_eq!(stats.stale_count, 1);
}

// ============================================================================
// Round-trip and idempotence laws (§8)
// ============================================================================

#[tokio::test]
async fn reingesting_identical_input_twice_is_indistinguishable_from_once() {
    let cache = CacheStore::open_in_memory();
    let parsed = parse("a.md", b"---\ntags: [x]\n---\n[[b]]", ts()).unwrap();
    cache.ingest_document(parsed.clone()).await.unwrap();
    cache.ingest_document(parsed).await.unwrap();

    let doc = cache.get_document("a.md".to_string()).await.unwrap().unwrap();
    let tags = cache.tags_for("a.md".to_string()).await.unwrap();
    let links = cache.links_from("a.md".to_string()).await.unwrap();
    assert_eq!(doc.path, "a.md");
    assert_eq!(tags, vec!["x".to_string()]);
    assert_eq!(links.len(), 1);
}

#[tokio::test]
async fn remove_then_reingest_restores_original_state() {
    let cache = CacheStore::open_in_memory();
    let bytes: &[u8] = b"---\ntags: [x, y]\n---\n[[c]]";
    let original = parse("a.md", bytes, ts()).unwrap();
    cache.ingest_document(original.clone()).await.unwrap();
    let before = cache.get_document("a.md".to_string()).await.unwrap().unwrap();

    cache.remove_document("a.md".to_string()).await.unwrap();
    assert!(cache.get_document("a.md".to_string()).await.unwrap().is_none());

    cache.ingest_document(parse("a.md", bytes, ts()).unwrap()).await.unwrap();
    let after = cache.get_document("a.md".to_string()).await.unwrap().unwrap();
    assert_eq!(before.content_hash, after.content_hash);
    assert_eq!(before.frontmatter, after.frontmatter);
}

#[tokio::test]
async fn get_file_tags_agree_with_search_tags_filtered_to_the_same_path() {
    let cache = CacheStore::open_in_memory();
    cache.ingest_document(parse("a.md", b"---\ntags: [shared, only-a]\n---\n", ts()).unwrap()).await.unwrap();
    cache.ingest_document(parse("b.md", b"---\ntags: [shared]\n---\n", ts()).unwrap()).await.unwrap();

    let a_tags = cache.tags_for("a.md".to_string()).await.unwrap();
    for tag in &a_tags {
        let matches = cache.search_tags(tag.clone(), 10).await.unwrap();
        assert!(matches.iter().any(|m| m.document.path == "a.md"));
    }
}

// ============================================================================
// Boundary behaviors (§8)
// ============================================================================

#[tokio::test]
async fn empty_body_and_frontmatter_only_files_ingest_cleanly() {
    let cache = CacheStore::open_in_memory();
    cache.ingest_document(parse("empty.md", b"", ts()).unwrap()).await.unwrap();
    cache.ingest_document(parse("fm_only.md", b"---\ntitle: Only Frontmatter\n---\n", ts()).unwrap()).await.unwrap();

    let empty = cache.get_document("empty.md".to_string()).await.unwrap().unwrap();
    assert!(!empty.stale);
    assert!(empty.frontmatter.is_empty());

    let fm_only = cache.get_document("fm_only.md".to_string()).await.unwrap().unwrap();
    assert_eq!(fm_only.title.as_deref(), Some("Only Frontmatter"));
}

#[tokio::test]
async fn wiki_link_targets_differing_only_by_md_suffix_normalize_identically() {
    let cache = CacheStore::open_in_memory();
    cache.ingest_document(parse("a.md", b"[[b]]", ts()).unwrap()).await.unwrap();
    cache.ingest_document(parse("c.md", b"[[b.md]]", ts()).unwrap()).await.unwrap();

    let backlinks = cache.backlinks_to("b.md".to_string()).await.unwrap();
    assert_eq!(backlinks.len(), 2);
}
