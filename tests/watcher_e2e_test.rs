//! Filesystem watcher integration tests, driving a real `notify` watcher
//! against a real temp directory rather than synthetic events.
//!
//! Coverage targets:
//! - Live edit: a change is observed, debounced, and reflected in the cache
//! - Event storm: a rapid burst on one path coalesces into a single ingest

use std::path::PathBuf;
use std::time::Duration;

use weaver::cache::CacheStore;
use weaver::vault::{parse, FileTimestamps};
use weaver::watcher::{FileEventKind, FileWatcher};

fn ts() -> FileTimestamps {
    FileTimestamps { created_at: 1, modified_at: 2 }
}

async fn ingest_on_event(cache: &CacheStore, vault_root: &PathBuf, event: &weaver::watcher::FileEvent) {
    match event.kind {
        FileEventKind::Changed => {
            let bytes = tokio::fs::read(vault_root.join(&event.path)).await.unwrap();
            let parsed = parse(&event.path, &bytes, ts()).unwrap();
            cache.ingest_document(parsed).await.unwrap();
        }
        FileEventKind::Removed => {
            cache.remove_document(event.path.clone()).await.unwrap();
        }
    }
}

// ============================================================================
// Scenario: Live edit
// ============================================================================

#[tokio::test]
async fn live_edit_is_observed_and_ingested_within_the_debounce_window() {
    let dir = tempfile::tempdir().unwrap();
    let vault_root = dir.path().to_path_buf();
    std::fs::write(vault_root.join("a.md"), "initial").unwrap();
    std::fs::write(vault_root.join("b.md"), "no links yet").unwrap();

    let cache = CacheStore::open_in_memory();
    let debounce = Duration::from_millis(30);
    let mut watcher =
        FileWatcher::start(vault_root.clone(), vault_root.join(".weaver-data"), debounce, vec!["md".to_string()])
            .unwrap();

    // give the OS watch a moment to arm before mutating the file
    tokio::time::sleep(Duration::from_millis(100)).await;
    std::fs::write(vault_root.join("b.md"), "now linking to [[c/d]]").unwrap();

    let budget = 2 * debounce + Duration::from_secs(2);
    let event = tokio::time::timeout(budget, watcher.recv())
        .await
        .expect("event should arrive within the debounce budget")
        .expect("watcher channel should stay open");

    assert_eq!(event.path, "b.md");
    ingest_on_event(&cache, &vault_root, &event).await;

    let links = cache.links_from("b.md".to_string()).await.unwrap();
    assert!(links.iter().any(|l| l.target_path == "c/d.md"));
    let backlinks = cache.backlinks_to("c/d.md".to_string()).await.unwrap();
    assert_eq!(backlinks.len(), 1);
    assert_eq!(backlinks[0].source_path, "b.md");
}

// ============================================================================
// Scenario: Event storm
// ============================================================================

#[tokio::test]
async fn rapid_edits_to_one_path_coalesce_into_a_single_ingest() {
    let dir = tempfile::tempdir().unwrap();
    let vault_root = dir.path().to_path_buf();
    std::fs::write(vault_root.join("x.md"), "rev 0").unwrap();
    std::fs::write(vault_root.join("untouched.md"), "leave me alone").unwrap();

    let cache = CacheStore::open_in_memory();
    let debounce = Duration::from_millis(80);
    let mut watcher =
        FileWatcher::start(vault_root.clone(), vault_root.join(".weaver-data"), debounce, vec!["md".to_string()])
            .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    for rev in 1..=50 {
        std::fs::write(vault_root.join("x.md"), format!("rev {rev}")).unwrap();
    }

    // Drain events until the channel has been quiet for a few debounce
    // windows, which is long enough for any second emission to show up.
    let mut coalesced = Vec::new();
    let quiet_period = debounce * 4;
    loop {
        match tokio::time::timeout(quiet_period, watcher.recv()).await {
            Ok(Some(event)) => coalesced.push(event),
            Ok(None) | Err(_) => break,
        }
    }

    let x_events: Vec<_> = coalesced.iter().filter(|e| e.path == "x.md").collect();
    assert_eq!(x_events.len(), 1, "expected exactly one coalesced event for x.md, got {x_events:?}");
    assert!(coalesced.iter().all(|e| e.path != "untouched.md"));

    for event in &coalesced {
        ingest_on_event(&cache, &vault_root, event).await;
    }
    let final_bytes = std::fs::read(vault_root.join("x.md")).unwrap();
    let on_disk = parse("x.md", &final_bytes, ts()).unwrap();
    let cached = cache.get_document("x.md".to_string()).await.unwrap().unwrap();
    assert_eq!(cached.content_hash, on_disk.document.content_hash);
    assert!(cache.get_document("untouched.md".to_string()).await.unwrap().is_none());
}
