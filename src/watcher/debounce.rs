//! Per-path debounce (§4.3, I4): collapses bursts of events on the same
//! path within `window` into a single emission, latest-kind-wins except
//! that a `Removed` always supersedes a pending `Changed` (a file that
//! appeared and vanished within the window should read as removed, not
//! changed).

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use super::events::{FileEvent, FileEventKind};

struct Pending {
    event: FileEvent,
    deadline: Instant,
}

/// Runs as a background task: reads raw events off `raw_rx` as fast as
/// they arrive, and emits one coalesced event per path once `window` has
/// elapsed since its last update, onto `out_tx`.
pub async fn run_debouncer(
    mut raw_rx: mpsc::Receiver<FileEvent>,
    out_tx: mpsc::Sender<FileEvent>,
    window: Duration,
) {
    let mut pending: HashMap<String, Pending> = HashMap::new();

    loop {
        let sleep_until = pending.values().map(|p| p.deadline).min();
        let tick = async {
            match sleep_until {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            maybe_event = raw_rx.recv() => {
                match maybe_event {
                    Some(event) => merge(&mut pending, event, window),
                    None => break,
                }
            }
            _ = tick => {
                flush_ready(&mut pending, &out_tx).await;
            }
        }
    }

    flush_all(&mut pending, &out_tx).await;
}

fn merge(pending: &mut HashMap<String, Pending>, event: FileEvent, window: Duration) {
    let deadline = Instant::now() + window;
    pending
        .entry(event.path.clone())
        .and_modify(|existing| {
            if existing.event.kind != FileEventKind::Removed {
                existing.event = event.clone();
            }
            existing.deadline = deadline;
        })
        .or_insert(Pending { event, deadline });
}

async fn flush_ready(pending: &mut HashMap<String, Pending>, out_tx: &mpsc::Sender<FileEvent>) {
    let now = Instant::now();
    let ready: Vec<String> =
        pending.iter().filter(|(_, p)| p.deadline <= now).map(|(k, _)| k.clone()).collect();
    for path in ready {
        if let Some(p) = pending.remove(&path) {
            let _ = out_tx.send(p.event).await;
        }
    }
}

async fn flush_all(pending: &mut HashMap<String, Pending>, out_tx: &mpsc::Sender<FileEvent>) {
    for (_, p) in pending.drain() {
        let _ = out_tx.send(p.event).await;
    }
}
