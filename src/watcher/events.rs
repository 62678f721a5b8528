//! Raw file change events, vault-relative and already filtered to markdown
//! files outside the cache's own data directory (§4.3).

use std::time::{SystemTime, UNIX_EPOCH};

use notify::{Event, EventKind};

/// The kind of change observed. Renames collapse to a `Removed` of the old
/// path plus a `Changed` of the new one, matching notify's own `From`/`To`
/// rename event pair — the router doesn't need a dedicated rename kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    Changed,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub kind: FileEventKind,
    /// Vault-relative, forward-slash-normalized path.
    pub path: String,
    pub observed_at_ms: u128,
}

fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or(0)
}

fn relative_vault_path(
    absolute: &std::path::Path,
    vault_root: &std::path::Path,
    extensions: &[String],
) -> Option<String> {
    let has_allowed_extension = absolute
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(e)))
        .unwrap_or(false);
    if !has_allowed_extension {
        return None;
    }
    let relative = absolute.strip_prefix(vault_root).ok()?;
    Some(relative.to_string_lossy().replace('\\', "/"))
}

/// Convert a raw notify event into zero or more `FileEvent`s. A notify
/// event can carry multiple paths (e.g. a rename's `From`/`To` pair under
/// `EventKind::Modify(ModifyKind::Name(RenameMode::Both))`); every
/// qualifying path becomes its own `FileEvent`. `extensions` is the
/// configured allowlist (§6: `.md` is conventional but any text extension
/// is acceptable).
pub fn from_notify_event(
    event: &Event,
    vault_root: &std::path::Path,
    data_dir: &std::path::Path,
    extensions: &[String],
) -> Vec<FileEvent> {
    let mut out = Vec::new();
    let kind = match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => FileEventKind::Changed,
        EventKind::Remove(_) => FileEventKind::Removed,
        _ => return out,
    };

    for raw_path in &event.paths {
        if raw_path.starts_with(data_dir) {
            continue;
        }
        let Some(path) = relative_vault_path(raw_path, vault_root, extensions) else { continue };
        out.push(FileEvent { kind, path, observed_at_ms: now_ms() });
    }
    out
}
