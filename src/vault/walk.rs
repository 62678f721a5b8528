//! Full-vault walk for cold start (§4.1, Scenario 1). Built on the `ignore`
//! crate the way a linter or formatter walks a source tree: respects
//! `.gitignore`-style rules if present, always skips dotdirs, and always
//! skips the cache's own data directory regardless of ignore rules.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

/// A vault-relative markdown file discovered by the walk, along with its
/// absolute path for reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub absolute_path: PathBuf,
    pub relative_path: String,
}

/// Walk `vault_root`, returning every file whose extension is in
/// `extensions` (case-insensitive) that's not inside `data_dir` and not
/// inside a dotdir. Ordering is not guaranteed; callers that need
/// determinism should sort by `relative_path`.
pub fn walk_vault(vault_root: &Path, data_dir: &Path, extensions: &[String]) -> Vec<DiscoveredFile> {
    let mut out = Vec::new();
    let walker = WalkBuilder::new(vault_root)
        .hidden(true)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(false)
        .build();

    for entry in walker.flatten() {
        let path = entry.path();
        if path.starts_with(data_dir) {
            continue;
        }
        let has_allowed_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(e)))
            .unwrap_or(false);
        if entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) && has_allowed_extension {
            let relative = path
                .strip_prefix(vault_root)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            out.push(DiscoveredFile {
                absolute_path: path.to_path_buf(),
                relative_path: relative,
            });
        }
    }
    out
}
