//! Router rule binding shape (§4.6): `{ workflow_id, event_kinds,
//! path_pattern, frontmatter_filter?, debounce_ms? }`.

use globset::{Glob, GlobMatcher};

use crate::watcher::FileEventKind;

/// An optional predicate evaluated against the document's current cache
/// row before a rule is allowed to fire.
#[derive(Debug, Clone)]
pub struct FrontmatterFilter {
    pub key: String,
    pub equals: String,
}

#[derive(Clone)]
pub struct Rule {
    pub id: String,
    pub workflow_id: String,
    pub event_kinds: Vec<FileEventKind>,
    pub path_pattern: String,
    matcher: GlobMatcher,
    pub frontmatter_filter: Option<FrontmatterFilter>,
    pub debounce_ms: Option<u64>,
}

impl Rule {
    pub fn new(
        id: impl Into<String>,
        workflow_id: impl Into<String>,
        event_kinds: Vec<FileEventKind>,
        path_pattern: impl Into<String>,
        frontmatter_filter: Option<FrontmatterFilter>,
        debounce_ms: Option<u64>,
    ) -> Result<Self, globset::Error> {
        let path_pattern = path_pattern.into();
        let matcher = Glob::new(&path_pattern)?.compile_matcher();
        Ok(Self {
            id: id.into(),
            workflow_id: workflow_id.into(),
            event_kinds,
            path_pattern,
            matcher,
            frontmatter_filter,
            debounce_ms,
        })
    }

    pub fn matches_kind_and_path(&self, kind: FileEventKind, path: &str) -> bool {
        self.event_kinds.contains(&kind) && self.matcher.is_match(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_matches_nested_markdown_paths() {
        let rule = Rule::new("r1", "sync_tags", vec![FileEventKind::Changed], "notes/**/*.md", None, None).unwrap();
        assert!(rule.matches_kind_and_path(FileEventKind::Changed, "notes/a/b.md"));
        assert!(!rule.matches_kind_and_path(FileEventKind::Removed, "notes/a/b.md"));
        assert!(!rule.matches_kind_and_path(FileEventKind::Changed, "other/a.md"));
    }
}
