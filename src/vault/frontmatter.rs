//! Frontmatter extraction (§4.1): an optional `---`-fenced YAML-like block
//! at the head of the document, tolerant of absence, intolerant of
//! malformed fences/YAML (the caller demotes the file and continues).

use super::model::{Frontmatter, FrontmatterValue};

#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    #[error("unterminated frontmatter fence")]
    UnterminatedFence,
    #[error("invalid YAML in frontmatter: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),
}

/// Split `text` into `(frontmatter_block, body)`. Returns `Ok((None, text))`
/// when there is no leading `---` fence at all.
pub fn split_frontmatter(text: &str) -> Result<(Option<&str>, &str), FrontmatterError> {
    let Some(after_open) = text.strip_prefix("---") else {
        return Ok((None, text));
    };
    // The opening fence must be the first line; anything else on that line
    // (besides a newline) means this isn't a frontmatter fence at all.
    let after_open = match after_open.strip_prefix("\r\n").or_else(|| after_open.strip_prefix('\n')) {
        Some(rest) => rest,
        None => return Ok((None, text)),
    };

    match find_closing_fence(after_open) {
        Some((block, rest)) => Ok((Some(block), rest)),
        None => Err(FrontmatterError::UnterminatedFence),
    }
}

fn find_closing_fence(text: &str) -> Option<(&str, &str)> {
    let mut offset = 0usize;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed == "---" {
            let block = &text[..offset];
            let rest_start = offset + line.len();
            return Some((block, &text[rest_start..]));
        }
        offset += line.len();
    }
    None
}

/// Parse the frontmatter block (without fences) into the open-shape map.
/// An empty block parses to an empty map (boundary behavior in §8).
pub fn parse_frontmatter(block: &str) -> Result<Frontmatter, FrontmatterError> {
    if block.trim().is_empty() {
        return Ok(Frontmatter::new());
    }
    let value: serde_yaml::Value = serde_yaml::from_str(block)?;
    match FrontmatterValue::from_yaml(&value) {
        FrontmatterValue::Mapping(map) => Ok(map),
        FrontmatterValue::Null => Ok(Frontmatter::new()),
        other => {
            // A scalar/sequence at the top level isn't a mapping of keys;
            // treat it as a single opaque `_root` entry rather than failing
            // the whole file outright.
            let mut map = Frontmatter::new();
            map.insert("_root".to_string(), other);
            Ok(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_fence_returns_whole_body() {
        let (fm, body) = split_frontmatter("# Hello\nbody").unwrap();
        assert!(fm.is_none());
        assert_eq!(body, "# Hello\nbody");
    }

    #[test]
    fn well_formed_fence_splits_cleanly() {
        let text = "---\ntitle: Hi\n---\nbody text\n";
        let (fm, body) = split_frontmatter(text).unwrap();
        assert_eq!(fm.unwrap(), "title: Hi\n");
        assert_eq!(body, "body text\n");
    }

    #[test]
    fn unterminated_fence_errors() {
        let text = "---\ntitle: Hi\nno closing fence\n";
        assert!(matches!(
            split_frontmatter(text),
            Err(FrontmatterError::UnterminatedFence)
        ));
    }

    #[test]
    fn empty_frontmatter_block_parses_to_empty_map() {
        let fm = parse_frontmatter("").unwrap();
        assert!(fm.is_empty());
    }

    #[test]
    fn malformed_yaml_is_reported() {
        let err = parse_frontmatter("tags: [unterminated").unwrap_err();
        assert!(matches!(err, FrontmatterError::InvalidYaml(_)));
    }

    #[test]
    fn tags_sequence_round_trips() {
        let fm = parse_frontmatter("tags:\n  - x\n  - y\n").unwrap();
        assert_eq!(
            fm.get("tags").unwrap().as_tag_list(),
            vec!["x".to_string(), "y".to_string()]
        );
    }
}
