//! Extraction of a complete artifact from free-form generator text.
//!
//! Preference order: an explicit `<file>...</file>` block, then a single fenced
//! code block that passes the marker check, then the raw response if it passes
//! the marker check and carries no delimiter fragments. The marker check is
//! deliberately strict: with no markers configured only delimited blocks are
//! accepted.

use std::sync::LazyLock;

use regex::Regex;

/// Delimiter tag the generator is instructed to wrap the artifact in.
pub const FILE_TAG: &str = "file";

static FILE_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<file>\s*(.*?)\s*</file>").unwrap());
static FENCED_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[\w+-]*[ \t]*\n(.*?)```").unwrap());

/// Rules for accepting undelimited text as an artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractRules {
    /// Substrings that must all be present (e.g. a function signature and its imports).
    pub required_markers: Vec<String>,
}

impl ExtractRules {
    pub fn new(required_markers: Vec<String>) -> Self {
        Self { required_markers }
    }

    /// Heuristic "looks like a complete artifact" check.
    pub fn looks_complete(&self, text: &str) -> bool {
        !self.required_markers.is_empty()
            && !text.trim().is_empty()
            && self
                .required_markers
                .iter()
                .all(|marker| text.contains(marker.as_str()))
    }
}

/// Contents of the first `<file>` block, trimmed. `None` if absent or blank.
pub fn extract_block(text: &str) -> Option<&str> {
    let caps = FILE_BLOCK_RE.captures(text)?;
    let body = caps.get(1)?.as_str().trim();
    (!body.is_empty()).then_some(body)
}

/// Extract a well-formed artifact from a raw generator response.
pub fn extract_artifact(raw: &str, rules: &ExtractRules) -> Option<String> {
    if let Some(block) = extract_block(raw) {
        return Some(block.to_string());
    }

    let fenced: Vec<&str> = FENCED_BLOCK_RE
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();
    if let [only] = fenced.as_slice() {
        return rules
            .looks_complete(only)
            .then(|| only.trim().to_string());
    }
    if !fenced.is_empty() || raw.contains("```") {
        return None;
    }

    // A stray tag means the response tried to delimit and got it wrong.
    if raw.contains("<file") || raw.contains("</file") {
        return None;
    }
    rules
        .looks_complete(raw)
        .then(|| raw.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topk_rules() -> ExtractRules {
        ExtractRules::new(vec![
            "def top_k_frequent".to_string(),
            "from collections".to_string(),
        ])
    }

    const CODE: &str =
        "from collections import Counter\n\ndef top_k_frequent(nums, k):\n    return []";

    #[test]
    fn extracts_delimited_block() {
        let raw = format!("Here you go:\n<file>\n{CODE}\n</file>\nThanks");
        assert_eq!(extract_artifact(&raw, &ExtractRules::default()).as_deref(), Some(CODE));
    }

    #[test]
    fn first_block_wins() {
        let raw = "<file>first</file> and <file>second</file>";
        assert_eq!(extract_block(raw), Some("first"));
    }

    #[test]
    fn blank_block_is_rejected() {
        assert_eq!(extract_block("<file>\n   \n</file>"), None);
        assert_eq!(extract_artifact("<file> </file>", &topk_rules()), None);
    }

    #[test]
    fn raw_code_accepted_only_with_all_markers() {
        assert_eq!(extract_artifact(CODE, &topk_rules()).as_deref(), Some(CODE));

        let partial = "def top_k_frequent(nums, k):\n    return []";
        assert_eq!(extract_artifact(partial, &topk_rules()), None);
    }

    #[test]
    fn raw_code_rejected_without_markers() {
        assert_eq!(extract_artifact(CODE, &ExtractRules::default()), None);
    }

    #[test]
    fn single_fenced_block_is_accepted_when_complete() {
        let raw = format!("Sure!\n```python\n{CODE}\n```\n");
        assert_eq!(extract_artifact(&raw, &topk_rules()).as_deref(), Some(CODE));
    }

    #[test]
    fn multiple_fenced_blocks_are_rejected() {
        let raw = format!("```python\n{CODE}\n```\nor\n```python\n{CODE}\n```");
        assert_eq!(extract_artifact(&raw, &topk_rules()), None);
    }

    #[test]
    fn dangling_tag_is_rejected() {
        let raw = format!("<file>\n{CODE}\n");
        assert_eq!(extract_artifact(&raw, &topk_rules()), None);
    }
}
