//! Hashtag normalization and the TEXT-column boundary.
//!
//! Stories keep their tags as a JSON array in a single column. [`to_column`]
//! and [`from_column`] are the only functions that encode or decode it, and
//! `from_column(Some(&to_column(&tags))) == tags` for any normalized list.

use serde_json::Value;
use tracing::warn;

pub const MAX_TAGS: usize = 10;
pub const MAX_TAG_CHARS: usize = 50;

/// Trim, drop leading `#` marks, and lowercase a single tag.
pub fn clean_tag(raw: &str) -> String {
    raw.trim().trim_start_matches('#').to_lowercase()
}

/// Normalize the `hashtags` field of a story submission.
///
/// Anything other than a JSON array yields no tags. Non-string and blank
/// entries are skipped, over-long tags are dropped, and at most
/// [`MAX_TAGS`] survive in submission order.
pub fn normalize(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(Value::as_str)
        .filter(|tag| !tag.trim().is_empty())
        .map(clean_tag)
        .filter(|tag| !tag.is_empty() && tag.chars().count() <= MAX_TAG_CHARS)
        .take(MAX_TAGS)
        .collect()
}

pub fn to_column(tags: &[String]) -> String {
    // Serializing a slice of strings cannot fail.
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

pub fn from_column(column: Option<&str>) -> Vec<String> {
    match column {
        None | Some("") => Vec::new(),
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
            warn!("Corrupt hashtags column '{}': {}", raw, e);
            Vec::new()
        }),
    }
}

/// Pattern fragment that matches one exact tag inside an encoded column.
pub fn column_needle(tag: &str) -> String {
    serde_json::to_string(tag).unwrap_or_else(|_| format!("\"{}\"", tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cleans_marks_case_and_whitespace() {
        let tags = normalize(Some(&json!(["  #Healing ", "##Hope", "sober"])));
        assert_eq!(tags, vec!["healing", "hope", "sober"]);
    }

    #[test]
    fn drops_blank_non_string_and_long_entries() {
        let long = "x".repeat(MAX_TAG_CHARS + 1);
        let tags = normalize(Some(&json!(["", "   ", 42, "#", long, "ok"])));
        assert_eq!(tags, vec!["ok"]);
    }

    #[test]
    fn keeps_first_ten() {
        let raw: Vec<String> = (0..15).map(|i| format!("tag{}", i)).collect();
        let tags = normalize(Some(&json!(raw)));
        assert_eq!(tags.len(), MAX_TAGS);
        assert_eq!(tags[0], "tag0");
        assert_eq!(tags[9], "tag9");
    }

    #[test]
    fn non_array_yields_nothing() {
        assert!(normalize(Some(&json!("healing"))).is_empty());
        assert!(normalize(None).is_empty());
    }

    #[test]
    fn column_boundary_is_lossless() {
        let tags = vec!["recovery".to_string(), "day \"one\"".to_string()];
        assert_eq!(from_column(Some(&to_column(&tags))), tags);
        assert!(from_column(Some("not json")).is_empty());
        assert!(from_column(None).is_empty());
    }

    #[test]
    fn needle_matches_encoded_tag() {
        let column = to_column(&["hope".to_string(), "hopeful".to_string()]);
        assert!(column.contains(&column_needle("hope")));
        assert!(!column.contains(&column_needle("hop")));
    }
}
