use serde::Deserialize;
use serde_json::Value;

// Request bodies keep every field optional so that missing or blank values
// surface as the service's own validation messages instead of a generic
// deserialization failure.

// -- Categories --

#[derive(Debug, Default, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

// -- Stories --

#[derive(Debug, Default, Deserialize)]
pub struct CreateStoryRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<i64>,
    pub pseudonym: Option<String>,
    /// Raw submission; normalized by [`crate::hashtags::normalize`].
    pub hashtags: Option<Value>,
    pub healing_process: Option<String>,
    pub next_steps: Option<String>,
    pub trigger_warning: Option<bool>,
    pub trigger_tags: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateResponseRequest {
    pub content: Option<String>,
    pub pseudonym: Option<String>,
    pub response_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StoryReactionRequest {
    pub reaction_type: Option<String>,
    /// Overrides the header identity when present.
    pub anonymous_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateReportRequest {
    pub content_type: Option<String>,
    pub content_id: Option<i64>,
    pub reason: Option<String>,
    pub description: Option<String>,
    pub anonymous_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StoryListQuery {
    pub category_id: Option<i64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub sort_by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub hashtag: Option<String>,
    pub category_id: Option<i64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

// -- Comments --

#[derive(Debug, Default, Deserialize)]
pub struct CreateCommentRequest {
    pub content: Option<String>,
    pub pseudonym: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentReactionRequest {
    pub reaction_type: Option<String>,
}

// -- Notifications --

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub unread_only: Option<bool>,
}

// -- Sharing --

#[derive(Debug, Default, Deserialize)]
pub struct ShareLinkRequest {
    pub shared_by: Option<String>,
    pub personal_message: Option<String>,
    pub expires_in_days: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForwardEmailRequest {
    pub recipient_email: Option<String>,
    pub sender_name: Option<String>,
    pub personal_message: Option<String>,
}

/// Trim an optional free-text field, collapsing blanks to `None`.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_blank_trims_and_drops_empty() {
        assert_eq!(non_blank(Some("  hi ")), Some("hi".to_string()));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn story_request_accepts_partial_bodies() {
        let req: CreateStoryRequest =
            serde_json::from_str(r#"{"title":"A","hashtags":"not-a-list","extra":1}"#).unwrap();
        assert_eq!(req.title.as_deref(), Some("A"));
        assert!(req.content.is_none());
        assert!(req.hashtags.is_some());
    }
}
