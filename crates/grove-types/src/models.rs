//! Read projections returned to clients.
//!
//! These are built by `grove-db` from its row types; they are what ends up
//! inside the JSON envelope.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::kinds::{NotificationKind, ReactionKind, ResponseType};

pub const ANONYMOUS_PSEUDONYM: &str = "Anonymous";

/// Render a stored pseudonym, substituting the anonymous label for blanks.
pub fn display_pseudonym(stored: Option<&str>) -> String {
    match stored.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => ANONYMOUS_PSEUDONYM.to_string(),
    }
}

// -- Categories --

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub icon: Option<String>,
    pub story_count: u64,
}

// -- Stories --

/// Feed entry. Omits the narrative body.
#[derive(Debug, Clone, Serialize)]
pub struct StorySummary {
    pub id: i64,
    pub title: String,
    pub pseudonym: String,
    pub category: Option<Category>,
    pub hashtags: Vec<String>,
    pub trigger_warning: bool,
    pub trigger_tags: Option<String>,
    pub heart_count: i64,
    pub hug_count: i64,
    pub strength_count: i64,
    pub response_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoryDetail {
    #[serde(flatten)]
    pub summary: StorySummary,
    pub content: String,
    pub healing_process: Option<String>,
    pub next_steps: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoryWithResponses {
    #[serde(flatten)]
    pub story: StoryDetail,
    pub responses: Vec<StoryResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoryResponse {
    pub id: i64,
    pub content: String,
    pub pseudonym: String,
    pub response_type: ResponseType,
    pub helpful_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReactionCounts {
    pub heart_count: i64,
    pub hug_count: i64,
    pub strength_count: i64,
}

impl ReactionCounts {
    pub fn get(&self, kind: ReactionKind) -> i64 {
        match kind {
            ReactionKind::Heart => self.heart_count,
            ReactionKind::Hug => self.hug_count,
            ReactionKind::Strength => self.strength_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendingHashtag {
    pub hashtag: String,
    pub count: u64,
}

// -- Comments --

/// Per-kind tallies for a comment, keyed by the bare reaction name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CommentReactionCounts {
    pub heart: i64,
    pub hug: i64,
    pub strength: i64,
}

impl CommentReactionCounts {
    pub fn bump(&mut self, kind: ReactionKind) {
        match kind {
            ReactionKind::Heart => self.heart += 1,
            ReactionKind::Hug => self.hug += 1,
            ReactionKind::Strength => self.strength += 1,
        }
    }

    pub fn total(&self) -> i64 {
        self.heart + self.hug + self.strength
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: i64,
    pub story_id: i64,
    pub parent_comment_id: Option<i64>,
    pub content: String,
    pub pseudonym: String,
    pub anonymous_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub reply_count: usize,
    pub reaction_counts: CommentReactionCounts,
    pub replies: Vec<Comment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleAction {
    Added,
    Removed,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentReactionOutcome {
    pub action: ToggleAction,
    pub reaction_counts: CommentReactionCounts,
}

// -- Notifications --

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: i64,
    pub recipient_anonymous_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub story_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub trigger_anonymous_id: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub story_title: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub total_count: u64,
    pub unread_count: u64,
}

// -- Sharing --

#[derive(Debug, Clone, Serialize)]
pub struct SharedConversation {
    pub id: i64,
    pub story_id: i64,
    pub share_id: String,
    pub shared_by: Option<String>,
    pub personal_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub view_count: i64,
    pub is_expired: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SharedStory {
    #[serde(flatten)]
    pub story: StoryDetail,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SharedMeta {
    pub shared_by: Option<String>,
    pub personal_message: Option<String>,
    pub view_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SharedThread {
    pub shared_conversation: SharedConversation,
    pub story: SharedStory,
    pub meta: SharedMeta,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForwardedEmail {
    pub id: i64,
    pub story_id: i64,
    pub recipient_email: String,
    pub sender_name: Option<String>,
    pub personal_message: Option<String>,
    pub sent_at: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SharingStats {
    pub share_count: u64,
    pub email_forwards: u64,
    pub total_views: u64,
    pub total_forwards: u64,
}

// -- Guided sharing --

/// Prompt shown beside an optional story section.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GuidedQuestion {
    pub question: &'static str,
    pub placeholder: &'static str,
    pub required: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GuidedQuestions {
    pub healing_process: GuidedQuestion,
    pub next_steps: GuidedQuestion,
}

pub const GUIDED_QUESTIONS: GuidedQuestions = GuidedQuestions {
    healing_process: GuidedQuestion {
        question: "What has helped you through the healing process?",
        placeholder: "Share what strategies, people, activities, or insights have supported your healing journey...",
        required: false,
    },
    next_steps: GuidedQuestion {
        question: "What is next in your life and recovery?",
        placeholder: "Share your hopes, goals, or next steps in your recovery journey...",
        required: false,
    },
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_pseudonyms_render_as_anonymous() {
        assert_eq!(display_pseudonym(None), ANONYMOUS_PSEUDONYM);
        assert_eq!(display_pseudonym(Some("  ")), ANONYMOUS_PSEUDONYM);
        assert_eq!(display_pseudonym(Some("River")), "River");
    }

    #[test]
    fn notification_kind_serializes_as_type() {
        let n = Notification {
            id: 1,
            recipient_anonymous_id: "u1".into(),
            kind: NotificationKind::CommentReply,
            story_id: Some(3),
            comment_id: None,
            trigger_anonymous_id: "u2".into(),
            message: "hello".into(),
            is_read: false,
            created_at: Utc::now(),
            story_title: None,
        };
        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(value["type"], "comment_reply");
        assert!(value.get("kind").is_none());
    }
}
