//! Row types as SQLite returns them, with their `SELECT` column lists.
//! Wire shapes live in `grove_types::models`; the `into_*` methods convert.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use tracing::warn;

use grove_types::hashtags;
use grove_types::models::{
    Category, Notification, SharedConversation, StoryDetail, StoryResponse, StorySummary,
    display_pseudonym,
};
use grove_types::{NotificationKind, ResponseType};

pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub icon: Option<String>,
    pub story_count: i64,
}

pub(crate) const CATEGORY_SELECT: &str = "SELECT c.id, c.name, c.description, c.color, c.icon,
        (SELECT COUNT(*) FROM stories s WHERE s.category_id = c.id)
     FROM categories c";

impl CategoryRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            color: row.get(3)?,
            icon: row.get(4)?,
            story_count: row.get(5)?,
        })
    }

    pub fn into_category(self) -> Category {
        Category {
            id: self.id,
            name: self.name,
            description: self.description,
            color: self.color,
            icon: self.icon,
            story_count: self.story_count.max(0) as u64,
        }
    }
}

pub struct StoryRow {
    pub id: i64,
    pub anonymous_id: String,
    pub title: String,
    pub content: String,
    pub category_id: i64,
    pub pseudonym: Option<String>,
    pub hashtags: Option<String>,
    pub healing_process: Option<String>,
    pub next_steps: Option<String>,
    pub trigger_warning: bool,
    pub trigger_tags: Option<String>,
    pub heart_count: i64,
    pub hug_count: i64,
    pub strength_count: i64,
    pub response_count: i64,
    pub is_approved: bool,
    pub is_flagged: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub category: Option<CategoryRow>,
}

/// Story columns followed by the joined category (with its story count).
pub(crate) const STORY_SELECT: &str = "SELECT s.id, s.anonymous_id, s.title, s.content, s.category_id,
        s.pseudonym, s.hashtags, s.healing_process, s.next_steps, s.trigger_warning,
        s.trigger_tags, s.heart_count, s.hug_count, s.strength_count, s.response_count,
        s.is_approved, s.is_flagged, s.created_at, s.updated_at,
        c.id, c.name, c.description, c.color, c.icon,
        (SELECT COUNT(*) FROM stories sc WHERE sc.category_id = c.id)
     FROM stories s
     LEFT JOIN categories c ON c.id = s.category_id";

/// Only approved, unflagged stories are shown to readers.
pub(crate) const VISIBLE: &str = "s.is_approved = 1 AND s.is_flagged = 0";

impl StoryRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let category = match row.get::<_, Option<i64>>(19)? {
            Some(id) => Some(CategoryRow {
                id,
                name: row.get(20)?,
                description: row.get(21)?,
                color: row.get(22)?,
                icon: row.get(23)?,
                story_count: row.get(24)?,
            }),
            None => None,
        };

        Ok(Self {
            id: row.get(0)?,
            anonymous_id: row.get(1)?,
            title: row.get(2)?,
            content: row.get(3)?,
            category_id: row.get(4)?,
            pseudonym: row.get(5)?,
            hashtags: row.get(6)?,
            healing_process: row.get(7)?,
            next_steps: row.get(8)?,
            trigger_warning: row.get(9)?,
            trigger_tags: row.get(10)?,
            heart_count: row.get(11)?,
            hug_count: row.get(12)?,
            strength_count: row.get(13)?,
            response_count: row.get(14)?,
            is_approved: row.get(15)?,
            is_flagged: row.get(16)?,
            created_at: row.get(17)?,
            updated_at: row.get(18)?,
            category,
        })
    }

    pub fn is_visible(&self) -> bool {
        self.is_approved && !self.is_flagged
    }

    pub fn into_summary(self) -> StorySummary {
        self.into_detail().summary
    }

    pub fn into_detail(self) -> StoryDetail {
        StoryDetail {
            summary: StorySummary {
                id: self.id,
                title: self.title,
                pseudonym: display_pseudonym(self.pseudonym.as_deref()),
                category: self.category.map(CategoryRow::into_category),
                hashtags: hashtags::from_column(self.hashtags.as_deref()),
                trigger_warning: self.trigger_warning,
                trigger_tags: self.trigger_tags,
                heart_count: self.heart_count,
                hug_count: self.hug_count,
                strength_count: self.strength_count,
                response_count: self.response_count,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            content: self.content,
            healing_process: self.healing_process,
            next_steps: self.next_steps,
        }
    }
}

pub struct ResponseRow {
    pub id: i64,
    pub story_id: i64,
    pub content: String,
    pub pseudonym: Option<String>,
    pub response_type: String,
    pub helpful_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResponseRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            story_id: row.get(1)?,
            content: row.get(2)?,
            pseudonym: row.get(3)?,
            response_type: row.get(4)?,
            helpful_count: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    pub fn into_response(self) -> StoryResponse {
        let response_type = ResponseType::parse(&self.response_type).unwrap_or_else(|| {
            warn!(
                "Corrupt response_type '{}' on response '{}'",
                self.response_type, self.id
            );
            ResponseType::default()
        });

        StoryResponse {
            id: self.id,
            content: self.content,
            pseudonym: display_pseudonym(self.pseudonym.as_deref()),
            response_type,
            helpful_count: self.helpful_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct CommentRow {
    pub id: i64,
    pub story_id: i64,
    pub parent_comment_id: Option<i64>,
    pub content: String,
    pub pseudonym: Option<String>,
    pub anonymous_id: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) const COMMENT_SELECT: &str = "SELECT id, story_id, parent_comment_id, content, pseudonym,
        anonymous_id, is_deleted, created_at, updated_at
     FROM comments";

impl CommentRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            story_id: row.get(1)?,
            parent_comment_id: row.get(2)?,
            content: row.get(3)?,
            pseudonym: row.get(4)?,
            anonymous_id: row.get(5)?,
            is_deleted: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

pub struct NotificationRow {
    pub id: i64,
    pub recipient_anonymous_id: String,
    pub kind: String,
    pub story_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub trigger_anonymous_id: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub story_title: Option<String>,
}

pub(crate) const NOTIFICATION_SELECT: &str = "SELECT n.id, n.recipient_anonymous_id, n.type,
        n.story_id, n.comment_id, n.trigger_anonymous_id, n.message, n.is_read,
        n.created_at, s.title
     FROM notifications n
     LEFT JOIN stories s ON s.id = n.story_id";

impl NotificationRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            recipient_anonymous_id: row.get(1)?,
            kind: row.get(2)?,
            story_id: row.get(3)?,
            comment_id: row.get(4)?,
            trigger_anonymous_id: row.get(5)?,
            message: row.get(6)?,
            is_read: row.get(7)?,
            created_at: row.get(8)?,
            story_title: row.get(9)?,
        })
    }

    /// Rows with an unknown `type` are skipped with a warning.
    pub fn into_notification(self) -> Option<Notification> {
        let Some(kind) = NotificationKind::parse(&self.kind) else {
            warn!("Corrupt type '{}' on notification '{}'", self.kind, self.id);
            return None;
        };

        Some(Notification {
            id: self.id,
            recipient_anonymous_id: self.recipient_anonymous_id,
            kind,
            story_id: self.story_id,
            comment_id: self.comment_id,
            trigger_anonymous_id: self.trigger_anonymous_id,
            message: self.message,
            is_read: self.is_read,
            created_at: self.created_at,
            story_title: self.story_title,
        })
    }
}

pub struct SharedConversationRow {
    pub id: i64,
    pub story_id: i64,
    pub share_id: String,
    pub shared_by: Option<String>,
    pub personal_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub view_count: i64,
}

pub(crate) const SHARED_SELECT: &str = "SELECT id, story_id, share_id, shared_by, personal_message,
        created_at, expires_at, view_count
     FROM shared_conversations";

impl SharedConversationRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            story_id: row.get(1)?,
            share_id: row.get(2)?,
            shared_by: row.get(3)?,
            personal_message: row.get(4)?,
            created_at: row.get(5)?,
            expires_at: row.get(6)?,
            view_count: row.get(7)?,
        })
    }

    /// Links without an expiry never expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now > at)
    }

    pub fn into_shared(self, now: DateTime<Utc>) -> SharedConversation {
        let is_expired = self.is_expired(now);
        SharedConversation {
            id: self.id,
            story_id: self.story_id,
            share_id: self.share_id,
            shared_by: self.shared_by,
            personal_message: self.personal_message,
            created_at: self.created_at,
            expires_at: self.expires_at,
            view_count: self.view_count,
            is_expired,
        }
    }
}
