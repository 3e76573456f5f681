//! Notification fan-out and inbox management.
//!
//! Fan-out is not a queue: [`notify`] runs inside the caller's transaction,
//! so a notification exists exactly when its triggering write commits.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, params};
use tracing::{debug, info};

use grove_types::models::{Notification, NotificationPage};
use grove_types::{NotificationKind, ReactionKind};

use crate::error::OptionalExt;
use crate::models::{NOTIFICATION_SELECT, NotificationRow};
use crate::{Database, StoreError, StoreResult};

pub const DEFAULT_RETENTION_DAYS: i64 = 30;
/// Longest retention window the cleanup accepts (about a century).
pub const MAX_RETENTION_DAYS: i64 = 36_500;

/// A notification about to be written.
pub(crate) struct NewNotification<'a> {
    pub recipient: &'a str,
    pub trigger: &'a str,
    pub kind: NotificationKind,
    pub story_id: i64,
    pub comment_id: i64,
    pub message: String,
}

impl<'a> NewNotification<'a> {
    pub fn story_comment(
        story_owner: &'a str,
        commenter: &'a str,
        story_id: i64,
        story_title: &str,
        comment_id: i64,
    ) -> Self {
        Self {
            recipient: story_owner,
            trigger: commenter,
            kind: NotificationKind::StoryComment,
            story_id,
            comment_id,
            message: format!("Someone commented on your story '{}'", story_title),
        }
    }

    pub fn comment_reply(
        parent_author: &'a str,
        replier: &'a str,
        story_id: i64,
        story_title: &str,
        reply_id: i64,
    ) -> Self {
        Self {
            recipient: parent_author,
            trigger: replier,
            kind: NotificationKind::CommentReply,
            story_id,
            comment_id: reply_id,
            message: format!("Someone replied to your comment on '{}'", story_title),
        }
    }

    pub fn comment_reaction(
        comment_author: &'a str,
        reactor: &'a str,
        story_id: i64,
        comment_id: i64,
        kind: ReactionKind,
    ) -> Self {
        Self {
            recipient: comment_author,
            trigger: reactor,
            kind: NotificationKind::CommentReaction,
            story_id,
            comment_id,
            message: format!("Someone reacted to your comment with {}", kind.emoji()),
        }
    }
}

/// Write `n` unless it would notify someone about their own action.
/// Returns whether a row was written.
pub(crate) fn notify(conn: &Connection, n: &NewNotification<'_>) -> StoreResult<bool> {
    if n.recipient == n.trigger {
        debug!("Skipping self-notification ({})", n.kind.as_str());
        return Ok(false);
    }

    conn.execute(
        "INSERT INTO notifications (recipient_anonymous_id, type, story_id, comment_id,
             trigger_anonymous_id, message, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            n.recipient,
            n.kind.as_str(),
            n.story_id,
            n.comment_id,
            n.trigger,
            n.message,
            Utc::now(),
        ],
    )?;
    Ok(true)
}

impl Database {
    /// Newest-first page of `anonymous_id`'s inbox. `total_count` follows the
    /// filter; `unread_count` never does.
    pub fn list_notifications(
        &self,
        anonymous_id: &str,
        limit: u32,
        offset: u32,
        unread_only: bool,
    ) -> StoreResult<NotificationPage> {
        self.with_conn(|conn| {
            let unread_clause = if unread_only { " AND n.is_read = 0" } else { "" };

            let total_count: i64 = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM notifications n
                     WHERE n.recipient_anonymous_id = ?1{unread_clause}"
                ),
                [anonymous_id],
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(&format!(
                "{NOTIFICATION_SELECT}
                 WHERE n.recipient_anonymous_id = ?1{unread_clause}
                 ORDER BY n.created_at DESC, n.id DESC
                 LIMIT ?2 OFFSET ?3"
            ))?;
            let rows = stmt
                .query_map(params![anonymous_id, limit, offset], NotificationRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(NotificationPage {
                notifications: rows
                    .into_iter()
                    .filter_map(NotificationRow::into_notification)
                    .collect(),
                total_count: total_count.max(0) as u64,
                unread_count: query_unread_count(conn, anonymous_id)?,
            })
        })
    }

    pub fn unread_count(&self, anonymous_id: &str) -> StoreResult<u64> {
        self.with_conn(|conn| query_unread_count(conn, anonymous_id))
    }

    /// Mark one of `anonymous_id`'s notifications read. Someone else's
    /// notification is reported as missing.
    pub fn mark_notification_read(&self, id: i64, anonymous_id: &str) -> StoreResult<Notification> {
        self.with_tx(|tx| {
            let updated = tx.execute(
                "UPDATE notifications SET is_read = 1
                 WHERE id = ?1 AND recipient_anonymous_id = ?2",
                params![id, anonymous_id],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound("Notification"));
            }

            tx.query_row(
                &format!("{NOTIFICATION_SELECT} WHERE n.id = ?1"),
                [id],
                NotificationRow::from_row,
            )
            .optional()?
            .and_then(NotificationRow::into_notification)
            .ok_or(StoreError::NotFound("Notification"))
        })
    }

    pub fn mark_all_notifications_read(&self, anonymous_id: &str) -> StoreResult<usize> {
        self.with_tx(|tx| {
            Ok(tx.execute(
                "UPDATE notifications SET is_read = 1
                 WHERE recipient_anonymous_id = ?1 AND is_read = 0",
                [anonymous_id],
            )?)
        })
    }

    pub fn delete_notification(&self, id: i64, anonymous_id: &str) -> StoreResult<()> {
        self.with_tx(|tx| {
            let deleted = tx.execute(
                "DELETE FROM notifications WHERE id = ?1 AND recipient_anonymous_id = ?2",
                params![id, anonymous_id],
            )?;
            if deleted == 0 {
                return Err(StoreError::NotFound("Notification"));
            }
            Ok(())
        })
    }

    /// Delete every notification older than `retention_days` before `now`.
    pub fn cleanup_notifications(&self, now: DateTime<Utc>, retention_days: i64) -> StoreResult<usize> {
        let cutoff = retention_cutoff(now, retention_days)?;
        let deleted = self.with_tx(|tx| {
            Ok(tx.execute("DELETE FROM notifications WHERE created_at < ?1", [cutoff])?)
        })?;

        info!("Cleaned up {} old notifications", deleted);
        Ok(deleted)
    }
}

fn retention_cutoff(now: DateTime<Utc>, retention_days: i64) -> StoreResult<DateTime<Utc>> {
    if !(0..=MAX_RETENTION_DAYS).contains(&retention_days) {
        return Err(StoreError::validation(format!(
            "retention_days must be between 0 and {MAX_RETENTION_DAYS}"
        )));
    }
    Duration::try_days(retention_days)
        .and_then(|span| now.checked_sub_signed(span))
        .ok_or_else(|| StoreError::validation("retention_days is out of range"))
}

fn query_unread_count(conn: &Connection, anonymous_id: &str) -> StoreResult<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE recipient_anonymous_id = ?1 AND is_read = 0",
        [anonymous_id],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{db_with_category, post_story};

    /// Owner `u1` with three comments from `u2` on their story.
    fn inbox_with_three() -> Database {
        let (db, category_id) = db_with_category();
        let story_id = post_story(&db, category_id, "u1");
        for text in ["one", "two", "three"] {
            db.create_comment(story_id, text, None, "u2").unwrap();
        }
        db
    }

    #[test]
    fn self_notifications_are_suppressed() {
        let (db, _) = db_with_category();
        let written = db
            .with_tx(|tx| {
                notify(
                    tx,
                    &NewNotification::comment_reaction("same", "same", 1, 1, ReactionKind::Heart),
                )
            })
            .unwrap();
        assert!(!written);
        assert_eq!(db.unread_count("same").unwrap(), 0);
    }

    #[test]
    fn listing_pages_and_filters() {
        let db = inbox_with_three();
        let page = db.list_notifications("u1", 2, 0, false).unwrap();
        assert_eq!(page.notifications.len(), 2);
        assert_eq!(page.total_count, 3);
        assert_eq!(page.unread_count, 3);
        assert!(page.notifications[0].id > page.notifications[1].id);
        assert_eq!(page.notifications[0].story_title.as_deref(), Some("A"));

        let newest = page.notifications[0].id;
        db.mark_notification_read(newest, "u1").unwrap();

        let unread = db.list_notifications("u1", 20, 0, true).unwrap();
        assert_eq!(unread.total_count, 2);
        assert_eq!(unread.unread_count, 2);
        assert!(unread.notifications.iter().all(|n| !n.is_read));

        let tail = db.list_notifications("u1", 20, 2, false).unwrap();
        assert_eq!(tail.notifications.len(), 1);
    }

    #[test]
    fn other_identities_cannot_touch_an_inbox() {
        let db = inbox_with_three();
        let id = db.list_notifications("u1", 1, 0, false).unwrap().notifications[0].id;

        assert!(matches!(
            db.mark_notification_read(id, "u2"),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            db.delete_notification(id, "u2"),
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(db.unread_count("u1").unwrap(), 3);

        db.delete_notification(id, "u1").unwrap();
        assert_eq!(db.unread_count("u1").unwrap(), 2);
    }

    #[test]
    fn mark_all_read_reports_changes() {
        let db = inbox_with_three();
        assert_eq!(db.mark_all_notifications_read("u1").unwrap(), 3);
        assert_eq!(db.mark_all_notifications_read("u1").unwrap(), 0);
        assert_eq!(db.unread_count("u1").unwrap(), 0);
    }

    #[test]
    fn cleanup_respects_retention() {
        let db = inbox_with_three();
        assert_eq!(db.cleanup_notifications(Utc::now(), DEFAULT_RETENTION_DAYS).unwrap(), 0);

        let later = Utc::now() + Duration::days(DEFAULT_RETENTION_DAYS + 1);
        assert_eq!(db.cleanup_notifications(later, DEFAULT_RETENTION_DAYS).unwrap(), 3);
        assert_eq!(db.list_notifications("u1", 20, 0, false).unwrap().total_count, 0);
    }

    #[test]
    fn cleanup_rejects_unrepresentable_retention() {
        let db = inbox_with_three();
        for days in [100_000_000, i64::MAX, -1] {
            assert!(matches!(
                db.cleanup_notifications(Utc::now(), days),
                Err(StoreError::Validation(_))
            ));
        }
        assert_eq!(db.cleanup_notifications(Utc::now(), MAX_RETENTION_DAYS).unwrap(), 0);
        assert_eq!(db.unread_count("u1").unwrap(), 3);
    }
}
