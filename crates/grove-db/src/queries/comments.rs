//! Comment tree.
//!
//! A story's comments are loaded as one flat arena keyed by id; threads are
//! assembled by looking parents up in that arena rather than linking rows
//! to each other.

use std::collections::HashMap;

use chrono::Utc;
use rusqlite::{Connection, params};
use tracing::info;

use grove_types::ReactionKind;
use grove_types::api::non_blank;
use grove_types::models::{Comment, CommentReactionCounts, display_pseudonym};

use crate::error::OptionalExt;
use crate::models::{COMMENT_SELECT, CommentRow};
use crate::queries::notifications::{NewNotification, notify};
use crate::queries::stories::query_story;
use crate::{Database, StoreError, StoreResult};

pub const DELETED_PLACEHOLDER: &str = "[Comment deleted]";

/// Which comments a thread projection includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tombstones {
    /// Default listings: deleted comments are left out.
    Hide,
    /// Shared threads keep deleted comments so replies stay in place.
    Keep,
}

/// All comments and reaction tallies for one story, indexed for assembly.
struct CommentArena {
    rows: HashMap<i64, CommentRow>,
    children: HashMap<Option<i64>, Vec<i64>>,
    reactions: HashMap<i64, CommentReactionCounts>,
}

impl CommentArena {
    fn load(conn: &Connection, story_id: i64) -> StoreResult<Self> {
        let mut stmt = conn.prepare(&format!(
            "{COMMENT_SELECT} WHERE story_id = ?1 ORDER BY created_at ASC, id ASC"
        ))?;
        let ordered = stmt
            .query_map([story_id], CommentRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = HashMap::with_capacity(ordered.len());
        let mut children: HashMap<Option<i64>, Vec<i64>> = HashMap::new();
        for row in ordered {
            children.entry(row.parent_comment_id).or_default().push(row.id);
            rows.insert(row.id, row);
        }

        let mut stmt = conn.prepare(
            "SELECT cr.comment_id, cr.reaction_type
             FROM comment_reactions cr
             JOIN comments c ON c.id = cr.comment_id
             WHERE c.story_id = ?1",
        )?;
        let tallies = stmt
            .query_map([story_id], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut reactions: HashMap<i64, CommentReactionCounts> = HashMap::new();
        for (comment_id, raw) in tallies {
            if let Some(kind) = ReactionKind::parse(&raw) {
                reactions.entry(comment_id).or_default().bump(kind);
            }
        }

        Ok(Self {
            rows,
            children,
            reactions,
        })
    }

    /// Child ids of `parent` in creation order, filtered by `mode`.
    fn children_of(&self, parent: Option<i64>, mode: Tombstones) -> Vec<i64> {
        self.children
            .get(&parent)
            .map(|ids| {
                ids.iter()
                    .copied()
                    .filter(|id| {
                        mode == Tombstones::Keep || self.rows.get(id).is_some_and(|r| !r.is_deleted)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn project(&self, id: i64, mode: Tombstones) -> Option<Comment> {
        let row = self.rows.get(&id)?;
        let replies: Vec<Comment> = self
            .children_of(Some(id), mode)
            .into_iter()
            .filter_map(|child| self.project(child, mode))
            .collect();
        let reply_count = self
            .children_of(Some(id), Tombstones::Hide)
            .len();

        Some(Comment {
            id: row.id,
            story_id: row.story_id,
            parent_comment_id: row.parent_comment_id,
            content: row.content.clone(),
            pseudonym: display_pseudonym(row.pseudonym.as_deref()),
            anonymous_id: row.anonymous_id.clone(),
            created_at: row.created_at,
            updated_at: row.updated_at,
            is_deleted: row.is_deleted,
            reply_count,
            reaction_counts: self.reactions.get(&id).copied().unwrap_or_default(),
            replies,
        })
    }

    fn top_level(&self, mode: Tombstones) -> Vec<Comment> {
        self.children_of(None, mode)
            .into_iter()
            .filter_map(|id| self.project(id, mode))
            .collect()
    }
}

/// Top-level comments of a story, each with its reply subtree.
pub(crate) fn story_thread(
    conn: &Connection,
    story_id: i64,
    mode: Tombstones,
) -> StoreResult<Vec<Comment>> {
    Ok(CommentArena::load(conn, story_id)?.top_level(mode))
}

pub(crate) fn query_comment(conn: &Connection, id: i64) -> StoreResult<Option<CommentRow>> {
    conn.query_row(&format!("{COMMENT_SELECT} WHERE id = ?1"), [id], CommentRow::from_row)
        .optional()
}

/// Project a single comment (and its subtree) for a response body.
fn comment_view(conn: &Connection, row: &CommentRow) -> StoreResult<Comment> {
    CommentArena::load(conn, row.story_id)?
        .project(row.id, Tombstones::Hide)
        .ok_or(StoreError::NotFound("Comment"))
}

fn required_content(content: &str) -> StoreResult<String> {
    non_blank(Some(content)).ok_or_else(|| StoreError::validation("Content is required"))
}

fn insert_comment(
    conn: &Connection,
    story_id: i64,
    parent_comment_id: Option<i64>,
    content: &str,
    pseudonym: Option<&str>,
    anonymous_id: &str,
) -> StoreResult<CommentRow> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO comments (story_id, parent_comment_id, content, pseudonym, anonymous_id,
             created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            story_id,
            parent_comment_id,
            content,
            non_blank(pseudonym),
            anonymous_id,
            now
        ],
    )?;
    query_comment(conn, conn.last_insert_rowid())?.ok_or(StoreError::NotFound("Comment"))
}

/// Load a comment and check that `anonymous_id` wrote it.
fn owned_comment(conn: &Connection, id: i64, anonymous_id: &str) -> StoreResult<CommentRow> {
    let comment = query_comment(conn, id)?.ok_or(StoreError::NotFound("Comment"))?;
    if comment.anonymous_id != anonymous_id {
        return Err(StoreError::Unauthorized);
    }
    Ok(comment)
}

impl Database {
    pub fn list_comments(&self, story_id: i64) -> StoreResult<Vec<Comment>> {
        self.with_conn(|conn| {
            query_story(conn, story_id)?.ok_or(StoreError::NotFound("Story"))?;
            story_thread(conn, story_id, Tombstones::Hide)
        })
    }

    /// Comment on a story and notify its author.
    pub fn create_comment(
        &self,
        story_id: i64,
        content: &str,
        pseudonym: Option<&str>,
        anonymous_id: &str,
    ) -> StoreResult<Comment> {
        let content = required_content(content)?;

        let comment = self.with_tx(|tx| {
            let story = query_story(tx, story_id)?.ok_or(StoreError::NotFound("Story"))?;
            let row = insert_comment(tx, story_id, None, &content, pseudonym, anonymous_id)?;

            notify(
                tx,
                &NewNotification::story_comment(
                    &story.anonymous_id,
                    anonymous_id,
                    story_id,
                    &story.title,
                    row.id,
                ),
            )?;

            comment_view(tx, &row)
        })?;

        info!("Comment {} added to story {}", comment.id, story_id);
        Ok(comment)
    }

    /// Reply to a comment and notify the parent's author.
    pub fn reply_to_comment(
        &self,
        parent_id: i64,
        content: &str,
        pseudonym: Option<&str>,
        anonymous_id: &str,
    ) -> StoreResult<Comment> {
        let content = required_content(content)?;

        self.with_tx(|tx| {
            let parent = query_comment(tx, parent_id)?.ok_or(StoreError::NotFound("Comment"))?;
            let story = query_story(tx, parent.story_id)?.ok_or(StoreError::NotFound("Story"))?;
            let row = insert_comment(
                tx,
                parent.story_id,
                Some(parent_id),
                &content,
                pseudonym,
                anonymous_id,
            )?;

            notify(
                tx,
                &NewNotification::comment_reply(
                    &parent.anonymous_id,
                    anonymous_id,
                    parent.story_id,
                    &story.title,
                    row.id,
                ),
            )?;

            comment_view(tx, &row)
        })
    }

    /// Replace the text of one's own comment. Tombstones stay tombstones.
    pub fn update_comment(&self, id: i64, content: &str, anonymous_id: &str) -> StoreResult<Comment> {
        self.with_tx(|tx| {
            let comment = owned_comment(tx, id, anonymous_id)?;
            if comment.is_deleted {
                return Err(StoreError::validation("Deleted comments cannot be edited"));
            }
            let content = required_content(content)?;

            tx.execute(
                "UPDATE comments SET content = ?1, updated_at = ?2 WHERE id = ?3",
                params![content, Utc::now(), id],
            )?;

            let row = query_comment(tx, id)?.ok_or(StoreError::NotFound("Comment"))?;
            comment_view(tx, &row)
        })
    }

    /// Soft delete: the row and its replies stay, the text does not.
    pub fn delete_comment(&self, id: i64, anonymous_id: &str) -> StoreResult<()> {
        self.with_tx(|tx| {
            owned_comment(tx, id, anonymous_id)?;
            tx.execute(
                "UPDATE comments SET is_deleted = 1, content = ?1, updated_at = ?2 WHERE id = ?3",
                params![DELETED_PLACEHOLDER, Utc::now(), id],
            )?;
            Ok(())
        })?;

        info!("Comment {} deleted", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{db_with_category, post_story};

    fn notifications_for(db: &Database, who: &str) -> Vec<grove_types::models::Notification> {
        db.list_notifications(who, 100, 0, false).unwrap().notifications
    }

    #[test]
    fn comment_notifies_story_owner_once() {
        let (db, category_id) = db_with_category();
        let story_id = post_story(&db, category_id, "u1");

        db.create_comment(story_id, "hi", None, "u2").unwrap();

        let inbox = notifications_for(&db, "u1");
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, grove_types::NotificationKind::StoryComment);
        assert_eq!(inbox[0].trigger_anonymous_id, "u2");
        assert_eq!(inbox[0].message, "Someone commented on your story 'A'");
        assert!(notifications_for(&db, "u2").is_empty());
    }

    #[test]
    fn owner_commenting_on_own_story_is_silent() {
        let (db, category_id) = db_with_category();
        let story_id = post_story(&db, category_id, "u1");
        let comment = db.create_comment(story_id, "note to self", None, "u1").unwrap();
        db.reply_to_comment(comment.id, "again", None, "u1").unwrap();
        db.toggle_comment_reaction(comment.id, "u1", ReactionKind::Heart).unwrap();

        assert!(notifications_for(&db, "u1").is_empty());
    }

    #[test]
    fn blank_content_is_rejected_before_writing() {
        let (db, category_id) = db_with_category();
        let story_id = post_story(&db, category_id, "u1");
        assert!(matches!(
            db.create_comment(story_id, "   ", None, "u2"),
            Err(StoreError::Validation(_))
        ));
        assert!(db.list_comments(story_id).unwrap().is_empty());
        assert!(matches!(
            db.create_comment(story_id + 9, "hi", None, "u2"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn replies_nest_under_their_parent_in_order() {
        let (db, category_id) = db_with_category();
        let story_id = post_story(&db, category_id, "u1");
        let first = db.create_comment(story_id, " first ", Some("River"), "u2").unwrap();
        let second = db.create_comment(story_id, "second", None, "u3").unwrap();
        let r1 = db.reply_to_comment(first.id, "r1", None, "u3").unwrap();
        let r2 = db.reply_to_comment(first.id, "r2", None, "u1").unwrap();

        assert_eq!(first.content, "first");
        assert_eq!(first.pseudonym, "River");
        assert_eq!(r1.parent_comment_id, Some(first.id));
        assert_eq!(r1.story_id, story_id);

        let thread = db.list_comments(story_id).unwrap();
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].id, first.id);
        assert_eq!(thread[1].id, second.id);
        assert_eq!(thread[0].reply_count, 2);
        let reply_ids: Vec<i64> = thread[0].replies.iter().map(|c| c.id).collect();
        assert_eq!(reply_ids, vec![r1.id, r2.id]);

        // Both replies land in the parent author's inbox.
        let kinds: Vec<_> = notifications_for(&db, "u2").iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![grove_types::NotificationKind::CommentReply; 2]);
    }

    #[test]
    fn soft_delete_keeps_replies_and_hides_comment() {
        let (db, category_id) = db_with_category();
        let story_id = post_story(&db, category_id, "u1");
        let parent = db.create_comment(story_id, "parent", None, "u2").unwrap();
        let reply = db.reply_to_comment(parent.id, "child", None, "u3").unwrap();

        assert!(matches!(
            db.delete_comment(parent.id, "u3"),
            Err(StoreError::Unauthorized)
        ));
        db.delete_comment(parent.id, "u2").unwrap();

        assert!(db.list_comments(story_id).unwrap().is_empty());

        let tombstone = db.with_conn(|conn| query_comment(conn, parent.id)).unwrap().unwrap();
        assert!(tombstone.is_deleted);
        assert_eq!(tombstone.content, DELETED_PLACEHOLDER);

        let shared = db
            .with_conn(|conn| story_thread(conn, story_id, Tombstones::Keep))
            .unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].content, DELETED_PLACEHOLDER);
        assert_eq!(shared[0].reply_count, 1);
        assert_eq!(shared[0].replies[0].id, reply.id);
        assert_eq!(shared[0].replies[0].content, "child");
    }

    #[test]
    fn deleted_replies_drop_out_of_counts() {
        let (db, category_id) = db_with_category();
        let story_id = post_story(&db, category_id, "u1");
        let parent = db.create_comment(story_id, "parent", None, "u2").unwrap();
        let reply = db.reply_to_comment(parent.id, "child", None, "u3").unwrap();
        db.delete_comment(reply.id, "u3").unwrap();

        let thread = db.list_comments(story_id).unwrap();
        assert_eq!(thread[0].reply_count, 0);
        assert!(thread[0].replies.is_empty());
    }

    #[test]
    fn only_the_author_may_edit() {
        let (db, category_id) = db_with_category();
        let story_id = post_story(&db, category_id, "u1");
        let comment = db.create_comment(story_id, "draft", None, "u2").unwrap();

        assert!(matches!(
            db.update_comment(comment.id, "hijack", "u1"),
            Err(StoreError::Unauthorized)
        ));
        assert!(matches!(
            db.update_comment(comment.id + 50, "x", "u2"),
            Err(StoreError::NotFound(_))
        ));

        let edited = db.update_comment(comment.id, " final ", "u2").unwrap();
        assert_eq!(edited.content, "final");
        assert!(edited.updated_at >= comment.updated_at);

        db.delete_comment(comment.id, "u2").unwrap();
        assert!(matches!(
            db.update_comment(comment.id, "revive", "u2"),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn reaction_counts_are_embedded() {
        let (db, category_id) = db_with_category();
        let story_id = post_story(&db, category_id, "u1");
        let comment = db.create_comment(story_id, "hi", None, "u2").unwrap();
        db.toggle_comment_reaction(comment.id, "u3", ReactionKind::Heart).unwrap();
        db.toggle_comment_reaction(comment.id, "u4", ReactionKind::Heart).unwrap();
        db.toggle_comment_reaction(comment.id, "u4", ReactionKind::Strength).unwrap();

        let thread = db.list_comments(story_id).unwrap();
        let counts = thread[0].reaction_counts;
        assert_eq!((counts.heart, counts.hug, counts.strength), (2, 0, 1));
    }
}
