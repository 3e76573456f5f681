//! Reaction ledger.
//!
//! Story reactions are explicit add/remove calls that reject duplicates and
//! keep denormalized counters on `stories`. Comment reactions toggle and are
//! always tallied from rows.

use chrono::Utc;
use rusqlite::{Connection, params};
use tracing::info;

use grove_types::ReactionKind;
use grove_types::models::{CommentReactionCounts, CommentReactionOutcome, ReactionCounts, ToggleAction};

use crate::error::OptionalExt;
use crate::queries::comments::query_comment;
use crate::queries::notifications::{NewNotification, notify};
use crate::queries::stories::{query_story, visible_story};
use crate::{Database, StoreError, StoreResult};

fn counter_column(kind: ReactionKind) -> &'static str {
    match kind {
        ReactionKind::Heart => "heart_count",
        ReactionKind::Hug => "hug_count",
        ReactionKind::Strength => "strength_count",
    }
}

impl Database {
    /// Record `kind` from `anonymous_id` on a story.
    pub fn add_story_reaction(
        &self,
        story_id: i64,
        anonymous_id: &str,
        kind: ReactionKind,
    ) -> StoreResult<ReactionCounts> {
        self.with_tx(|tx| {
            visible_story(tx, story_id)?;

            if story_reaction_id(tx, story_id, anonymous_id, kind)?.is_some() {
                return Err(StoreError::DuplicateReaction);
            }

            tx.execute(
                "INSERT INTO reactions (story_id, reaction_type, anonymous_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![story_id, kind.as_str(), anonymous_id, Utc::now()],
            )?;
            tx.execute(
                &format!(
                    "UPDATE stories SET {col} = {col} + 1 WHERE id = ?1",
                    col = counter_column(kind)
                ),
                [story_id],
            )?;

            story_counts(tx, story_id)
        })
    }

    /// Withdraw a previously recorded reaction. The counter never drops below zero.
    pub fn remove_story_reaction(
        &self,
        story_id: i64,
        anonymous_id: &str,
        kind: ReactionKind,
    ) -> StoreResult<ReactionCounts> {
        self.with_tx(|tx| {
            let reaction_id = story_reaction_id(tx, story_id, anonymous_id, kind)?
                .ok_or(StoreError::NotFound("Reaction"))?;

            tx.execute(
                &format!(
                    "UPDATE stories SET {col} = MAX(0, {col} - 1) WHERE id = ?1",
                    col = counter_column(kind)
                ),
                [story_id],
            )?;
            tx.execute("DELETE FROM reactions WHERE id = ?1", [reaction_id])?;

            story_counts(tx, story_id)
        })
    }

    /// Toggle `kind` from `anonymous_id` on a comment. Adding notifies the
    /// comment's author; removing is silent.
    pub fn toggle_comment_reaction(
        &self,
        comment_id: i64,
        anonymous_id: &str,
        kind: ReactionKind,
    ) -> StoreResult<CommentReactionOutcome> {
        self.with_tx(|tx| {
            let comment = query_comment(tx, comment_id)?.ok_or(StoreError::NotFound("Comment"))?;

            let existing: Option<i64> = tx
                .query_row(
                    "SELECT id FROM comment_reactions
                     WHERE comment_id = ?1 AND anonymous_id = ?2 AND reaction_type = ?3",
                    params![comment_id, anonymous_id, kind.as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            let action = if let Some(existing_id) = existing {
                tx.execute("DELETE FROM comment_reactions WHERE id = ?1", [existing_id])?;
                ToggleAction::Removed
            } else {
                tx.execute(
                    "INSERT INTO comment_reactions (comment_id, reaction_type, anonymous_id, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![comment_id, kind.as_str(), anonymous_id, Utc::now()],
                )?;

                notify(
                    tx,
                    &NewNotification::comment_reaction(
                        &comment.anonymous_id,
                        anonymous_id,
                        comment.story_id,
                        comment_id,
                        kind,
                    ),
                )?;
                ToggleAction::Added
            };

            let reaction_counts = comment_reaction_counts(tx, comment_id)?;
            Ok(CommentReactionOutcome {
                action,
                reaction_counts,
            })
        })
    }

    /// Recompute every story's cached counters from live rows.
    /// Returns how many stories had drifted.
    pub fn reconcile_story_counters(&self) -> StoreResult<usize> {
        let fixed = self.with_tx(|tx| {
            let fixed = tx.execute(
                "WITH live AS (
                     SELECT s.id AS story_id,
                         (SELECT COUNT(*) FROM reactions r WHERE r.story_id = s.id AND r.reaction_type = 'heart') AS hearts,
                         (SELECT COUNT(*) FROM reactions r WHERE r.story_id = s.id AND r.reaction_type = 'hug') AS hugs,
                         (SELECT COUNT(*) FROM reactions r WHERE r.story_id = s.id AND r.reaction_type = 'strength') AS strengths,
                         (SELECT COUNT(*) FROM responses p WHERE p.story_id = s.id) AS responses
                     FROM stories s
                 )
                 UPDATE stories SET
                     heart_count = live.hearts,
                     hug_count = live.hugs,
                     strength_count = live.strengths,
                     response_count = live.responses
                 FROM live
                 WHERE live.story_id = stories.id
                   AND (stories.heart_count != live.hearts
                     OR stories.hug_count != live.hugs
                     OR stories.strength_count != live.strengths
                     OR stories.response_count != live.responses)",
                [],
            )?;
            Ok(fixed)
        })?;

        if fixed > 0 {
            info!("Reconciled counters on {} stories", fixed);
        }
        Ok(fixed)
    }
}

fn story_reaction_id(
    conn: &Connection,
    story_id: i64,
    anonymous_id: &str,
    kind: ReactionKind,
) -> StoreResult<Option<i64>> {
    conn.query_row(
        "SELECT id FROM reactions
         WHERE story_id = ?1 AND anonymous_id = ?2 AND reaction_type = ?3",
        params![story_id, anonymous_id, kind.as_str()],
        |row| row.get(0),
    )
    .optional()
}

fn story_counts(conn: &Connection, story_id: i64) -> StoreResult<ReactionCounts> {
    let story = query_story(conn, story_id)?.ok_or(StoreError::NotFound("Story"))?;
    Ok(ReactionCounts {
        heart_count: story.heart_count,
        hug_count: story.hug_count,
        strength_count: story.strength_count,
    })
}

pub(crate) fn comment_reaction_counts(
    conn: &Connection,
    comment_id: i64,
) -> StoreResult<CommentReactionCounts> {
    let mut stmt =
        conn.prepare("SELECT reaction_type FROM comment_reactions WHERE comment_id = ?1")?;
    let kinds = stmt
        .query_map([comment_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut counts = CommentReactionCounts::default();
    for kind in kinds.iter().filter_map(|k| ReactionKind::parse(k)) {
        counts.bump(kind);
    }
    Ok(counts)
}
