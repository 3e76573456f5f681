use rusqlite::Connection;
use tracing::info;

use crate::StoreResult;

pub fn run(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| {
            r.get(0)
        })?;

    if version < 1 {
        info!("Running migration v1 (stories, responses, reactions, reports)");
        conn.execute_batch(
            "
            CREATE TABLE categories (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL UNIQUE,
                description TEXT,
                color       TEXT NOT NULL DEFAULT '#4A7C59',
                icon        TEXT,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE stories (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                anonymous_id    TEXT NOT NULL,
                title           TEXT NOT NULL,
                content         TEXT NOT NULL,
                category_id     INTEGER NOT NULL REFERENCES categories(id),
                pseudonym       TEXT,
                hashtags        TEXT,
                healing_process TEXT,
                next_steps      TEXT,
                trigger_warning INTEGER NOT NULL DEFAULT 0,
                trigger_tags    TEXT,
                heart_count     INTEGER NOT NULL DEFAULT 0,
                hug_count       INTEGER NOT NULL DEFAULT 0,
                strength_count  INTEGER NOT NULL DEFAULT 0,
                response_count  INTEGER NOT NULL DEFAULT 0,
                is_approved     INTEGER NOT NULL DEFAULT 1,
                is_flagged      INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_stories_category ON stories(category_id, created_at);

            CREATE TABLE responses (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                anonymous_id    TEXT NOT NULL,
                story_id        INTEGER NOT NULL REFERENCES stories(id) ON DELETE CASCADE,
                content         TEXT NOT NULL,
                pseudonym       TEXT,
                response_type   TEXT NOT NULL DEFAULT 'support',
                helpful_count   INTEGER NOT NULL DEFAULT 0,
                is_approved     INTEGER NOT NULL DEFAULT 1,
                is_flagged      INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_responses_story ON responses(story_id, created_at);

            CREATE TABLE reactions (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                story_id        INTEGER NOT NULL REFERENCES stories(id) ON DELETE CASCADE,
                reaction_type   TEXT NOT NULL,
                anonymous_id    TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                UNIQUE(story_id, anonymous_id, reaction_type)
            );

            CREATE TABLE reports (
                id                      INTEGER PRIMARY KEY AUTOINCREMENT,
                content_type            TEXT NOT NULL,
                content_id              INTEGER NOT NULL,
                reason                  TEXT NOT NULL,
                description             TEXT,
                reporter_anonymous_id   TEXT NOT NULL,
                status                  TEXT NOT NULL DEFAULT 'pending',
                created_at              TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (comments, notifications)");
        conn.execute_batch(
            "
            CREATE TABLE comments (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                story_id            INTEGER NOT NULL REFERENCES stories(id) ON DELETE CASCADE,
                parent_comment_id   INTEGER REFERENCES comments(id),
                content             TEXT NOT NULL,
                pseudonym           TEXT,
                anonymous_id        TEXT NOT NULL,
                is_deleted          INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            );

            CREATE INDEX idx_comments_story ON comments(story_id, created_at);

            CREATE TABLE comment_reactions (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                comment_id      INTEGER NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
                reaction_type   TEXT NOT NULL,
                anonymous_id    TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                UNIQUE(comment_id, anonymous_id, reaction_type)
            );

            CREATE TABLE notifications (
                id                      INTEGER PRIMARY KEY AUTOINCREMENT,
                recipient_anonymous_id  TEXT NOT NULL,
                type                    TEXT NOT NULL,
                story_id                INTEGER REFERENCES stories(id) ON DELETE CASCADE,
                comment_id              INTEGER REFERENCES comments(id) ON DELETE CASCADE,
                trigger_anonymous_id    TEXT NOT NULL,
                message                 TEXT NOT NULL,
                is_read                 INTEGER NOT NULL DEFAULT 0,
                created_at              TEXT NOT NULL
            );

            CREATE INDEX idx_notifications_recipient
                ON notifications(recipient_anonymous_id, is_read, created_at);

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    if version < 3 {
        info!("Running migration v3 (sharing)");
        conn.execute_batch(
            "
            CREATE TABLE shared_conversations (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                story_id            INTEGER NOT NULL REFERENCES stories(id) ON DELETE CASCADE,
                share_id            TEXT NOT NULL UNIQUE,
                shared_by           TEXT,
                personal_message    TEXT,
                created_at          TEXT NOT NULL,
                expires_at          TEXT,
                view_count          INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE forwarded_emails (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                story_id            INTEGER NOT NULL REFERENCES stories(id) ON DELETE CASCADE,
                recipient_email     TEXT NOT NULL,
                sender_name         TEXT,
                personal_message    TEXT,
                sent_at             TEXT NOT NULL,
                status              TEXT NOT NULL DEFAULT 'sent'
            );

            INSERT INTO schema_version (version) VALUES (3);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 3);
    }
}
