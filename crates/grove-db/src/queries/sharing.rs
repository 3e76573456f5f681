//! Share links, email forwarding, and sharing statistics.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use regex::Regex;
use rusqlite::{Connection, Row, params};
use tracing::info;

use grove_types::api::{ForwardEmailRequest, ShareLinkRequest, non_blank};
use grove_types::models::{
    ForwardedEmail, SharedConversation, SharedMeta, SharedStory, SharedThread, SharingStats,
};

use crate::error::OptionalExt;
use crate::models::{SHARED_SELECT, SharedConversationRow, StoryRow};
use crate::queries::comments::{Tombstones, story_thread};
use crate::queries::stories::query_story;
use crate::{Database, StoreError, StoreResult};

pub const SHARE_ID_LEN: usize = 16;
/// Lifetime of the link embedded in a forwarded email.
pub const EMAIL_LINK_DAYS: i64 = 30;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("EMAIL_RE: invalid regex pattern")
});

/// A freshly created share link.
#[derive(Debug, Clone)]
pub struct SharedLink {
    pub shared_conversation: SharedConversation,
    pub share_url: String,
}

/// A composed message handed to the delivery collaborator.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub recipient: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Debug, Clone)]
pub struct ForwardOutcome {
    pub share_url: String,
    pub forwarded_email: ForwardedEmail,
}

fn random_share_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SHARE_ID_LEN)
        .map(char::from)
        .collect()
}

/// Draw candidates from `generate` until one is not already in use.
fn unique_share_id(conn: &Connection, mut generate: impl FnMut() -> String) -> StoreResult<String> {
    loop {
        let candidate = generate();
        let taken: Option<i64> = conn
            .query_row(
                "SELECT id FROM shared_conversations WHERE share_id = ?1",
                [&candidate],
                |row| row.get(0),
            )
            .optional()?;
        if taken.is_none() {
            return Ok(candidate);
        }
    }
}

fn share_url(base_url: &str, share_id: &str) -> String {
    format!("{}/shared/{}", base_url.trim_end_matches('/'), share_id)
}

fn expiry(now: DateTime<Utc>, expires_in_days: Option<i64>) -> StoreResult<Option<DateTime<Utc>>> {
    let Some(days) = expires_in_days else {
        return Ok(None);
    };
    if days < 0 {
        return Err(StoreError::validation("expires_in_days must not be negative"));
    }
    Duration::try_days(days)
        .and_then(|span| now.checked_add_signed(span))
        .map(Some)
        .ok_or_else(|| StoreError::validation("expires_in_days is out of range"))
}

fn insert_share(
    conn: &Connection,
    story_id: i64,
    shared_by: Option<&str>,
    personal_message: Option<&str>,
    now: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
) -> StoreResult<SharedConversationRow> {
    let share_id = unique_share_id(conn, random_share_id)?;
    conn.execute(
        "INSERT INTO shared_conversations (story_id, share_id, shared_by, personal_message,
             created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![story_id, share_id, shared_by, personal_message, now, expires_at],
    )?;
    query_share(conn, &share_id)?.ok_or(StoreError::NotFound("Shared conversation"))
}

fn query_share(conn: &Connection, share_id: &str) -> StoreResult<Option<SharedConversationRow>> {
    conn.query_row(
        &format!("{SHARED_SELECT} WHERE share_id = ?1"),
        [share_id],
        SharedConversationRow::from_row,
    )
    .optional()
}

fn forwarded_from_row(row: &Row<'_>) -> rusqlite::Result<ForwardedEmail> {
    Ok(ForwardedEmail {
        id: row.get(0)?,
        story_id: row.get(1)?,
        recipient_email: row.get(2)?,
        sender_name: row.get(3)?,
        personal_message: row.get(4)?,
        sent_at: row.get(5)?,
        status: row.get(6)?,
    })
}

fn is_valid_email(address: &str) -> bool {
    EMAIL_RE.is_match(address)
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn compose_email(
    recipient: &str,
    story: &StoryRow,
    sender_name: Option<&str>,
    personal_message: Option<&str>,
    link: &str,
) -> OutgoingEmail {
    let sender = sender_name.unwrap_or("Someone");
    let subject = format!("{sender} shared a healing story with you from SupportGrove");
    let category = story
        .category
        .as_ref()
        .map(|c| c.name.as_str())
        .unwrap_or("Uncategorized");
    let tags = grove_types::hashtags::from_column(story.hashtags.as_deref())
        .iter()
        .map(|t| format!("#{t}"))
        .collect::<Vec<_>>()
        .join(" ");

    let mut text = format!(
        "{sender} thought you might find this story and conversation meaningful:\n\n\
         \"{}\"\nCategory: {category}\n",
        story.title
    );
    if !tags.is_empty() {
        text.push_str(&format!("{tags}\n"));
    }
    if let Some(message) = personal_message {
        text.push_str(&format!("\n\"{message}\"\n- {}\n", sender_name.unwrap_or("Anonymous")));
    }
    text.push_str(&format!("\nRead the full conversation: {link}\n"));

    let quote = personal_message
        .map(|message| {
            format!(
                "<blockquote><p>\"{}\"</p><p>- {}</p></blockquote>",
                escape_html(message),
                escape_html(sender_name.unwrap_or("Anonymous"))
            )
        })
        .unwrap_or_default();
    let html = format!(
        "<html><body>\
         <h2>Someone shared a healing story with you</h2>\
         <p><strong>{sender}</strong> thought you might find this story and conversation meaningful:</p>\
         <h3>\"{title}\"</h3><p>Category: {category}</p><p>{tags}</p>\
         {quote}\
         <p><a href=\"{link}\">Read the Full Conversation</a></p>\
         <p>SupportGrove - Anonymous Support Community</p>\
         </body></html>",
        sender = escape_html(sender),
        title = escape_html(&story.title),
        category = escape_html(category),
        tags = escape_html(&tags),
        link = escape_html(link),
    );

    OutgoingEmail {
        recipient: recipient.to_string(),
        subject,
        text,
        html,
    }
}

impl Database {
    pub fn create_share_link(
        &self,
        story_id: i64,
        req: &ShareLinkRequest,
        base_url: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<SharedLink> {
        let expires_at = expiry(now, req.expires_in_days)?;
        let shared_by = non_blank(req.shared_by.as_deref());
        let personal_message = non_blank(req.personal_message.as_deref());

        let row = self.with_tx(|tx| {
            query_story(tx, story_id)?.ok_or(StoreError::NotFound("Story"))?;
            insert_share(
                tx,
                story_id,
                shared_by.as_deref(),
                personal_message.as_deref(),
                now,
                expires_at,
            )
        })?;

        info!("Share link {} created for story {}", row.share_id, story_id);
        let url = share_url(base_url, &row.share_id);
        Ok(SharedLink {
            shared_conversation: row.into_shared(now),
            share_url: url,
        })
    }

    /// Open a shared thread, counting the view. Expired links are `Gone`
    /// and leave the view count untouched.
    pub fn view_shared(&self, share_id: &str, now: DateTime<Utc>) -> StoreResult<SharedThread> {
        self.with_tx(|tx| {
            let share = query_share(tx, share_id)?.ok_or(StoreError::NotFound("Shared conversation"))?;
            if share.is_expired(now) {
                return Err(StoreError::Gone("This shared conversation has expired".into()));
            }

            tx.execute(
                "UPDATE shared_conversations SET view_count = view_count + 1 WHERE id = ?1",
                [share.id],
            )?;
            let share = query_share(tx, share_id)?.ok_or(StoreError::NotFound("Shared conversation"))?;

            let story = query_story(tx, share.story_id)?.ok_or(StoreError::NotFound("Story"))?;
            let comments = story_thread(tx, share.story_id, Tombstones::Keep)?;

            let meta = SharedMeta {
                shared_by: share.shared_by.clone(),
                personal_message: share.personal_message.clone(),
                view_count: share.view_count,
            };
            Ok(SharedThread {
                shared_conversation: share.into_shared(now),
                story: SharedStory {
                    story: story.into_detail(),
                    comments,
                },
                meta,
            })
        })
    }

    /// Create a 30-day link and hand the composed email to `deliver` while
    /// the transaction is open. A delivery failure rolls everything back.
    pub fn forward_by_email<F>(
        &self,
        story_id: i64,
        req: &ForwardEmailRequest,
        base_url: &str,
        now: DateTime<Utc>,
        deliver: F,
    ) -> StoreResult<ForwardOutcome>
    where
        F: FnOnce(&OutgoingEmail) -> Result<(), String>,
    {
        let sender_name = non_blank(req.sender_name.as_deref());
        let personal_message = non_blank(req.personal_message.as_deref());
        let recipient = non_blank(req.recipient_email.as_deref()).unwrap_or_default();

        let outcome = self.with_tx(|tx| {
            let story = query_story(tx, story_id)?.ok_or(StoreError::NotFound("Story"))?;
            if !is_valid_email(&recipient) {
                return Err(StoreError::validation("Valid recipient email required"));
            }

            let share = insert_share(
                tx,
                story_id,
                sender_name.as_deref(),
                personal_message.as_deref(),
                now,
                expiry(now, Some(EMAIL_LINK_DAYS))?,
            )?;
            let url = share_url(base_url, &share.share_id);

            let email = compose_email(
                &recipient,
                &story,
                sender_name.as_deref(),
                personal_message.as_deref(),
                &url,
            );
            deliver(&email).map_err(StoreError::Delivery)?;

            tx.execute(
                "INSERT INTO forwarded_emails (story_id, recipient_email, sender_name,
                     personal_message, sent_at, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'sent')",
                params![story_id, recipient, sender_name, personal_message, now],
            )?;
            let forwarded_email = tx.query_row(
                "SELECT id, story_id, recipient_email, sender_name, personal_message, sent_at, status
                 FROM forwarded_emails WHERE id = ?1",
                [tx.last_insert_rowid()],
                forwarded_from_row,
            )?;

            Ok(ForwardOutcome {
                share_url: url,
                forwarded_email,
            })
        })?;

        info!("Story {} forwarded by email", story_id);
        Ok(outcome)
    }

    pub fn sharing_stats(&self, story_id: i64) -> StoreResult<SharingStats> {
        self.with_conn(|conn| {
            query_story(conn, story_id)?.ok_or(StoreError::NotFound("Story"))?;

            let (share_count, total_views): (i64, i64) = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(view_count), 0)
                 FROM shared_conversations WHERE story_id = ?1",
                [story_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            let email_forwards: i64 = conn.query_row(
                "SELECT COUNT(*) FROM forwarded_emails WHERE story_id = ?1",
                [story_id],
                |row| row.get(0),
            )?;

            let share_count = share_count.max(0) as u64;
            let email_forwards = email_forwards.max(0) as u64;
            Ok(SharingStats {
                share_count,
                email_forwards,
                total_views: total_views.max(0) as u64,
                total_forwards: share_count + email_forwards,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{db_with_category, post_story};

    const BASE: &str = "http://grove.test/";

    fn link_request(expires_in_days: Option<i64>) -> ShareLinkRequest {
        ShareLinkRequest {
            shared_by: Some(" River ".into()),
            personal_message: Some("thought of you".into()),
            expires_in_days,
        }
    }

    fn forward_request(recipient: &str) -> ForwardEmailRequest {
        ForwardEmailRequest {
            recipient_email: Some(recipient.into()),
            sender_name: Some("River".into()),
            personal_message: None,
        }
    }

    fn count(db: &Database, table: &str) -> i64 {
        db.with_conn(|conn| {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?)
        })
        .unwrap()
    }

    #[test]
    fn share_link_has_token_and_url() {
        let (db, category_id) = db_with_category();
        let story_id = post_story(&db, category_id, "u1");
        let now = Utc::now();

        let link = db.create_share_link(story_id, &link_request(Some(7)), BASE, now).unwrap();
        let share = &link.shared_conversation;
        assert_eq!(share.share_id.len(), SHARE_ID_LEN);
        assert!(share.share_id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(link.share_url, format!("http://grove.test/shared/{}", share.share_id));
        assert_eq!(share.shared_by.as_deref(), Some("River"));
        assert_eq!(share.expires_at, Some(now + Duration::days(7)));
        assert!(!share.is_expired);

        let forever = db.create_share_link(story_id, &ShareLinkRequest::default(), BASE, now).unwrap();
        assert!(forever.shared_conversation.expires_at.is_none());
        assert_ne!(forever.shared_conversation.share_id, share.share_id);
    }

    #[test]
    fn share_link_validation() {
        let (db, category_id) = db_with_category();
        let story_id = post_story(&db, category_id, "u1");
        let now = Utc::now();

        assert!(matches!(
            db.create_share_link(story_id + 1, &link_request(None), BASE, now),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            db.create_share_link(story_id, &link_request(Some(-1)), BASE, now),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            db.create_share_link(story_id, &link_request(Some(i64::MAX)), BASE, now),
            Err(StoreError::Validation(_))
        ));
        assert_eq!(count(&db, "shared_conversations"), 0);
    }

    #[test]
    fn colliding_tokens_are_redrawn() {
        let (db, category_id) = db_with_category();
        let story_id = post_story(&db, category_id, "u1");
        let taken = db
            .create_share_link(story_id, &link_request(None), BASE, Utc::now())
            .unwrap()
            .shared_conversation
            .share_id;

        let mut draws = vec!["fresh0000000000a".to_string(), taken.clone(), taken].into_iter().rev();
        let picked = db
            .with_conn(|conn| unique_share_id(conn, || draws.next().unwrap()))
            .unwrap();
        assert_eq!(picked, "fresh0000000000a");
    }

    #[test]
    fn viewing_counts_and_includes_thread() {
        let (db, category_id) = db_with_category();
        let story_id = post_story(&db, category_id, "u1");
        let parent = db.create_comment(story_id, "parent", None, "u2").unwrap();
        db.reply_to_comment(parent.id, "child", None, "u3").unwrap();
        db.delete_comment(parent.id, "u2").unwrap();

        let now = Utc::now();
        let link = db.create_share_link(story_id, &link_request(None), BASE, now).unwrap();
        let share_id = &link.shared_conversation.share_id;

        let first = db.view_shared(share_id, now).unwrap();
        assert_eq!(first.meta.view_count, 1);
        assert_eq!(first.story.story.content, "A body");
        assert_eq!(first.story.comments.len(), 1);
        assert!(first.story.comments[0].is_deleted);
        assert_eq!(first.story.comments[0].replies[0].content, "child");

        let second = db.view_shared(share_id, now).unwrap();
        assert_eq!(second.shared_conversation.view_count, 2);

        assert!(matches!(
            db.view_shared("nope", now),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn expired_link_is_gone_without_counting() {
        let (db, category_id) = db_with_category();
        let story_id = post_story(&db, category_id, "u1");
        let now = Utc::now();
        let link = db.create_share_link(story_id, &link_request(Some(0)), BASE, now).unwrap();
        let share_id = &link.shared_conversation.share_id;

        // Zero days expires at the creation instant; that instant is still readable.
        assert_eq!(db.view_shared(share_id, now).unwrap().meta.view_count, 1);

        let later = now + Duration::seconds(1);
        assert!(matches!(
            db.view_shared(share_id, later),
            Err(StoreError::Gone(_))
        ));
        assert_eq!(db.sharing_stats(story_id).unwrap().total_views, 1);
    }

    #[test]
    fn forwarding_records_link_and_email() {
        let (db, category_id) = db_with_category();
        let story_id = post_story(&db, category_id, "u1");
        let now = Utc::now();

        let mut sent = Vec::new();
        let outcome = db
            .forward_by_email(story_id, &forward_request("friend@example.org"), BASE, now, |email| {
                sent.push(email.clone());
                Ok(())
            })
            .unwrap();

        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "friend@example.org");
        assert_eq!(sent[0].subject, "River shared a healing story with you from SupportGrove");
        assert!(sent[0].text.contains(&outcome.share_url));
        assert!(sent[0].html.contains("<h3>\"A\"</h3>"));
        assert!(sent[0].html.contains(&outcome.share_url));
        assert_eq!(outcome.forwarded_email.status, "sent");

        let share_id = outcome.share_url.rsplit('/').next().unwrap();
        let thread = db.view_shared(share_id, now).unwrap();
        assert_eq!(
            thread.shared_conversation.expires_at,
            Some(now + Duration::days(EMAIL_LINK_DAYS))
        );

        let stats = db.sharing_stats(story_id).unwrap();
        assert_eq!(
            stats,
            SharingStats { share_count: 1, email_forwards: 1, total_views: 1, total_forwards: 2 }
        );
    }

    #[test]
    fn failed_delivery_leaves_nothing_behind() {
        let (db, category_id) = db_with_category();
        let story_id = post_story(&db, category_id, "u1");

        let err = db
            .forward_by_email(story_id, &forward_request("friend@example.org"), BASE, Utc::now(), |_| {
                Err("relay refused".into())
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Delivery(ref msg) if msg == "relay refused"));
        assert_eq!(count(&db, "shared_conversations"), 0);
        assert_eq!(count(&db, "forwarded_emails"), 0);
    }

    #[test]
    fn bad_recipients_never_reach_delivery() {
        let (db, category_id) = db_with_category();
        let story_id = post_story(&db, category_id, "u1");

        for bad in ["", "not-an-email", "a@b", "a b@example.org"] {
            let result = db.forward_by_email(story_id, &forward_request(bad), BASE, Utc::now(), |_| {
                panic!("delivery attempted for {bad:?}")
            });
            assert!(matches!(result, Err(StoreError::Validation(_))), "{bad:?}");
        }
        assert!(matches!(
            db.sharing_stats(story_id + 1),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn email_pattern_accepts_ordinary_addresses() {
        for good in ["friend@example.org", "first.last+grove@mail.example.co.uk"] {
            assert!(is_valid_email(good), "{good:?}");
        }
        assert!(!is_valid_email("friend@example"));
    }
}
