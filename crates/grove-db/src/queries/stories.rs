use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, params, params_from_iter};
use tracing::info;

use grove_types::api::{CreateResponseRequest, CreateStoryRequest, non_blank};
use grove_types::hashtags;
use grove_types::models::{
    StoryDetail, StoryResponse, StorySummary, StoryWithResponses, TrendingHashtag,
};
use grove_types::pagination::{PageRequest, Pagination};
use grove_types::{ResponseType, StorySort};

use crate::error::OptionalExt;
use crate::models::{ResponseRow, STORY_SELECT, StoryRow, VISIBLE};
use crate::queries::categories::query_category;
use crate::{Database, StoreError, StoreResult};

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_PSEUDONYM_CHARS: usize = 50;
pub const TRENDING_WINDOW_DAYS: i64 = 30;
pub const TRENDING_LIMIT: usize = 20;

/// A page of story summaries plus its pagination envelope.
#[derive(Debug)]
pub struct StoryPage {
    pub stories: Vec<StorySummary>,
    pub pagination: Pagination,
}

/// Accumulates `WHERE` clauses with their positional values.
#[derive(Default)]
struct StoryFilter {
    clauses: Vec<String>,
    values: Vec<Value>,
}

impl StoryFilter {
    fn visible() -> Self {
        Self {
            clauses: vec![VISIBLE.to_string()],
            values: Vec::new(),
        }
    }

    fn push(&mut self, clause: &str, values: impl IntoIterator<Item = Value>) {
        self.clauses.push(clause.to_string());
        self.values.extend(values);
    }

    fn category(&mut self, category_id: Option<i64>) {
        if let Some(id) = category_id {
            self.push("s.category_id = ?", [Value::Integer(id)]);
        }
    }

    fn hashtag(&mut self, tag: &str) {
        self.push(
            "instr(COALESCE(s.hashtags, ''), ?) > 0",
            [Value::Text(hashtags::column_needle(tag))],
        );
    }

    fn where_sql(&self) -> String {
        self.clauses.join(" AND ")
    }
}

impl Database {
    pub fn create_story(&self, req: &CreateStoryRequest, anonymous_id: &str) -> StoreResult<StoryDetail> {
        let title = non_blank(req.title.as_deref())
            .ok_or_else(|| StoreError::validation("title is required"))?;
        let content = non_blank(req.content.as_deref())
            .ok_or_else(|| StoreError::validation("content is required"))?;
        let category_id = req
            .category_id
            .filter(|id| *id != 0)
            .ok_or_else(|| StoreError::validation("category_id is required"))?;

        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(StoreError::validation(format!(
                "title must be at most {} characters",
                MAX_TITLE_CHARS
            )));
        }
        let pseudonym = non_blank(req.pseudonym.as_deref());
        if pseudonym
            .as_ref()
            .is_some_and(|p| p.chars().count() > MAX_PSEUDONYM_CHARS)
        {
            return Err(StoreError::validation(format!(
                "pseudonym must be at most {} characters",
                MAX_PSEUDONYM_CHARS
            )));
        }

        let tags = hashtags::normalize(req.hashtags.as_ref());

        let story = self.with_tx(|tx| {
            if query_category(tx, category_id)?.is_none() {
                return Err(StoreError::validation("Invalid category"));
            }

            let now = Utc::now();
            tx.execute(
                "INSERT INTO stories (anonymous_id, title, content, category_id, pseudonym, hashtags,
                     healing_process, next_steps, trigger_warning, trigger_tags, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
                params![
                    anonymous_id,
                    title,
                    content,
                    category_id,
                    pseudonym,
                    hashtags::to_column(&tags),
                    non_blank(req.healing_process.as_deref()),
                    non_blank(req.next_steps.as_deref()),
                    req.trigger_warning.unwrap_or(false),
                    non_blank(req.trigger_tags.as_deref()),
                    now,
                ],
            )?;

            query_story(tx, tx.last_insert_rowid())?.ok_or(StoreError::NotFound("Story"))
        })?;

        info!("Story {} created in category {}", story.id, category_id);
        Ok(story.into_detail())
    }

    pub fn list_stories(
        &self,
        category_id: Option<i64>,
        sort: StorySort,
        page: PageRequest,
    ) -> StoreResult<StoryPage> {
        let mut filter = StoryFilter::visible();
        filter.category(category_id);

        let order = match sort {
            StorySort::HeartCount => "s.heart_count DESC, s.id DESC",
            StorySort::ResponseCount => "s.response_count DESC, s.id DESC",
            StorySort::CreatedAt => "s.created_at DESC, s.id DESC",
        };

        self.with_conn(|conn| query_story_page(conn, &filter, order, Vec::new(), page))
    }

    /// A visible story with its visible responses, oldest response first.
    pub fn get_story(&self, id: i64) -> StoreResult<StoryWithResponses> {
        self.with_conn(|conn| {
            let story = visible_story(conn, id)?;

            let mut stmt = conn.prepare(
                "SELECT id, story_id, content, pseudonym, response_type, helpful_count,
                        created_at, updated_at
                 FROM responses
                 WHERE story_id = ?1 AND is_approved = 1 AND is_flagged = 0
                 ORDER BY created_at ASC, id ASC",
            )?;
            let responses = stmt
                .query_map([id], ResponseRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(StoryWithResponses {
                story: story.into_detail(),
                responses: responses.into_iter().map(ResponseRow::into_response).collect(),
            })
        })
    }

    pub fn create_response(
        &self,
        story_id: i64,
        req: &CreateResponseRequest,
        anonymous_id: &str,
    ) -> StoreResult<StoryResponse> {
        let content = non_blank(req.content.as_deref())
            .ok_or_else(|| StoreError::validation("Response content is required"))?;
        let response_type = match non_blank(req.response_type.as_deref()) {
            None => ResponseType::default(),
            Some(raw) => ResponseType::parse(&raw)
                .ok_or_else(|| StoreError::validation("Invalid response type"))?,
        };

        self.with_tx(|tx| {
            visible_story(tx, story_id)?;

            let now = Utc::now();
            tx.execute(
                "INSERT INTO responses (anonymous_id, story_id, content, pseudonym, response_type,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    anonymous_id,
                    story_id,
                    content,
                    non_blank(req.pseudonym.as_deref()),
                    response_type.as_str(),
                    now,
                ],
            )?;
            let response_id = tx.last_insert_rowid();

            tx.execute(
                "UPDATE stories SET response_count = response_count + 1 WHERE id = ?1",
                [story_id],
            )?;

            tx.query_row(
                "SELECT id, story_id, content, pseudonym, response_type, helpful_count,
                        created_at, updated_at
                 FROM responses WHERE id = ?1",
                [response_id],
                ResponseRow::from_row,
            )
            .map(ResponseRow::into_response)
            .map_err(StoreError::from)
        })
    }

    /// Containment search over the narrative fields and/or one hashtag.
    /// Title matches rank ahead of body matches; ties go newest first.
    pub fn search_stories(
        &self,
        query: Option<&str>,
        hashtag: Option<&str>,
        category_id: Option<i64>,
        page: PageRequest,
    ) -> StoreResult<StoryPage> {
        let query = non_blank(query);
        let hashtag = non_blank(hashtag)
            .map(|tag| hashtags::clean_tag(&tag))
            .filter(|tag| !tag.is_empty());

        if query.is_none() && hashtag.is_none() {
            return Err(StoreError::validation("Search query or hashtag is required"));
        }

        let mut filter = StoryFilter::visible();
        let mut order_values = Vec::new();
        let order = if let Some(q) = &query {
            let pattern = like_pattern(q);
            filter.push(
                "(s.title LIKE ? ESCAPE '\\' OR s.content LIKE ? ESCAPE '\\'
                  OR s.healing_process LIKE ? ESCAPE '\\' OR s.next_steps LIKE ? ESCAPE '\\')",
                std::iter::repeat_n(Value::Text(pattern.clone()), 4),
            );
            order_values.push(Value::Text(pattern));
            "CASE WHEN s.title LIKE ? ESCAPE '\\' THEN 1 ELSE 0 END DESC, s.created_at DESC, s.id DESC"
        } else {
            "s.created_at DESC, s.id DESC"
        };
        if let Some(tag) = &hashtag {
            filter.hashtag(tag);
        }
        filter.category(category_id);

        self.with_conn(|conn| query_story_page(conn, &filter, order, order_values, page))
    }

    pub fn stories_by_hashtag(&self, tag: &str, page: PageRequest) -> StoreResult<StoryPage> {
        let tag = hashtags::clean_tag(tag);
        let mut filter = StoryFilter::visible();
        filter.hashtag(&tag);

        self.with_conn(|conn| {
            query_story_page(conn, &filter, "s.created_at DESC, s.id DESC", Vec::new(), page)
        })
    }

    /// Most used tags among visible stories of the trailing window.
    pub fn trending_hashtags(&self, now: DateTime<Utc>) -> StoreResult<Vec<TrendingHashtag>> {
        let since = now - Duration::days(TRENDING_WINDOW_DAYS);

        let columns: Vec<String> = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT s.hashtags FROM stories s
                 WHERE {VISIBLE} AND s.hashtags IS NOT NULL AND s.created_at >= ?1"
            ))?;
            let rows = stmt
                .query_map([since], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        let mut counts: HashMap<String, u64> = HashMap::new();
        for column in &columns {
            for tag in hashtags::from_column(Some(column)) {
                *counts.entry(tag).or_default() += 1;
            }
        }

        let mut trending: Vec<TrendingHashtag> = counts
            .into_iter()
            .map(|(hashtag, count)| TrendingHashtag { hashtag, count })
            .collect();
        trending.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.hashtag.cmp(&b.hashtag)));
        trending.truncate(TRENDING_LIMIT);
        Ok(trending)
    }
}

pub(crate) fn query_story(conn: &Connection, id: i64) -> StoreResult<Option<StoryRow>> {
    conn.query_row(&format!("{STORY_SELECT} WHERE s.id = ?1"), [id], StoryRow::from_row)
        .optional()
}

/// Fetch a story readers may see, or `NotFound`.
pub(crate) fn visible_story(conn: &Connection, id: i64) -> StoreResult<StoryRow> {
    query_story(conn, id)?
        .filter(StoryRow::is_visible)
        .ok_or(StoreError::NotFound("Story"))
}

fn query_story_page(
    conn: &Connection,
    filter: &StoryFilter,
    order: &str,
    order_values: Vec<Value>,
    page: PageRequest,
) -> StoreResult<StoryPage> {
    let where_sql = filter.where_sql();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM stories s WHERE {where_sql}"),
        params_from_iter(filter.values.iter()),
        |row| row.get(0),
    )?;

    let mut values = filter.values.clone();
    values.extend(order_values);
    values.push(Value::Integer(i64::from(page.per_page)));
    values.push(Value::Integer(page.offset() as i64));

    let mut stmt = conn.prepare(&format!(
        "{STORY_SELECT} WHERE {where_sql} ORDER BY {order} LIMIT ? OFFSET ?"
    ))?;
    let rows = stmt
        .query_map(params_from_iter(values.iter()), StoryRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(StoryPage {
        stories: rows.into_iter().map(StoryRow::into_summary).collect(),
        pagination: Pagination::new(page, total.max(0) as u64),
    })
}

/// `%needle%` with LIKE metacharacters escaped by backslash.
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
