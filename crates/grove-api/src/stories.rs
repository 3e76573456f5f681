use axum::{extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;

use grove_db::queries::stories::StoryPage;
use grove_types::api::{
    CreateReportRequest, CreateResponseRequest, CreateStoryRequest, PageQuery, SearchQuery,
    StoryListQuery, StoryReactionRequest, non_blank,
};
use grove_types::models::GUIDED_QUESTIONS;
use grove_types::pagination::PageRequest;
use grove_types::{ReactionKind, StorySort};

use crate::error::ApiError;
use crate::extractors::{AnonymousId, ApiJson, ApiPath, ApiQuery};
use crate::state::{AppState, blocking, success};

/// Parse a `reaction_type` field shared by story and comment reactions.
pub(crate) fn reaction_kind(raw: Option<&str>) -> Result<ReactionKind, ApiError> {
    let raw = raw.ok_or_else(|| ApiError::bad_request("reaction_type is required"))?;
    ReactionKind::parse(raw).ok_or_else(|| ApiError::bad_request("Invalid reaction type"))
}

fn page_json(page: StoryPage) -> serde_json::Value {
    json!({
        "stories": page.stories,
        "pagination": page.pagination,
    })
}

pub async fn list_stories(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<StoryListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let sort = StorySort::from_param(query.sort_by.as_deref());
    let page = PageRequest::new(query.page, query.per_page);
    let stories = blocking(&state, move |s| {
        s.db.list_stories(query.category_id, sort, page)
    })
    .await?;
    Ok(success(page_json(stories)))
}

pub async fn create_story(
    State(state): State<AppState>,
    anonymous_id: AnonymousId,
    ApiJson(req): ApiJson<CreateStoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = anonymous_id.0.clone();
    let story = blocking(&state, move |s| s.db.create_story(&req, &owner)).await?;
    Ok((
        StatusCode::CREATED,
        success(json!({
            "story": story,
            "anonymous_id": anonymous_id.0,
            "message": "Your story has been shared successfully. Thank you for contributing to our community.",
        })),
    ))
}

pub async fn get_story(
    State(state): State<AppState>,
    ApiPath(story_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let story = blocking(&state, move |s| s.db.get_story(story_id)).await?;
    Ok(success(json!({ "story": story })))
}

pub async fn guided_questions() -> impl IntoResponse {
    success(json!({ "questions": GUIDED_QUESTIONS }))
}

pub async fn create_response(
    State(state): State<AppState>,
    ApiPath(story_id): ApiPath<i64>,
    anonymous_id: AnonymousId,
    ApiJson(req): ApiJson<CreateResponseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = blocking(&state, move |s| {
        s.db.create_response(story_id, &req, anonymous_id.as_str())
    })
    .await?;
    Ok((
        StatusCode::CREATED,
        success(json!({
            "response": response,
            "message": "Response added successfully",
        })),
    ))
}

/// Identity for a story reaction: the body's `anonymous_id` wins over the header.
fn reactor(req: &StoryReactionRequest, header: AnonymousId) -> String {
    non_blank(req.anonymous_id.as_deref()).unwrap_or(header.0)
}

pub async fn add_reaction(
    State(state): State<AppState>,
    ApiPath(story_id): ApiPath<i64>,
    anonymous_id: AnonymousId,
    ApiJson(req): ApiJson<StoryReactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = reaction_kind(req.reaction_type.as_deref())?;
    let who = reactor(&req, anonymous_id);
    let counts = blocking(&state, move |s| s.db.add_story_reaction(story_id, &who, kind)).await?;
    Ok(success(json!({
        "message": format!("{} reaction added", kind.title()),
        "counts": counts,
    })))
}

pub async fn remove_reaction(
    State(state): State<AppState>,
    ApiPath(story_id): ApiPath<i64>,
    anonymous_id: AnonymousId,
    ApiJson(req): ApiJson<StoryReactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = reaction_kind(req.reaction_type.as_deref())?;
    let who = reactor(&req, anonymous_id);
    let counts =
        blocking(&state, move |s| s.db.remove_story_reaction(story_id, &who, kind)).await?;
    Ok(success(json!({
        "message": format!("{} reaction removed", kind.title()),
        "counts": counts,
    })))
}

pub async fn create_report(
    State(state): State<AppState>,
    anonymous_id: AnonymousId,
    ApiJson(req): ApiJson<CreateReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let report_id =
        blocking(&state, move |s| s.db.create_report(&req, anonymous_id.as_str())).await?;
    Ok((
        StatusCode::CREATED,
        success(json!({
            "report_id": report_id,
            "message": "Report submitted successfully. Thank you for helping keep our community safe.",
        })),
    ))
}

pub async fn search(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::new(query.page, query.per_page);
    let (q, hashtag, category_id) = (query.q.clone(), query.hashtag.clone(), query.category_id);
    let results = blocking(&state, move |s| {
        s.db.search_stories(q.as_deref(), hashtag.as_deref(), category_id, page)
    })
    .await?;

    let mut body = page_json(results);
    body["query"] = json!(query.q.unwrap_or_default().trim());
    body["hashtag"] = json!(query.hashtag.unwrap_or_default().trim());
    Ok(success(body))
}

pub async fn trending_hashtags(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let trending = blocking(&state, |s| s.db.trending_hashtags(Utc::now())).await?;
    Ok(success(json!({ "trending_hashtags": trending })))
}

pub async fn hashtag_stories(
    State(state): State<AppState>,
    ApiPath(tag): ApiPath<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::new(query.page, query.per_page);
    let clean = grove_types::hashtags::clean_tag(&tag);
    let stories = blocking(&state, move |s| s.db.stories_by_hashtag(&tag, page)).await?;

    let mut body = page_json(stories);
    body["hashtag"] = json!(clean);
    Ok(success(body))
}
