use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use grove_types::api::{CommentReactionRequest, CreateCommentRequest, UpdateCommentRequest};

use crate::error::ApiError;
use crate::extractors::{AnonymousId, ApiJson, ApiPath};
use crate::state::{AppState, blocking, success};
use crate::stories::reaction_kind;

pub async fn list_comments(
    State(state): State<AppState>,
    ApiPath(story_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let comments = blocking(&state, move |s| s.db.list_comments(story_id)).await?;
    let total_count = comments.len();
    Ok(success(json!({
        "comments": comments,
        "total_count": total_count,
    })))
}

pub async fn create_comment(
    State(state): State<AppState>,
    ApiPath(story_id): ApiPath<i64>,
    anonymous_id: AnonymousId,
    ApiJson(req): ApiJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let who = anonymous_id.0.clone();
    let comment = blocking(&state, move |s| {
        s.db.create_comment(
            story_id,
            req.content.as_deref().unwrap_or_default(),
            req.pseudonym.as_deref(),
            &who,
        )
    })
    .await?;
    Ok((
        StatusCode::CREATED,
        success(json!({
            "comment": comment,
            "anonymous_id": anonymous_id.0,
        })),
    ))
}

pub async fn reply_to_comment(
    State(state): State<AppState>,
    ApiPath(comment_id): ApiPath<i64>,
    anonymous_id: AnonymousId,
    ApiJson(req): ApiJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let who = anonymous_id.0.clone();
    let reply = blocking(&state, move |s| {
        s.db.reply_to_comment(
            comment_id,
            req.content.as_deref().unwrap_or_default(),
            req.pseudonym.as_deref(),
            &who,
        )
    })
    .await?;
    Ok((
        StatusCode::CREATED,
        success(json!({
            "comment": reply,
            "anonymous_id": anonymous_id.0,
        })),
    ))
}

pub async fn toggle_reaction(
    State(state): State<AppState>,
    ApiPath(comment_id): ApiPath<i64>,
    anonymous_id: AnonymousId,
    ApiJson(req): ApiJson<CommentReactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = reaction_kind(req.reaction_type.as_deref())?;
    let who = anonymous_id.0.clone();
    let outcome = blocking(&state, move |s| {
        s.db.toggle_comment_reaction(comment_id, &who, kind)
    })
    .await?;
    Ok(success(json!({
        "action": outcome.action,
        "reaction_counts": outcome.reaction_counts,
        "anonymous_id": anonymous_id.0,
    })))
}

pub async fn update_comment(
    State(state): State<AppState>,
    ApiPath(comment_id): ApiPath<i64>,
    anonymous_id: AnonymousId,
    ApiJson(req): ApiJson<UpdateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = blocking(&state, move |s| {
        s.db.update_comment(
            comment_id,
            req.content.as_deref().unwrap_or_default(),
            anonymous_id.as_str(),
        )
    })
    .await?;
    Ok(success(json!({ "comment": comment })))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    ApiPath(comment_id): ApiPath<i64>,
    anonymous_id: AnonymousId,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |s| s.db.delete_comment(comment_id, anonymous_id.as_str())).await?;
    Ok(success(json!({ "message": "Comment deleted successfully" })))
}
