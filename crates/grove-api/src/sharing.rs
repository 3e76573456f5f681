use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;

use grove_types::api::{ForwardEmailRequest, ShareLinkRequest};

use crate::error::ApiError;
use crate::extractors::{ApiJson, ApiPath};
use crate::state::{AppState, blocking, success};

/// Create a share link. The body is optional; a request with no JSON body
/// gets a link with no sender, message or expiry.
pub async fn create_share_link(
    State(state): State<AppState>,
    ApiPath(story_id): ApiPath<i64>,
    body: Result<Json<ShareLinkRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = match body {
        Ok(Json(req)) => req,
        Err(JsonRejection::MissingJsonContentType(_)) => ShareLinkRequest::default(),
        Err(rejection) => return Err(rejection.into()),
    };

    let link = blocking(&state, move |s| {
        s.db.create_share_link(story_id, &req, &s.public_url, Utc::now())
    })
    .await?;
    Ok(success(json!({
        "share_url": link.share_url,
        "share_id": link.shared_conversation.share_id,
        "shared_conversation": link.shared_conversation,
    })))
}

pub async fn forward_by_email(
    State(state): State<AppState>,
    ApiPath(story_id): ApiPath<i64>,
    ApiJson(req): ApiJson<ForwardEmailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = blocking(&state, move |s| {
        s.db.forward_by_email(story_id, &req, &s.public_url, Utc::now(), |email| {
            s.mailer.send(email).map_err(|e| e.to_string())
        })
    })
    .await?;
    Ok(success(json!({
        "message": "Story forwarded successfully via email",
        "share_url": outcome.share_url,
        "forwarded_email": outcome.forwarded_email,
    })))
}

pub async fn view_shared(
    State(state): State<AppState>,
    ApiPath(share_id): ApiPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let thread = blocking(&state, move |s| s.db.view_shared(&share_id, Utc::now())).await?;
    Ok(success(json!({
        "shared_conversation": thread.shared_conversation,
        "story": thread.story,
        "meta": thread.meta,
    })))
}

pub async fn sharing_stats(
    State(state): State<AppState>,
    ApiPath(story_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = blocking(&state, move |s| s.db.sharing_stats(story_id)).await?;
    Ok(success(json!({ "stats": stats })))
}
