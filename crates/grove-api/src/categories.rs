use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use grove_types::api::CreateCategoryRequest;

use crate::error::ApiError;
use crate::extractors::{ApiJson, ApiPath};
use crate::state::{AppState, blocking, success};

pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let categories = blocking(&state, |s| s.db.list_categories()).await?;
    Ok(success(json!({ "categories": categories })))
}

pub async fn get_category(
    State(state): State<AppState>,
    ApiPath(category_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let category = blocking(&state, move |s| s.db.get_category(category_id)).await?;
    Ok(success(json!({ "category": category })))
}

pub async fn create_category(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category = blocking(&state, move |s| s.db.create_category(&req)).await?;
    Ok((StatusCode::CREATED, success(json!({ "category": category }))))
}

pub async fn seed_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let created = blocking(&state, |s| s.db.seed_categories()).await?;
    Ok(success(json!({
        "message": format!("Created {} categories", created.len()),
        "created": created,
    })))
}
