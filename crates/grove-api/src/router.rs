use axum::{
    Json, Router,
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};

use crate::state::AppState;
use crate::{categories, comments, notifications, sharing, stories};

/// Every `/api` route plus the root health check. Transport layers (CORS,
/// tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route("/categories/seed", post(categories::seed_categories))
        .route("/categories/{category_id}", get(categories::get_category))
        .route(
            "/stories",
            get(stories::list_stories).post(stories::create_story),
        )
        .route("/stories/guided-questions", get(stories::guided_questions))
        .route("/stories/{story_id}", get(stories::get_story))
        .route("/stories/{story_id}/responses", post(stories::create_response))
        .route(
            "/stories/{story_id}/reactions",
            post(stories::add_reaction).delete(stories::remove_reaction),
        )
        .route("/reports", post(stories::create_report))
        .route("/search", get(stories::search))
        .route("/hashtags/trending", get(stories::trending_hashtags))
        .route("/hashtags/{tag}/stories", get(stories::hashtag_stories))
        .route(
            "/stories/{story_id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route("/comments/{comment_id}/replies", post(comments::reply_to_comment))
        .route("/comments/{comment_id}/reactions", post(comments::toggle_reaction))
        .route(
            "/comments/{comment_id}",
            put(comments::update_comment).delete(comments::delete_comment),
        )
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/read-all", put(notifications::mark_all_read))
        .route("/notifications/cleanup", post(notifications::cleanup))
        .route("/notifications/{notification_id}/read", put(notifications::mark_read))
        .route(
            "/notifications/{notification_id}",
            delete(notifications::delete_notification),
        )
        .route("/stories/{story_id}/share-link", post(sharing::create_share_link))
        .route("/stories/{story_id}/forward/email", post(sharing::forward_by_email))
        .route("/stories/{story_id}/sharing-stats", get(sharing::sharing_stats))
        .route("/shared/{share_id}", get(sharing::view_shared));

    Router::new()
        .nest("/api", api)
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "SupportGrove API is running",
    }))
}
