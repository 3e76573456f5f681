use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::error;

use grove_db::{Database, StoreResult};

use crate::error::ApiError;
use crate::mailer::Mailer;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub mailer: Arc<dyn Mailer>,
    /// Base of every share URL, without a trailing slash.
    pub public_url: String,
    pub notification_retention_days: i64,
}

/// Run a store call off the async runtime.
pub async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal("Internal server error")
        })?
        .map_err(ApiError::from)
}

/// Wrap a JSON object payload in the success envelope.
pub fn success(payload: Value) -> axum::Json<Value> {
    let mut body = Map::new();
    body.insert("success".into(), Value::Bool(true));
    if let Value::Object(fields) = payload {
        body.extend(fields);
    }
    axum::Json(Value::Object(body))
}
