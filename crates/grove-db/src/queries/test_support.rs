use grove_types::api::{CreateCategoryRequest, CreateStoryRequest};

use crate::Database;

pub fn db_with_category() -> (Database, i64) {
    let db = Database::open_in_memory().unwrap();
    let category = db
        .create_category(&CreateCategoryRequest {
            name: Some("Mental Health".into()),
            ..Default::default()
        })
        .unwrap();
    (db, category.id)
}

pub fn story_request(category_id: i64, title: &str) -> CreateStoryRequest {
    CreateStoryRequest {
        title: Some(title.into()),
        content: Some(format!("{} body", title)),
        category_id: Some(category_id),
        ..Default::default()
    }
}

/// Post a story owned by `owner` and return its id.
pub fn post_story(db: &Database, category_id: i64, owner: &str) -> i64 {
    db.create_story(&story_request(category_id, "A"), owner)
        .unwrap()
        .summary
        .id
}
