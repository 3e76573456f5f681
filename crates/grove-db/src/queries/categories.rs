use chrono::Utc;
use rusqlite::{Connection, params};
use tracing::info;

use grove_types::api::{CreateCategoryRequest, non_blank};
use grove_types::models::Category;

use crate::error::OptionalExt;
use crate::models::{CATEGORY_SELECT, CategoryRow};
use crate::{Database, StoreError, StoreResult};

pub const DEFAULT_COLOR: &str = "#4A7C59";

struct SeedCategory {
    name: &'static str,
    description: &'static str,
    color: &'static str,
    icon: &'static str,
}

const DEFAULT_CATEGORIES: [SeedCategory; 6] = [
    SeedCategory {
        name: "Addiction Recovery",
        description: "Stories and support for overcoming substance abuse and behavioral addictions",
        color: "#4A7C59",
        icon: "recovery",
    },
    SeedCategory {
        name: "Trauma & Healing",
        description: "Experiences with PTSD, childhood trauma, abuse recovery, racial trauma, sexism, religious abuse, gender fluidity shaming, and multigenerational family dysfunctionality",
        color: "#87CEEB",
        icon: "healing",
    },
    SeedCategory {
        name: "Mental Health",
        description: "Depression, anxiety, bipolar disorder, and other mental health journeys",
        color: "#E6E6FA",
        icon: "mental-health",
    },
    SeedCategory {
        name: "Life Transitions",
        description: "Displacement, loss, major life changes, and adaptation",
        color: "#FFB6C1",
        icon: "transition",
    },
    SeedCategory {
        name: "Relationship Recovery",
        description: "Healing from domestic violence, toxic relationships, and emotional abuse",
        color: "#8FBC8F",
        icon: "relationship",
    },
    SeedCategory {
        name: "Self-Care & Wellness",
        description: "Coping strategies, mindfulness, and personal growth",
        color: "#FFD700",
        icon: "wellness",
    },
];

impl Database {
    pub fn list_categories(&self) -> StoreResult<Vec<Category>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{CATEGORY_SELECT} ORDER BY c.id ASC"))?;
            let rows = stmt
                .query_map([], CategoryRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(CategoryRow::into_category).collect())
        })
    }

    pub fn get_category(&self, id: i64) -> StoreResult<Category> {
        self.with_conn(|conn| {
            query_category(conn, id)?
                .map(CategoryRow::into_category)
                .ok_or(StoreError::NotFound("Category"))
        })
    }

    pub fn create_category(&self, req: &CreateCategoryRequest) -> StoreResult<Category> {
        let name = non_blank(req.name.as_deref())
            .ok_or_else(|| StoreError::validation("Category name is required"))?;

        self.with_tx(|tx| {
            if category_id_by_name(tx, &name)?.is_some() {
                return Err(StoreError::AlreadyExists("Category"));
            }

            let id = insert_category(
                tx,
                &name,
                req.description.as_deref().unwrap_or(""),
                non_blank(req.color.as_deref()).as_deref().unwrap_or(DEFAULT_COLOR),
                req.icon.as_deref().unwrap_or(""),
            )?;

            query_category(tx, id)?
                .map(CategoryRow::into_category)
                .ok_or(StoreError::NotFound("Category"))
        })
    }

    /// Insert whichever default categories are missing. Returns the names created.
    pub fn seed_categories(&self) -> StoreResult<Vec<String>> {
        let created = self.with_tx(|tx| {
            let mut created = Vec::new();
            for seed in &DEFAULT_CATEGORIES {
                if category_id_by_name(tx, seed.name)?.is_none() {
                    insert_category(tx, seed.name, seed.description, seed.color, seed.icon)?;
                    created.push(seed.name.to_string());
                }
            }
            Ok(created)
        })?;

        info!("Seeded {} categories", created.len());
        Ok(created)
    }
}

pub(crate) fn query_category(conn: &Connection, id: i64) -> StoreResult<Option<CategoryRow>> {
    conn.query_row(
        &format!("{CATEGORY_SELECT} WHERE c.id = ?1"),
        [id],
        CategoryRow::from_row,
    )
    .optional()
}

fn category_id_by_name(conn: &Connection, name: &str) -> StoreResult<Option<i64>> {
    conn.query_row("SELECT id FROM categories WHERE name = ?1", [name], |row| row.get(0))
        .optional()
}

fn insert_category(
    conn: &Connection,
    name: &str,
    description: &str,
    color: &str,
    icon: &str,
) -> StoreResult<i64> {
    conn.execute(
        "INSERT INTO categories (name, description, color, icon, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![name, description, color, icon, Utc::now()],
    )?;
    Ok(conn.last_insert_rowid())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn seeding_is_idempotent() {
        let db = db();
        let first = db.seed_categories().unwrap();
        assert_eq!(first.len(), DEFAULT_CATEGORIES.len());
        assert_eq!(first[0], "Addiction Recovery");

        let second = db.seed_categories().unwrap();
        assert!(second.is_empty());
        assert_eq!(db.list_categories().unwrap().len(), DEFAULT_CATEGORIES.len());
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let db = db();
        let req = CreateCategoryRequest {
            name: Some("Grief".into()),
            ..Default::default()
        };
        let created = db.create_category(&req).unwrap();
        assert_eq!(created.color, DEFAULT_COLOR);
        assert_eq!(created.story_count, 0);

        let err = db.create_category(&req).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[test]
    fn blank_name_is_a_validation_error() {
        let db = db();
        let req = CreateCategoryRequest {
            name: Some("   ".into()),
            ..Default::default()
        };
        assert!(matches!(
            db.create_category(&req),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn missing_category_is_not_found() {
        assert!(matches!(db().get_category(99), Err(StoreError::NotFound(_))));
    }
}
