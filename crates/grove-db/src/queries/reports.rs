use chrono::Utc;
use rusqlite::params;
use tracing::info;

use grove_types::ReportTarget;
use grove_types::api::{CreateReportRequest, non_blank};

use crate::{Database, StoreError, StoreResult};

impl Database {
    /// File a moderation report against a story or response. The body's
    /// `anonymous_id` wins over the caller identity when present.
    pub fn create_report(&self, req: &CreateReportRequest, anonymous_id: &str) -> StoreResult<i64> {
        let target = req
            .content_type
            .as_deref()
            .ok_or_else(|| StoreError::validation("content_type is required"))?;
        let content_id = req
            .content_id
            .ok_or_else(|| StoreError::validation("content_id is required"))?;
        let reason = non_blank(req.reason.as_deref())
            .ok_or_else(|| StoreError::validation("reason is required"))?;
        let target =
            ReportTarget::parse(target).ok_or_else(|| StoreError::validation("Invalid content type"))?;
        let reporter = non_blank(req.anonymous_id.as_deref()).unwrap_or_else(|| anonymous_id.to_string());

        let id = self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO reports (content_type, content_id, reason, description,
                     reporter_anonymous_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    target.as_str(),
                    content_id,
                    reason,
                    non_blank(req.description.as_deref()),
                    reporter,
                    Utc::now()
                ],
            )?;
            Ok(tx.last_insert_rowid())
        })?;

        info!("Report {} filed against {} {}", id, target.as_str(), content_id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::db_with_category;

    fn report(content_type: &str) -> CreateReportRequest {
        CreateReportRequest {
            content_type: Some(content_type.into()),
            content_id: Some(1),
            reason: Some("spam".into()),
            ..Default::default()
        }
    }

    #[test]
    fn report_is_pending_and_attributed() {
        let (db, _) = db_with_category();
        let id = db.create_report(&report("response"), "caller").unwrap();

        let (status, reporter): (String, String) = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT status, reporter_anonymous_id FROM reports WHERE id = ?1",
                    [id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?)
            })
            .unwrap();
        assert_eq!(status, "pending");
        assert_eq!(reporter, "caller");

        let mut body = report("story");
        body.anonymous_id = Some("from-body".into());
        let id = db.create_report(&body, "caller").unwrap();
        let reporter: String = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT reporter_anonymous_id FROM reports WHERE id = ?1",
                    [id],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(reporter, "from-body");
    }

    #[test]
    fn rejects_unknown_targets_and_missing_fields() {
        let (db, _) = db_with_category();
        assert!(matches!(
            db.create_report(&report("comment"), "u1"),
            Err(StoreError::Validation(msg)) if msg == "Invalid content type"
        ));

        let mut missing = report("story");
        missing.reason = Some("  ".into());
        assert!(matches!(
            db.create_report(&missing, "u1"),
            Err(StoreError::Validation(_))
        ));
    }
}
