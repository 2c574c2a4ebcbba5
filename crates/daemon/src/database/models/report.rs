use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::types::{DTimestamp, DUuid};
use crate::database::Database;

/// A problem report filed against a reviewer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: DUuid,
    pub reviewer_id: DUuid,
    pub reason: String,
    pub details: String,
    pub reported_by: Option<String>,
    pub created_at: DTimestamp,
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub reviewer_id: Uuid,
    pub reason: String,
    pub details: String,
    pub reported_by: Option<String>,
}

impl Report {
    /// Store a report. Fails with a foreign key violation if the reviewer is gone.
    pub async fn create(params: NewReport, db: &Database) -> Result<Report, sqlx::Error> {
        sqlx::query_as::<_, Report>(
            r#"
            INSERT INTO reports (id, reviewer_id, reason, details, reported_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING id, reviewer_id, reason, details, reported_by, created_at
            "#,
        )
        .bind(DUuid::new())
        .bind(DUuid::from(params.reviewer_id))
        .bind(params.reason)
        .bind(params.details)
        .bind(params.reported_by)
        .bind(DTimestamp::now())
        .fetch_one(&**db)
        .await
    }

    pub async fn list_for_reviewer(
        reviewer_id: Uuid,
        db: &Database,
    ) -> Result<Vec<Report>, sqlx::Error> {
        sqlx::query_as::<_, Report>(
            r#"
            SELECT id, reviewer_id, reason, details, reported_by, created_at
            FROM reports
            WHERE reviewer_id = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(DUuid::from(reviewer_id))
        .fetch_all(&**db)
        .await
    }
}
