use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::types::{BroadcastKind, DTimestamp, DUuid};
use crate::database::Database;

macro_rules! broadcast_columns {
    () => {
        "id, title, message, kind, created_by, created_at, expires_at, is_active, dismissible"
    };
}

/// A site-wide announcement.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Broadcast {
    pub id: DUuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: BroadcastKind,
    pub created_by: String,
    pub created_at: DTimestamp,
    /// `None` means the broadcast never expires.
    pub expires_at: Option<DTimestamp>,
    pub is_active: bool,
    pub dismissible: bool,
}

#[derive(Debug, Clone)]
pub struct NewBroadcast {
    pub title: String,
    pub message: String,
    pub kind: BroadcastKind,
    pub created_by: String,
    pub expires_at: Option<DTimestamp>,
    pub dismissible: bool,
}

impl Broadcast {
    /// Active on creation.
    pub async fn create(params: NewBroadcast, db: &Database) -> Result<Broadcast, sqlx::Error> {
        sqlx::query_as::<_, Broadcast>(concat!(
            r#"
            INSERT INTO broadcasts (
                id, title, message, kind, created_by, created_at, expires_at,
                is_active, dismissible
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8)
            RETURNING "#,
            broadcast_columns!()
        ))
        .bind(DUuid::new())
        .bind(params.title)
        .bind(params.message)
        .bind(params.kind)
        .bind(params.created_by)
        .bind(DTimestamp::now())
        .bind(params.expires_at)
        .bind(params.dismissible)
        .fetch_one(&**db)
        .await
    }

    /// Every broadcast, newest first.
    pub async fn list(db: &Database) -> Result<Vec<Broadcast>, sqlx::Error> {
        sqlx::query_as::<_, Broadcast>(concat!(
            "SELECT ",
            broadcast_columns!(),
            " FROM broadcasts ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&**db)
        .await
    }

    /// Broadcasts that are switched on and not yet expired at `now`.
    pub async fn list_active(now: DTimestamp, db: &Database) -> Result<Vec<Broadcast>, sqlx::Error> {
        sqlx::query_as::<_, Broadcast>(concat!(
            "SELECT ",
            broadcast_columns!(),
            r#"
            FROM broadcasts
            WHERE is_active = 1 AND (expires_at IS NULL OR expires_at > ?1)
            ORDER BY created_at DESC, rowid DESC
            "#
        ))
        .bind(now)
        .fetch_all(&**db)
        .await
    }

    /// Flip `is_active` in a single statement.
    pub async fn toggle_active(id: Uuid, db: &Database) -> Result<Option<Broadcast>, sqlx::Error> {
        sqlx::query_as::<_, Broadcast>(concat!(
            "UPDATE broadcasts SET is_active = CASE is_active WHEN 0 THEN 1 ELSE 0 END \
             WHERE id = ?1 RETURNING ",
            broadcast_columns!()
        ))
        .bind(DUuid::from(id))
        .fetch_optional(&**db)
        .await
    }

    pub async fn delete(id: Uuid, db: &Database) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM broadcasts WHERE id = ?1")
            .bind(DUuid::from(id))
            .execute(&**db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;

    fn sample(title: &str, expires_at: Option<DTimestamp>) -> NewBroadcast {
        NewBroadcast {
            title: title.to_string(),
            message: "Library closes early on Friday".to_string(),
            kind: BroadcastKind::Warning,
            created_by: "admin-1".to_string(),
            expires_at,
            dismissible: true,
        }
    }

    #[tokio::test]
    async fn test_active_excludes_expired_and_inactive() {
        let db = Database::in_memory().await.unwrap();
        let now = DTimestamp::now();
        let past = DTimestamp::from(*now - Duration::hours(1));
        let future = DTimestamp::from(*now + Duration::hours(1));

        let forever = Broadcast::create(sample("Forever", None), &db).await.unwrap();
        Broadcast::create(sample("Expired", Some(past)), &db)
            .await
            .unwrap();
        let upcoming = Broadcast::create(sample("Until later", Some(future)), &db)
            .await
            .unwrap();
        let switched_off = Broadcast::create(sample("Off", None), &db).await.unwrap();
        Broadcast::toggle_active(*switched_off.id, &db)
            .await
            .unwrap()
            .unwrap();

        let mut active: Vec<_> = Broadcast::list_active(now, &db)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();
        active.sort_by_key(|id| id.to_string());
        let mut expected = vec![forever.id, upcoming.id];
        expected.sort_by_key(|id| id.to_string());
        assert_eq!(active, expected);

        assert_eq!(Broadcast::list(&db).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_toggle_round_trip_and_delete() {
        let db = Database::in_memory().await.unwrap();
        let broadcast = Broadcast::create(sample("Exam week", None), &db)
            .await
            .unwrap();
        assert!(broadcast.is_active);
        assert!(broadcast.dismissible);

        let off = Broadcast::toggle_active(*broadcast.id, &db)
            .await
            .unwrap()
            .unwrap();
        assert!(!off.is_active);
        let on = Broadcast::toggle_active(*broadcast.id, &db)
            .await
            .unwrap()
            .unwrap();
        assert!(on.is_active);

        assert!(Broadcast::delete(*broadcast.id, &db).await.unwrap());
        assert!(!Broadcast::delete(*broadcast.id, &db).await.unwrap());
        assert!(Broadcast::toggle_active(*broadcast.id, &db)
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_kind_serializes_as_type() {
        let json = serde_json::json!({
            "id": "7d444840-9dc0-11d1-b245-5ffdce74fad2",
            "title": "t",
            "message": "m",
            "type": "urgent",
            "createdBy": "admin-1",
            "createdAt": "2025-01-01T00:00:00Z",
            "expiresAt": null,
            "isActive": true,
            "dismissible": false
        });
        let broadcast: Broadcast = serde_json::from_value(json).unwrap();
        assert_eq!(broadcast.kind, BroadcastKind::Urgent);
        assert_eq!(serde_json::to_value(&broadcast).unwrap()["type"], "urgent");
    }
}
