use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite};
use uuid::Uuid;

use super::{push_filter, CatalogFilter, TextColumn};
use crate::database::types::{DTimestamp, DUuid};
use crate::database::Database;

pub const MAX_POINTER_LIMIT: u32 = 60;

macro_rules! pointer_columns {
    () => {
        "id, title, description, subject, teacher, grade_level, file_name, file_key, \
         file_size, uploaded_by, created_at, updated_at"
    };
}

const SEARCH_COLUMNS: &[TextColumn] = &[
    TextColumn::Plain("title"),
    TextColumn::Plain("description"),
    TextColumn::Plain("subject"),
    TextColumn::Plain("teacher"),
];

/// An image handout listing what a test will cover.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Pointer {
    pub id: DUuid,
    pub title: String,
    pub description: String,
    pub subject: String,
    pub teacher: String,
    pub grade_level: String,
    pub file_name: String,
    pub file_key: String,
    pub file_size: i64,
    pub uploaded_by: String,
    pub created_at: DTimestamp,
    pub updated_at: DTimestamp,
}

#[derive(Debug, Clone, Default)]
pub struct NewPointer {
    pub title: String,
    pub description: String,
    pub subject: String,
    pub teacher: String,
    pub grade_level: String,
    pub file_name: String,
    pub file_key: String,
    pub file_size: i64,
    pub uploaded_by: String,
    pub created_at: Option<DTimestamp>,
}

impl Pointer {
    pub async fn create(params: NewPointer, db: &Database) -> Result<Pointer, sqlx::Error> {
        let now = DTimestamp::now();
        let created_at = params.created_at.unwrap_or(now);

        sqlx::query_as::<_, Pointer>(concat!(
            r#"
            INSERT INTO pointers (
                id, title, description, subject, teacher, grade_level, file_name,
                file_key, file_size, uploaded_by, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            RETURNING "#,
            pointer_columns!()
        ))
        .bind(DUuid::new())
        .bind(params.title)
        .bind(params.description)
        .bind(params.subject)
        .bind(params.teacher)
        .bind(params.grade_level)
        .bind(params.file_name)
        .bind(params.file_key)
        .bind(params.file_size)
        .bind(params.uploaded_by)
        .bind(created_at)
        .bind(created_at.max(now))
        .fetch_one(&**db)
        .await
    }

    pub async fn get(id: Uuid, db: &Database) -> Result<Option<Pointer>, sqlx::Error> {
        sqlx::query_as::<_, Pointer>(concat!(
            "SELECT ",
            pointer_columns!(),
            " FROM pointers WHERE id = ?1"
        ))
        .bind(DUuid::from(id))
        .fetch_optional(&**db)
        .await
    }

    /// Newest first; `q` matches title, description, subject and teacher.
    pub async fn list(filter: &CatalogFilter, db: &Database) -> Result<Vec<Pointer>, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new(concat!(
            "SELECT ",
            pointer_columns!(),
            " FROM pointers WHERE 1 = 1"
        ));
        push_filter(&mut qb, filter, SEARCH_COLUMNS, MAX_POINTER_LIMIT);

        qb.build_query_as::<Pointer>().fetch_all(&**db).await
    }

    pub async fn delete(id: Uuid, db: &Database) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("DELETE FROM pointers WHERE id = ?1 RETURNING file_key")
            .bind(DUuid::from(id))
            .fetch_optional(&**db)
            .await
    }
}
