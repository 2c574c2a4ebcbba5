use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteExecutor};
use uuid::Uuid;

use super::{push_filter, push_text_match, CatalogFilter, TextColumn};
use crate::database::types::{Component, DTimestamp, DUuid, Difficulty};
use crate::database::Database;

/// Upper bound on any reviewer listing or search.
pub const MAX_REVIEWER_LIMIT: u32 = 200;

macro_rules! reviewer_columns {
    () => {
        "id, title, description, subject, grade_level, file_name, file_key, file_size, \
         uploaded_by, tags, difficulty, author, component, download_count, helpful_count, \
         last_downloaded_at, created_at, updated_at"
    };
}

const SEARCH_COLUMNS: &[TextColumn] = &[
    TextColumn::Plain("title"),
    TextColumn::Plain("description"),
    TextColumn::Plain("subject"),
    TextColumn::JsonArray("tags"),
];

/// A study guide available to students.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reviewer {
    pub id: DUuid,
    pub title: String,
    pub description: String,
    pub subject: String,
    pub grade_level: String,
    pub file_name: String,
    pub file_key: String,
    pub file_size: i64,
    pub uploaded_by: String,
    pub tags: Json<Vec<String>>,
    pub difficulty: Option<Difficulty>,
    pub author: Option<String>,
    pub component: Option<Component>,
    pub download_count: i64,
    pub helpful_count: i64,
    pub last_downloaded_at: Option<DTimestamp>,
    pub created_at: DTimestamp,
    pub updated_at: DTimestamp,
}

/// Fields supplied when cataloguing a reviewer. Ids and counters are assigned here.
#[derive(Debug, Clone, Default)]
pub struct NewReviewer {
    pub title: String,
    pub description: String,
    pub subject: String,
    pub grade_level: String,
    pub file_name: String,
    pub file_key: String,
    pub file_size: i64,
    pub uploaded_by: String,
    pub tags: Vec<String>,
    pub difficulty: Option<Difficulty>,
    pub author: Option<String>,
    pub component: Option<Component>,
    /// Defaults to now.
    pub created_at: Option<DTimestamp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Download,
    Helpful,
}

impl Reviewer {
    pub async fn create(params: NewReviewer, db: &Database) -> Result<Reviewer, sqlx::Error> {
        Self::insert(params, &**db).await
    }

    /// Insert on any executor, so approval can run it inside its transaction.
    pub async fn insert<'e, E>(params: NewReviewer, executor: E) -> Result<Reviewer, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let now = DTimestamp::now();
        let created_at = params.created_at.unwrap_or(now);

        sqlx::query_as::<_, Reviewer>(concat!(
            r#"
            INSERT INTO reviewers (
                id, title, description, subject, grade_level, file_name, file_key,
                file_size, uploaded_by, tags, difficulty, author, component,
                created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            RETURNING "#,
            reviewer_columns!()
        ))
        .bind(DUuid::new())
        .bind(params.title)
        .bind(params.description)
        .bind(params.subject)
        .bind(params.grade_level)
        .bind(params.file_name)
        .bind(params.file_key)
        .bind(params.file_size)
        .bind(params.uploaded_by)
        .bind(Json(params.tags))
        .bind(params.difficulty)
        .bind(params.author)
        .bind(params.component)
        .bind(created_at)
        .bind(created_at.max(now))
        .fetch_one(executor)
        .await
    }

    pub async fn get(id: Uuid, db: &Database) -> Result<Option<Reviewer>, sqlx::Error> {
        sqlx::query_as::<_, Reviewer>(concat!(
            "SELECT ",
            reviewer_columns!(),
            " FROM reviewers WHERE id = ?1"
        ))
        .bind(DUuid::from(id))
        .fetch_optional(&**db)
        .await
    }

    /// Newest first, narrowed by grade token and subject.
    pub async fn list(filter: &CatalogFilter, db: &Database) -> Result<Vec<Reviewer>, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new(concat!(
            "SELECT ",
            reviewer_columns!(),
            " FROM reviewers WHERE 1 = 1"
        ));
        push_filter(&mut qb, filter, SEARCH_COLUMNS, MAX_REVIEWER_LIMIT);

        qb.build_query_as::<Reviewer>().fetch_all(&**db).await
    }

    /// Case-insensitive substring match over title, description, subject and tags.
    ///
    /// A blank query matches nothing.
    pub async fn search(query: &str, db: &Database) -> Result<Vec<Reviewer>, sqlx::Error> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(concat!(
            "SELECT ",
            reviewer_columns!(),
            " FROM reviewers WHERE 1 = 1"
        ));
        push_text_match(&mut qb, query, SEARCH_COLUMNS);
        qb.push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
            .push_bind(i64::from(MAX_REVIEWER_LIMIT));

        qb.build_query_as::<Reviewer>().fetch_all(&**db).await
    }

    /// Atomically bump a counter, returning the updated row.
    pub async fn increment(
        id: Uuid,
        counter: Counter,
        db: &Database,
    ) -> Result<Option<Reviewer>, sqlx::Error> {
        let id = DUuid::from(id);
        let query = match counter {
            Counter::Download => sqlx::query_as::<_, Reviewer>(concat!(
                "UPDATE reviewers SET download_count = download_count + 1, last_downloaded_at = ?2 \
                 WHERE id = ?1 RETURNING ",
                reviewer_columns!()
            ))
            .bind(id)
            .bind(DTimestamp::now()),
            Counter::Helpful => sqlx::query_as::<_, Reviewer>(concat!(
                "UPDATE reviewers SET helpful_count = helpful_count + 1 WHERE id = ?1 RETURNING ",
                reviewer_columns!()
            ))
            .bind(id),
        };

        query.fetch_optional(&**db).await
    }

    /// Record a download against whichever reviewer serves `file_key`.
    ///
    /// Returns the number of rows touched; zero when the file belongs to
    /// something other than a reviewer.
    pub async fn record_download(file_key: &str, db: &Database) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE reviewers
            SET download_count = download_count + 1, last_downloaded_at = ?1
            WHERE file_key = ?2
            "#,
        )
        .bind(DTimestamp::now())
        .bind(file_key)
        .execute(&**db)
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete a reviewer, handing back the blob key it referenced.
    pub async fn delete(id: Uuid, db: &Database) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("DELETE FROM reviewers WHERE id = ?1 RETURNING file_key")
            .bind(DUuid::from(id))
            .fetch_optional(&**db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(title: &str, grade_level: &str) -> NewReviewer {
        NewReviewer {
            title: title.to_string(),
            description: "Worked examples".to_string(),
            subject: "Math".to_string(),
            grade_level: grade_level.to_string(),
            file_name: "guide.pdf".to_string(),
            file_key: Uuid::new_v4().to_string(),
            file_size: 12,
            uploaded_by: "admin-1".to_string(),
            tags: vec!["algebra".to_string(), "Linear Equations".to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = Database::in_memory().await.unwrap();
        let created = Reviewer::create(
            NewReviewer {
                difficulty: Some(Difficulty::Medium),
                component: Some(Component::Finals),
                ..sample("Algebra Basics", "7")
            },
            &db,
        )
        .await
        .unwrap();

        assert_eq!(created.download_count, 0);
        assert_eq!(created.helpful_count, 0);
        assert!(created.last_downloaded_at.is_none());

        let fetched = Reviewer::get(*created.id, &db).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Algebra Basics");
        assert_eq!(fetched.tags.0.len(), 2);
        assert_eq!(fetched.difficulty, Some(Difficulty::Medium));
        assert_eq!(fetched.component, Some(Component::Finals));
        assert_eq!(fetched.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let db = Database::in_memory().await.unwrap();
        let older = DTimestamp::from_micros(1_000_000).unwrap();
        let newer = DTimestamp::from_micros(2_000_000).unwrap();

        Reviewer::create(
            NewReviewer {
                created_at: Some(older),
                ..sample("Old", "7")
            },
            &db,
        )
        .await
        .unwrap();
        Reviewer::create(
            NewReviewer {
                created_at: Some(newer),
                ..sample("New", "7")
            },
            &db,
        )
        .await
        .unwrap();

        let titles: Vec<_> = Reviewer::list(&CatalogFilter::default(), &db)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["New", "Old"]);
    }

    #[tokio::test]
    async fn test_grade_token_membership() {
        let db = Database::in_memory().await.unwrap();
        Reviewer::create(sample("Spread", "7,8,9,10"), &db)
            .await
            .unwrap();
        Reviewer::create(sample("Eleven", "11"), &db).await.unwrap();

        let nine = Reviewer::list(&CatalogFilter::grade("9"), &db).await.unwrap();
        assert_eq!(nine.len(), 1);
        assert_eq!(nine[0].title, "Spread");

        // "1" is a prefix of "10" and "11" but not a token of either
        assert!(Reviewer::list(&CatalogFilter::grade("1"), &db)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_subject_filter_and_limit() {
        let db = Database::in_memory().await.unwrap();
        for i in 0..3 {
            Reviewer::create(sample(&format!("Math {}", i), "7"), &db)
                .await
                .unwrap();
        }
        Reviewer::create(
            NewReviewer {
                subject: "Science".to_string(),
                ..sample("Cells", "7")
            },
            &db,
        )
        .await
        .unwrap();

        let filter = CatalogFilter {
            subject: Some("Science".to_string()),
            ..Default::default()
        };
        assert_eq!(Reviewer::list(&filter, &db).await.unwrap().len(), 1);

        let filter = CatalogFilter {
            limit: Some(2),
            ..Default::default()
        };
        assert_eq!(Reviewer::list(&filter, &db).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_search() {
        let db = Database::in_memory().await.unwrap();
        Reviewer::create(sample("Algebra Basics", "7"), &db)
            .await
            .unwrap();
        Reviewer::create(
            NewReviewer {
                subject: "History".to_string(),
                description: "Dates".to_string(),
                tags: vec![],
                ..sample("World War II", "9")
            },
            &db,
        )
        .await
        .unwrap();

        assert_eq!(Reviewer::search("ALGEBRA", &db).await.unwrap().len(), 1);
        assert_eq!(Reviewer::search("linear eq", &db).await.unwrap().len(), 1);
        assert_eq!(Reviewer::search("history", &db).await.unwrap().len(), 1);
        assert!(Reviewer::search("", &db).await.unwrap().is_empty());
        assert!(Reviewer::search("   ", &db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_ignores_tag_json_punctuation() {
        let db = Database::in_memory().await.unwrap();
        for title in ["Algebra", "Biology", "Chemistry"] {
            Reviewer::create(sample(title, "7"), &db).await.unwrap();
        }

        for query in ["[]", "[", "]", "\"", "\",\""] {
            assert!(
                Reviewer::search(query, &db).await.unwrap().is_empty(),
                "query {:?} matched",
                query
            );
        }
        assert_eq!(Reviewer::search("equations", &db).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_search_folds_non_ascii_query() {
        let db = Database::in_memory().await.unwrap();
        Reviewer::create(sample("álgebra lineal", "7"), &db)
            .await
            .unwrap();

        assert_eq!(Reviewer::search("ÁLGEBRA", &db).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_increment_and_delete() {
        let db = Database::in_memory().await.unwrap();
        let reviewer = Reviewer::create(sample("Counted", "8"), &db).await.unwrap();

        let bumped = Reviewer::increment(*reviewer.id, Counter::Helpful, &db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bumped.helpful_count, 1);
        assert!(bumped.last_downloaded_at.is_none());

        let bumped = Reviewer::increment(*reviewer.id, Counter::Download, &db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bumped.download_count, 1);
        assert!(bumped.last_downloaded_at.is_some());

        assert_eq!(
            Reviewer::record_download(&reviewer.file_key, &db)
                .await
                .unwrap(),
            1
        );

        let key = Reviewer::delete(*reviewer.id, &db).await.unwrap();
        assert_eq!(key.as_deref(), Some(reviewer.file_key.as_str()));
        assert!(Reviewer::delete(*reviewer.id, &db).await.unwrap().is_none());
        assert!(Reviewer::increment(*reviewer.id, Counter::Helpful, &db)
            .await
            .unwrap()
            .is_none());
    }
}
