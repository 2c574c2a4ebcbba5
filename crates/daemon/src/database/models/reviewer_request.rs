use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{NewReviewer, Reviewer};
use crate::database::types::{Component, DTimestamp, DUuid, RequestStatus};
use crate::database::Database;

macro_rules! request_columns {
    () => {
        "id, title, description, subject, grade_level, author, component, student_name, \
         student_section, file_name, file_key, file_size, uploaded_by, status, reviewer_id, \
         created_at"
    };
}

/// A student's submission, waiting for staff to approve or reject it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerRequest {
    pub id: DUuid,
    pub title: String,
    pub description: String,
    pub subject: String,
    pub grade_level: String,
    pub author: String,
    pub component: Component,
    pub student_name: String,
    pub student_section: String,
    pub file_name: String,
    pub file_key: String,
    pub file_size: i64,
    pub uploaded_by: String,
    pub status: RequestStatus,
    pub reviewer_id: Option<DUuid>,
    pub created_at: DTimestamp,
}

#[derive(Debug, Clone)]
pub struct NewReviewerRequest {
    pub title: String,
    pub description: String,
    pub subject: String,
    pub grade_level: String,
    pub author: String,
    pub component: Component,
    pub student_name: String,
    pub student_section: String,
    pub file_name: String,
    pub file_key: String,
    pub file_size: i64,
    pub uploaded_by: String,
}

/// Outcome of a guarded status change.
#[derive(Debug, Clone)]
pub enum Transition<T> {
    Done(T),
    NotFound,
    /// The request had already left `pending`.
    AlreadyProcessed(RequestStatus),
}

impl From<&ReviewerRequest> for NewReviewer {
    fn from(request: &ReviewerRequest) -> Self {
        let author = Some(request.author.trim())
            .filter(|a| !a.is_empty())
            .map(str::to_string);

        NewReviewer {
            title: request.title.clone(),
            description: request.description.clone(),
            subject: request.subject.clone(),
            grade_level: request.grade_level.clone(),
            file_name: request.file_name.clone(),
            file_key: request.file_key.clone(),
            file_size: request.file_size,
            uploaded_by: request.uploaded_by.clone(),
            author,
            component: Some(request.component),
            ..Default::default()
        }
    }
}

impl ReviewerRequest {
    pub async fn create(
        params: NewReviewerRequest,
        db: &Database,
    ) -> Result<ReviewerRequest, sqlx::Error> {
        sqlx::query_as::<_, ReviewerRequest>(concat!(
            r#"
            INSERT INTO reviewer_requests (
                id, title, description, subject, grade_level, author, component,
                student_name, student_section, file_name, file_key, file_size,
                uploaded_by, status, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            RETURNING "#,
            request_columns!()
        ))
        .bind(DUuid::new())
        .bind(params.title)
        .bind(params.description)
        .bind(params.subject)
        .bind(params.grade_level)
        .bind(params.author)
        .bind(params.component)
        .bind(params.student_name)
        .bind(params.student_section)
        .bind(params.file_name)
        .bind(params.file_key)
        .bind(params.file_size)
        .bind(params.uploaded_by)
        .bind(RequestStatus::Pending)
        .bind(DTimestamp::now())
        .fetch_one(&**db)
        .await
    }

    pub async fn get(id: Uuid, db: &Database) -> Result<Option<ReviewerRequest>, sqlx::Error> {
        sqlx::query_as::<_, ReviewerRequest>(concat!(
            "SELECT ",
            request_columns!(),
            " FROM reviewer_requests WHERE id = ?1"
        ))
        .bind(DUuid::from(id))
        .fetch_optional(&**db)
        .await
    }

    pub async fn list(
        status: RequestStatus,
        db: &Database,
    ) -> Result<Vec<ReviewerRequest>, sqlx::Error> {
        sqlx::query_as::<_, ReviewerRequest>(concat!(
            "SELECT ",
            request_columns!(),
            " FROM reviewer_requests WHERE status = ?1 ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(status)
        .fetch_all(&**db)
        .await
    }

    /// Promote a pending request into a reviewer.
    ///
    /// The status claim, the reviewer insert and the back-reference commit
    /// together; of two racing approve/reject calls exactly one wins.
    pub async fn approve(
        id: Uuid,
        db: &Database,
    ) -> Result<Transition<(ReviewerRequest, Reviewer)>, sqlx::Error> {
        let mut tx = db.begin().await?;

        let claimed = sqlx::query_as::<_, ReviewerRequest>(concat!(
            "UPDATE reviewer_requests SET status = ?2 WHERE id = ?1 AND status = ?3 RETURNING ",
            request_columns!()
        ))
        .bind(DUuid::from(id))
        .bind(RequestStatus::Approved)
        .bind(RequestStatus::Pending)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut request) = claimed else {
            tx.rollback().await?;
            return Self::not_pending(id, db).await;
        };

        let reviewer = Reviewer::insert(NewReviewer::from(&request), &mut *tx).await?;

        sqlx::query("UPDATE reviewer_requests SET reviewer_id = ?1 WHERE id = ?2")
            .bind(reviewer.id)
            .bind(request.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        request.reviewer_id = Some(reviewer.id);
        Ok(Transition::Done((request, reviewer)))
    }

    /// Delete a pending request, returning its file key.
    pub async fn reject(id: Uuid, db: &Database) -> Result<Transition<String>, sqlx::Error> {
        let file_key = sqlx::query_scalar::<_, String>(
            "DELETE FROM reviewer_requests WHERE id = ?1 AND status = ?2 RETURNING file_key",
        )
        .bind(DUuid::from(id))
        .bind(RequestStatus::Pending)
        .fetch_optional(&**db)
        .await?;

        match file_key {
            Some(file_key) => Ok(Transition::Done(file_key)),
            None => Self::not_pending(id, db).await,
        }
    }

    async fn not_pending<T>(id: Uuid, db: &Database) -> Result<Transition<T>, sqlx::Error> {
        Ok(match Self::get(id, db).await? {
            Some(existing) => Transition::AlreadyProcessed(existing.status),
            None => Transition::NotFound,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewReviewerRequest {
        NewReviewerRequest {
            title: "Cell Division".to_string(),
            description: "Mitosis vs meiosis".to_string(),
            subject: "Science".to_string(),
            grade_level: "9".to_string(),
            author: "J. Cruz".to_string(),
            component: Component::Midterms,
            student_name: "Jamie Cruz".to_string(),
            student_section: "9-Rizal".to_string(),
            file_name: "cells.pdf".to_string(),
            file_key: Uuid::new_v4().to_string(),
            file_size: 4096,
            uploaded_by: "student-7".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_is_pending() {
        let db = Database::in_memory().await.unwrap();
        let request = ReviewerRequest::create(sample(), &db).await.unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert!(request.reviewer_id.is_none());

        let pending = ReviewerRequest::list(RequestStatus::Pending, &db)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn test_approve_copies_fields_and_links_reviewer() {
        let db = Database::in_memory().await.unwrap();
        let request = ReviewerRequest::create(sample(), &db).await.unwrap();

        let Transition::Done((approved, reviewer)) =
            ReviewerRequest::approve(*request.id, &db).await.unwrap()
        else {
            panic!("approve should succeed");
        };

        assert_eq!(approved.status, RequestStatus::Approved);
        assert_eq!(approved.reviewer_id, Some(reviewer.id));
        assert_eq!(reviewer.title, request.title);
        assert_eq!(reviewer.file_key, request.file_key);
        assert_eq!(reviewer.author.as_deref(), Some("J. Cruz"));
        assert_eq!(reviewer.component, Some(Component::Midterms));

        let stored = ReviewerRequest::get(*request.id, &db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.reviewer_id, Some(reviewer.id));
    }

    #[tokio::test]
    async fn test_second_transition_is_rejected() {
        let db = Database::in_memory().await.unwrap();
        let request = ReviewerRequest::create(sample(), &db).await.unwrap();

        assert!(matches!(
            ReviewerRequest::approve(*request.id, &db).await.unwrap(),
            Transition::Done(_)
        ));
        assert!(matches!(
            ReviewerRequest::reject(*request.id, &db).await.unwrap(),
            Transition::AlreadyProcessed(RequestStatus::Approved)
        ));
        assert!(matches!(
            ReviewerRequest::approve(*request.id, &db).await.unwrap(),
            Transition::AlreadyProcessed(RequestStatus::Approved)
        ));

        let reviewers = Reviewer::list(&Default::default(), &db).await.unwrap();
        assert_eq!(reviewers.len(), 1);
    }

    #[tokio::test]
    async fn test_reject_deletes_row() {
        let db = Database::in_memory().await.unwrap();
        let request = ReviewerRequest::create(sample(), &db).await.unwrap();

        match ReviewerRequest::reject(*request.id, &db).await.unwrap() {
            Transition::Done(key) => assert_eq!(key, request.file_key),
            other => panic!("unexpected {:?}", other),
        }
        assert!(ReviewerRequest::get(*request.id, &db)
            .await
            .unwrap()
            .is_none());
        assert!(matches!(
            ReviewerRequest::reject(*request.id, &db).await.unwrap(),
            Transition::NotFound
        ));
        assert!(matches!(
            ReviewerRequest::approve(*request.id, &db).await.unwrap(),
            Transition::NotFound
        ));
    }
}
