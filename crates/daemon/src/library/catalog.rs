//! Catalog reads and the small mutations that never touch blob bytes.

use time::OffsetDateTime;

use super::validation;
use crate::database::models::{
    Broadcast, CatalogFilter, Counter, NewBroadcast, NewReport, Pointer, Report, Reviewer,
    ReviewerRequest,
};
use crate::database::types::{BroadcastKind, DTimestamp, RequestStatus};
use crate::error::ShelfError;
use crate::principal::Principal;
use crate::ServiceState;

pub async fn list_reviewers(
    state: &ServiceState,
    filter: &CatalogFilter,
) -> Result<Vec<Reviewer>, ShelfError> {
    Ok(Reviewer::list(filter, state.database()).await?)
}

pub async fn search_reviewers(state: &ServiceState, query: &str) -> Result<Vec<Reviewer>, ShelfError> {
    Ok(Reviewer::search(query, state.database()).await?)
}

pub async fn get_reviewer(state: &ServiceState, id: &str) -> Result<Reviewer, ShelfError> {
    let id = validation::record_id("reviewer", id)?;
    Reviewer::get(id, state.database())
        .await?
        .ok_or_else(|| ShelfError::not_found("reviewer"))
}

/// Count one more "this helped me" vote.
pub async fn mark_helpful(state: &ServiceState, id: &str) -> Result<Reviewer, ShelfError> {
    let id = validation::record_id("reviewer", id)?;
    Reviewer::increment(id, Counter::Helpful, state.database())
        .await?
        .ok_or_else(|| ShelfError::not_found("reviewer"))
}

/// File a report against a reviewer. Anyone may report; the reporter is
/// recorded when known.
pub async fn report_reviewer(
    state: &ServiceState,
    principal: Option<&Principal>,
    id: &str,
    reason: Option<&str>,
    details: Option<&str>,
) -> Result<Report, ShelfError> {
    let reviewer_id = validation::record_id("reviewer", id)?;
    let reason = validation::required("reason", reason)?;

    let report = Report::create(
        NewReport {
            reviewer_id,
            reason,
            details: validation::optional(details).unwrap_or_default(),
            reported_by: principal.map(|p| p.id.clone()),
        },
        state.database(),
    )
    .await
    .map_err(|e| {
        let missing_reviewer = e
            .as_database_error()
            .is_some_and(|db_err| db_err.is_foreign_key_violation());
        if missing_reviewer {
            ShelfError::not_found("reviewer")
        } else {
            ShelfError::from(e)
        }
    })?;

    tracing::info!(report_id = %report.id, %reviewer_id, "reviewer reported");
    Ok(report)
}

pub async fn list_reports(
    state: &ServiceState,
    principal: &Principal,
    id: &str,
) -> Result<Vec<Report>, ShelfError> {
    principal.require_staff()?;
    let reviewer_id = validation::record_id("reviewer", id)?;
    Ok(Report::list_for_reviewer(reviewer_id, state.database()).await?)
}

pub async fn list_pointers(
    state: &ServiceState,
    filter: &CatalogFilter,
) -> Result<Vec<Pointer>, ShelfError> {
    Ok(Pointer::list(filter, state.database()).await?)
}

pub async fn list_requests(
    state: &ServiceState,
    principal: &Principal,
    status: Option<RequestStatus>,
) -> Result<Vec<ReviewerRequest>, ShelfError> {
    principal.require_staff()?;
    Ok(ReviewerRequest::list(status.unwrap_or_default(), state.database()).await?)
}

/// Raw input for a new broadcast.
#[derive(Debug, Clone, Default)]
pub struct BroadcastDraft {
    pub title: Option<String>,
    pub message: Option<String>,
    pub kind: Option<String>,
    pub expires_at: Option<OffsetDateTime>,
    pub dismissible: Option<bool>,
}

pub async fn create_broadcast(
    state: &ServiceState,
    principal: &Principal,
    draft: BroadcastDraft,
) -> Result<Broadcast, ShelfError> {
    principal.require_staff()?;

    let title = validation::required("title", draft.title.as_deref())?;
    let message = validation::required("message", draft.message.as_deref())?;
    let kind = validation::choice::<BroadcastKind>(draft.kind.as_deref())?.unwrap_or_default();

    let broadcast = Broadcast::create(
        NewBroadcast {
            title,
            message,
            kind,
            created_by: principal.id.clone(),
            expires_at: draft.expires_at.map(DTimestamp::from),
            dismissible: draft.dismissible.unwrap_or(true),
        },
        state.database(),
    )
    .await?;

    tracing::info!(broadcast_id = %broadcast.id, by = %principal.id, "broadcast created");
    Ok(broadcast)
}

/// Broadcasts visible right now.
pub async fn active_broadcasts(state: &ServiceState) -> Result<Vec<Broadcast>, ShelfError> {
    Ok(Broadcast::list_active(DTimestamp::now(), state.database()).await?)
}

pub async fn all_broadcasts(
    state: &ServiceState,
    principal: &Principal,
) -> Result<Vec<Broadcast>, ShelfError> {
    principal.require_staff()?;
    Ok(Broadcast::list(state.database()).await?)
}

pub async fn toggle_broadcast(
    state: &ServiceState,
    principal: &Principal,
    id: &str,
) -> Result<Broadcast, ShelfError> {
    principal.require_staff()?;
    let id = validation::record_id("broadcast", id)?;
    Broadcast::toggle_active(id, state.database())
        .await?
        .ok_or_else(|| ShelfError::not_found("broadcast"))
}

pub async fn delete_broadcast(
    state: &ServiceState,
    principal: &Principal,
    id: &str,
) -> Result<(), ShelfError> {
    principal.require_staff()?;
    let id = validation::record_id("broadcast", id)?;
    if Broadcast::delete(id, state.database()).await? {
        tracing::info!(broadcast_id = %id, by = %principal.id, "broadcast deleted");
        Ok(())
    } else {
        Err(ShelfError::not_found("broadcast"))
    }
}

#[cfg(test)]
mod tests {
    use crate::database::models::NewReviewer;
    use crate::principal::Role;

    use super::*;

    fn admin() -> Principal {
        Principal::new("admin-1", "Ana", Role::Admin)
    }

    async fn seeded() -> (ServiceState, Reviewer) {
        let state = ServiceState::ephemeral().await.unwrap();
        let reviewer = Reviewer::create(
            NewReviewer {
                title: "Fractions".to_string(),
                subject: "Math".to_string(),
                grade_level: "6".to_string(),
                file_name: "f.pdf".to_string(),
                file_key: uuid::Uuid::new_v4().to_string(),
                uploaded_by: "admin-1".to_string(),
                ..Default::default()
            },
            state.database(),
        )
        .await
        .unwrap();
        (state, reviewer)
    }

    #[tokio::test]
    async fn test_report_unknown_reviewer_is_not_found() {
        let (state, reviewer) = seeded().await;

        let report = report_reviewer(
            &state,
            None,
            &reviewer.id.to_string(),
            Some("Wrong answers on page 2"),
            None,
        )
        .await
        .unwrap();
        assert!(report.reported_by.is_none());

        let err = report_reviewer(
            &state,
            None,
            &uuid::Uuid::new_v4().to_string(),
            Some("spam"),
            None,
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "not_found");

        let err = report_reviewer(&state, None, "nope", Some("spam"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");

        let reports = list_reports(&state, &admin(), &reviewer.id.to_string())
            .await
            .unwrap();
        assert_eq!(reports.len(), 1);
    }

    #[tokio::test]
    async fn test_mark_helpful_missing() {
        let (state, reviewer) = seeded().await;
        let bumped = mark_helpful(&state, &reviewer.id.to_string()).await.unwrap();
        assert_eq!(bumped.helpful_count, 1);

        let err = mark_helpful(&state, &uuid::Uuid::new_v4().to_string())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn test_broadcast_lifecycle() {
        let state = ServiceState::ephemeral().await.unwrap();
        let student = Principal::new("s-1", "Sam", Role::Student);

        let draft = BroadcastDraft {
            title: Some("Exam week".to_string()),
            message: Some("Good luck!".to_string()),
            kind: Some("urgent".to_string()),
            ..Default::default()
        };
        let err = create_broadcast(&state, &student, draft.clone())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "forbidden");

        let broadcast = create_broadcast(&state, &admin(), draft).await.unwrap();
        assert_eq!(broadcast.kind, BroadcastKind::Urgent);
        assert!(broadcast.dismissible);
        assert_eq!(active_broadcasts(&state).await.unwrap().len(), 1);

        let id = broadcast.id.to_string();
        toggle_broadcast(&state, &admin(), &id).await.unwrap();
        assert!(active_broadcasts(&state).await.unwrap().is_empty());
        assert_eq!(all_broadcasts(&state, &admin()).await.unwrap().len(), 1);

        delete_broadcast(&state, &admin(), &id).await.unwrap();
        let err = delete_broadcast(&state, &admin(), &id).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn test_bad_broadcast_kind() {
        let state = ServiceState::ephemeral().await.unwrap();
        let draft = BroadcastDraft {
            title: Some("Hi".to_string()),
            message: Some("There".to_string()),
            kind: Some("critical".to_string()),
            ..Default::default()
        };
        let err = create_broadcast(&state, &admin(), draft).await.unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }
}
