//! Upload paths: authorise, validate, store the bytes, then catalogue them.
//!
//! Every check runs before the first durable write. Once the blob is stored,
//! a catalog failure leaves it orphaned; that is logged and reported, never
//! retried, since a retry could catalogue the same bytes twice.

use blob_store::{BlobId, BlobMetadata};

use super::validation::{self, Upload, UploadKind};
use crate::database::models::{
    NewPointer, NewReviewer, NewReviewerRequest, Pointer, Reviewer, ReviewerRequest,
};
use crate::database::types::{Component, Difficulty};
use crate::error::ShelfError;
use crate::principal::Principal;
use crate::ServiceState;

/// Raw form input for a staff reviewer upload.
#[derive(Debug, Clone, Default)]
pub struct ReviewerUpload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub grade_level: Option<String>,
    /// Comma-separated.
    pub tags: Option<String>,
    pub difficulty: Option<String>,
    pub author: Option<String>,
    pub component: Option<String>,
    pub file: Option<Upload>,
}

#[derive(Debug, Clone, Default)]
pub struct PointerUpload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub teacher: Option<String>,
    pub grade_level: Option<String>,
    pub file: Option<Upload>,
}

#[derive(Debug, Clone, Default)]
pub struct RequestSubmission {
    pub title: Option<String>,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub grade_level: Option<String>,
    pub author: Option<String>,
    pub component: Option<String>,
    pub student_name: Option<String>,
    pub student_section: Option<String>,
    pub file: Option<Upload>,
}

/// A file that passed every check and is ready to store.
struct CheckedFile {
    upload: Upload,
    content_type: String,
}

fn check_file(kind: UploadKind, file: Option<Upload>) -> Result<CheckedFile, ShelfError> {
    let upload = file.ok_or_else(|| ShelfError::validation("file is required"))?;
    let content_type = upload.resolve_content_type(kind)?;
    if upload.bytes.is_empty() {
        return Err(ShelfError::validation("file is empty"));
    }
    if upload.file_name.trim().is_empty() {
        return Err(ShelfError::validation("file name is required"));
    }

    Ok(CheckedFile {
        upload,
        content_type,
    })
}

async fn store_blob(
    state: &ServiceState,
    principal: &Principal,
    file: &CheckedFile,
) -> Result<BlobId, ShelfError> {
    let metadata = BlobMetadata::new(file.content_type.clone(), Some(principal.id.clone()));
    let id = state
        .blobs()
        .put(file.upload.bytes.clone(), &file.upload.file_name, metadata)
        .await
        .map_err(|e| ShelfError::StorageFault(format!("blob write: {}", e)))?;

    tracing::debug!(blob_id = %id, size = file.upload.bytes.len(), "stored upload");
    Ok(id)
}

fn orphaned(blob_id: &BlobId, err: sqlx::Error) -> ShelfError {
    tracing::warn!(%blob_id, error = %err, "catalog write failed, blob left orphaned");
    ShelfError::StorageFault(format!("catalog write: {}", err))
}

/// Staff upload of a reviewer.
pub async fn upload_reviewer(
    state: &ServiceState,
    principal: &Principal,
    form: ReviewerUpload,
) -> Result<Reviewer, ShelfError> {
    principal.require_staff()?;

    let title = validation::required("title", form.title.as_deref())?;
    let description = validation::required("description", form.description.as_deref())?;
    let subject = validation::required("subject", form.subject.as_deref())?;
    let grade_level = validation::grade_level(form.grade_level.as_deref())?;
    let difficulty = validation::choice::<Difficulty>(form.difficulty.as_deref())?;
    let component = validation::choice::<Component>(form.component.as_deref())?;
    let file = check_file(UploadKind::Reviewer, form.file)?;

    let blob_id = store_blob(state, principal, &file).await?;

    let reviewer = Reviewer::create(
        NewReviewer {
            title,
            description,
            subject,
            grade_level,
            file_name: file.upload.file_name,
            file_key: blob_id.to_string(),
            file_size: file.upload.bytes.len() as i64,
            uploaded_by: principal.id.clone(),
            tags: validation::tags(form.tags.as_deref()),
            difficulty,
            author: validation::optional(form.author.as_deref()),
            component,
            created_at: None,
        },
        state.database(),
    )
    .await
    .map_err(|e| orphaned(&blob_id, e))?;

    tracing::info!(reviewer_id = %reviewer.id, %blob_id, by = %principal.id, "reviewer uploaded");
    Ok(reviewer)
}

/// Staff upload of a pointer image.
pub async fn upload_pointer(
    state: &ServiceState,
    principal: &Principal,
    form: PointerUpload,
) -> Result<Pointer, ShelfError> {
    principal.require_staff()?;

    let title = validation::required("title", form.title.as_deref())?;
    let subject = validation::required("subject", form.subject.as_deref())?;
    let grade_level = validation::grade_level(form.grade_level.as_deref())?;
    let file = check_file(UploadKind::Pointer, form.file)?;

    let blob_id = store_blob(state, principal, &file).await?;

    let pointer = Pointer::create(
        NewPointer {
            title,
            description: validation::optional(form.description.as_deref()).unwrap_or_default(),
            subject,
            teacher: validation::optional(form.teacher.as_deref()).unwrap_or_default(),
            grade_level,
            file_name: file.upload.file_name,
            file_key: blob_id.to_string(),
            file_size: file.upload.bytes.len() as i64,
            uploaded_by: principal.id.clone(),
            created_at: None,
        },
        state.database(),
    )
    .await
    .map_err(|e| orphaned(&blob_id, e))?;

    tracing::info!(pointer_id = %pointer.id, %blob_id, by = %principal.id, "pointer uploaded");
    Ok(pointer)
}

/// Any signed-in user may submit a reviewer for staff review.
pub async fn submit_request(
    state: &ServiceState,
    principal: &Principal,
    form: RequestSubmission,
) -> Result<ReviewerRequest, ShelfError> {
    let title = validation::required("title", form.title.as_deref())?;
    let subject = validation::required("subject", form.subject.as_deref())?;
    let grade_level = validation::grade_level(form.grade_level.as_deref())?;
    let component = validation::choice::<Component>(form.component.as_deref())?
        .ok_or_else(|| ShelfError::validation("component is required"))?;
    let file = check_file(UploadKind::ReviewerRequest, form.file)?;

    let blob_id = store_blob(state, principal, &file).await?;

    let student_name = validation::optional(form.student_name.as_deref())
        .unwrap_or_else(|| principal.display_name.clone());

    let request = ReviewerRequest::create(
        NewReviewerRequest {
            title,
            description: validation::optional(form.description.as_deref()).unwrap_or_default(),
            subject,
            grade_level,
            author: validation::optional(form.author.as_deref()).unwrap_or_default(),
            component,
            student_name,
            student_section: validation::optional(form.student_section.as_deref())
                .unwrap_or_default(),
            file_name: file.upload.file_name,
            file_key: blob_id.to_string(),
            file_size: file.upload.bytes.len() as i64,
            uploaded_by: principal.id.clone(),
        },
        state.database(),
    )
    .await
    .map_err(|e| orphaned(&blob_id, e))?;

    tracing::info!(request_id = %request.id, %blob_id, by = %principal.id, "reviewer request submitted");
    Ok(request)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::principal::Role;

    fn admin() -> Principal {
        Principal::new("admin-1", "Ana Admin", Role::Admin)
    }

    fn pdf(bytes: &'static [u8]) -> Option<Upload> {
        Some(Upload::new(
            "algebra.pdf",
            Some("application/pdf".to_string()),
            Bytes::from_static(bytes),
        ))
    }

    fn reviewer_form() -> ReviewerUpload {
        ReviewerUpload {
            title: Some("Algebra Basics".to_string()),
            description: Some("Linear equations".to_string()),
            subject: Some("Math".to_string()),
            grade_level: Some("7".to_string()),
            tags: Some("algebra, equations".to_string()),
            file: pdf(b"%PDF-1.7 test"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upload_reviewer_stores_blob_and_record() {
        let state = ServiceState::ephemeral().await.unwrap();
        let reviewer = upload_reviewer(&state, &admin(), reviewer_form())
            .await
            .unwrap();

        assert_eq!(reviewer.uploaded_by, "admin-1");
        assert_eq!(reviewer.tags.0, vec!["algebra", "equations"]);
        assert_eq!(reviewer.file_size, 13);

        let blob_id = reviewer.file_key.parse().unwrap();
        let blob = state.blobs().get(&blob_id).await.unwrap();
        assert_eq!(blob.record.metadata.content_type, "application/pdf");
        assert_eq!(blob.record.metadata.uploaded_by.as_deref(), Some("admin-1"));
    }

    #[tokio::test]
    async fn test_student_cannot_upload_reviewer() {
        let state = ServiceState::ephemeral().await.unwrap();
        let student = Principal::new("s-1", "Sam", Role::Student);

        let err = upload_reviewer(&state, &student, reviewer_form())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "forbidden");
        assert!(state.blobs().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validation_happens_before_any_write() {
        let state = ServiceState::ephemeral().await.unwrap();

        let missing_title = ReviewerUpload {
            title: Some("  ".to_string()),
            ..reviewer_form()
        };
        let err = upload_reviewer(&state, &admin(), missing_title)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");

        let wrong_type = ReviewerUpload {
            file: Some(Upload::new(
                "photo.png",
                Some("image/png".to_string()),
                Bytes::from_static(b"\x89PNG"),
            )),
            ..reviewer_form()
        };
        let err = upload_reviewer(&state, &admin(), wrong_type)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "unsupported_media_type");

        let empty = ReviewerUpload {
            file: pdf(b""),
            ..reviewer_form()
        };
        let err = upload_reviewer(&state, &admin(), empty).await.unwrap_err();
        assert_eq!(err.kind(), "validation_error");

        assert!(state.blobs().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_catalog_failure_reports_storage_fault() {
        let state = ServiceState::ephemeral().await.unwrap();
        state.database().close().await;

        let err = upload_reviewer(&state, &admin(), reviewer_form())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "storage_fault");

        // The blob was written before the catalog failed
        assert_eq!(state.blobs().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_pointer_requires_image() {
        let state = ServiceState::ephemeral().await.unwrap();
        let form = PointerUpload {
            title: Some("Week 3".to_string()),
            subject: Some("Science".to_string()),
            grade_level: Some("8".to_string()),
            file: pdf(b"%PDF"),
            ..Default::default()
        };
        let err = upload_pointer(&state, &admin(), form).await.unwrap_err();
        assert_eq!(err.kind(), "unsupported_media_type");

        let form = PointerUpload {
            title: Some("Week 3".to_string()),
            subject: Some("Science".to_string()),
            grade_level: Some("8".to_string()),
            file: Some(Upload::new("week3.jpg", None, Bytes::from_static(b"\xff\xd8"))),
            ..Default::default()
        };
        let pointer = upload_pointer(&state, &admin(), form).await.unwrap();
        assert_eq!(pointer.file_name, "week3.jpg");
    }

    #[tokio::test]
    async fn test_submit_request_requires_component() {
        let state = ServiceState::ephemeral().await.unwrap();
        let student = Principal::new("s-1", "Sam Santos", Role::Student);

        let form = RequestSubmission {
            title: Some("Cells".to_string()),
            subject: Some("Science".to_string()),
            grade_level: Some("9".to_string()),
            file: pdf(b"%PDF-1.4"),
            ..Default::default()
        };
        let err = submit_request(&state, &student, form.clone())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");

        let request = submit_request(
            &state,
            &student,
            RequestSubmission {
                component: Some("Finals".to_string()),
                ..form
            },
        )
        .await
        .unwrap();
        assert_eq!(request.component, Component::Finals);
        assert_eq!(request.student_name, "Sam Santos");
        assert_eq!(request.uploaded_by, "s-1");
    }
}
