//! Serving files back out, and every delete that has to keep the catalog
//! and the blob store agreeing.
//!
//! The catalog is authoritative. A record is removed first; its blob is then
//! deleted on a best-effort basis, and only when no other record still points
//! at it (an approved request and its reviewer share one file).

use std::collections::HashSet;

use blob_store::{BlobId, BlobRecord};
use bytes::Bytes;
use serde::Serialize;
use time::OffsetDateTime;
use tokio::task::JoinHandle;

use super::validation;
use crate::database::models::{Pointer, Reviewer, ReviewerRequest, Transition};
use crate::database::types::RequestStatus;
use crate::error::ShelfError;
use crate::principal::Principal;
use crate::ServiceState;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";
const FALLBACK_FILE_NAME: &str = "file";

/// How the client should present a fetched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Disposition {
    #[default]
    Inline,
    /// Save to disk. Counts as a download.
    Attachment,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        }
    }
}

/// A file read back in full, with everything needed to serve it.
#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub bytes: Bytes,
    pub content_type: String,
    /// Header-safe version of the stored name.
    pub file_name: String,
    pub disposition: Disposition,
}

impl FetchedFile {
    /// Taken from the bytes actually read, never from stored metadata.
    pub fn content_length(&self) -> usize {
        self.bytes.len()
    }

    pub fn content_disposition(&self) -> String {
        format!(
            "{}; filename=\"{}\"",
            self.disposition.as_str(),
            self.file_name
        )
    }
}

/// Make a stored filename safe for a quoted header parameter.
///
/// Anything outside printable ASCII, plus `"` and `\`, becomes `_`.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    if sanitized.trim().is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        sanitized
    }
}

/// Read a file by blob id.
///
/// Attachment fetches also count a download, without waiting for it.
pub async fn fetch(
    state: &ServiceState,
    blob_id: &str,
    disposition: Disposition,
) -> Result<FetchedFile, ShelfError> {
    let id: BlobId = blob_id.parse()?;
    let blob = state.blobs().get(&id).await?;
    let record = blob.record.clone();
    let bytes = blob.into_bytes().await?;

    let content_type = Some(record.metadata.content_type.trim())
        .filter(|ct| !ct.is_empty())
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string();

    if disposition == Disposition::Attachment {
        record_download(state, id.to_string());
    }

    Ok(FetchedFile {
        bytes,
        content_type,
        file_name: sanitize_filename(&record.filename),
        disposition,
    })
}

/// Count a download against whichever reviewer serves `file_key`.
///
/// Runs detached; failures are logged and dropped so they can never fail
/// the read that triggered them.
pub fn record_download(state: &ServiceState, file_key: String) -> JoinHandle<()> {
    let database = state.database().clone();
    tokio::spawn(async move {
        match Reviewer::record_download(&file_key, &database).await {
            Ok(0) => tracing::debug!(%file_key, "downloaded file has no reviewer"),
            Ok(_) => {}
            Err(e) => tracing::debug!(%file_key, error = %e, "failed to record download"),
        }
    })
}

/// Delete the blob behind `file_key` unless something still references it.
/// Never fails: the catalog change that led here already happened.
async fn release_blob(state: &ServiceState, file_key: &str) {
    match state.database().file_key_references(file_key).await {
        Ok(0) => {}
        Ok(refs) => {
            tracing::debug!(%file_key, refs, "blob still referenced, keeping it");
            return;
        }
        Err(e) => {
            tracing::warn!(%file_key, error = %e, "could not count blob references, keeping it");
            return;
        }
    }

    let id: BlobId = match file_key.parse() {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(%file_key, error = %e, "catalog held a malformed file key");
            return;
        }
    };

    match state.blobs().delete(&id).await {
        Ok(()) => tracing::debug!(%file_key, "blob deleted"),
        Err(e) if e.is_not_found() => tracing::debug!(%file_key, "blob already gone"),
        Err(e) => tracing::warn!(%file_key, error = %e, "failed to delete blob"),
    }
}

pub async fn delete_reviewer(
    state: &ServiceState,
    principal: &Principal,
    id: &str,
) -> Result<(), ShelfError> {
    principal.require_staff()?;
    let id = validation::record_id("reviewer", id)?;

    let file_key = Reviewer::delete(id, state.database())
        .await?
        .ok_or_else(|| ShelfError::not_found("reviewer"))?;
    tracing::info!(reviewer_id = %id, by = %principal.id, "reviewer deleted");

    release_blob(state, &file_key).await;
    Ok(())
}

pub async fn delete_pointer(
    state: &ServiceState,
    principal: &Principal,
    id: &str,
) -> Result<(), ShelfError> {
    principal.require_staff()?;
    let id = validation::record_id("pointer", id)?;

    let file_key = Pointer::delete(id, state.database())
        .await?
        .ok_or_else(|| ShelfError::not_found("pointer"))?;
    tracing::info!(pointer_id = %id, by = %principal.id, "pointer deleted");

    release_blob(state, &file_key).await;
    Ok(())
}

fn already_processed(status: RequestStatus) -> ShelfError {
    ShelfError::Conflict(format!("request already processed ({})", status))
}

/// Approve a pending request, publishing it as a reviewer.
pub async fn approve_request(
    state: &ServiceState,
    principal: &Principal,
    id: &str,
) -> Result<Reviewer, ShelfError> {
    principal.require_staff()?;
    let id = validation::record_id("request", id)?;

    match ReviewerRequest::approve(id, state.database()).await? {
        Transition::Done((_, reviewer)) => {
            tracing::info!(request_id = %id, reviewer_id = %reviewer.id, by = %principal.id, "request approved");
            Ok(reviewer)
        }
        Transition::NotFound => Err(ShelfError::not_found("request")),
        Transition::AlreadyProcessed(status) => Err(already_processed(status)),
    }
}

/// Reject a pending request: its record and its file are both removed.
pub async fn reject_request(
    state: &ServiceState,
    principal: &Principal,
    id: &str,
) -> Result<(), ShelfError> {
    principal.require_staff()?;
    let id = validation::record_id("request", id)?;

    match ReviewerRequest::reject(id, state.database()).await? {
        Transition::Done(file_key) => {
            tracing::info!(request_id = %id, by = %principal.id, "request rejected");
            release_blob(state, &file_key).await;
            Ok(())
        }
        Transition::NotFound => Err(ShelfError::not_found("request")),
        Transition::AlreadyProcessed(status) => Err(already_processed(status)),
    }
}

/// Blobs younger than this are never reported or purged. An upload stores
/// its blob before writing the catalog row, so a fresh unreferenced blob is
/// usually one whose record is still on the way.
pub const ORPHAN_GRACE_SECS: i64 = 60 * 60;

/// Blobs that no catalog record points at.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanReport {
    pub orphans: Vec<BlobRecord>,
    pub purged: usize,
}

fn past_grace(record: &BlobRecord, now: i64) -> bool {
    now - record.metadata.uploaded_at.timestamp() >= ORPHAN_GRACE_SECS
}

/// List unreferenced blobs older than [`ORPHAN_GRACE_SECS`], optionally
/// deleting them.
pub async fn orphaned_blobs(
    state: &ServiceState,
    principal: &Principal,
    purge: bool,
) -> Result<OrphanReport, ShelfError> {
    principal.require_staff()?;

    let now = OffsetDateTime::now_utc().unix_timestamp();
    let referenced: HashSet<String> = state.database().referenced_file_keys().await?;
    let orphans: Vec<BlobRecord> = state
        .blobs()
        .list()
        .await?
        .into_iter()
        .filter(|record| past_grace(record, now))
        .filter(|record| !referenced.contains(&record.id.to_string()))
        .collect();

    let mut purged = 0;
    if purge {
        for record in &orphans {
            // Re-checked per blob: a late catalog write may have landed since the scan
            if state
                .database()
                .file_key_references(&record.id.to_string())
                .await?
                > 0
            {
                continue;
            }
            match state.blobs().delete(&record.id).await {
                Ok(()) => purged += 1,
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }
        tracing::info!(purged, by = %principal.id, "purged orphaned blobs");
    }

    Ok(OrphanReport { orphans, purged })
}

#[cfg(test)]
mod tests {
    use blob_store::BlobMetadata;

    use super::*;
    use crate::database::models::NewReviewer;
    use crate::principal::Role;

    fn admin() -> Principal {
        Principal::new("admin-1", "Ana", Role::Admin)
    }

    async fn put_pdf(state: &ServiceState, name: &str) -> BlobId {
        state
            .blobs()
            .put(
                Bytes::from_static(b"%PDF-1.7 demo"),
                name,
                BlobMetadata::new("application/pdf", Some("admin-1".to_string())),
            )
            .await
            .unwrap()
    }

    /// A blob whose upload finished well outside the orphan grace window.
    async fn put_stale_pdf(state: &ServiceState, name: &str) -> BlobId {
        let mut metadata = BlobMetadata::new("application/pdf", Some("admin-1".to_string()));
        metadata.uploaded_at -= chrono::Duration::seconds(ORPHAN_GRACE_SECS + 60);
        state
            .blobs()
            .put(Bytes::from_static(b"%PDF-1.7 demo"), name, metadata)
            .await
            .unwrap()
    }

    async fn catalogue(state: &ServiceState, blob_id: &BlobId) -> Reviewer {
        Reviewer::create(
            NewReviewer {
                title: "Algebra".to_string(),
                subject: "Math".to_string(),
                grade_level: "7".to_string(),
                file_name: "algebra.pdf".to_string(),
                file_key: blob_id.to_string(),
                file_size: 13,
                uploaded_by: "admin-1".to_string(),
                ..Default::default()
            },
            state.database(),
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Algebra 101.pdf"), "Algebra 101.pdf");
        assert_eq!(sanitize_filename("Ñandú.pdf"), "_and_.pdf");
        assert_eq!(sanitize_filename("a\"b\\c\r\n.pdf"), "a_b_c__.pdf");
        assert_eq!(sanitize_filename(""), "file");
    }

    #[tokio::test]
    async fn test_fetch_inline_does_not_count() {
        let state = ServiceState::ephemeral().await.unwrap();
        let blob_id = put_pdf(&state, "algebra.pdf").await;
        let reviewer = catalogue(&state, &blob_id).await;

        let file = fetch(&state, &blob_id.to_string(), Disposition::Inline)
            .await
            .unwrap();
        assert_eq!(file.content_length(), 13);
        assert_eq!(file.content_type, "application/pdf");
        assert_eq!(
            file.content_disposition(),
            "inline; filename=\"algebra.pdf\""
        );

        // Give any stray task a chance to run
        tokio::task::yield_now().await;
        let stored = Reviewer::get(*reviewer.id, state.database())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.download_count, 0);
    }

    #[tokio::test]
    async fn test_record_download_on_attachment() {
        let state = ServiceState::ephemeral().await.unwrap();
        let blob_id = put_pdf(&state, "algebra.pdf").await;
        let reviewer = catalogue(&state, &blob_id).await;

        record_download(&state, blob_id.to_string()).await.unwrap();

        let stored = Reviewer::get(*reviewer.id, state.database())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.download_count, 1);
        assert!(stored.last_downloaded_at.is_some());
    }

    #[tokio::test]
    async fn test_fetch_errors() {
        let state = ServiceState::ephemeral().await.unwrap();

        let err = fetch(&state, "../etc/passwd", Disposition::Inline)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_reference");

        let err = fetch(
            &state,
            &uuid::Uuid::new_v4().to_string(),
            Disposition::Attachment,
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn test_shared_blob_survives_until_last_reference() {
        let state = ServiceState::ephemeral().await.unwrap();
        let blob_id = put_pdf(&state, "shared.pdf").await;
        let first = catalogue(&state, &blob_id).await;
        let second = catalogue(&state, &blob_id).await;

        delete_reviewer(&state, &admin(), &first.id.to_string())
            .await
            .unwrap();
        assert!(state.blobs().get(&blob_id).await.is_ok());

        delete_reviewer(&state, &admin(), &second.id.to_string())
            .await
            .unwrap();
        assert!(state.blobs().get(&blob_id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_survives_missing_blob() {
        let state = ServiceState::ephemeral().await.unwrap();
        let blob_id = put_pdf(&state, "gone.pdf").await;
        let reviewer = catalogue(&state, &blob_id).await;
        state.blobs().delete(&blob_id).await.unwrap();

        delete_reviewer(&state, &admin(), &reviewer.id.to_string())
            .await
            .unwrap();
        let err = delete_reviewer(&state, &admin(), &reviewer.id.to_string())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn test_orphan_report_and_purge() {
        let state = ServiceState::ephemeral().await.unwrap();
        let kept = put_stale_pdf(&state, "kept.pdf").await;
        catalogue(&state, &kept).await;
        let orphan = put_stale_pdf(&state, "orphan.pdf").await;

        let report = orphaned_blobs(&state, &admin(), false).await.unwrap();
        assert_eq!(report.orphans.len(), 1);
        assert_eq!(report.orphans[0].id, orphan);
        assert_eq!(report.purged, 0);

        let report = orphaned_blobs(&state, &admin(), true).await.unwrap();
        assert_eq!(report.purged, 1);
        assert!(state.blobs().get(&orphan).await.is_err());
        assert!(state.blobs().get(&kept).await.is_ok());

        let student = Principal::new("s", "Sam", Role::Student);
        assert_eq!(
            orphaned_blobs(&state, &student, false)
                .await
                .unwrap_err()
                .kind(),
            "forbidden"
        );
    }

    #[tokio::test]
    async fn test_purge_spares_blob_awaiting_its_record() {
        let state = ServiceState::ephemeral().await.unwrap();

        // Blob written, catalog insert not yet done
        let fresh = put_pdf(&state, "fresh.pdf").await;

        let report = orphaned_blobs(&state, &admin(), true).await.unwrap();
        assert!(report.orphans.is_empty());
        assert_eq!(report.purged, 0);

        let reviewer = catalogue(&state, &fresh).await;
        let fetched = fetch(&state, &reviewer.file_key, Disposition::Inline)
            .await
            .unwrap();
        assert_eq!(fetched.bytes, Bytes::from_static(b"%PDF-1.7 demo"));
    }
}
