use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};

use crate::database::models::Reviewer;
use crate::error::ShelfError;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::http_server::extract::read_upload_form;
use crate::library::ingest::{self, ReviewerUpload};
use crate::library::validation::UploadKind;
use crate::principal::Principal;
use crate::ServiceState;

pub async fn handler(
    State(state): State<ServiceState>,
    principal: Principal,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Reviewer>), ShelfError> {
    // Refuse before buffering a body we would discard
    principal.require_staff()?;

    let mut form = read_upload_form(multipart, UploadKind::Reviewer).await?;
    let upload = ReviewerUpload {
        title: form.take("title"),
        description: form.take("description"),
        subject: form.take("subject"),
        grade_level: form.take("gradeLevel"),
        tags: form.take("tags"),
        difficulty: form.take("difficulty"),
        author: form.take("author"),
        component: form.take("component"),
        file: form.file.take(),
    };

    let reviewer = ingest::upload_reviewer(&state, &principal, upload).await?;
    Ok((StatusCode::CREATED, Json(reviewer)))
}

/// A reviewer upload as sent by the CLI.
#[derive(Debug, Clone, Default)]
pub struct ReviewerUploadRequest {
    pub title: String,
    pub description: String,
    pub subject: String,
    pub grade_level: String,
    pub tags: Option<String>,
    pub difficulty: Option<String>,
    pub author: Option<String>,
    pub component: Option<String>,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ApiRequest for ReviewerUploadRequest {
    type Response = Reviewer;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let mut form = Form::new()
            .text("title", self.title)
            .text("description", self.description)
            .text("subject", self.subject)
            .text("gradeLevel", self.grade_level);
        for (name, value) in [
            ("tags", self.tags),
            ("difficulty", self.difficulty),
            ("author", self.author),
            ("component", self.component),
        ] {
            if let Some(value) = value {
                form = form.text(name, value);
            }
        }

        let mut part = Part::bytes(self.bytes).file_name(self.file_name);
        if let Some(value) = self
            .content_type
            .and_then(|ct| HeaderValue::from_str(&ct).ok())
        {
            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, value);
            part = part.headers(headers);
        }

        client
            .post(endpoint(base_url, "/api/v0/reviewers"))
            .multipart(form.part("file", part))
    }
}
