//! Request extractors shared by the v0 handlers.

use std::collections::HashMap;

use axum::async_trait;
use axum::extract::multipart::Field;
use axum::extract::{FromRequestParts, Multipart};
use http::request::Parts;
use http::HeaderMap;

use crate::error::ShelfError;
use crate::library::validation::{self, Upload, UploadKind};
use crate::principal::{Principal, Role};

pub const PRINCIPAL_ID_HEADER: &str = "x-principal-id";
pub const PRINCIPAL_NAME_HEADER: &str = "x-principal-name";
pub const PRINCIPAL_ROLE_HEADER: &str = "x-principal-role";

/// Multipart field that carries the uploaded file.
const FILE_FIELD: &str = "file";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Build the caller from the headers set by the authenticating proxy.
///
/// No id header means an anonymous caller. A missing role is a student.
pub fn principal_from_headers(headers: &HeaderMap) -> Result<Option<Principal>, ShelfError> {
    let Some(id) = header(headers, PRINCIPAL_ID_HEADER) else {
        return Ok(None);
    };

    let role = match header(headers, PRINCIPAL_ROLE_HEADER) {
        Some(raw) => raw.parse::<Role>()?,
        None => Role::Student,
    };
    let display_name = header(headers, PRINCIPAL_NAME_HEADER).unwrap_or(id);

    Ok(Some(Principal::new(id, display_name, role)))
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ShelfError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        principal_from_headers(&parts.headers)?.ok_or(ShelfError::Unauthorized)
    }
}

/// The caller when there is one. Public routes that still record who acted
/// use this instead of [`Principal`].
#[derive(Debug, Clone)]
pub struct MaybePrincipal(pub Option<Principal>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybePrincipal
where
    S: Send + Sync,
{
    type Rejection = ShelfError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybePrincipal(principal_from_headers(&parts.headers)?))
    }
}

/// Text fields and the single file part of an upload form.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    pub file: Option<Upload>,
}

impl UploadForm {
    pub fn take(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }
}

fn multipart_error(e: impl std::fmt::Display) -> ShelfError {
    ShelfError::validation(format!("malformed upload: {}", e))
}

async fn read_file(field: Field<'_>, kind: UploadKind) -> Result<Upload, ShelfError> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().map(str::to_string);

    // A declared type is checked before buffering anything
    if let Some(declared) = validation::declared_type(content_type.as_deref()) {
        kind.accept(declared)?;
    }

    let bytes = field.bytes().await.map_err(multipart_error)?;
    Ok(Upload::new(file_name, content_type, bytes))
}

/// Drain a multipart body into an [`UploadForm`].
pub async fn read_upload_form(
    mut multipart: Multipart,
    kind: UploadKind,
) -> Result<UploadForm, ShelfError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == FILE_FIELD {
            if form.file.is_some() {
                return Err(ShelfError::validation("only one file per upload"));
            }
            form.file = Some(read_file(field, kind).await?);
        } else if name.is_empty() {
            tracing::debug!("ignoring unnamed form field");
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}
