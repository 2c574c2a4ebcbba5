//! Input checks shared by every ingestion path.

use bytes::Bytes;
use uuid::Uuid;

use crate::error::ShelfError;

/// Tags beyond this many are dropped.
pub const MAX_TAGS: usize = 12;

const DOCUMENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

const IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg"];

/// What an upload is destined to become; decides its media type allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Reviewer,
    Pointer,
    ReviewerRequest,
}

impl UploadKind {
    pub fn allowed_types(&self) -> &'static [&'static str] {
        match self {
            UploadKind::Reviewer | UploadKind::ReviewerRequest => DOCUMENT_TYPES,
            UploadKind::Pointer => IMAGE_TYPES,
        }
    }

    /// Normalise `content_type` and check it against the allow-list.
    pub fn accept(&self, content_type: &str) -> Result<String, ShelfError> {
        let normalized = normalize_content_type(content_type);
        if self.allowed_types().contains(&normalized.as_str()) {
            Ok(normalized)
        } else {
            Err(ShelfError::UnsupportedMediaType(format!(
                "{} (allowed: {})",
                if normalized.is_empty() {
                    "unknown"
                } else {
                    normalized.as_str()
                },
                self.allowed_types().join(", ")
            )))
        }
    }
}

/// A file as received from the caller, fully buffered.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    /// The type the client declared, if any.
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, bytes: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        }
    }

    /// The declared type when it says anything useful, otherwise a guess
    /// from the file extension, checked against `kind`'s allow-list.
    pub fn resolve_content_type(&self, kind: UploadKind) -> Result<String, ShelfError> {
        match declared_type(self.content_type.as_deref()) {
            Some(declared) => kind.accept(declared),
            None => kind.accept(&guess_content_type(&self.file_name)),
        }
    }
}

/// A client-declared type, ignoring blanks and the generic octet-stream.
pub fn declared_type(content_type: Option<&str>) -> Option<&str> {
    content_type
        .map(str::trim)
        .filter(|ct| !ct.is_empty() && !ct.eq_ignore_ascii_case("application/octet-stream"))
}

/// Lowercase and strip parameters: `Application/PDF; name=x` -> `application/pdf`.
pub fn normalize_content_type(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

pub fn guess_content_type(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Trimmed, non-empty value of a required field.
pub fn required(field: &str, value: Option<&str>) -> Result<String, ShelfError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ShelfError::validation(format!("{} is required", field)))
}

/// Trimmed value, or `None` when blank.
pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Normalise a grade set: `" 7, 8 ,9"` -> `"7,8,9"`.
pub fn grade_level(value: Option<&str>) -> Result<String, ShelfError> {
    let raw = required("gradeLevel", value)?;
    let tokens: Vec<&str> = raw.split(',').map(str::trim).collect();
    if tokens.iter().any(|t| t.is_empty()) {
        return Err(ShelfError::validation(format!(
            "gradeLevel has an empty grade: {:?}",
            raw
        )));
    }
    Ok(tokens.join(","))
}

/// Split a comma-separated tag list, trimming and dropping blanks.
pub fn tags(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .take(MAX_TAGS)
        .map(str::to_string)
        .collect()
}

/// Parse a closed-vocabulary field, mapping failures to a validation error.
pub fn choice<T>(value: Option<&str>) -> Result<Option<T>, ShelfError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match optional(value) {
        Some(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|e| ShelfError::validation(e.to_string())),
        None => Ok(None),
    }
}

/// Parse a catalog record id.
pub fn record_id(kind: &str, raw: &str) -> Result<Uuid, ShelfError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ShelfError::validation(format!("invalid {} id", kind)))
}

#[cfg(test)]
mod tests {
    use crate::database::types::Component;

    use super::*;

    #[test]
    fn test_allow_lists() {
        assert_eq!(
            UploadKind::Reviewer.accept("Application/PDF; charset=binary").unwrap(),
            "application/pdf"
        );
        assert!(UploadKind::ReviewerRequest
            .accept("application/msword")
            .is_ok());
        assert!(UploadKind::Pointer.accept("image/jpeg").is_ok());

        let err = UploadKind::Pointer.accept("application/pdf").unwrap_err();
        assert_eq!(err.kind(), "unsupported_media_type");
        let err = UploadKind::Reviewer.accept("image/png").unwrap_err();
        assert_eq!(err.kind(), "unsupported_media_type");
    }

    #[test]
    fn test_content_type_falls_back_to_extension() {
        let upload = Upload::new("notes.docx", None, Bytes::from_static(b"PK"));
        assert_eq!(
            upload.resolve_content_type(UploadKind::Reviewer).unwrap(),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );

        let upload = Upload::new(
            "week1.png",
            Some("application/octet-stream".to_string()),
            Bytes::from_static(b"\x89PNG"),
        );
        assert_eq!(
            upload.resolve_content_type(UploadKind::Pointer).unwrap(),
            "image/png"
        );

        // A declared type wins over the extension
        let upload = Upload::new(
            "sneaky.pdf",
            Some("text/html".to_string()),
            Bytes::from_static(b"<html>"),
        );
        assert!(upload.resolve_content_type(UploadKind::Reviewer).is_err());
    }

    #[test]
    fn test_required_fields() {
        assert_eq!(required("title", Some("  Algebra ")).unwrap(), "Algebra");
        assert_eq!(
            required("title", Some("   ")).unwrap_err().kind(),
            "validation_error"
        );
        assert!(required("title", None).is_err());
    }

    #[test]
    fn test_grade_level_normalisation() {
        assert_eq!(grade_level(Some(" 7, 8 ,9")).unwrap(), "7,8,9");
        assert_eq!(grade_level(Some("10")).unwrap(), "10");
        assert!(grade_level(Some("7,,8")).is_err());
        assert!(grade_level(Some("")).is_err());
    }

    #[test]
    fn test_tags_are_trimmed_and_capped() {
        assert_eq!(tags(Some(" algebra, , fractions ,")), vec!["algebra", "fractions"]);
        assert!(tags(None).is_empty());

        let many = (0..20).map(|i| format!("t{}", i)).collect::<Vec<_>>().join(",");
        assert_eq!(tags(Some(&many)).len(), MAX_TAGS);
    }

    #[test]
    fn test_choice() {
        assert_eq!(choice::<Component>(Some("Quiz")).unwrap(), Some(Component::Quiz));
        assert_eq!(choice::<Component>(Some(" ")).unwrap(), None);
        assert!(choice::<Component>(Some("Exam")).is_err());
    }
}
