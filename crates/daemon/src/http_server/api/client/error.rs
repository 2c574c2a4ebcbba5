use reqwest::StatusCode;

use crate::error::ErrorBody;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("HTTP status {0}: {1}")]
    HttpStatus(StatusCode, String),
    #[error("{status} ({}): {}", .body.kind, .body.message)]
    Service { status: StatusCode, body: ErrorBody },
}

impl ApiError {
    /// Turn a non-success response body into the most specific error we can.
    pub fn from_status(status: StatusCode, text: String) -> Self {
        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => ApiError::Service { status, body },
            Err(_) => ApiError::HttpStatus(status, text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_error_body() {
        let err = ApiError::from_status(
            StatusCode::CONFLICT,
            r#"{"kind":"conflict","message":"request already processed (approved)"}"#.to_string(),
        );
        match err {
            ApiError::Service { status, body } => {
                assert_eq!(status, StatusCode::CONFLICT);
                assert_eq!(body.kind, "conflict");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "upstream down".to_string());
        assert!(matches!(err, ApiError::HttpStatus(StatusCode::BAD_GATEWAY, _)));
    }
}
