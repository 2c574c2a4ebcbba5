use std::path::{Path, PathBuf};

use clap::Args;
use reqwest::header::CONTENT_DISPOSITION;
use uuid::Uuid;

use studyshelf::http_server::api::client::{endpoint, ApiError};

#[derive(Args, Debug, Clone)]
pub struct Fetch {
    /// File key (blob id) of the document
    pub file_key: Uuid,

    /// Where to write the file (defaults to the served file name)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Fetch as an attachment, which counts as a download
    #[arg(long)]
    pub download: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("failed to write {0}: {1}")]
    Write(PathBuf, std::io::Error),
}

/// The quoted filename parameter of a Content-Disposition value.
fn disposition_filename(value: &str) -> Option<&str> {
    let start = value.find("filename=\"")? + "filename=\"".len();
    let rest = &value[start..];
    let end = rest.find('"')?;
    Some(&rest[..end]).filter(|name| !name.is_empty())
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Fetch {
    type Error = FetchError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut url = endpoint(
            ctx.client.base_url(),
            &format!("/api/v0/files/{}", self.file_key),
        );
        if self.download {
            url.set_query(Some("download=1"));
        }

        let response = ctx
            .client
            .http_client()
            .get(url)
            .send()
            .await
            .map_err(ApiError::from)?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.map_err(ApiError::from)?;
            return Err(ApiError::from_status(status, text).into());
        }

        let served_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_filename)
            .and_then(|name| Path::new(name).file_name())
            .map(PathBuf::from);
        let output = self
            .output
            .clone()
            .or(served_name)
            .unwrap_or_else(|| PathBuf::from(self.file_key.to_string()));

        let bytes = response.bytes().await.map_err(ApiError::from)?;
        tokio::fs::write(&output, &bytes)
            .await
            .map_err(|e| FetchError::Write(output.clone(), e))?;

        Ok(format!("Wrote {} bytes to {}", bytes.len(), output.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_filename() {
        assert_eq!(
            disposition_filename("attachment; filename=\"algebra.pdf\""),
            Some("algebra.pdf")
        );
        assert_eq!(disposition_filename("inline; filename=\"\""), None);
        assert_eq!(disposition_filename("inline"), None);
    }
}
