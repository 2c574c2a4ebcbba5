use std::path::PathBuf;

use clap::Args;

use studyshelf::http_server::api::client::ApiError;
use studyshelf::http_server::api::v0::ReviewerUploadRequest;

#[derive(Args, Debug, Clone)]
pub struct Upload {
    /// Document to upload (pdf, doc or docx)
    pub path: PathBuf,

    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub description: String,

    #[arg(long)]
    pub subject: String,

    /// Grade or comma-separated grades, e.g. "7,8,9"
    #[arg(long)]
    pub grade: String,

    /// Comma-separated tags
    #[arg(long)]
    pub tags: Option<String>,

    /// easy, medium or hard
    #[arg(long)]
    pub difficulty: Option<String>,

    #[arg(long)]
    pub author: Option<String>,

    /// Quiz, Midterms, Finals or Others
    #[arg(long)]
    pub component: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("{0} has no file name")]
    NoFileName(PathBuf),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Upload {
    type Error = UploadError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| UploadError::NoFileName(self.path.clone()))?;
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| UploadError::Read(self.path.clone(), e))?;
        let content_type = mime_guess::from_path(&self.path)
            .first()
            .map(|m| m.essence_str().to_string());

        let request = ReviewerUploadRequest {
            title: self.title.clone(),
            description: self.description.clone(),
            subject: self.subject.clone(),
            grade_level: self.grade.clone(),
            tags: self.tags.clone(),
            difficulty: self.difficulty.clone(),
            author: self.author.clone(),
            component: self.component.clone(),
            file_name,
            content_type,
            bytes,
        };

        let mut client = ctx.client.clone();
        let reviewer = client.call(request).await?;
        Ok(format!(
            "Uploaded reviewer {} ({} bytes, file {})",
            reviewer.id, reviewer.file_size, reviewer.file_key
        ))
    }
}
