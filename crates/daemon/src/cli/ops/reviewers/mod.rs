use clap::{Args, Subcommand};

pub mod fetch;
pub mod ls;
pub mod search;
pub mod upload;

use crate::cli::op::Op;

crate::command_enum! {
    (Ls, ls::Ls),
    (Search, search::Search),
    (Upload, upload::Upload),
    (Fetch, fetch::Fetch),
}

pub type ReviewersCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Reviewers {
    #[command(subcommand)]
    pub command: ReviewersCommand,
}

#[async_trait::async_trait]
impl Op for Reviewers {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

/// One line per reviewer, newest first.
pub(crate) fn render(reviewers: &[studyshelf::database::models::Reviewer]) -> String {
    if reviewers.is_empty() {
        return "No reviewers found".to_string();
    }

    reviewers
        .iter()
        .map(|r| {
            format!(
                "{}  {} [{} / grade {}] {} downloads, {} helpful (file {})",
                r.id, r.title, r.subject, r.grade_level, r.download_count, r.helpful_count, r.file_key
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
