pub mod delete;
pub mod feedback;
pub mod get;
pub mod list;
pub mod upload;

pub use delete::DeleteReviewerRequest;
pub use feedback::HelpfulRequest;
pub use get::GetReviewerRequest;
pub use list::{ListReviewersRequest, ReviewerList};
pub use upload::ReviewerUploadRequest;
