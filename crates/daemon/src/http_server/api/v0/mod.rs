use axum::routing::{get, patch, post};
use axum::Router;

pub mod admin;
pub mod broadcasts;
pub mod files;
pub mod pointers;
pub mod requests;
pub mod reviewers;
pub mod search;

pub use reviewers::{ListReviewersRequest, ReviewerUploadRequest};
pub use search::SearchRequest;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route(
            "/reviewers",
            get(reviewers::list::handler).post(reviewers::upload::handler),
        )
        .route(
            "/reviewers/:id",
            get(reviewers::get::handler).delete(reviewers::delete::handler),
        )
        .route("/reviewers/:id/helpful", post(reviewers::feedback::helpful))
        .route("/reviewers/:id/report", post(reviewers::feedback::report))
        .route("/reviewers/:id/reports", get(reviewers::feedback::reports))
        .route("/search", get(search::handler))
        .route("/pointers", get(pointers::list).post(pointers::upload))
        .route("/pointers/:id", axum::routing::delete(pointers::delete))
        .route("/requests", get(requests::list).post(requests::submit))
        .route("/requests/:id/approve", post(requests::approve))
        .route("/requests/:id/reject", post(requests::reject))
        .route("/broadcasts", get(broadcasts::active))
        .route(
            "/admin/broadcasts",
            get(broadcasts::all).post(broadcasts::create),
        )
        .route(
            "/admin/broadcasts/:id",
            patch(broadcasts::toggle).delete(broadcasts::delete),
        )
        .route("/admin/orphans", get(admin::orphans))
        .route("/files/:id", get(files::handler))
        .with_state(state)
}
