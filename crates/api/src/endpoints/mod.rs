//! API endpoints.

mod answers;
mod poll;
mod questions;
mod votes;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/votes", votes::router())
        .nest("/poll", poll::router())
        .nest("/questions", questions::router())
        .nest("/answers", answers::router())
}
