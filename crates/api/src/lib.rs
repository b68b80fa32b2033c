//! HTTP API layer for quorum.
//!
//! JSON endpoints for votes, polls, the question feed and answer threads,
//! built on Axum 0.8. Mount [`router`] under `/api` with
//! [`middleware::auth_middleware`] layered on top.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::AppState;
