//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use quorum_common::Config;
use quorum_core::{FeedService, PollService, TallyService, ThreadService};
use quorum_db::repositories::{
    AnswerRepository, PollRepository, PollVoteRepository, QuestionRepository, UserRepository,
    VoteRepository,
};
use sea_orm::DatabaseConnection;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_repo: UserRepository,
    pub tally_service: TallyService,
    pub poll_service: PollService,
    pub feed_service: FeedService,
    pub thread_service: ThreadService,
}

impl AppState {
    /// Wire repositories and services over one connection pool.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, config: &Config) -> Self {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let question_repo = QuestionRepository::new(Arc::clone(&db));
        let answer_repo = AnswerRepository::new(Arc::clone(&db));
        let vote_repo = VoteRepository::new(Arc::clone(&db));
        let poll_repo = PollRepository::new(Arc::clone(&db));
        let poll_vote_repo = PollVoteRepository::new(Arc::clone(&db));

        let tally_service =
            TallyService::new(vote_repo, question_repo.clone(), answer_repo.clone());
        let poll_service = PollService::new(poll_repo, poll_vote_repo, question_repo.clone());
        let feed_service = FeedService::new(question_repo.clone(), config.feed.clone());
        let thread_service = ThreadService::new(
            question_repo,
            answer_repo,
            tally_service.clone(),
            config.thread.clone(),
        );

        Self {
            user_repo,
            tally_service,
            poll_service,
            feed_service,
            thread_service,
        }
    }
}

/// Authentication middleware.
///
/// Resolves a `Bearer` token to its user and stores the user in the request
/// extensions. Requests without a valid token continue anonymously.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string);

    if let Some(token) = token {
        match state.user_repo.find_by_token(&token).await {
            Ok(Some(user)) => {
                req.extensions_mut().insert(user);
            }
            Ok(None) => tracing::debug!("Unknown bearer token"),
            Err(e) => tracing::warn!(error = %e, "Token lookup failed"),
        }
    }

    next.run(req).await
}
