//! Poll endpoints.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use quorum_common::AppResult;
use quorum_core::{CreatePollInput, PollWithOptions};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{ApiResponse, VoteOutcome},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(show_poll))
        .route("/create", post(create_poll))
        .route("/vote", post(vote))
}

/// Poll response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub id: String,
    pub question_id: String,
    pub options: Vec<PollOptionResponse>,
    pub total_votes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voted_option_id: Option<String>,
}

/// Poll option response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOptionResponse {
    pub id: String,
    pub text: String,
    pub votes_count: i32,
    pub percentage: u32,
}

impl PollResponse {
    fn new(poll: PollWithOptions, voted_option_id: Option<String>) -> Self {
        let total_votes = poll.total_votes();
        let percentages = poll.percentages();
        let options = poll
            .options
            .into_iter()
            .zip(percentages)
            .map(|(option, percentage)| PollOptionResponse {
                id: option.id,
                text: option.text,
                votes_count: option.votes_count,
                percentage,
            })
            .collect();

        Self {
            id: poll.poll.id,
            question_id: poll.poll.question_id,
            options,
            total_votes,
            voted_option_id,
        }
    }
}

/// Show poll request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowPollRequest {
    pub question_id: String,
}

/// Get the poll of a question.
async fn show_poll(
    MaybeAuthUser(maybe_user): MaybeAuthUser,
    State(state): State<AppState>,
    Query(req): Query<ShowPollRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    let voter_id = maybe_user.map(|u| u.id);
    let status = state
        .poll_service
        .get_poll_with_status(&req.question_id, voter_id.as_deref())
        .await?;

    Ok(ApiResponse::ok(PollResponse::new(
        status.poll,
        status.voted_option_id,
    )))
}

/// Create poll request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    #[validate(length(min = 1, max = 32))]
    pub question_id: String,
    pub options: Vec<String>,
}

/// Attach a poll to a question.
async fn create_poll(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreatePollRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    req.validate()?;

    tracing::debug!(user_id = %user.id, question_id = %req.question_id, "Creating poll");

    let poll = state
        .poll_service
        .create_poll(&req.question_id, CreatePollInput { options: req.options })
        .await?;

    Ok(ApiResponse::ok(PollResponse::new(poll, None)))
}

/// Vote request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub option_id: String,
}

/// Vote for a poll option.
async fn vote(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<VoteRequest>,
) -> AppResult<ApiResponse<VoteOutcome>> {
    match state.poll_service.cast_poll_vote(&req.option_id, &user.id).await {
        Ok(_) => Ok(ApiResponse::ok(VoteOutcome::accepted())),
        Err(e) if e.is_already_voted() => Ok(ApiResponse::ok(VoteOutcome::rejected(e.error_code()))),
        Err(e) => Err(e),
    }
}
