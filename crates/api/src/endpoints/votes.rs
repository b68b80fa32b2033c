//! Vote endpoints.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use quorum_common::AppResult;
use quorum_db::entities::vote::{TargetKind, VoteDirection, VoteTarget};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, VoteOutcome},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/up", post(upvote))
        .route("/down", post(downvote))
        .route("/tally", get(tally))
        .route("/mine", get(mine))
}

/// Target of a vote request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetRequest {
    pub target_id: String,
    pub target_kind: TargetKind,
}

impl TargetRequest {
    fn target(&self) -> VoteTarget {
        VoteTarget::new(self.target_kind, self.target_id.clone())
    }
}

/// Tally response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyResponse {
    pub target_id: String,
    pub target_kind: TargetKind,
    pub tally: i64,
}

/// The caller's own vote on a target.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyVoteResponse {
    pub voted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<i32>,
}

async fn cast(
    state: &AppState,
    voter_id: &str,
    req: &TargetRequest,
    direction: VoteDirection,
) -> AppResult<ApiResponse<VoteOutcome>> {
    match state
        .tally_service
        .cast_vote(voter_id, req.target(), direction)
        .await
    {
        Ok(_) => Ok(ApiResponse::ok(VoteOutcome::accepted())),
        Err(e) if e.is_already_voted() => Ok(ApiResponse::ok(VoteOutcome::rejected(e.error_code()))),
        Err(e) => Err(e),
    }
}

/// Up-vote a question or an answer.
async fn upvote(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TargetRequest>,
) -> AppResult<ApiResponse<VoteOutcome>> {
    cast(&state, &user.id, &req, VoteDirection::Up).await
}

/// Down-vote a question or an answer.
async fn downvote(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TargetRequest>,
) -> AppResult<ApiResponse<VoteOutcome>> {
    cast(&state, &user.id, &req, VoteDirection::Down).await
}

/// Current tally of a target.
async fn tally(
    State(state): State<AppState>,
    Query(req): Query<TargetRequest>,
) -> AppResult<ApiResponse<TallyResponse>> {
    let tally = state.tally_service.get_tally(&req.target()).await?;

    Ok(ApiResponse::ok(TallyResponse {
        target_id: req.target_id,
        target_kind: req.target_kind,
        tally,
    }))
}

/// Whether the caller already voted on a target.
async fn mine(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(req): Query<TargetRequest>,
) -> AppResult<ApiResponse<MyVoteResponse>> {
    let vote = state.tally_service.find_vote(&user.id, &req.target()).await?;

    Ok(ApiResponse::ok(MyVoteResponse {
        voted: vote.is_some(),
        value: vote.map(|v| v.value),
    }))
}
