//! Answer thread endpoints.

use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use quorum_common::AppResult;
use quorum_core::{AnswerNode, ThreadOrder};
use serde::{Deserialize, Serialize};

use crate::{middleware::AppState, response::ApiResponse};

pub fn router() -> Router<AppState> {
    Router::new().route("/thread", get(thread))
}

/// A node of the answer tree.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerNodeResponse {
    pub id: String,
    pub body: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_answer_id: Option<String>,
    pub created_at: String,
    pub votes_count: i64,
    pub replies_count: usize,
    pub children: Vec<AnswerNodeResponse>,
}

impl From<AnswerNode> for AnswerNodeResponse {
    fn from(node: AnswerNode) -> Self {
        Self {
            id: node.answer.id,
            body: node.answer.body,
            user_id: node.answer.user_id,
            parent_answer_id: node.answer.parent_answer_id,
            created_at: node.answer.created_at.to_rfc3339(),
            votes_count: node.votes_count,
            replies_count: node.replies_count,
            children: node.children.into_iter().map(Into::into).collect(),
        }
    }
}

/// Thread query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadQuery {
    pub question_id: String,
    pub max_depth: Option<usize>,
    pub order: Option<String>,
}

/// Answer tree of a question.
async fn thread(
    State(state): State<AppState>,
    Query(query): Query<ThreadQuery>,
) -> AppResult<ApiResponse<Vec<AnswerNodeResponse>>> {
    let order = match query.order.as_deref() {
        Some(order) => order.parse::<ThreadOrder>()?,
        None => ThreadOrder::default(),
    };

    let tree = state
        .thread_service
        .assemble_thread(&query.question_id, query.max_depth, order)
        .await?;

    Ok(ApiResponse::ok(tree.into_iter().map(Into::into).collect()))
}
