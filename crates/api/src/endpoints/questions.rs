//! Question feed endpoints.

use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use quorum_common::AppResult;
use quorum_core::{FeedQuery, QuestionWithAggregates, SortMode};
use serde::{Deserialize, Serialize};

use crate::{middleware::AppState, response::ApiResponse};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_questions))
        .route("/show", get(show_question))
}

/// Feed item.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionItemResponse {
    pub question: QuestionResponse,
    pub user: AskerResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<TopicResponse>,
    pub answers_count: i64,
    pub votes_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_answer_at: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub id: String,
    pub title: String,
    pub body: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AskerResponse {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicResponse {
    pub id: String,
    pub name: String,
}

impl From<QuestionWithAggregates> for QuestionItemResponse {
    fn from(item: QuestionWithAggregates) -> Self {
        Self {
            question: QuestionResponse {
                id: item.question.id,
                title: item.question.title,
                body: item.question.body,
                user_id: item.question.user_id,
                topic_id: item.question.topic_id,
                created_at: item.question.created_at.to_rfc3339(),
                updated_at: item.question.updated_at.to_rfc3339(),
            },
            user: AskerResponse {
                id: item.user.id,
                username: item.user.username,
                name: item.user.name,
            },
            topic: item.topic.map(|t| TopicResponse {
                id: t.id,
                name: t.name,
            }),
            answers_count: item.answers_count,
            votes_count: item.votes_count,
            last_answer_at: item.last_answer_at.map(|at| at.to_rfc3339()),
        }
    }
}

/// Feed page response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub items: Vec<QuestionItemResponse>,
    pub has_more: bool,
}

/// List questions query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuestionsQuery {
    pub sort: Option<String>,
    #[serde(default)]
    pub skip: u64,
    pub limit: Option<u64>,
    pub topic_id: Option<String>,
}

/// Ranked question feed.
async fn list_questions(
    State(state): State<AppState>,
    Query(query): Query<ListQuestionsQuery>,
) -> AppResult<ApiResponse<FeedResponse>> {
    let sort = match query.sort.as_deref() {
        Some(sort) => sort.parse::<SortMode>()?,
        None => SortMode::default(),
    };

    let page = state
        .feed_service
        .list_questions(FeedQuery {
            sort,
            skip: query.skip,
            limit: query.limit,
            topic_id: query.topic_id,
        })
        .await?;

    Ok(ApiResponse::ok(FeedResponse {
        items: page.items.into_iter().map(Into::into).collect(),
        has_more: page.has_more,
    }))
}

/// Show question query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowQuestionQuery {
    pub question_id: String,
}

/// A single question with its aggregates.
async fn show_question(
    State(state): State<AppState>,
    Query(query): Query<ShowQuestionQuery>,
) -> AppResult<ApiResponse<QuestionItemResponse>> {
    let item = state.feed_service.get_question(&query.question_id).await?;
    Ok(ApiResponse::ok(item.into()))
}
