//! Question feed service.
//!
//! Each page is one query: the ordering and any filter run in the database
//! against aggregates computed for that read.

use quorum_common::{AppError, AppResult, config::FeedConfig};
use quorum_db::{
    entities::question,
    repositories::{FeedFilter, QuestionFeedRow, QuestionRepository, SortMode},
};
use sea_orm::prelude::DateTimeWithTimeZone;

/// Parameters of a feed request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedQuery {
    pub sort: SortMode,
    pub skip: u64,
    /// Page size; the configured default when absent.
    pub limit: Option<u64>,
    pub topic_id: Option<String>,
}

/// Asker shown next to a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskerSummary {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
}

/// Topic shown next to a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSummary {
    pub id: String,
    pub name: String,
}

/// A question enriched with read-time aggregates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionWithAggregates {
    pub question: question::Model,
    pub user: AskerSummary,
    pub topic: Option<TopicSummary>,
    pub answers_count: i64,
    pub votes_count: i64,
    pub last_answer_at: Option<DateTimeWithTimeZone>,
}

impl From<QuestionFeedRow> for QuestionWithAggregates {
    fn from(row: QuestionFeedRow) -> Self {
        let topic = match (&row.topic_id, row.topic_name) {
            (Some(id), Some(name)) => Some(TopicSummary {
                id: id.clone(),
                name,
            }),
            _ => None,
        };

        Self {
            user: AskerSummary {
                id: row.user_id.clone(),
                username: row.user_username,
                name: row.user_name,
            },
            question: question::Model {
                id: row.id,
                title: row.title,
                body: row.body,
                user_id: row.user_id,
                topic_id: row.topic_id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            topic,
            answers_count: row.answers_count,
            votes_count: row.votes_count,
            last_answer_at: row.last_answer_at,
        }
    }
}

/// One page of the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPage {
    pub items: Vec<QuestionWithAggregates>,
    /// A full page came back, so another one may follow.
    pub has_more: bool,
}

/// Feed service for ranked question listings.
#[derive(Clone)]
pub struct FeedService {
    question_repo: QuestionRepository,
    config: FeedConfig,
}

impl FeedService {
    /// Create a new feed service.
    #[must_use]
    pub const fn new(question_repo: QuestionRepository, config: FeedConfig) -> Self {
        Self {
            question_repo,
            config,
        }
    }

    /// Page size actually used for a requested limit.
    #[must_use]
    pub fn effective_limit(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.config.default_limit)
            .clamp(1, self.config.max_limit.max(1))
    }

    /// List questions in the requested order.
    pub async fn list_questions(&self, query: FeedQuery) -> AppResult<FeedPage> {
        let limit = self.effective_limit(query.limit);
        let filter = FeedFilter {
            sort: query.sort,
            skip: query.skip,
            limit,
            topic_id: query.topic_id,
        };

        let rows = self.question_repo.find_feed(&filter).await?;
        let has_more = rows.len() as u64 == limit;

        tracing::debug!(
            sort = %filter.sort,
            skip = filter.skip,
            limit,
            returned = rows.len(),
            "Question feed page"
        );

        Ok(FeedPage {
            items: rows.into_iter().map(Into::into).collect(),
            has_more,
        })
    }

    /// A single question with the same aggregates as a feed item.
    pub async fn get_question(&self, question_id: &str) -> AppResult<QuestionWithAggregates> {
        self.question_repo
            .find_with_aggregates(question_id)
            .await?
            .map(Into::into)
            .ok_or_else(|| AppError::NotFound(format!("Question not found: {question_id}")))
    }
}
