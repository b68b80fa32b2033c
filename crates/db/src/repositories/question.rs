//! Question repository and feed queries.
//!
//! Feed rows are produced by a single statement: the question page joined
//! with its asker, its optional topic, and grouped sub-selects over `answer`
//! and `vote`. Counts are computed on every read and never stored.

use std::{fmt, str::FromStr, sync::Arc};

use crate::entities::{Question, question};
use quorum_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, DbBackend, EntityTrait, FromQueryResult, Statement,
    Value, prelude::DateTimeWithTimeZone,
};
use serde::{Deserialize, Serialize};

/// Question feed ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    /// Newest first.
    #[default]
    Recent,
    /// Most answers first.
    MostAnswered,
    /// Highest vote sum first.
    MostVoted,
    /// Most recently answered first; unanswered questions last.
    Bump,
    /// Only questions without answers, newest first.
    NoAnswer,
    /// Highest vote sum first, newest first among equals.
    Populaire,
}

impl SortMode {
    pub const ALL: [Self; 6] = [
        Self::Recent,
        Self::MostAnswered,
        Self::MostVoted,
        Self::Bump,
        Self::NoAnswer,
        Self::Populaire,
    ];

    /// Wire name of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recent => "recent",
            Self::MostAnswered => "most-answered",
            Self::MostVoted => "most-voted",
            Self::Bump => "bump",
            Self::NoAnswer => "no-answer",
            Self::Populaire => "populaire",
        }
    }

    /// `ORDER BY` terms, always ending in `q.created_at DESC, q.id DESC`.
    const fn order_clause(self) -> &'static str {
        match self {
            Self::Recent | Self::NoAnswer => "q.created_at DESC, q.id DESC",
            Self::MostAnswered => "COALESCE(a.answers_count, 0) DESC, q.created_at DESC, q.id DESC",
            Self::MostVoted | Self::Populaire => {
                "COALESCE(v.votes_count, 0) DESC, q.created_at DESC, q.id DESC"
            }
            Self::Bump => "a.last_answer_at DESC NULLS LAST, q.created_at DESC, q.id DESC",
        }
    }

    /// Extra `WHERE` condition the mode imposes, if any.
    const fn filter_clause(self) -> Option<&'static str> {
        match self {
            Self::NoAnswer => Some("COALESCE(a.answers_count, 0) = 0"),
            _ => None,
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown sort mode: {s}")))
    }
}

/// Parameters of a feed page query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedFilter {
    pub sort: SortMode,
    pub skip: u64,
    pub limit: u64,
    pub topic_id: Option<String>,
}

/// A question with its asker, topic and read-time aggregates.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct QuestionFeedRow {
    pub id: String,
    pub title: String,
    pub body: String,
    pub user_id: String,
    pub topic_id: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub user_username: String,
    pub user_name: Option<String>,
    pub topic_name: Option<String>,
    pub answers_count: i64,
    pub votes_count: i64,
    pub last_answer_at: Option<DateTimeWithTimeZone>,
}

const FEED_SELECT: &str = r#"
    SELECT
        q.id, q.title, q.body, q.user_id, q.topic_id, q.created_at, q.updated_at,
        u.username AS user_username,
        u.name AS user_name,
        t.name AS topic_name,
        COALESCE(a.answers_count, 0) AS answers_count,
        COALESCE(v.votes_count, 0) AS votes_count,
        a.last_answer_at
    FROM question q
    INNER JOIN "user" u ON u.id = q.user_id
    LEFT JOIN topic t ON t.id = q.topic_id
    LEFT JOIN (
        SELECT question_id, COUNT(*) AS answers_count, MAX(created_at) AS last_answer_at
        FROM answer
        GROUP BY question_id
    ) a ON a.question_id = q.id
    LEFT JOIN (
        SELECT question_id, SUM(value) AS votes_count
        FROM vote
        WHERE question_id IS NOT NULL
        GROUP BY question_id
    ) v ON v.question_id = q.id"#;

/// Build the feed statement for a filter.
fn feed_statement(filter: &FeedFilter) -> Statement {
    let mut conditions: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(clause) = filter.sort.filter_clause() {
        conditions.push(clause.to_string());
    }
    if let Some(topic_id) = &filter.topic_id {
        values.push(topic_id.clone().into());
        conditions.push(format!("q.topic_id = ${}", values.len()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("\n    WHERE {}", conditions.join(" AND "))
    };

    values.push(i64::try_from(filter.skip).unwrap_or(i64::MAX).into());
    let offset_param = values.len();
    values.push(i64::try_from(filter.limit).unwrap_or(i64::MAX).into());
    let limit_param = values.len();

    let sql = format!(
        "{FEED_SELECT}{where_clause}\n    ORDER BY {}\n    OFFSET ${offset_param} LIMIT ${limit_param}",
        filter.sort.order_clause(),
    );

    Statement::from_sql_and_values(DbBackend::Postgres, sql, values)
}

/// Question repository for database operations.
#[derive(Clone)]
pub struct QuestionRepository {
    db: Arc<DatabaseConnection>,
}

impl QuestionRepository {
    /// Create a new question repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a question by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<question::Model>> {
        Question::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a question by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<question::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Question not found: {id}")))
    }

    /// Create a new question.
    pub async fn create(&self, model: question::ActiveModel) -> AppResult<question::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// One page of the question feed.
    pub async fn find_feed(&self, filter: &FeedFilter) -> AppResult<Vec<QuestionFeedRow>> {
        QuestionFeedRow::find_by_statement(feed_statement(filter))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// A single question with the same aggregates as a feed row.
    pub async fn find_with_aggregates(&self, id: &str) -> AppResult<Option<QuestionFeedRow>> {
        let sql = format!("{FEED_SELECT}\n    WHERE q.id = $1");

        QuestionFeedRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [id.into()],
        ))
        .one(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }
}
