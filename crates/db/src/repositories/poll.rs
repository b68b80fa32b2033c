//! Poll repositories.

use std::sync::Arc;

use crate::entities::{Poll, PollOption, PollVote, poll, poll_option, poll_vote};
use quorum_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    TransactionTrait,
    sea_query::{Expr, OnConflict},
};

use super::is_unique_violation;

/// Poll repository for database operations.
#[derive(Clone)]
pub struct PollRepository {
    db: Arc<DatabaseConnection>,
}

impl PollRepository {
    /// Create a new poll repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a poll by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<poll::Model>> {
        Poll::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a poll by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<poll::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Poll not found: {id}")))
    }

    /// Find the poll attached to a question.
    pub async fn find_by_question_id(&self, question_id: &str) -> AppResult<Option<poll::Model>> {
        Poll::find()
            .filter(poll::Column::QuestionId.eq(question_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the poll attached to a question, returning error if not found.
    pub async fn get_by_question_id(&self, question_id: &str) -> AppResult<poll::Model> {
        self.find_by_question_id(question_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Poll not found for question: {question_id}")))
    }

    /// Insert a poll and all of its options in one transaction.
    ///
    /// A second poll for the same question fails with `Conflict`.
    pub async fn create_with_options(
        &self,
        poll: poll::ActiveModel,
        options: Vec<poll_option::ActiveModel>,
    ) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if let Err(e) = Poll::insert(poll).exec_without_returning(&txn).await {
            return Err(if is_unique_violation(&e) {
                AppError::Conflict("Question already has a poll".to_string())
            } else {
                AppError::Database(e.to_string())
            });
        }

        PollOption::insert_many(options)
            .exec_without_returning(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Options of a poll in creation order.
    pub async fn find_options(&self, poll_id: &str) -> AppResult<Vec<poll_option::Model>> {
        PollOption::find()
            .filter(poll_option::Column::PollId.eq(poll_id))
            .order_by_asc(poll_option::Column::Position)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an option by ID.
    pub async fn find_option_by_id(&self, option_id: &str) -> AppResult<Option<poll_option::Model>> {
        PollOption::find_by_id(option_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an option by ID, returning error if not found.
    pub async fn get_option_by_id(&self, option_id: &str) -> AppResult<poll_option::Model> {
        self.find_option_by_id(option_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Poll option not found: {option_id}")))
    }
}

/// Poll vote repository for database operations.
#[derive(Clone)]
pub struct PollVoteRepository {
    db: Arc<DatabaseConnection>,
}

impl PollVoteRepository {
    /// Create a new poll vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the vote a voter cast on a poll.
    pub async fn find_by_poll_and_voter(
        &self,
        poll_id: &str,
        voter_id: &str,
    ) -> AppResult<Option<poll_vote::Model>> {
        PollVote::find()
            .filter(poll_vote::Column::PollId.eq(poll_id))
            .filter(poll_vote::Column::VoterId.eq(voter_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Record a poll vote and bump the chosen option's counter atomically.
    ///
    /// Returns `false` without touching the counter when the voter already
    /// voted on this poll. An insert whose counter update misses the option
    /// is rolled back as an `Internal` error.
    pub async fn record_vote(&self, model: poll_vote::ActiveModel, option_id: &str) -> AppResult<bool> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let inserted = PollVote::insert(model)
            .on_conflict(
                OnConflict::columns([poll_vote::Column::PollId, poll_vote::Column::VoterId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await;

        let rows = match inserted {
            Ok(rows) => rows,
            Err(e) if is_unique_violation(&e) => 0,
            Err(e) => return Err(AppError::Database(e.to_string())),
        };

        if rows == 0 {
            txn.rollback()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            return Ok(false);
        }

        let updated = PollOption::update_many()
            .col_expr(
                poll_option::Column::VotesCount,
                Expr::col(poll_option::Column::VotesCount).add(1),
            )
            .filter(poll_option::Column::Id.eq(option_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if updated.rows_affected != 1 {
            txn.rollback()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            return Err(AppError::Internal(format!(
                "Poll vote recorded but option counter not updated: {option_id}"
            )));
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(true)
    }

    /// Number of votes cast on a poll.
    pub async fn count_by_poll(&self, poll_id: &str) -> AppResult<u64> {
        PollVote::find()
            .filter(poll_vote::Column::PollId.eq(poll_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Set};

    fn create_test_option(id: &str, position: i32, votes_count: i32) -> poll_option::Model {
        poll_option::Model {
            id: id.to_string(),
            poll_id: "poll1".to_string(),
            text: format!("option {position}"),
            position,
            votes_count,
        }
    }

    fn active_poll_vote() -> poll_vote::ActiveModel {
        poll_vote::ActiveModel {
            id: Set("pv1".to_string()),
            poll_id: Set("poll1".to_string()),
            option_id: Set("opt1".to_string()),
            voter_id: Set("user1".to_string()),
            created_at: Set(Utc::now().into()),
        }
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn test_find_options_in_position_order() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    create_test_option("opt1", 0, 2),
                    create_test_option("opt2", 1, 1),
                ]])
                .into_connection(),
        );

        let repo = PollRepository::new(db);
        let options = repo.find_options("poll1").await.unwrap();

        assert_eq!(options.len(), 2);
        assert_eq!(options[0].position, 0);
        assert_eq!(options[1].id, "opt2");
    }

    #[tokio::test]
    async fn test_get_by_question_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<poll::Model>::new()])
                .into_connection(),
        );

        let repo = PollRepository::new(db);
        let result = repo.get_by_question_id("q1").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_with_options() {
        let now = Utc::now();
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(2)])
                .into_connection(),
        );

        let poll = poll::ActiveModel {
            id: Set("poll1".to_string()),
            question_id: Set("q1".to_string()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        let options = ["red", "blue"]
            .iter()
            .enumerate()
            .map(|(i, text)| poll_option::ActiveModel {
                id: Set(format!("opt{i}")),
                poll_id: Set("poll1".to_string()),
                text: Set((*text).to_string()),
                position: Set(i32::try_from(i).unwrap()),
                votes_count: Set(0),
            })
            .collect();

        let repo = PollRepository::new(db);
        assert!(repo.create_with_options(poll, options).await.is_ok());
    }

    #[tokio::test]
    async fn test_record_vote_increments_option() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(1)])
                .into_connection(),
        );

        let repo = PollVoteRepository::new(db);
        let recorded = repo.record_vote(active_poll_vote(), "opt1").await.unwrap();

        assert!(recorded);
    }

    #[tokio::test]
    async fn test_record_vote_second_vote_is_skipped() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(0)])
                .into_connection(),
        );

        let repo = PollVoteRepository::new(db);
        let recorded = repo.record_vote(active_poll_vote(), "opt1").await.unwrap();

        assert!(!recorded);
    }

    #[tokio::test]
    async fn test_record_vote_rolls_back_when_counter_misses() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(0)])
                .into_connection(),
        );

        let repo = PollVoteRepository::new(db);
        let result = repo.record_vote(active_poll_vote(), "gone").await;

        match result {
            Err(e @ AppError::Internal(_)) => assert!(e.is_server_error()),
            _ => panic!("Expected Internal error"),
        }
    }

    #[tokio::test]
    async fn test_count_by_poll() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(3))
                }]])
                .into_connection(),
        );

        let repo = PollVoteRepository::new(db);
        assert_eq!(repo.count_by_poll("poll1").await.unwrap(), 3);
    }
}
