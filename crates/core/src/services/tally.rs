//! Vote tally service.
//!
//! Votes are immutable ledger rows and tallies are summed from the ledger on
//! every read. A voter gets one vote per target; the second attempt is
//! refused by the insert itself, never by a prior read.

use std::collections::HashMap;

use chrono::Utc;
use quorum_common::{AppError, AppResult, IdGenerator};
use quorum_db::{
    entities::vote::{self, TargetKind, VoteDirection, VoteTarget},
    repositories::{AnswerRepository, QuestionRepository, VoteRepository},
};
use sea_orm::Set;

/// Tally service for casting and summing votes.
#[derive(Clone)]
pub struct TallyService {
    vote_repo: VoteRepository,
    question_repo: QuestionRepository,
    answer_repo: AnswerRepository,
    id_gen: IdGenerator,
}

impl TallyService {
    /// Create a new tally service.
    #[must_use]
    pub const fn new(
        vote_repo: VoteRepository,
        question_repo: QuestionRepository,
        answer_repo: AnswerRepository,
    ) -> Self {
        Self {
            vote_repo,
            question_repo,
            answer_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Cast a vote on a question or an answer.
    ///
    /// Fails with `AlreadyVoted` if the voter has any vote on the target,
    /// whatever its direction. Votes cannot be changed or retracted.
    pub async fn cast_vote(
        &self,
        voter_id: &str,
        target: VoteTarget,
        direction: VoteDirection,
    ) -> AppResult<vote::Model> {
        self.ensure_target_exists(&target).await?;

        let (question_id, answer_id) = match &target {
            VoteTarget::Question(id) => (Some(id.clone()), None),
            VoteTarget::Answer(id) => (None, Some(id.clone())),
        };

        let model = vote::Model {
            id: self.id_gen.generate(),
            voter_id: voter_id.to_string(),
            question_id,
            answer_id,
            value: direction.value(),
            created_at: Utc::now().into(),
        };

        let active = vote::ActiveModel {
            id: Set(model.id.clone()),
            voter_id: Set(model.voter_id.clone()),
            question_id: Set(model.question_id.clone()),
            answer_id: Set(model.answer_id.clone()),
            value: Set(model.value),
            created_at: Set(model.created_at),
        };

        if !self.vote_repo.insert_unique(active, target.kind()).await? {
            tracing::debug!(
                voter_id = %voter_id,
                target_kind = target.kind().as_str(),
                target_id = %target.id(),
                "Duplicate vote refused"
            );
            return Err(AppError::AlreadyVoted(format!(
                "{} {}",
                target.kind().as_str(),
                target.id()
            )));
        }

        tracing::info!(
            vote_id = %model.id,
            voter_id = %voter_id,
            target_kind = target.kind().as_str(),
            target_id = %target.id(),
            value = model.value,
            "Vote cast"
        );

        Ok(model)
    }

    /// Current tally of a target: the sum of its vote values.
    ///
    /// Fails with `NotFound` when the target does not exist.
    pub async fn get_tally(&self, target: &VoteTarget) -> AppResult<i64> {
        self.ensure_target_exists(target).await?;
        self.vote_repo.sum_by_target(target).await
    }

    /// Tallies for many targets of one kind. Every requested id is present,
    /// with 0 for targets nobody voted on.
    pub async fn get_tallies(
        &self,
        kind: TargetKind,
        target_ids: &[String],
    ) -> AppResult<HashMap<String, i64>> {
        let mut tallies: HashMap<String, i64> =
            target_ids.iter().map(|id| (id.clone(), 0)).collect();

        for row in self.vote_repo.sum_by_targets(kind, target_ids).await? {
            tallies.insert(row.target_id, row.total);
        }

        Ok(tallies)
    }

    /// The vote a voter already cast on a target, if any.
    pub async fn find_vote(
        &self,
        voter_id: &str,
        target: &VoteTarget,
    ) -> AppResult<Option<vote::Model>> {
        self.vote_repo.find_by_voter_and_target(voter_id, target).await
    }

    async fn ensure_target_exists(&self, target: &VoteTarget) -> AppResult<()> {
        match target {
            VoteTarget::Question(id) => {
                self.question_repo.get_by_id(id).await?;
            }
            VoteTarget::Answer(id) => {
                self.answer_repo.get_by_id(id).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use quorum_db::entities::{answer, question};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
    use std::sync::Arc;

    fn create_test_question(id: &str) -> question::Model {
        question::Model {
            id: id.to_string(),
            title: "Is Rust fast?".to_string(),
            body: "Asking for benchmarks.".to_string(),
            user_id: "asker".to_string(),
            topic_id: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn service(
        vote_db: MockDatabase,
        question_db: MockDatabase,
        answer_db: MockDatabase,
    ) -> TallyService {
        TallyService::new(
            VoteRepository::new(Arc::new(vote_db.into_connection())),
            QuestionRepository::new(Arc::new(question_db.into_connection())),
            AnswerRepository::new(Arc::new(answer_db.into_connection())),
        )
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn test_cast_upvote() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([exec(1)]),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_question("q1")]]),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        let vote = service
            .cast_vote("voter1", VoteTarget::Question("q1".to_string()), VoteDirection::Up)
            .await
            .unwrap();

        assert_eq!(vote.value, 1);
        assert_eq!(vote.question_id.as_deref(), Some("q1"));
        assert!(vote.answer_id.is_none());
        assert_eq!(vote.id.len(), 26);
    }

    #[tokio::test]
    async fn test_cast_downvote_stores_zero() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([exec(1)]),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_question("q1")]]),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        let vote = service
            .cast_vote("voter1", VoteTarget::Question("q1".to_string()), VoteDirection::Down)
            .await
            .unwrap();

        assert_eq!(vote.value, 0);
    }

    #[tokio::test]
    async fn test_second_vote_is_already_voted() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([exec(0)]),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_question("q1")]]),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        let result = service
            .cast_vote("voter1", VoteTarget::Question("q1".to_string()), VoteDirection::Down)
            .await;

        match result {
            Err(AppError::AlreadyVoted(msg)) => assert_eq!(msg, "question q1"),
            _ => panic!("Expected AlreadyVoted error"),
        }
    }

    #[tokio::test]
    async fn test_vote_on_missing_answer() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<answer::Model>::new()]),
        );

        let result = service
            .cast_vote("voter1", VoteTarget::Answer("gone".to_string()), VoteDirection::Up)
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_tally_sums_ledger() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[
                maplit::btreemap! { "total" => Value::BigInt(Some(1)) },
            ]]),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_question("q1")]]),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        let tally = service
            .get_tally(&VoteTarget::Question("q1".to_string()))
            .await
            .unwrap();

        assert_eq!(tally, 1);
    }

    #[tokio::test]
    async fn test_get_tally_of_missing_answer() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<answer::Model>::new()]),
        );

        let result = service.get_tally(&VoteTarget::Answer("gone".to_string())).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_tallies_fills_missing_targets() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([vec![
                maplit::btreemap! {
                    "target_id" => Value::from("a1"),
                    "total" => Value::BigInt(Some(2)),
                },
            ]]),
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        let tallies = service
            .get_tallies(TargetKind::Answer, &["a1".to_string(), "a2".to_string()])
            .await
            .unwrap();

        assert_eq!(tallies.len(), 2);
        assert_eq!(tallies["a1"], 2);
        assert_eq!(tallies["a2"], 0);
    }

    #[tokio::test]
    async fn test_find_vote_none() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<vote::Model>::new()]),
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        let vote = service
            .find_vote("voter1", &VoteTarget::Question("q1".to_string()))
            .await
            .unwrap();

        assert!(vote.is_none());
    }
}
