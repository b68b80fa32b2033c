//! Vote ledger repository.
//!
//! The ledger is append-only. One row per voter and target is guaranteed by
//! the unique indexes on `(voter_id, question_id)` and `(voter_id, answer_id)`;
//! inserts rely on them instead of checking first.

use std::sync::Arc;

use crate::entities::{
    Vote,
    vote::{self, TargetKind, VoteTarget},
};
use quorum_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter, QuerySelect,
    sea_query::OnConflict,
};

use super::is_unique_violation;

/// Summed vote values of one target.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct TargetTally {
    pub target_id: String,
    pub total: i64,
}

/// Vote repository for database operations.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a vote unless the voter already has one on the same target.
    ///
    /// Returns `false` when the row was not written because of the
    /// uniqueness rule, whether the database skipped it through
    /// `ON CONFLICT DO NOTHING` or reported a unique violation.
    pub async fn insert_unique(&self, model: vote::ActiveModel, kind: TargetKind) -> AppResult<bool> {
        let result = Vote::insert(model)
            .on_conflict(
                OnConflict::columns([vote::Column::VoterId, kind.column()])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await;

        match result {
            Ok(rows) => Ok(rows > 0),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// Find the vote a voter cast on a target.
    pub async fn find_by_voter_and_target(
        &self,
        voter_id: &str,
        target: &VoteTarget,
    ) -> AppResult<Option<vote::Model>> {
        Vote::find()
            .filter(vote::Column::VoterId.eq(voter_id))
            .filter(target.kind().column().eq(target.id()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Sum of vote values for a target (0 when nobody voted).
    pub async fn sum_by_target(&self, target: &VoteTarget) -> AppResult<i64> {
        #[derive(FromQueryResult)]
        struct SumResult {
            total: Option<i64>,
        }

        let result = Vote::find()
            .filter(target.kind().column().eq(target.id()))
            .select_only()
            .column_as(vote::Column::Value.sum(), "total")
            .into_model::<SumResult>()
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.and_then(|r| r.total).unwrap_or(0))
    }

    /// Sums for many targets of the same kind in one grouped query.
    ///
    /// Targets without votes are absent from the result.
    pub async fn sum_by_targets(
        &self,
        kind: TargetKind,
        target_ids: &[String],
    ) -> AppResult<Vec<TargetTally>> {
        if target_ids.is_empty() {
            return Ok(Vec::new());
        }

        let column = kind.column();
        Vote::find()
            .filter(column.is_in(target_ids.iter().map(String::as_str)))
            .select_only()
            .column_as(column, "target_id")
            .column_as(vote::Column::Value.sum(), "total")
            .group_by(column)
            .into_model::<TargetTally>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
