//! Database repositories.

pub mod answer;
pub mod poll;
pub mod question;
pub mod user;
pub mod vote;

pub use answer::AnswerRepository;
pub use poll::{PollRepository, PollVoteRepository};
pub use question::{FeedFilter, QuestionFeedRow, QuestionRepository, SortMode};
pub use user::UserRepository;
pub use vote::{TargetTally, VoteRepository};

use sea_orm::{DbErr, SqlErr};

/// Whether a database error is a unique-constraint violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
