//! Vote entity (the question/answer vote ledger).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stored value of an up-vote.
pub const UPVOTE_VALUE: i32 = 1;

/// Stored value of a down-vote.
///
/// Down-votes are recorded as `0`, so they never lower a tally. Tallies are
/// `SUM(value)` and existing data depends on this encoding.
pub const DOWNVOTE_VALUE: i32 = 0;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vote")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub voter_id: String,

    /// Set when the vote targets a question (exclusive with `answer_id`)
    #[sea_orm(nullable, indexed)]
    pub question_id: Option<String>,

    /// Set when the vote targets an answer (exclusive with `question_id`)
    #[sea_orm(nullable, indexed)]
    pub answer_id: Option<String>,

    pub value: i32,

    pub created_at: DateTimeWithTimeZone,
}

/// Kind of entity a vote can target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Question,
    Answer,
}

impl TargetKind {
    /// Ledger column holding the target id for this kind.
    #[must_use]
    pub const fn column(self) -> Column {
        match self {
            Self::Question => Column::QuestionId,
            Self::Answer => Column::AnswerId,
        }
    }

    /// Lowercase name used on the wire and in log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::Answer => "answer",
        }
    }
}

/// A question or an answer, identified by id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum VoteTarget {
    Question(String),
    Answer(String),
}

impl VoteTarget {
    /// Build a target from its kind and id.
    #[must_use]
    pub fn new(kind: TargetKind, id: impl Into<String>) -> Self {
        match kind {
            TargetKind::Question => Self::Question(id.into()),
            TargetKind::Answer => Self::Answer(id.into()),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> TargetKind {
        match self {
            Self::Question(_) => TargetKind::Question,
            Self::Answer(_) => TargetKind::Answer,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Question(id) | Self::Answer(id) => id,
        }
    }
}

/// Direction of a cast vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    /// Value written to the ledger.
    #[must_use]
    pub const fn value(self) -> i32 {
        match self {
            Self::Up => UPVOTE_VALUE,
            Self::Down => DOWNVOTE_VALUE,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::VoterId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Voter,

    #[sea_orm(
        belongs_to = "super::question::Entity",
        from = "Column::QuestionId",
        to = "super::question::Column::Id",
        on_delete = "Cascade"
    )]
    Question,

    #[sea_orm(
        belongs_to = "super::answer::Entity",
        from = "Column::AnswerId",
        to = "super::answer::Column::Id",
        on_delete = "Cascade"
    )]
    Answer,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Voter.def()
    }
}

impl Related<super::question::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Question.def()
    }
}

impl Related<super::answer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Answer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_values() {
        assert_eq!(VoteDirection::Up.value(), 1);
        assert_eq!(VoteDirection::Down.value(), 0);
    }

    #[test]
    fn test_target_kind_and_id() {
        let target = VoteTarget::new(TargetKind::Answer, "a9");
        assert_eq!(target.kind(), TargetKind::Answer);
        assert_eq!(target.id(), "a9");
        assert_eq!(target.kind().as_str(), "answer");
    }

    #[test]
    fn test_target_kind_wire_names() {
        let kind: TargetKind = serde_json::from_str("\"question\"").unwrap();
        assert_eq!(kind, TargetKind::Question);
        assert!(serde_json::from_str::<TargetKind>("\"comment\"").is_err());
    }
}
