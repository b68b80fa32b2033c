//! Create vote table migration.
//!
//! The unique indexes on `(voter_id, question_id)` and `(voter_id, answer_id)`
//! are what enforce one vote per voter per target. Postgres treats NULLs as
//! distinct, so a question vote never collides with an answer vote.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vote::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Vote::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Vote::VoterId).string_len(32).not_null())
                    .col(ColumnDef::new(Vote::QuestionId).string_len(32))
                    .col(ColumnDef::new(Vote::AnswerId).string_len(32))
                    .col(ColumnDef::new(Vote::Value).integer().not_null())
                    .col(
                        ColumnDef::new(Vote::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    // Exactly one target column is set
                    .check(Expr::cust("(question_id IS NULL) <> (answer_id IS NULL)"))
                    .check(Expr::cust("value IN (0, 1)"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_voter")
                            .from(Vote::Table, Vote::VoterId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_question")
                            .from(Vote::Table, Vote::QuestionId)
                            .to(Question::Table, Question::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_answer")
                            .from(Vote::Table, Vote::AnswerId)
                            .to(Answer::Table, Answer::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (voter_id, question_id) - one vote per voter per question
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_voter_question")
                    .table(Vote::Table)
                    .col(Vote::VoterId)
                    .col(Vote::QuestionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Unique index: (voter_id, answer_id) - one vote per voter per answer
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_voter_answer")
                    .table(Vote::Table)
                    .col(Vote::VoterId)
                    .col(Vote::AnswerId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: question_id (tallies)
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_question_id")
                    .table(Vote::Table)
                    .col(Vote::QuestionId)
                    .to_owned(),
            )
            .await?;

        // Index: answer_id (tallies)
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_answer_id")
                    .table(Vote::Table)
                    .col(Vote::AnswerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vote::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Vote {
    Table,
    Id,
    VoterId,
    QuestionId,
    AnswerId,
    Value,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Question {
    Table,
    Id,
}

#[derive(Iden)]
enum Answer {
    Table,
    Id,
}
