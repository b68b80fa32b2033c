//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `quorum_test`)
//!   `TEST_DB_PASSWORD` (default: `quorum_test`)
//!   `TEST_DB_NAME` (default: `quorum_test`)

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use quorum_db::{
    entities::{question, user, vote},
    repositories::{FeedFilter, QuestionRepository, SortMode, UserRepository, VoteRepository},
    test_utils::TestDatabase,
};
use sea_orm::{ActiveModelTrait, Set};

async fn seed_question(db: &TestDatabase, user_id: &str, question_id: &str) {
    let now = Utc::now();
    let users = UserRepository::new(db.shared());
    if users.find_by_id(user_id).await.unwrap().is_none() {
        user::ActiveModel {
            id: Set(user_id.to_string()),
            username: Set(user_id.to_string()),
            name: Set(None),
            token: Set(None),
            created_at: Set(now.into()),
        }
        .insert(db.connection())
        .await
        .unwrap();
    }

    question::ActiveModel {
        id: Set(question_id.to_string()),
        title: Set("Title".to_string()),
        body: Set("Body".to_string()),
        user_id: Set(user_id.to_string()),
        topic_id: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db.connection())
    .await
    .unwrap();
}

fn question_vote(id: &str, voter_id: &str, question_id: &str) -> vote::ActiveModel {
    vote::ActiveModel {
        id: Set(id.to_string()),
        voter_id: Set(voter_id.to_string()),
        question_id: Set(Some(question_id.to_string())),
        answer_id: Set(None),
        value: Set(vote::UPVOTE_VALUE),
        created_at: Set(Utc::now().into()),
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_migrations_apply() {
    let db = TestDatabase::new().await;
    assert!(db.is_ok(), "Failed to connect: {:?}", db.err());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_vote_unique_per_voter_and_target() {
    let db = TestDatabase::create_unique().await.unwrap();
    seed_question(&db, "u1", "q1").await;

    let votes = VoteRepository::new(db.shared());
    assert!(
        votes
            .insert_unique(question_vote("v1", "u1", "q1"), vote::TargetKind::Question)
            .await
            .unwrap()
    );
    assert!(
        !votes
            .insert_unique(question_vote("v2", "u1", "q1"), vote::TargetKind::Question)
            .await
            .unwrap()
    );

    let total = votes
        .sum_by_target(&vote::VoteTarget::Question("q1".to_string()))
        .await
        .unwrap();
    assert_eq!(total, 1);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_vote_must_name_exactly_one_target() {
    let db = TestDatabase::create_unique().await.unwrap();
    seed_question(&db, "u1", "q1").await;

    let mut both = question_vote("v1", "u1", "q1");
    both.answer_id = Set(Some("a1".to_string()));
    assert!(both.insert(db.connection()).await.is_err());

    let mut neither = question_vote("v2", "u1", "q1");
    neither.question_id = Set(None);
    assert!(neither.insert(db.connection()).await.is_err());

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_feed_statement_runs_for_every_mode() {
    let db = TestDatabase::create_unique().await.unwrap();
    seed_question(&db, "u1", "q1").await;

    let questions = QuestionRepository::new(db.shared());
    for sort in SortMode::ALL {
        let rows = questions
            .find_feed(&FeedFilter {
                sort,
                skip: 0,
                limit: 10,
                topic_id: None,
            })
            .await
            .unwrap();
        assert_eq!(rows.len(), 1, "sort mode {sort}");
        assert_eq!(rows[0].answers_count, 0);
    }

    db.drop_database().await.unwrap();
}
