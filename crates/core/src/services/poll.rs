//! Poll service.

use chrono::Utc;
use quorum_common::{AppError, AppResult, IdGenerator};
use quorum_db::{
    entities::{poll, poll_option, poll_vote},
    repositories::{PollRepository, PollVoteRepository, QuestionRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::{Validate, ValidationError};

/// Most options a single poll may offer.
pub const MAX_POLL_OPTIONS: usize = 20;

/// Longest option text, in characters.
pub const MAX_OPTION_CHARS: usize = 200;

/// Input for creating a poll.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePollInput {
    #[validate(custom(function = "validate_option_lengths"))]
    pub options: Vec<String>,
}

fn validate_option_lengths(options: &[String]) -> Result<(), ValidationError> {
    if options.iter().any(|o| o.chars().count() > MAX_OPTION_CHARS) {
        let mut err = ValidationError::new("option_length");
        err.message = Some(format!("Poll options are limited to {MAX_OPTION_CHARS} characters").into());
        return Err(err);
    }
    Ok(())
}

/// A poll and its options in creation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollWithOptions {
    pub poll: poll::Model,
    pub options: Vec<poll_option::Model>,
}

impl PollWithOptions {
    /// Sum of the option counters.
    #[must_use]
    pub fn total_votes(&self) -> i64 {
        self.options.iter().map(|o| i64::from(o.votes_count)).sum()
    }

    /// Percentage of each option, in option order.
    #[must_use]
    pub fn percentages(&self) -> Vec<u32> {
        let total = self.total_votes();
        self.options
            .iter()
            .map(|o| option_percentage(i64::from(o.votes_count), total))
            .collect()
    }
}

/// A poll together with the option the requesting voter picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollWithStatus {
    pub poll: PollWithOptions,
    pub voted_option_id: Option<String>,
}

/// Share of `votes` in `total` as a whole percent, rounded half up.
///
/// Returns 0 when nobody has voted.
#[must_use]
pub fn option_percentage(votes: i64, total: i64) -> u32 {
    if total <= 0 || votes <= 0 {
        return 0;
    }
    ((votes * 200 + total) / (2 * total)) as u32
}

/// Poll service for business logic.
#[derive(Clone)]
pub struct PollService {
    poll_repo: PollRepository,
    vote_repo: PollVoteRepository,
    question_repo: QuestionRepository,
    id_gen: IdGenerator,
}

impl PollService {
    /// Create a new poll service.
    #[must_use]
    pub const fn new(
        poll_repo: PollRepository,
        vote_repo: PollVoteRepository,
        question_repo: QuestionRepository,
    ) -> Self {
        Self {
            poll_repo,
            vote_repo,
            question_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a poll for a question.
    pub async fn create_poll(
        &self,
        question_id: &str,
        input: CreatePollInput,
    ) -> AppResult<PollWithOptions> {
        let input = CreatePollInput {
            options: input.options.iter().map(|o| o.trim().to_string()).collect(),
        };

        if input.options.is_empty() {
            return Err(AppError::InvalidPoll(
                "Poll must have at least one option".to_string(),
            ));
        }
        if input.options.len() > MAX_POLL_OPTIONS {
            return Err(AppError::InvalidPoll(format!(
                "Poll cannot have more than {MAX_POLL_OPTIONS} options"
            )));
        }
        if input.options.iter().any(String::is_empty) {
            return Err(AppError::InvalidPoll(
                "Poll options cannot be empty".to_string(),
            ));
        }
        input.validate()?;

        self.question_repo.get_by_id(question_id).await?;
        if self.poll_repo.find_by_question_id(question_id).await?.is_some() {
            return Err(AppError::Conflict("Question already has a poll".to_string()));
        }

        let now = Utc::now();
        let poll = poll::Model {
            id: self.id_gen.generate(),
            question_id: question_id.to_string(),
            created_at: now.into(),
            updated_at: now.into(),
        };
        let options: Vec<poll_option::Model> = input
            .options
            .into_iter()
            .enumerate()
            .map(|(position, text)| poll_option::Model {
                id: self.id_gen.generate(),
                poll_id: poll.id.clone(),
                text,
                position: position as i32,
                votes_count: 0,
            })
            .collect();

        let poll_active = poll::ActiveModel {
            id: Set(poll.id.clone()),
            question_id: Set(poll.question_id.clone()),
            created_at: Set(poll.created_at),
            updated_at: Set(poll.updated_at),
        };
        let option_actives = options
            .iter()
            .map(|o| poll_option::ActiveModel {
                id: Set(o.id.clone()),
                poll_id: Set(o.poll_id.clone()),
                text: Set(o.text.clone()),
                position: Set(o.position),
                votes_count: Set(0),
            })
            .collect();

        self.poll_repo
            .create_with_options(poll_active, option_actives)
            .await?;

        tracing::info!(
            poll_id = %poll.id,
            question_id = %question_id,
            options = options.len(),
            "Poll created"
        );

        Ok(PollWithOptions { poll, options })
    }

    /// Cast a vote for a poll option.
    ///
    /// A voter gets one vote per poll, so voting again for any option of the
    /// same poll fails with `AlreadyVoted`.
    pub async fn cast_poll_vote(
        &self,
        option_id: &str,
        voter_id: &str,
    ) -> AppResult<PollWithOptions> {
        let option = self.poll_repo.get_option_by_id(option_id).await?;
        let poll = self.poll_repo.get_by_id(&option.poll_id).await?;

        let vote = poll_vote::ActiveModel {
            id: Set(self.id_gen.generate()),
            poll_id: Set(poll.id.clone()),
            option_id: Set(option.id.clone()),
            voter_id: Set(voter_id.to_string()),
            created_at: Set(Utc::now().into()),
        };

        if !self.vote_repo.record_vote(vote, &option.id).await? {
            tracing::debug!(poll_id = %poll.id, voter_id = %voter_id, "Duplicate poll vote refused");
            return Err(AppError::AlreadyVoted(format!("poll {}", poll.id)));
        }

        tracing::info!(
            poll_id = %poll.id,
            option_id = %option.id,
            voter_id = %voter_id,
            "Poll vote cast"
        );

        let options = self.poll_repo.find_options(&poll.id).await?;
        Ok(PollWithOptions { poll, options })
    }

    /// The poll of a question with its options.
    pub async fn get_poll_by_question(&self, question_id: &str) -> AppResult<PollWithOptions> {
        let poll = self.poll_repo.get_by_question_id(question_id).await?;
        let options = self.poll_repo.find_options(&poll.id).await?;
        Ok(PollWithOptions { poll, options })
    }

    /// The poll of a question plus the option `voter_id` chose, if any.
    pub async fn get_poll_with_status(
        &self,
        question_id: &str,
        voter_id: Option<&str>,
    ) -> AppResult<PollWithStatus> {
        let poll = self.get_poll_by_question(question_id).await?;

        let voted_option_id = match voter_id {
            Some(voter_id) => self
                .vote_repo
                .find_by_poll_and_voter(&poll.poll.id, voter_id)
                .await?
                .map(|v| v.option_id),
            None => None,
        };

        Ok(PollWithStatus {
            poll,
            voted_option_id,
        })
    }
}
