//! Engagement services.

#![allow(missing_docs)]

pub mod feed;
pub mod poll;
pub mod tally;
pub mod thread;

pub use feed::{AskerSummary, FeedPage, FeedQuery, FeedService, QuestionWithAggregates, TopicSummary};
pub use poll::{
    CreatePollInput, MAX_OPTION_CHARS, MAX_POLL_OPTIONS, PollService, PollWithOptions,
    PollWithStatus, option_percentage,
};
pub use quorum_db::repositories::SortMode;
pub use tally::TallyService;
pub use thread::{AnswerNode, ThreadOrder, ThreadService, build_thread};
