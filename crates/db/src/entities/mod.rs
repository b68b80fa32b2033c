//! Database entities.

#![allow(missing_docs)]

pub mod answer;
pub mod poll;
pub mod poll_option;
pub mod poll_vote;
pub mod question;
pub mod topic;
pub mod user;
pub mod vote;

pub use answer::Entity as Answer;
pub use poll::Entity as Poll;
pub use poll_option::Entity as PollOption;
pub use poll_vote::Entity as PollVote;
pub use question::Entity as Question;
pub use topic::Entity as Topic;
pub use user::Entity as User;
pub use vote::Entity as Vote;
