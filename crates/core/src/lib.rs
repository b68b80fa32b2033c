//! Core engagement logic for quorum: vote tallies, polls, question feeds
//! and answer threads.

pub mod services;

pub use services::*;
