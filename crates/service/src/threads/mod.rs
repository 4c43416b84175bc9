//! Where each pull request's Slack thread lives.

pub mod domain;
pub mod repository;
pub mod repo;

pub use domain::Thread;
pub use repository::ThreadRepository;
