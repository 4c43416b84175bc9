//! Decides who to tell about a webhook and where in Slack to say it.

pub mod mention;
pub mod service;

pub use service::{NotificationService, Outcome};
