//! Service layer relaying Gitea pull request activity into Slack.
//! - `gitea`: webhook payloads and the user directory used to recover emails.
//! - `slack`: Block Kit messages, rendering and the Web API client.
//! - `threads`: persistence of the Slack thread opened for each pull request.
//! - `notifier`: orchestration of the above for one webhook.

pub mod errors;
pub mod gitea;
pub mod notifier;
pub mod observability;
pub mod slack;
pub mod threads;
#[cfg(test)]
pub mod test_support;

pub use errors::NotifyError;
pub use notifier::{NotificationService, Outcome};
