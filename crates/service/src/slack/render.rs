//! Turns a webhook into the Slack message announcing it.

use super::blocks::{Block, SlackMessage, SlackUserId};
use crate::gitea::webhook::{Action, Review, User, Webhook};

/// `recipients` are the Slack users resolved for this event, in order.
/// Returns `None` when the event produces no message.
pub fn render(webhook: &Webhook, recipients: &[SlackUserId]) -> Option<SlackMessage> {
    match webhook.effective_action() {
        Action::Opened => Some(render_opened(webhook)),
        Action::Reviewed { review } => Some(render_reviewed(webhook, review, recipients)),
        Action::ReviewRequested { requested_reviewer } => {
            Some(render_review_requested(webhook, requested_reviewer, recipients))
        }
        Action::Created { .. } => render_comment(recipients),
        Action::Other => None,
        action @ (Action::Closed | Action::Reopened | Action::Merged) => {
            Some(single_section(format!("{} was {}", webhook.pull_request.slack_link(), action)))
        }
    }
}

fn single_section(text: String) -> SlackMessage {
    let block = Block::section(&text);
    SlackMessage::new(text, vec![block])
}

/// First resolved Slack user, else the Gitea username.
fn addressee(recipients: &[SlackUserId], fallback: &User) -> String {
    recipients
        .first()
        .map(SlackUserId::mention)
        .unwrap_or_else(|| fallback.username.clone())
}

fn render_opened(webhook: &Webhook) -> SlackMessage {
    let header = match webhook.repository.owner_and_name() {
        Some((owner, name)) => format!("{owner} | {name}"),
        None => webhook.repository.full_name.clone(),
    };
    let summary = format!(
        "Pull request {} opened by {}",
        webhook.pull_request.slack_link(),
        webhook.sender.username
    );

    let mut blocks = vec![Block::header(&header), Block::section(&summary)];
    let quoted = quote(&webhook.pull_request.body);
    if !quoted.is_empty() {
        blocks.push(Block::section(&quoted));
    }
    SlackMessage::new(summary, blocks)
}

fn render_reviewed(webhook: &Webhook, review: &Review, recipients: &[SlackUserId]) -> SlackMessage {
    single_section(format!(
        "{}, {} has {} your PR",
        addressee(recipients, &webhook.pull_request.user),
        webhook.sender.username,
        review
    ))
}

fn render_review_requested(webhook: &Webhook, reviewer: &User, recipients: &[SlackUserId]) -> SlackMessage {
    single_section(format!(
        "{}, {} has requested you to review {}",
        addressee(recipients, reviewer),
        webhook.sender.username,
        webhook.pull_request.slack_link()
    ))
}

fn render_comment(recipients: &[SlackUserId]) -> Option<SlackMessage> {
    if recipients.is_empty() {
        return None;
    }
    let mentions = recipients
        .iter()
        .map(SlackUserId::mention)
        .collect::<Vec<_>>()
        .join(" ");
    Some(single_section(format!("{mentions}, you were mentioned in a comment")))
}

/// Prefix every line with `>`, keeping line endings.
fn quote(body: &str) -> String {
    body.split_inclusive('\n')
        .map(|line| format!(">{line}"))
        .collect()
}
