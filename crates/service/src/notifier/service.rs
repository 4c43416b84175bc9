use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use super::mention::mentioned_usernames;
use crate::errors::NotifyError;
use crate::gitea::{deanonymise, Action, UserDirectory, Webhook};
use crate::observability::{HANDLE_DURATION, MESSAGES_POSTED_TOTAL, NOTIFY_ERRORS_TOTAL, WEBHOOKS_RECEIVED_TOTAL, WEBHOOKS_SKIPPED_TOTAL};
use crate::slack::{render, ChatClient, SlackUserId};
use crate::threads::ThreadRepository;

/// What happened to a webhook.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Action has no notification.
    Ignored,
    /// Action is notifiable but nobody was there to notify.
    Skipped,
    /// A new thread was started for the pull request.
    Started { ts: String },
    Posted { ts: String, threaded: bool },
}

pub struct NotificationService {
    chat: Arc<dyn ChatClient>,
    directory: Arc<dyn UserDirectory>,
    threads: Arc<dyn ThreadRepository>,
    channel: String,
}

impl NotificationService {
    pub fn new(
        chat: Arc<dyn ChatClient>,
        directory: Arc<dyn UserDirectory>,
        threads: Arc<dyn ThreadRepository>,
        channel: impl Into<String>,
    ) -> Self {
        Self { chat, directory, threads, channel: channel.into() }
    }

    #[instrument(
        skip_all,
        fields(
            repository = %webhook.repository.full_name,
            number = webhook.pull_request.number,
            action = %webhook.action,
        )
    )]
    pub async fn handle(&self, webhook: Webhook) -> Result<Outcome, NotifyError> {
        let action = webhook.action.to_string();
        WEBHOOKS_RECEIVED_TOTAL.with_label_values(&[action.as_str()]).inc();
        let timer = HANDLE_DURATION.start_timer();
        let res = self.dispatch(webhook).await;
        timer.observe_duration();

        match &res {
            Ok(Outcome::Ignored) | Ok(Outcome::Skipped) => WEBHOOKS_SKIPPED_TOTAL.inc(),
            Ok(_) => MESSAGES_POSTED_TOTAL.inc(),
            Err(e) => {
                NOTIFY_ERRORS_TOTAL.inc();
                warn!(error = %e, "webhook notification failed");
            }
        }
        res
    }

    async fn dispatch(&self, webhook: Webhook) -> Result<Outcome, NotifyError> {
        if webhook.action == Action::Other {
            return Ok(Outcome::Ignored);
        }

        let webhook = deanonymise(webhook, self.directory.as_ref()).await;
        let recipients = self.recipients(&webhook).await;
        let Some(message) = render(&webhook, &recipients) else {
            info!("nothing to notify");
            return Ok(Outcome::Skipped);
        };

        let (repository, number) = webhook.thread_key();
        let number = i64::try_from(number)
            .map_err(|_| NotifyError::Payload(format!("pull request number {number} out of range")))?;
        let existing = self.threads.find(repository, number).await?;

        match (&webhook.action, existing) {
            (Action::Opened, None) => {
                let ts = self.chat.post_message(&self.channel, &message, None).await?;
                self.threads.save(repository, number, &self.channel, &ts).await?;
                info!(%ts, "started slack thread");
                Ok(Outcome::Started { ts })
            }
            (_, Some(thread)) => {
                let ts = self
                    .chat
                    .post_message(&thread.channel, &message, Some(&thread.ts))
                    .await?;
                info!(%ts, thread_ts = %thread.ts, "posted thread reply");
                Ok(Outcome::Posted { ts, threaded: true })
            }
            (_, None) => {
                let ts = self.chat.post_message(&self.channel, &message, None).await?;
                info!(%ts, "posted without thread");
                Ok(Outcome::Posted { ts, threaded: false })
            }
        }
    }

    /// Slack users this event is addressed to. Unresolvable people are dropped.
    async fn recipients(&self, webhook: &Webhook) -> Vec<SlackUserId> {
        let emails = match &webhook.action {
            Action::ReviewRequested { requested_reviewer } => vec![requested_reviewer.email.clone()],
            Action::Reviewed { .. } => vec![webhook.pull_request.user.email.clone()],
            Action::Created { comment } => self.mentioned_emails(webhook, &comment.body).await,
            _ => Vec::new(),
        };

        let mut users = Vec::with_capacity(emails.len());
        for email in emails.iter().filter(|e| !e.is_empty()) {
            match self.chat.lookup_user_by_email(email).await {
                Ok(id) if !users.contains(&id) => users.push(id),
                Ok(_) => {}
                Err(e) => warn!(%email, error = %e, "no slack user for email"),
            }
        }
        users
    }

    async fn mentioned_emails(&self, webhook: &Webhook, body: &str) -> Vec<String> {
        let mut emails = Vec::new();
        for username in mentioned_usernames(body) {
            match self.directory.lookup_email(&webhook.pull_request.url, &username).await {
                Ok(email) => emails.push(email),
                Err(e) => warn!(%username, error = %e, "mentioned user not found in gitea"),
            }
        }
        emails
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gitea::client::mock::MockUserDirectory;
    use crate::slack::client::mock::MockChatClient;
    use crate::slack::Block;
    use crate::test_support::webhook;
    use crate::threads::repository::mock::MockThreadRepository;
    use serde_json::json;

    struct Fixture {
        chat: Arc<MockChatClient>,
        threads: Arc<MockThreadRepository>,
        svc: NotificationService,
    }

    fn fixture() -> Fixture {
        let chat = Arc::new(MockChatClient::with_users([
            ("alice@example.com", "UALICE"),
            ("bob@example.com", "UBOB"),
        ]));
        let directory = Arc::new(MockUserDirectory::with_users([
            ("alice", "alice@example.com"),
            ("bob", "bob@example.com"),
            ("carol", "carol@example.com"),
        ]));
        let threads = Arc::new(MockThreadRepository::default());
        let svc = NotificationService::new(chat.clone(), directory, threads.clone(), "C-REVIEW");
        Fixture { chat, threads, svc }
    }

    #[tokio::test]
    async fn opened_starts_and_stores_thread() {
        let f = fixture();
        let out = f.svc.handle(webhook("opened", json!({}))).await.unwrap();
        let Outcome::Started { ts } = out else { panic!("expected new thread") };

        let stored = f.threads.find("acme/widgets", 3).await.unwrap().unwrap();
        assert_eq!(stored.ts, ts);
        assert_eq!(stored.channel, "C-REVIEW");
        let posted = f.chat.posted();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].thread_ts, None);
    }

    #[tokio::test]
    async fn follow_ups_reply_in_thread() {
        let f = fixture();
        let Outcome::Started { ts: root } = f.svc.handle(webhook("opened", json!({}))).await.unwrap() else {
            panic!("expected new thread")
        };

        let review = webhook(
            "reviewed",
            json!({"review": {"type": "pull_request_review_approved", "content": "LGTM"}}),
        );
        let out = f.svc.handle(review).await.unwrap();
        assert!(matches!(out, Outcome::Posted { threaded: true, .. }));

        let posted = f.chat.posted();
        assert_eq!(posted[1].thread_ts.as_deref(), Some(root.as_str()));
        // Author deanonymised then resolved in Slack
        assert_eq!(posted[1].message.blocks[0].text(), "<@UALICE>, alice has approved your PR");
        assert_eq!(f.threads.len(), 1);
    }

    #[tokio::test]
    async fn event_without_thread_posts_to_channel() {
        let f = fixture();
        let out = f.svc.handle(webhook("closed", json!({}))).await.unwrap();
        assert!(matches!(out, Outcome::Posted { threaded: false, .. }));
        assert!(f.threads.is_empty());
    }

    #[tokio::test]
    async fn comment_mentions_resolve_through_gitea_and_slack() {
        let f = fixture();
        let hook = webhook(
            "created",
            json!({"comment": {"body": "@bob @carol @nobody please check\n> @alice old quote"}}),
        );
        let out = f.svc.handle(hook).await.unwrap();
        assert!(matches!(out, Outcome::Posted { .. }));

        // carol has no Slack account and nobody is unknown to Gitea
        let posted = f.chat.posted();
        assert_eq!(posted[0].message.blocks, vec![Block::section("<@UBOB>, you were mentioned in a comment")]);
    }

    #[tokio::test]
    async fn comment_without_resolvable_mentions_is_skipped() {
        let f = fixture();
        let hook = webhook("created", json!({"comment": {"body": "looks fine"}}));
        assert_eq!(f.svc.handle(hook).await.unwrap(), Outcome::Skipped);
        assert!(f.chat.posted().is_empty());
    }

    #[tokio::test]
    async fn unknown_action_is_ignored() {
        let f = fixture();
        assert_eq!(f.svc.handle(webhook("edited", json!({}))).await.unwrap(), Outcome::Ignored);
        assert!(f.chat.posted().is_empty());
    }

    #[tokio::test]
    async fn slack_failure_is_reported_and_nothing_stored() {
        let f = fixture();
        f.chat.fail_posts(true);
        let err = f.svc.handle(webhook("opened", json!({}))).await.unwrap_err();
        assert!(matches!(err, NotifyError::Slack(_)));
        assert!(f.threads.is_empty());
    }

    #[tokio::test]
    async fn failed_save_surfaces_as_storage_error() {
        let f = fixture();
        f.threads.fail_saves(true);
        let err = f.svc.handle(webhook("opened", json!({}))).await.unwrap_err();
        assert!(matches!(err, NotifyError::Storage(_)));
        assert!(!err.is_upstream());
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let v = serde_json::to_value(Outcome::Posted { ts: "1.2".into(), threaded: true }).unwrap();
        assert_eq!(v, json!({"status": "posted", "ts": "1.2", "threaded": true}));
        assert_eq!(serde_json::to_value(Outcome::Skipped).unwrap(), json!({"status": "skipped"}));
    }
}
