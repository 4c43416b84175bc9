//! Gitea webhook payloads for pull request, review and comment events.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(try_from = "RawUser")]
pub struct User {
    pub email: String,
    pub username: String,
}

/// Gitea user objects carry `login`, usually next to `username`.
#[derive(Deserialize)]
struct RawUser {
    #[serde(default)]
    email: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    login: Option<String>,
}

impl TryFrom<RawUser> for User {
    type Error = String;

    fn try_from(raw: RawUser) -> Result<Self, Self::Error> {
        let username = raw
            .username
            .filter(|u| !u.is_empty())
            .or(raw.login)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| "user without `username` or `login`".to_string())?;
        Ok(Self { email: raw.email, username })
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestState {
    Open,
    Closed,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Repository {
    pub full_name: String,
}

impl Repository {
    /// `owner/name` split on the first slash.
    pub fn owner_and_name(&self) -> Option<(&str, &str)> {
        self.full_name.split_once('/')
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Comment {
    pub body: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PullRequest {
    pub number: u64,
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub comments: u64,
    pub user: User,
    #[serde(rename = "html_url")]
    pub url: Url,
    pub state: PullRequestState,
    #[serde(default)]
    pub merged: bool,
}

impl PullRequest {
    /// Slack link markup.
    pub fn slack_link(&self) -> String {
        format!("<{}|{}>", self.url, self.title)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum Review {
    #[serde(rename = "pull_request_review_approved")]
    Approved { content: String },
    #[serde(rename = "pull_request_review_rejected")]
    Rejected { content: String },
    #[serde(rename = "pull_request_review_comment")]
    Comment { content: String },
}

impl fmt::Display for Review {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Review::Approved { .. } => "approved",
            Review::Rejected { .. } => "rejected",
            Review::Comment { .. } => "commented on",
        };
        f.write_str(verb)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum Action {
    Opened,
    Closed,
    Reopened,
    Merged,
    Created { comment: Comment },
    Reviewed { review: Review },
    ReviewRequested { requested_reviewer: User },
    /// Everything Gitea sends that has no notification (edited, labeled, ...).
    #[serde(other)]
    Other,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Opened => "opened",
            Action::Closed => "closed",
            Action::Reopened => "reopened",
            Action::Merged => "merged",
            Action::Created { .. } => "created",
            Action::Reviewed { .. } => "reviewed",
            Action::ReviewRequested { .. } => "review_requested",
            Action::Other => "other",
        };
        f.write_str(name)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(try_from = "RawWebhook")]
pub struct Webhook {
    #[serde(flatten)]
    pub action: Action,
    pub pull_request: PullRequest,
    pub sender: User,
    pub repository: Repository,
}

/// Comment events carry the pull request as `issue`, sometimes alongside `pull_request`.
#[derive(Deserialize)]
struct RawWebhook {
    #[serde(flatten)]
    action: Action,
    #[serde(default)]
    pull_request: Option<PullRequest>,
    #[serde(default)]
    issue: Option<PullRequest>,
    sender: User,
    repository: Repository,
}

impl TryFrom<RawWebhook> for Webhook {
    type Error = String;

    fn try_from(raw: RawWebhook) -> Result<Self, Self::Error> {
        let pull_request = raw
            .pull_request
            .or(raw.issue)
            .ok_or_else(|| "missing `pull_request` or `issue`".to_string())?;
        Ok(Self { action: raw.action, pull_request, sender: raw.sender, repository: raw.repository })
    }
}

impl Webhook {
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Key of the Slack thread this event belongs to.
    pub fn thread_key(&self) -> (&str, u64) {
        (&self.repository.full_name, self.pull_request.number)
    }

    /// Gitea reports a merge as `closed` with `merged` set.
    pub fn effective_action(&self) -> &Action {
        match self.action {
            Action::Closed if self.pull_request.merged => &Action::Merged,
            _ => &self.action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{pull_request_payload, webhook_json};
    use serde_json::json;

    #[test]
    fn parses_opened_pull_request() {
        let hook = Webhook::from_slice(webhook_json("opened", json!({})).as_bytes()).unwrap();
        assert_eq!(hook.action, Action::Opened);
        assert_eq!(hook.pull_request.number, 3);
        assert_eq!(hook.pull_request.state, PullRequestState::Open);
        assert_eq!(hook.sender.username, "alice");
        assert_eq!(hook.thread_key(), ("acme/widgets", 3));
        assert_eq!(hook.repository.owner_and_name(), Some(("acme", "widgets")));
    }

    #[test]
    fn parses_review_variants() {
        let hook = Webhook::from_slice(
            webhook_json(
                "reviewed",
                json!({"review": {"type": "pull_request_review_approved", "content": "LGTM"}}),
            )
            .as_bytes(),
        )
        .unwrap();
        let Action::Reviewed { review } = &hook.action else { panic!("expected review") };
        assert_eq!(review.to_string(), "approved");

        let comment: Review = serde_json::from_value(json!({"type": "pull_request_review_comment", "content": ""})).unwrap();
        assert_eq!(comment.to_string(), "commented on");
        let rejected: Review = serde_json::from_value(json!({"type": "pull_request_review_rejected", "content": "no"})).unwrap();
        assert_eq!(rejected.to_string(), "rejected");
    }

    #[test]
    fn parses_review_request() {
        let hook = Webhook::from_slice(
            webhook_json(
                "review_requested",
                json!({"requested_reviewer": {"email": "bob@noreply.example", "username": "bob"}}),
            )
            .as_bytes(),
        )
        .unwrap();
        let Action::ReviewRequested { requested_reviewer } = &hook.action else { panic!("expected request") };
        assert_eq!(requested_reviewer.username, "bob");
        assert_eq!(hook.action.to_string(), "review_requested");
    }

    #[test]
    fn comment_payload_uses_issue_field() {
        let body = json!({
            "action": "created",
            "comment": {"body": "hey @bob"},
            "issue": pull_request_payload(),
            "sender": {"email": "carol@example.com", "username": "carol"},
            "repository": {"full_name": "acme/widgets"},
        });
        let hook: Webhook = serde_json::from_value(body).unwrap();
        assert!(matches!(hook.action, Action::Created { ref comment } if comment.body == "hey @bob"));
        assert_eq!(hook.pull_request.number, 3);
    }

    #[test]
    fn comment_payload_with_both_fields_prefers_pull_request() {
        let mut pr = pull_request_payload();
        pr["title"] = json!("from pull_request");
        let body = json!({
            "action": "created",
            "comment": {"body": "ok"},
            "issue": pull_request_payload(),
            "pull_request": pr,
            "sender": {"email": "carol@example.com", "username": "carol"},
            "repository": {"full_name": "acme/widgets"},
        });
        let hook: Webhook = serde_json::from_value(body).unwrap();
        assert_eq!(hook.pull_request.title, "from pull_request");
    }

    #[test]
    fn user_falls_back_to_login() {
        let only_login: User = serde_json::from_value(json!({"login": "dave", "email": "d@example.com"})).unwrap();
        assert_eq!(only_login.username, "dave");

        let both: User = serde_json::from_value(json!({"login": "erin", "username": "erin", "id": 4})).unwrap();
        assert_eq!(both.username, "erin");
        assert_eq!(both.email, "");

        assert!(serde_json::from_value::<User>(json!({"email": "x@example.com"})).is_err());
    }

    #[test]
    fn review_request_with_login_only_reviewer() {
        let hook = Webhook::from_slice(
            webhook_json("review_requested", json!({"requested_reviewer": {"login": "bob", "email": "bob@noreply.example"}}))
                .as_bytes(),
        )
        .unwrap();
        let Action::ReviewRequested { requested_reviewer } = &hook.action else { panic!("expected request") };
        assert_eq!(requested_reviewer.username, "bob");
    }

    #[test]
    fn unknown_action_is_other() {
        let hook = Webhook::from_slice(webhook_json("label_updated", json!({})).as_bytes()).unwrap();
        assert_eq!(hook.action, Action::Other);
    }

    #[test]
    fn closed_and_merged_reads_as_merged() {
        let mut hook = Webhook::from_slice(webhook_json("closed", json!({})).as_bytes()).unwrap();
        assert_eq!(hook.effective_action(), &Action::Closed);
        hook.pull_request.merged = true;
        assert_eq!(hook.effective_action(), &Action::Merged);
    }

    #[test]
    fn missing_pull_request_is_an_error() {
        let body = json!({"action": "opened", "sender": {"username": "a"}, "repository": {"full_name": "a/b"}});
        assert!(serde_json::from_value::<Webhook>(body).is_err());
    }
}
