use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::blocks::{Block, SlackMessage, SlackUserId};
use crate::errors::NotifyError;

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn lookup_user_by_email(&self, email: &str) -> Result<SlackUserId, NotifyError>;

    /// Returns the `ts` of the posted message.
    async fn post_message(
        &self,
        channel: &str,
        message: &SlackMessage,
        thread_ts: Option<&str>,
    ) -> Result<String, NotifyError>;
}

#[derive(Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
    blocks: &'a [Block],
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<&'a str>,
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

#[derive(Deserialize)]
struct LookupResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    user: Option<LookupUser>,
}

#[derive(Deserialize)]
struct LookupUser {
    id: String,
}

/// Slack Web API over reqwest with a bot token.
pub struct SlackClient {
    http: Client,
    token: String,
    api_base: String,
}

impl SlackClient {
    pub fn new(cfg: &configs::SlackConfig) -> Result<Self, NotifyError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            token: cfg.api_token.clone(),
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }
}

fn api_error(error: Option<String>) -> NotifyError {
    NotifyError::Slack(error.unwrap_or_else(|| "unknown_error".to_string()))
}

#[async_trait]
impl ChatClient for SlackClient {
    #[instrument(skip(self), err)]
    async fn lookup_user_by_email(&self, email: &str) -> Result<SlackUserId, NotifyError> {
        let res = self
            .http
            .get(self.endpoint("users.lookupByEmail"))
            .bearer_auth(&self.token)
            .query(&[("email", email)])
            .send()
            .await?
            .error_for_status()?
            .json::<LookupResponse>()
            .await?;
        match (res.ok, res.user) {
            (true, Some(user)) => Ok(SlackUserId(user.id)),
            (_, _) => Err(api_error(res.error)),
        }
    }

    #[instrument(skip(self, message), err)]
    async fn post_message(
        &self,
        channel: &str,
        message: &SlackMessage,
        thread_ts: Option<&str>,
    ) -> Result<String, NotifyError> {
        let body = PostMessageRequest {
            channel,
            text: &message.text,
            blocks: &message.blocks,
            thread_ts,
        };
        let res = self
            .http
            .post(self.endpoint("chat.postMessage"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<PostMessageResponse>()
            .await?;
        match (res.ok, res.ts) {
            (true, Some(ts)) => Ok(ts),
            (_, _) => Err(api_error(res.error)),
        }
    }
}

/// Recording chat client for tests.
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub struct PostedMessage {
        pub channel: String,
        pub message: SlackMessage,
        pub thread_ts: Option<String>,
        pub ts: String,
    }

    #[derive(Default)]
    pub struct MockChatClient {
        users: HashMap<String, SlackUserId>,
        posted: Mutex<Vec<PostedMessage>>,
        counter: AtomicU64,
        fail_posts: AtomicBool,
    }

    impl MockChatClient {
        /// `(email, slack id)` pairs known to the workspace.
        pub fn with_users<I, S>(users: I) -> Self
        where
            I: IntoIterator<Item = (S, S)>,
            S: Into<String>,
        {
            let users = users
                .into_iter()
                .map(|(email, id)| (email.into(), SlackUserId(id.into())))
                .collect();
            Self { users, ..Self::default() }
        }

        pub fn fail_posts(&self, fail: bool) {
            self.fail_posts.store(fail, Ordering::SeqCst);
        }

        pub fn posted(&self) -> Vec<PostedMessage> {
            self.posted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatClient for MockChatClient {
        async fn lookup_user_by_email(&self, email: &str) -> Result<SlackUserId, NotifyError> {
            self.users
                .get(email)
                .cloned()
                .ok_or_else(|| NotifyError::Slack("users_not_found".into()))
        }

        async fn post_message(
            &self,
            channel: &str,
            message: &SlackMessage,
            thread_ts: Option<&str>,
        ) -> Result<String, NotifyError> {
            if self.fail_posts.load(Ordering::SeqCst) {
                return Err(NotifyError::Slack("channel_not_found".into()));
            }
            let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
            let ts = format!("1700000000.{n:06}");
            self.posted.lock().unwrap().push(PostedMessage {
                channel: channel.to_string(),
                message: message.clone(),
                thread_ts: thread_ts.map(str::to_string),
                ts: ts.clone(),
            });
            Ok(ts)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> SlackClient {
        let cfg = configs::SlackConfig {
            api_token: "xoxb-test".into(),
            channel: "C1".into(),
            api_base: server.url("/api/"),
            ..configs::SlackConfig::default()
        };
        SlackClient::new(&cfg).unwrap()
    }

    #[tokio::test]
    async fn posts_threaded_message_with_bearer_token() {
        let server = MockServer::start_async().await;
        let m = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/chat.postMessage")
                    .header("authorization", "Bearer xoxb-test")
                    .json_body(json!({
                        "channel": "C1",
                        "text": "hello",
                        "blocks": [{"type": "section", "text": {"type": "mrkdwn", "text": "hello"}}],
                        "thread_ts": "1.000001"
                    }));
                then.status(200).json_body(json!({"ok": true, "channel": "C1", "ts": "2.000002"}));
            })
            .await;

        let msg = SlackMessage::new("hello", vec![Block::section("hello")]);
        let ts = client(&server).post_message("C1", &msg, Some("1.000001")).await.unwrap();
        assert_eq!(ts, "2.000002");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn root_message_omits_thread_ts() {
        let server = MockServer::start_async().await;
        let m = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/chat.postMessage")
                    .json_body(json!({"channel": "C1", "text": "t", "blocks": []}));
                then.status(200).json_body(json!({"ok": true, "ts": "3.000003"}));
            })
            .await;

        let msg = SlackMessage::new("t", vec![]);
        assert_eq!(client(&server).post_message("C1", &msg, None).await.unwrap(), "3.000003");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn api_level_failure_maps_to_slack_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/chat.postMessage");
                then.status(200).json_body(json!({"ok": false, "error": "not_in_channel"}));
            })
            .await;

        let msg = SlackMessage::new("t", vec![]);
        let err = client(&server).post_message("C1", &msg, None).await.unwrap_err();
        assert!(matches!(err, NotifyError::Slack(ref e) if e == "not_in_channel"));
    }

    #[tokio::test]
    async fn looks_up_user_by_email() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/users.lookupByEmail")
                    .query_param("email", "bob@example.com");
                then.status(200).json_body(json!({"ok": true, "user": {"id": "U0BOB", "name": "bob"}}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/users.lookupByEmail")
                    .query_param("email", "nobody@example.com");
                then.status(200).json_body(json!({"ok": false, "error": "users_not_found"}));
            })
            .await;

        let c = client(&server);
        assert_eq!(c.lookup_user_by_email("bob@example.com").await.unwrap(), SlackUserId("U0BOB".into()));
        let err = c.lookup_user_by_email("nobody@example.com").await.unwrap_err();
        assert!(matches!(err, NotifyError::Slack(ref e) if e == "users_not_found"));
    }

    #[tokio::test]
    async fn http_error_status_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/chat.postMessage");
                then.status(500);
            })
            .await;

        let msg = SlackMessage::new("t", vec![]);
        let err = client(&server).post_message("C1", &msg, None).await.unwrap_err();
        assert!(matches!(err, NotifyError::Http(_)));
    }
}
