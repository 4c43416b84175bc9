use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use super::webhook::{Action, Webhook};
use crate::errors::NotifyError;

/// Resolves Gitea usernames to their real email addresses.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// `instance` is any URL on the Gitea host, usually the pull request's.
    async fn lookup_email(&self, instance: &Url, username: &str) -> Result<String, NotifyError>;
}

#[derive(Deserialize)]
struct ApiUser {
    email: String,
}

pub struct GiteaClient {
    http: Client,
    token: String,
    api_base: Option<Url>,
    cache: Cache<String, String>,
}

impl GiteaClient {
    pub fn new(cfg: &configs::GiteaConfig) -> Result<Self, NotifyError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        let api_base = match &cfg.api_base {
            Some(base) => Some(with_trailing_slash(base)?),
            None => None,
        };
        let cache = Cache::builder()
            .max_capacity(1_000)
            .time_to_live(Duration::from_secs(cfg.user_cache_ttl_secs))
            .build();
        Ok(Self { http, token: cfg.api_token.clone(), api_base, cache })
    }

    /// `GET /api/v1/users/{username}` on the configured base or the instance host.
    pub fn user_endpoint(&self, instance: &Url, username: &str) -> Result<Url, NotifyError> {
        validate_username(username)?;
        let path = format!("api/v1/users/{username}");
        match &self.api_base {
            Some(base) => base
                .join(&path)
                .map_err(|e| NotifyError::Gitea(format!("bad user endpoint: {e}"))),
            None => {
                let mut url = instance.clone();
                url.set_path(&path);
                url.set_query(None);
                url.set_fragment(None);
                Ok(url)
            }
        }
    }

    async fn fetch_email(&self, url: Url) -> Result<String, NotifyError> {
        let res = self
            .http
            .get(url)
            .header("Authorization", format!("token {}", self.token))
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(NotifyError::Gitea(format!("user lookup returned {}", res.status())));
        }
        let user = res.json::<ApiUser>().await?;
        Ok(user.email)
    }
}

#[async_trait]
impl UserDirectory for GiteaClient {
    #[instrument(skip(self, instance), fields(host = instance.host_str().unwrap_or_default()), err)]
    async fn lookup_email(&self, instance: &Url, username: &str) -> Result<String, NotifyError> {
        let url = self.user_endpoint(instance, username)?;
        let key = format!("{}{}", url.host_str().unwrap_or_default(), url.path());
        if let Some(email) = self.cache.get(&key).await {
            debug!(%username, "gitea user cache hit");
            return Ok(email);
        }
        let email = self.fetch_email(url).await?;
        self.cache.insert(key, email.clone()).await;
        Ok(email)
    }
}

fn with_trailing_slash(base: &str) -> Result<Url, NotifyError> {
    let base = if base.ends_with('/') { base.to_string() } else { format!("{base}/") };
    Url::parse(&base).map_err(|e| NotifyError::Gitea(format!("bad api base: {e}")))
}

fn validate_username(username: &str) -> Result<(), NotifyError> {
    let valid = !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(NotifyError::Gitea(format!("invalid username `{username}`")))
    }
}

/// Replace Gitea's placeholder emails with real ones where the directory knows them.
/// Failed lookups keep the placeholder.
pub async fn deanonymise(mut webhook: Webhook, directory: &dyn UserDirectory) -> Webhook {
    let instance = webhook.pull_request.url.clone();

    let sender = resolve(directory, &instance, &webhook.sender.username).await;
    if let Some(email) = sender {
        webhook.sender.email = email;
    }
    let author = resolve(directory, &instance, &webhook.pull_request.user.username).await;
    if let Some(email) = author {
        webhook.pull_request.user.email = email;
    }
    if let Action::ReviewRequested { ref mut requested_reviewer } = webhook.action {
        let username = requested_reviewer.username.clone();
        if let Some(email) = resolve(directory, &instance, &username).await {
            requested_reviewer.email = email;
        }
    }
    webhook
}

async fn resolve(directory: &dyn UserDirectory, instance: &Url, username: &str) -> Option<String> {
    match directory.lookup_email(instance, username).await {
        Ok(email) => Some(email),
        Err(e) => {
            warn!(%username, error = %e, "keeping anonymised email");
            None
        }
    }
}

/// In-memory directory for tests.
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockUserDirectory {
        emails: HashMap<String, String>,
        lookups: Mutex<Vec<String>>,
    }

    impl MockUserDirectory {
        pub fn with_users<I, S>(users: I) -> Self
        where
            I: IntoIterator<Item = (S, S)>,
            S: Into<String>,
        {
            let emails = users.into_iter().map(|(u, e)| (u.into(), e.into())).collect();
            Self { emails, lookups: Mutex::new(Vec::new()) }
        }

        pub fn lookups(&self) -> Vec<String> {
            self.lookups.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UserDirectory for MockUserDirectory {
        async fn lookup_email(&self, _instance: &Url, username: &str) -> Result<String, NotifyError> {
            self.lookups.lock().unwrap().push(username.to_string());
            self.emails
                .get(username)
                .cloned()
                .ok_or_else(|| NotifyError::Gitea(format!("user lookup returned 404 for {username}")))
        }
    }
}
