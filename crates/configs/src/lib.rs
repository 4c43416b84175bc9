use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;
use std::net::SocketAddr;
use url::Url;

/// Variables the compose file passes to the server container.
pub const BIND_ADDRESS: &str = "BIND_ADDRESS";
pub const SLACK_CHANNEL: &str = "SLACK_CHANNEL";
pub const SLACK_API_TOKEN: &str = "SLACK_API_TOKEN";
pub const GITEA_API_TOKEN: &str = "GITEA_API_TOKEN";
pub const POSTGRES_PASSWORD: &str = "POSTGRES_PASSWORD";
pub const POSTGRES_DB: &str = "POSTGRES_DB";

pub const DEPLOYMENT_VARS: [&str; 6] = [
    BIND_ADDRESS,
    SLACK_CHANNEL,
    SLACK_API_TOKEN,
    GITEA_API_TOKEN,
    POSTGRES_PASSWORD,
    POSTGRES_DB,
];

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub gitea: GiteaConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: default_bind_address(), worker_threads: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default = "default_db_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            host: default_db_host(),
            port: default_db_port(),
            user: default_db_user(),
            password: String::new(),
            name: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
            run_migrations: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackConfig {
    #[serde(default)]
    pub api_token: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default = "default_slack_api_base")]
    pub api_base: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            channel: String::new(),
            api_base: default_slack_api_base(),
            timeout_secs: default_http_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GiteaConfig {
    #[serde(default)]
    pub api_token: String,
    /// Overrides the host taken from each webhook's pull request URL.
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_cache_ttl")]
    pub user_cache_ttl_secs: u64,
}

impl Default for GiteaConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            api_base: None,
            timeout_secs: default_http_timeout(),
            user_cache_ttl_secs: default_user_cache_ttl(),
        }
    }
}

fn default_bind_address() -> String { "0.0.0.0:4242".into() }
fn default_db_host() -> String { "db".into() }
fn default_db_port() -> u16 { 5432 }
fn default_db_user() -> String { "postgres".into() }
fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 1 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_max_lifetime() -> u64 { 3600 }
fn default_acquire_timeout() -> u64 { 30 }
fn default_true() -> bool { true }
fn default_slack_api_base() -> String { "https://slack.com/api".into() }
fn default_http_timeout() -> u64 { 10 }
fn default_user_cache_ttl() -> u64 { 300 }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    load_from_str(&content)
}

pub fn load_from_str(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// config.toml when present, environment on top, then validation.
    pub fn load() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) if is_not_found(&e) => AppConfig::default(),
            Err(e) => return Err(e),
        };
        cfg.apply_env(|name| std::env::var(name).ok());
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Overlay values from the environment. Values are taken verbatim;
    /// blank ones leave the file value or default in place.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |target: &mut String, name: &str| {
            if let Some(v) = lookup(name).filter(|v| !v.trim().is_empty()) {
                *target = v;
            }
        };

        set(&mut self.server.bind_address, BIND_ADDRESS);
        set(&mut self.slack.channel, SLACK_CHANNEL);
        set(&mut self.slack.api_token, SLACK_API_TOKEN);
        set(&mut self.gitea.api_token, GITEA_API_TOKEN);
        set(&mut self.database.password, POSTGRES_PASSWORD);
        set(&mut self.database.name, POSTGRES_DB);
        set(&mut self.database.host, "POSTGRES_HOST");
        set(&mut self.database.user, "POSTGRES_USER");
        set(&mut self.database.url, "DATABASE_URL");

        if let Some(port) = lookup("POSTGRES_PORT").and_then(|p| p.parse::<u16>().ok()) {
            self.database.port = port;
        }
        if let Some(w) = lookup("TOKIO_WORKER_THREADS").and_then(|v| v.parse::<usize>().ok()) {
            self.server.worker_threads = Some(w);
        }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.database.validate()?;
        self.slack.validate()?;
        self.gitea.validate()?;
        Ok(())
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.downcast_ref::<std::io::Error>()
        .map(|io| io.kind() == std::io::ErrorKind::NotFound)
        .unwrap_or(false)
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.bind_address.trim().is_empty() {
            self.bind_address = default_bind_address();
        }
        self.socket_addr()?;
        if self.worker_threads == Some(0) {
            self.worker_threads = None;
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| anyhow!("{BIND_ADDRESS} `{}` is not a socket address: {e}", self.bind_address))
    }
}

impl DatabaseConfig {
    /// Explicit URL wins; otherwise assembled from the compose variables.
    pub fn connection_url(&self) -> Result<String> {
        if !self.url.trim().is_empty() {
            return Ok(self.url.trim().to_string());
        }
        let mut url = Url::parse(&format!("postgres://{}:{}/{}", self.host, self.port, self.name))
            .map_err(|e| anyhow!("cannot build database url: {e}"))?;
        url.set_username(&self.user)
            .map_err(|_| anyhow!("database user cannot be encoded"))?;
        url.set_password(Some(&self.password))
            .map_err(|_| anyhow!("database password cannot be encoded"))?;
        Ok(url.to_string())
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            if self.password.is_empty() {
                return Err(anyhow!("{POSTGRES_PASSWORD} is required when DATABASE_URL is not set"));
            }
            if self.name.trim().is_empty() {
                return Err(anyhow!("{POSTGRES_DB} is required when DATABASE_URL is not set"));
            }
        } else {
            let lower = self.url.to_lowercase();
            if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://")) {
                return Err(anyhow!("database url must start with postgresql:// or postgres://"));
            }
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive"));
        }
        Ok(())
    }
}

impl SlackConfig {
    fn validate(&self) -> Result<()> {
        if self.api_token.trim().is_empty() {
            return Err(anyhow!("{SLACK_API_TOKEN} is required"));
        }
        if self.channel.trim().is_empty() {
            return Err(anyhow!("{SLACK_CHANNEL} is required"));
        }
        Url::parse(&self.api_base).map_err(|e| anyhow!("slack.api_base is not a url: {e}"))?;
        Ok(())
    }
}

impl GiteaConfig {
    fn validate(&self) -> Result<()> {
        if self.api_token.trim().is_empty() {
            return Err(anyhow!("{GITEA_API_TOKEN} is required"));
        }
        if let Some(base) = &self.api_base {
            Url::parse(base).map_err(|e| anyhow!("gitea.api_base is not a url: {e}"))?;
        }
        Ok(())
    }
}
