use std::time::Duration;

use configs::DatabaseConfig;
use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

/// Open a pooled connection using the database section of the app config.
pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<DatabaseConnection> {
    let url = cfg.connection_url()?;
    let mut opts = ConnectOptions::new(url);
    opts.max_connections(cfg.max_connections)
        .min_connections(cfg.min_connections)
        .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(cfg.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(cfg.max_lifetime_secs))
        .sqlx_logging(cfg.sqlx_logging);

    let db = Database::connect(opts).await?;
    info!(host = %cfg.host, database = %cfg.name, "database connected");
    Ok(db)
}

/// Connect using `DATABASE_URL` (loaded from `.env` if present). Used by tests.
pub async fn connect_from_env() -> anyhow::Result<DatabaseConnection> {
    let _ = dotenvy::dotenv();
    let url = std::env::var("DATABASE_URL")?;
    let cfg = DatabaseConfig { url, ..DatabaseConfig::default() };
    connect(&cfg).await
}

/// Apply pending migrations. Table creation is idempotent with the init script.
pub async fn migrate(db: &DatabaseConnection) -> anyhow::Result<()> {
    migration::Migrator::up(db, None).await?;
    info!("database migrations applied");
    Ok(())
}
