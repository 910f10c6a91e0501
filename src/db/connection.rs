use crate::config::DatabaseConfig;
use anyhow::{Context, Result};
use log::LevelFilter;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{ConnectOptions, Sqlite, SqlitePool};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

pub type Pool = SqlitePool;

/// A pooled connection used as one unit of work. Returned to the pool on drop.
pub type Session = PoolConnection<Sqlite>;

/// Connection factory built once from configuration and shared read-only.
#[derive(Debug, Clone)]
pub struct Database {
    pool: Pool,
}

impl Database {
    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self> {
        let url = expand_home(&cfg.url);
        let options = SqliteConnectOptions::from_str(&url)
            .with_context(|| format!("invalid database url: {}", cfg.url))?
            .create_if_missing(true)
            .foreign_keys(true)
            .log_statements(statement_log_level(cfg.echo));

        if let Some(parent) = sqlite_file_path(&url).as_deref().and_then(Path::parent) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(cfg.max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to connect to {}", cfg.url))?;
        info!(url = %cfg.url, echo = cfg.echo, "connected to database");
        Ok(Self { pool })
    }

    /// Apply the embedded schema migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("failed to run migrations")?;
        debug!("migrations applied");
        Ok(())
    }

    pub async fn session(&self) -> Result<Session> {
        self.pool
            .acquire()
            .await
            .context("failed to acquire database session")
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Level sqlx logs executed statements at; `Off` unless echo is on.
fn statement_log_level(echo: bool) -> LevelFilter {
    if echo {
        LevelFilter::Info
    } else {
        LevelFilter::Off
    }
}

/// Expand a leading `~/` in a file-backed SQLite URL. Other URLs pass through.
fn expand_home(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    let path = rest.strip_prefix("//").unwrap_or(rest);
    match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(tail), Ok(home)) => format!("sqlite://{}/{}", home.trim_end_matches('/'), tail),
        _ => url.to_string(),
    }
}

/// File path of a file-backed SQLite URL, without the query string.
fn sqlite_file_path(url: &str) -> Option<PathBuf> {
    let rest = url.strip_prefix("sqlite:")?;
    if rest.starts_with(":memory") {
        return None;
    }
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let path = rest.split_once('?').map_or(rest, |(p, _)| p);
    (!path.is_empty()).then(|| PathBuf::from(path))
}
