//! Persistence for conversations and messages.
//!
//! Handlers and services only see the [`ConversationRepo`] and
//! [`MessageRepo`] traits; [`DbPool`] picks the SQLite or PostgreSQL
//! implementation from configuration.

mod error;
#[cfg(feature = "database-postgres")]
pub mod postgres;
pub mod repos;
#[cfg(feature = "database-sqlite")]
pub mod sqlite;

#[cfg(all(test, any(feature = "database-sqlite", feature = "database-postgres")))]
pub mod tests;

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, SubsecRound, Utc};
pub use error::{DbError, DbResult};
pub use repos::*;

use crate::config::DatabaseConfig;

#[cfg(feature = "database-sqlite")]
pub(crate) static SQLITE_MIGRATOR: sqlx::migrate::Migrator =
    sqlx::migrate!("./migrations_sqlx/sqlite");

#[cfg(feature = "database-postgres")]
pub(crate) static POSTGRES_MIGRATOR: sqlx::migrate::Migrator =
    sqlx::migrate!("./migrations_sqlx/postgres");

/// Current time at the microsecond precision both backends store.
pub(crate) fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

enum Backend {
    #[cfg(feature = "database-sqlite")]
    Sqlite(sqlx::SqlitePool),
    #[cfg(feature = "database-postgres")]
    Postgres {
        write: sqlx::PgPool,
        read: Option<sqlx::PgPool>,
    },
    #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
    _None(std::convert::Infallible),
}

/// Connection pool plus the repositories built on it.
pub struct DbPool {
    backend: Backend,
    conversations: Arc<dyn ConversationRepo>,
    messages: Arc<dyn MessageRepo>,
}

impl DbPool {
    #[cfg(feature = "database-sqlite")]
    pub fn from_sqlite(pool: sqlx::SqlitePool) -> Self {
        Self {
            conversations: Arc::new(sqlite::SqliteConversationRepo::new(pool.clone())),
            messages: Arc::new(sqlite::SqliteMessageRepo::new(pool.clone())),
            backend: Backend::Sqlite(pool),
        }
    }

    /// `read` serves lookups and lists when set.
    #[cfg(feature = "database-postgres")]
    pub fn from_postgres(write: sqlx::PgPool, read: Option<sqlx::PgPool>) -> Self {
        Self {
            conversations: Arc::new(postgres::PostgresConversationRepo::new(
                write.clone(),
                read.clone(),
            )),
            messages: Arc::new(postgres::PostgresMessageRepo::new(
                write.clone(),
                read.clone(),
            )),
            backend: Backend::Postgres { write, read },
        }
    }

    /// Open the configured database.
    pub async fn from_config(config: &DatabaseConfig) -> DbResult<Self> {
        match config {
            DatabaseConfig::None => Err(DbError::NotConfigured),
            #[cfg(feature = "database-sqlite")]
            DatabaseConfig::Sqlite(cfg) => Ok(Self::from_sqlite(connect_sqlite(cfg).await?)),
            #[cfg(feature = "database-postgres")]
            DatabaseConfig::Postgres(cfg) => {
                let (write, read) = connect_postgres(cfg).await?;
                Ok(Self::from_postgres(write, read))
            }
        }
    }

    fn kind(&self) -> &'static str {
        match &self.backend {
            #[cfg(feature = "database-sqlite")]
            Backend::Sqlite(_) => "sqlite",
            #[cfg(feature = "database-postgres")]
            Backend::Postgres { .. } => "postgres",
            #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
            Backend::_None(infallible) => match *infallible {},
        }
    }

    /// Apply pending migrations. Already-applied ones are skipped.
    pub async fn run_migrations(&self) -> DbResult<()> {
        let started = std::time::Instant::now();
        match &self.backend {
            #[cfg(feature = "database-sqlite")]
            Backend::Sqlite(pool) => SQLITE_MIGRATOR.run(pool).await?,
            #[cfg(feature = "database-postgres")]
            Backend::Postgres { write, .. } => POSTGRES_MIGRATOR.run(write).await?,
            #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
            Backend::_None(infallible) => match *infallible {},
        }
        tracing::info!(
            backend = self.kind(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Database migrations applied"
        );
        Ok(())
    }

    pub fn conversations(&self) -> Arc<dyn ConversationRepo> {
        Arc::clone(&self.conversations)
    }

    pub fn messages(&self) -> Arc<dyn MessageRepo> {
        Arc::clone(&self.messages)
    }

    /// Round-trip a trivial query on every pool.
    pub async fn health_check(&self) -> DbResult<()> {
        match &self.backend {
            #[cfg(feature = "database-sqlite")]
            Backend::Sqlite(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
            #[cfg(feature = "database-postgres")]
            Backend::Postgres { write, read } => {
                sqlx::query("SELECT 1").execute(write).await?;
                if let Some(read) = read {
                    sqlx::query("SELECT 1").execute(read).await?;
                }
            }
            #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
            Backend::_None(infallible) => match *infallible {},
        }
        Ok(())
    }
}

#[cfg(feature = "database-sqlite")]
async fn connect_sqlite(cfg: &crate::config::SqliteConfig) -> DbResult<sqlx::SqlitePool> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

    let journal_mode = if cfg.wal_mode {
        SqliteJournalMode::Wal
    } else {
        SqliteJournalMode::Delete
    };
    // Conversation deletes rely on ON DELETE CASCADE.
    let options = SqliteConnectOptions::new()
        .filename(&cfg.path)
        .create_if_missing(cfg.create_if_missing)
        .foreign_keys(true)
        .journal_mode(journal_mode)
        .busy_timeout(Duration::from_millis(cfg.busy_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(cfg.max_connections)
        .connect_with(options)
        .await?;
    tracing::info!(path = %cfg.path, "Opened SQLite database");
    Ok(pool)
}

#[cfg(feature = "database-postgres")]
async fn connect_postgres(
    cfg: &crate::config::PostgresConfig,
) -> DbResult<(sqlx::PgPool, Option<sqlx::PgPool>)> {
    let options = || {
        sqlx::postgres::PgPoolOptions::new()
            .min_connections(cfg.min_connections)
            .max_connections(cfg.max_connections)
            .acquire_timeout(Duration::from_secs(cfg.connect_timeout_secs))
    };

    let write = options().connect(&cfg.url).await?;
    let read = match &cfg.read_url {
        Some(url) => {
            tracing::info!("Using PostgreSQL read replica for reads");
            Some(options().connect(url).await?)
        }
        None => None,
    };
    Ok((write, read))
}
