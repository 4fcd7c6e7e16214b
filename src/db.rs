use std::{
    ops::{Deref, DerefMut},
    str::FromStr,
};

use anyhow::Context;
use sqlx::{
    migrate::Migrator,
    pool::PoolConnection,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Sqlite, SqliteConnection, SqlitePool,
};
use tracing::{debug, trace};

use crate::config::DatabaseConfig;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Handle on the record store. Cheap to clone; all clones share one pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .with_context(|| format!("parse DATABASE_URL `{}`", config.url))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    /// Single-connection in-memory store with the schema applied.
    #[cfg(test)]
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // every connection to :memory: is its own database, so keep exactly one alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let db = Self { pool };
        db.ensure_schema().await?;
        Ok(db)
    }

    /// Creates the `user` table and its indexes if they are missing.
    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .context("run migrations")?;
        debug!("schema ensured");
        Ok(())
    }

    /// Acquires a scoped session. The underlying connection goes back to the
    /// pool when the returned [`Session`] is dropped.
    pub async fn open_session(&self) -> Result<Session, sqlx::Error> {
        let conn = self.pool.acquire().await?;
        trace!("session opened");
        Ok(Session { conn })
    }
}

/// One connection borrowed from the pool for the lifetime of a request.
pub struct Session {
    conn: PoolConnection<Sqlite>,
}

impl Deref for Session {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for Session {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        trace!("session released");
    }
}
