use std::sync::Arc;

use crate::config::AppConfig;
use crate::credentials::{hasher_for, CredentialHasher};
use crate::db::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
    pub hasher: Arc<dyn CredentialHasher>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = Database::connect(&config.database).await?;
        let hasher = hasher_for(config.password_hasher);
        Ok(Self::from_parts(db, config, hasher))
    }

    pub fn from_parts(
        db: Database,
        config: Arc<AppConfig>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        Self { db, config, hasher }
    }

    /// State backed by a fresh in-memory store and the default config.
    #[cfg(test)]
    pub async fn fake() -> Self {
        let config = Arc::new(AppConfig::from_lookup(|_| None).expect("default config"));
        let db = Database::in_memory().await.expect("in-memory database");
        let hasher = hasher_for(config.password_hasher);
        Self::from_parts(db, config, hasher)
    }

    /// Same store, different password hasher.
    #[cfg(test)]
    pub fn with_hasher(self, kind: crate::config::HasherKind) -> Self {
        let hasher = hasher_for(kind);
        Self { hasher, ..self }
    }
}
