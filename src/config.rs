use std::str::FromStr;

/// Which credential hasher is applied to passwords before they are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HasherKind {
    /// Store passwords exactly as received.
    Plain,
    Argon2,
}

impl FromStr for HasherKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(Self::Plain),
            "argon2" => Ok(Self::Argon2),
            other => anyhow::bail!("unknown PASSWORD_HASHER `{other}` (expected plain or argon2)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub host: String,
    pub port: u16,
    pub password_hasher: HasherKind,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = DatabaseConfig {
            url: get("DATABASE_URL").unwrap_or_else(|| "sqlite://database.db".into()),
            max_connections: get("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(5),
        };
        let password_hasher = match get("PASSWORD_HASHER") {
            Some(v) => v.parse()?,
            None => HasherKind::Plain,
        };
        Ok(Self {
            database,
            host: get("APP_HOST").unwrap_or_else(|| "127.0.0.1".into()),
            port: get("APP_PORT")
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8000),
            password_hasher,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
