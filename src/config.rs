use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl DbConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db: DbConfig,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let db = DbConfig {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:users.db?mode=rwc".into()),
            max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(5),
            acquire_timeout_secs: std::env::var("DB_ACQUIRE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5),
        };
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = std::env::var("APP_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(8080);
        Ok(Self { db, host, port })
    }

    /// Single-connection in-memory database, used by tests.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            db: DbConfig {
                url: "sqlite::memory:".into(),
                max_connections: 1,
                acquire_timeout_secs: 5,
            },
            host: "127.0.0.1".into(),
            port: 0,
        }
    }

    /// File-backed database with a multi-connection pool, used by tests.
    #[cfg(test)]
    pub fn sqlite_file(path: &std::path::Path, max_connections: u32) -> Self {
        Self {
            db: DbConfig {
                url: format!("sqlite:{}?mode=rwc", path.display()),
                max_connections,
                acquire_timeout_secs: 30,
            },
            host: "127.0.0.1".into(),
            port: 0,
        }
    }
}
