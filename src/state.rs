use crate::config::AppConfig;
use crate::users::repo::{CredentialStore, SqliteStore};
use anyhow::Context;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
}

impl AppState {
    pub async fn init(config: &AppConfig) -> anyhow::Result<Self> {
        let store = SqliteStore::connect(config)
            .await
            .context("connect to database")?;

        if let Err(e) = store.migrate().await {
            warn!(error = %e, "migration failed; continuing");
        }

        Ok(Self::new(Arc::new(store)))
    }

    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }
}
