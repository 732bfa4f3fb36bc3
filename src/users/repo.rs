use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::debug;

use crate::config::AppConfig;
use crate::errors::StoreError;
use crate::users::repo_types::{LookupId, NewUser, UserRecord};

/// Read/write access to the `users` table.
///
/// Every call takes its own connection from the pool and hands it back when
/// the call returns, whatever the outcome.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Exact-match lookup; a miss is `Ok(None)`.
    async fn find_by_id(&self, id: &LookupId) -> Result<Option<UserRecord>, StoreError>;

    /// Every record, ordered by id. Not paginated.
    async fn find_all(&self) -> Result<Vec<UserRecord>, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn insert(&self, user: &NewUser) -> Result<UserRecord, StoreError>;
}

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(config: &AppConfig) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.db.max_connections)
            .acquire_timeout(config.db.acquire_timeout())
            .connect(&config.db.url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    #[cfg(test)]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn find_by_id(&self, id: &LookupId) -> Result<Option<UserRecord>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let query = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, email, password_hash
            FROM users
            WHERE id = ?
            "#,
        );
        let query = match id {
            LookupId::Int(n) => query.bind(*n),
            LookupId::Text(raw) => query.bind(raw.as_str()),
        };
        let user = query.fetch_optional(&mut *conn).await?;
        debug!(%id, found = user.is_some(), "find_by_id");
        Ok(user)
    }

    async fn find_all(&self) -> Result<Vec<UserRecord>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let users = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, email, password_hash
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;
        debug!(count = users.len(), "find_all");
        Ok(users)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, email, password_hash
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: &NewUser) -> Result<UserRecord, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let created = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES (?, ?, ?)
            RETURNING id, username, email, password_hash
            "#,
        )
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(user.password_hash.as_str())
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::DuplicateUsername(user.username.clone())
            }
            other => StoreError::Unavailable(other),
        })?;
        debug!(user_id = created.id, "user inserted");
        Ok(created)
    }
}

/// Opaque hash used for seeded rows that never log in.
#[cfg(test)]
pub(crate) const SEED_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c2VlZHNhbHQ$c2VlZGhhc2gtc2VlZGhhc2gtc2VlZGhhc2gtc2VlZA";

/// In-memory store holding `admin`, `user1` and `user2` as ids 1..=3.
#[cfg(test)]
pub(crate) async fn seeded_store() -> SqliteStore {
    let store = SqliteStore::connect(&AppConfig::in_memory())
        .await
        .expect("connect in-memory sqlite");
    store.migrate().await.expect("migrate");
    for name in ["admin", "user1", "user2"] {
        store
            .insert(&NewUser {
                username: name.into(),
                email: format!("{name}@example.com"),
                password_hash: SEED_HASH.into(),
            })
            .await
            .expect("seed user");
    }
    store
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn find_by_id_returns_seeded_user() {
        let store = seeded_store().await;
        let user = store
            .find_by_id(&LookupId::Int(1))
            .await
            .unwrap()
            .expect("admin exists");
        assert_eq!(user.username, "admin");
        assert_eq!(user.email, "admin@example.com");
    }

    #[tokio::test]
    async fn find_by_id_accepts_numeric_text() {
        let store = seeded_store().await;
        let user = store.find_by_id(&LookupId::from("2")).await.unwrap();
        assert_eq!(user.map(|u| u.username), Some("user1".to_string()));
    }

    #[tokio::test]
    async fn find_by_id_miss_is_none() {
        let store = seeded_store().await;
        assert!(store.find_by_id(&LookupId::Int(999)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn injection_payload_is_a_literal_miss() {
        let store = seeded_store().await;
        for payload in [
            "1; DROP TABLE users; --",
            "1 OR 1=1",
            "' OR '1'='1",
            "1' UNION SELECT 1, 'x', 'y', 'z' --",
        ] {
            let found = store.find_by_id(&LookupId::from(payload)).await.unwrap();
            assert!(found.is_none(), "payload {payload:?} matched a row");
        }
        let users = store.find_all().await.unwrap();
        assert_eq!(users.len(), 3);
    }

    #[tokio::test]
    async fn find_all_is_ordered_by_id() {
        let store = seeded_store().await;
        let users = store.find_all().await.unwrap();
        let ids: Vec<i64> = users.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn find_all_on_empty_table() {
        let store = SqliteStore::connect(&AppConfig::in_memory()).await.unwrap();
        store.migrate().await.unwrap();
        assert!(store.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_assigns_next_id() {
        let store = seeded_store().await;
        let created = store
            .insert(&NewUser {
                username: "carol".into(),
                email: "carol@example.com".into(),
                password_hash: SEED_HASH.into(),
            })
            .await
            .unwrap();
        assert_eq!(created.id, 4);
        let found = store.find_by_username("carol").await.unwrap();
        assert_eq!(found, Some(created));
    }

    #[tokio::test]
    async fn insert_duplicate_username_is_rejected() {
        let store = seeded_store().await;
        let err = store
            .insert(&NewUser {
                username: "admin".into(),
                email: "second-admin@example.com".into(),
                password_hash: SEED_HASH.into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUsername(ref name) if name == "admin"));
        assert_eq!(store.find_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn closed_pool_is_unavailable() {
        let store = seeded_store().await;
        store.pool().close().await;
        let err = store.find_by_id(&LookupId::Int(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        let err = store.find_all().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn concurrent_lookups_each_get_a_handle() {
        let store = std::sync::Arc::new(seeded_store().await);
        let mut set = tokio::task::JoinSet::new();
        for i in 0..16_i64 {
            let store = store.clone();
            set.spawn(async move { store.find_by_id(&LookupId::Int(i % 4)).await });
        }
        let mut hits = 0;
        while let Some(res) = set.join_next().await {
            if res.unwrap().unwrap().is_some() {
                hits += 1;
            }
        }
        // ids 1..=3 exist, 0 does not
        assert_eq!(hits, 12);
    }

    #[tokio::test]
    async fn connections_are_returned_after_each_call() {
        // One connection in the pool: a leaked handle would time out the next call.
        let store = seeded_store().await;
        for _ in 0..5 {
            store.find_all().await.unwrap();
            store.find_by_id(&LookupId::Int(999)).await.unwrap();
        }
        assert_eq!(store.pool().size(), 1);
    }
}
