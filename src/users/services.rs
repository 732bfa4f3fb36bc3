use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, warn};

use crate::auth::password::{spawn_hash, spawn_verify};
use crate::errors::{StoreError, UserError};
use crate::users::repo::CredentialStore;
use crate::users::repo_types::{LookupId, NewUser, UserRecord};

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Looks up one user. An absent or empty id is a caller error, distinct from a
/// miss; any other string, whitespace included, is looked up as given.
pub async fn get_user(
    store: &dyn CredentialStore,
    user_id: Option<&str>,
) -> Result<UserRecord, UserError> {
    let raw = match user_id {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(UserError::MissingParameter("user_id")),
    };
    let id = LookupId::from(raw);
    match store.find_by_id(&id).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => {
            warn!(%id, "user not found");
            Err(UserError::UserNotFound)
        }
        Err(e) => {
            error!(error = %e, "find_by_id failed");
            Err(e.into())
        }
    }
}

pub async fn list_users(store: &dyn CredentialStore) -> Result<Vec<UserRecord>, UserError> {
    store.find_all().await.map_err(|e| {
        error!(error = %e, "find_all failed");
        e.into()
    })
}

pub async fn register(
    store: &dyn CredentialStore,
    username: &str,
    email: &str,
    password: &str,
) -> Result<UserRecord, UserError> {
    let username = username.trim();
    if username.is_empty() {
        warn!("empty username");
        return Err(UserError::InvalidInput("Username required".into()));
    }

    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(UserError::InvalidInput("Invalid email".into()));
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(UserError::InvalidInput("Password too short".into()));
    }

    if store.find_by_username(username).await?.is_some() {
        warn!(%username, "username already registered");
        return Err(UserError::UsernameTaken);
    }

    let password_hash = spawn_hash(password.to_owned()).await?;
    // The unique index settles races the pre-check above cannot see.
    let user = match store
        .insert(&NewUser {
            username: username.to_owned(),
            email,
            password_hash,
        })
        .await
    {
        Ok(u) => u,
        Err(StoreError::DuplicateUsername(_)) => {
            warn!(%username, "username registered concurrently");
            return Err(UserError::UsernameTaken);
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err(e.into());
        }
    };

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

pub async fn authenticate(
    store: &dyn CredentialStore,
    username: &str,
    password: &str,
) -> Result<UserRecord, UserError> {
    let user = match store.find_by_username(username.trim()).await? {
        Some(u) => u,
        None => {
            // Same Argon2 cost as a wrong password.
            let _ = spawn_verify(password.to_owned(), None).await;
            warn!(%username, "login unknown username");
            return Err(UserError::InvalidCredentials);
        }
    };

    if !spawn_verify(password.to_owned(), Some(user.password_hash.clone())).await {
        warn!(user_id = user.id, "login invalid password");
        return Err(UserError::InvalidCredentials);
    }

    info!(user_id = user.id, "user logged in");
    Ok(user)
}
