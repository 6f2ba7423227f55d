//! Account registration, login and in-memory session tracking.

use std::sync::Arc;

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{NewUser, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

pub const SESSION_COOKIE: &str = "sessionid";
const MIN_PASSWORD_CHARS: usize = 8;
const MAX_USERNAME_CHARS: usize = 30;
const SESSION_IDLE_LIMIT: time::Duration = time::Duration::days(14);

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("username is already taken")]
    UsernameTaken,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// A logged-in browser session. Tokens are opaque and live only in
/// process memory; restarting the server logs everyone out.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub username: String,
    pub created_at: OffsetDateTime,
    pub last_seen: OffsetDateTime,
}

#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, user: &UserRecord) -> String {
        let token = format!(
            "{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        );
        let now = OffsetDateTime::now_utc();
        self.sessions.insert(
            token.clone(),
            Session {
                user_id: user.id,
                username: user.username.clone(),
                created_at: now,
                last_seen: now,
            },
        );
        token
    }

    /// Looks up a session, refreshing its idle clock. Sessions idle for
    /// longer than the limit are dropped on access.
    pub fn get(&self, token: &str) -> Option<Session> {
        let now = OffsetDateTime::now_utc();
        match self.sessions.get_mut(token) {
            Some(mut entry) => {
                if now - entry.last_seen > SESSION_IDLE_LIMIT {
                    drop(entry);
                    self.sessions.remove(token);
                    return None;
                }
                entry.last_seen = now;
                Some(entry.value().clone())
            }
            None => None,
        }
    }

    pub fn remove(&self, token: &str) {
        self.sessions.remove(token);
    }
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UsersRepo>,
    sessions: SessionStore,
}

impl AuthService {
    pub fn new(users: Arc<dyn UsersRepo>, sessions: SessionStore) -> Self {
        Self { users, sessions }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn signup(&self, username: &str, password: &str) -> Result<UserRecord, AuthError> {
        let username = validate_username(username)?;
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AuthError::Validation(format!(
                "password must be at least {MIN_PASSWORD_CHARS} characters"
            )));
        }
        if self.users.find_user_by_username(&username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }

        let salt = Uuid::new_v4().simple().to_string();
        let hash = hash_password(&salt, password);
        let created = self
            .users
            .create_user(NewUser {
                username,
                password_salt: salt,
                password_hash: hash,
            })
            .await;
        match created {
            Ok(user) => Ok(user),
            // Races with a concurrent signup surface as the same error
            // the pre-check produces.
            Err(RepoError::Duplicate { .. }) => Err(AuthError::UsernameTaken),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<UserRecord, AuthError> {
        let user = self
            .users
            .find_user_by_username(username.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let hashed_input = hash_password(&user.password_salt, password);
        if user.password_hash.ct_eq(&hashed_input).unwrap_u8() == 0 {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(user)
    }
}

pub fn hash_password(salt: &str, password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

fn validate_username(raw: &str) -> Result<String, AuthError> {
    let username = raw.trim();
    if username.len() < 3 || username.chars().count() > MAX_USERNAME_CHARS {
        return Err(AuthError::Validation(
            "username must be between 3 and 30 characters".into(),
        ));
    }
    let valid = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if !valid {
        return Err(AuthError::Validation(
            "username may only contain letters, digits, '_', '-' and '.'".into(),
        ));
    }
    Ok(username.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_is_salted() {
        let first = hash_password("salt-a", "correct horse");
        let second = hash_password("salt-b", "correct horse");
        assert_ne!(first, second);
        assert_eq!(first, hash_password("salt-a", "correct horse"));
    }

    #[test]
    fn usernames_are_validated() {
        assert!(validate_username("leo").is_ok());
        assert!(validate_username("leo.tolstoy-1828").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has spaces").is_err());
        assert!(validate_username(&"x".repeat(31)).is_err());
    }

    #[test]
    fn session_round_trip() {
        let store = SessionStore::new();
        let user = UserRecord {
            id: Uuid::new_v4(),
            username: "reader".into(),
            password_salt: "salt".into(),
            password_hash: vec![0; 32],
            created_at: OffsetDateTime::now_utc(),
        };
        let token = store.create(&user);
        let session = store.get(&token).unwrap();
        assert_eq!(session.user_id, user.id);
        store.remove(&token);
        assert!(store.get(&token).is_none());
    }
}
