use chrono::{Duration, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::auth::{self, Claims, JwtError, PasswordError};
use crate::config::{AppConfig, BootstrapAdmin};
use crate::database::models::{NewUser, Session, User};
use crate::database::{DatabaseError, Store};
use crate::policy::{AuthScheme, Permission, Principal};

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error("Invalid username/password.")]
    InvalidCredentials,
    #[error("User inactive or deleted.")]
    Inactive,
    #[error("Invalid token.")]
    InvalidToken,
    #[error("User '{0}' not found")]
    UnknownUser(String),
    #[error("Invalid username: {0}")]
    InvalidUsername(String),
    #[error("Password may not be blank")]
    BlankPassword,
    #[error("Password hashing task failed: {0}")]
    Task(String),
}

/// Users, credentials and sessions.
#[derive(Clone)]
pub struct AccountService {
    store: Store,
    config: Arc<AppConfig>,
}

impl AccountService {
    pub fn new(store: Store, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    /// Create an active account with a freshly hashed password.
    pub async fn create_user(&self, username: &str, password: &str, is_superuser: bool) -> Result<User, AccountError> {
        Self::validate_username(username)?;
        if password.is_empty() {
            return Err(AccountError::BlankPassword);
        }

        let password_hash = hash_blocking(password.to_string()).await?;
        let user = self
            .store
            .accounts
            .create_user(NewUser {
                username: username.to_string(),
                password_hash,
                is_superuser,
            })
            .await?;

        info!("Created user '{}' (superuser: {})", user.username, user.is_superuser);
        Ok(user)
    }

    fn validate_username(username: &str) -> Result<(), AccountError> {
        if username.is_empty() || username.chars().count() > 150 {
            return Err(AccountError::InvalidUsername("must be 1 to 150 characters".to_string()));
        }
        if !username.chars().all(|c| c.is_alphanumeric() || "@.+-_".contains(c)) {
            return Err(AccountError::InvalidUsername(
                "may contain only letters, digits and @/./+/-/_".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn user_by_username(&self, username: &str) -> Result<User, AccountError> {
        self.store
            .accounts
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AccountError::UnknownUser(username.to_string()))
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AccountError> {
        Ok(self.store.accounts.list_users().await?)
    }

    pub async fn grant(&self, username: &str, permission: Permission) -> Result<(), AccountError> {
        let user = self.user_by_username(username).await?;
        self.store.accounts.grant(user.id, permission).await?;
        info!("Granted {} to '{}'", permission, username);
        Ok(())
    }

    pub async fn revoke(&self, username: &str, permission: Permission) -> Result<bool, AccountError> {
        let user = self.user_by_username(username).await?;
        let removed = self.store.accounts.revoke(user.id, permission).await?;
        if removed {
            info!("Revoked {} from '{}'", permission, username);
        }
        Ok(removed)
    }

    pub async fn permissions(&self, username: &str) -> Result<BTreeSet<Permission>, AccountError> {
        let user = self.user_by_username(username).await?;
        Ok(self.store.accounts.permissions(user.id).await?)
    }

    pub async fn set_active(&self, username: &str, is_active: bool) -> Result<(), AccountError> {
        let user = self.user_by_username(username).await?;
        self.store.accounts.set_active(user.id, is_active).await?;
        info!("User '{}' is now {}", username, if is_active { "active" } else { "inactive" });
        Ok(())
    }

    /// Check a username/password pair. Inactive accounts are rejected even
    /// with the right password.
    pub async fn verify_credentials(&self, username: &str, password: &str) -> Result<User, AccountError> {
        let Some(user) = self.store.accounts.find_user_by_username(username).await? else {
            warn!("Login failed: unknown user '{}'", username);
            return Err(AccountError::InvalidCredentials);
        };

        if !verify_blocking(password.to_string(), user.password_hash.clone()).await? {
            warn!("Login failed: bad password for '{}'", username);
            return Err(AccountError::InvalidCredentials);
        }
        if !user.is_active {
            warn!("Login refused: user '{}' is inactive", username);
            return Err(AccountError::Inactive);
        }
        Ok(user)
    }

    pub async fn principal_for(&self, user: &User, scheme: AuthScheme) -> Result<Principal, AccountError> {
        let permissions = self.store.accounts.permissions(user.id).await?;
        debug!("Resolved principal '{}' via {:?}", user.username, scheme);
        Ok(Principal {
            user_id: user.id,
            username: user.username.clone(),
            is_superuser: user.is_superuser,
            permissions,
            scheme,
        })
    }

    pub fn issue_token(&self, user: &User) -> Result<String, AccountError> {
        let claims = Claims::new(user.id, user.username.clone(), self.config.security.jwt_expiry_hours);
        Ok(auth::generate_jwt(&claims, &self.config.security.jwt_secret)?)
    }

    pub async fn principal_from_token(&self, token: &str) -> Result<Principal, AccountError> {
        let claims = auth::validate_jwt(token, &self.config.security.jwt_secret).map_err(|e| {
            warn!("Rejected bearer token: {}", e);
            AccountError::InvalidToken
        })?;

        let user = self
            .store
            .accounts
            .find_user(claims.user_id)
            .await?
            .ok_or(AccountError::InvalidToken)?;
        if !user.is_active {
            return Err(AccountError::Inactive);
        }
        self.principal_for(&user, AuthScheme::Token).await
    }

    /// Start a session and return the raw key for the cookie.
    pub async fn open_session(&self, user: &User) -> Result<String, AccountError> {
        let key = auth::generate_session_key();
        let expires_at = Utc::now() + Duration::hours(self.config.security.session_expiry_hours as i64);
        self.store
            .accounts
            .create_session(Session {
                key_digest: auth::digest_key(&key),
                user_id: user.id,
                expires_at,
            })
            .await?;

        info!("Session opened for '{}'", user.username);
        Ok(key)
    }

    /// Principal behind a session key; `None` for unknown, expired or inactive.
    pub async fn principal_from_session(&self, key: &str) -> Result<Option<Principal>, AccountError> {
        let digest = auth::digest_key(key);
        let Some(session) = self.store.accounts.find_session(&digest).await? else {
            return Ok(None);
        };

        if session.is_expired(Utc::now()) {
            self.store.accounts.delete_session(&digest).await?;
            return Ok(None);
        }

        match self.store.accounts.find_user(session.user_id).await? {
            Some(user) if user.is_active => Ok(Some(self.principal_for(&user, AuthScheme::Session).await?)),
            _ => Ok(None),
        }
    }

    pub async fn close_session(&self, key: &str) -> Result<bool, AccountError> {
        let closed = self.store.accounts.delete_session(&auth::digest_key(key)).await?;
        if closed {
            info!("Session closed");
        }
        Ok(closed)
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64, AccountError> {
        Ok(self.store.accounts.purge_expired_sessions().await?)
    }

    /// Create the configured superuser if it does not exist yet.
    pub async fn ensure_bootstrap_admin(&self, admin: &BootstrapAdmin) -> Result<bool, AccountError> {
        if self.store.accounts.find_user_by_username(&admin.username).await?.is_some() {
            return Ok(false);
        }
        self.create_user(&admin.username, &admin.password, true).await?;
        info!("Bootstrap superuser '{}' created", admin.username);
        Ok(true)
    }
}

async fn hash_blocking(password: String) -> Result<String, AccountError> {
    tokio::task::spawn_blocking(move || auth::hash_password(&password))
        .await
        .map_err(|e| AccountError::Task(e.to_string()))?
        .map_err(AccountError::from)
}

async fn verify_blocking(password: String, hash: String) -> Result<bool, AccountError> {
    tokio::task::spawn_blocking(move || auth::verify_password(&password, &hash))
        .await
        .map_err(|e| AccountError::Task(e.to_string()))?
        .map_err(AccountError::from)
}
