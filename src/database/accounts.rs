//! Users, their granted permissions and login sessions.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::warn;

use crate::database::manager::DatabaseError;
use crate::database::models::{NewUser, Session, User};
use crate::policy::Permission;

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_user(&self, id: i64) -> Result<Option<User>, DatabaseError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError>;

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError>;

    /// Fails with `Conflict` when the username is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError>;

    async fn set_active(&self, user_id: i64, is_active: bool) -> Result<bool, DatabaseError>;

    async fn permissions(&self, user_id: i64) -> Result<BTreeSet<Permission>, DatabaseError>;

    async fn grant(&self, user_id: i64, permission: Permission) -> Result<(), DatabaseError>;

    async fn revoke(&self, user_id: i64, permission: Permission) -> Result<bool, DatabaseError>;

    async fn create_session(&self, session: Session) -> Result<(), DatabaseError>;

    async fn find_session(&self, key_digest: &str) -> Result<Option<Session>, DatabaseError>;

    async fn delete_session(&self, key_digest: &str) -> Result<bool, DatabaseError>;

    async fn purge_expired_sessions(&self) -> Result<u64, DatabaseError>;
}

fn duplicate_username(username: &str) -> String {
    format!("A user with username '{}' already exists", username)
}

fn parse_codenames(user_id: i64, codenames: Vec<String>) -> BTreeSet<Permission> {
    codenames
        .into_iter()
        .filter_map(|codename| match codename.parse::<Permission>() {
            Ok(permission) => Some(permission),
            Err(e) => {
                warn!("Ignoring stored permission for user {}: {}", user_id, e);
                None
            }
        })
        .collect()
}

pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn find_user(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (username, password_hash, is_superuser) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.is_superuser)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_unique_violation(e, duplicate_username(&user.username)))
    }

    async fn set_active(&self, user_id: i64, is_active: bool) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE users SET is_active = $2 WHERE id = $1")
            .bind(user_id)
            .bind(is_active)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn permissions(&self, user_id: i64) -> Result<BTreeSet<Permission>, DatabaseError> {
        let codenames: Vec<String> =
            sqlx::query_scalar("SELECT codename FROM user_permissions WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(parse_codenames(user_id, codenames))
    }

    async fn grant(&self, user_id: i64, permission: Permission) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO user_permissions (user_id, codename) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(permission.codename())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn revoke(&self, user_id: i64, permission: Permission) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM user_permissions WHERE user_id = $1 AND codename = $2")
            .bind(user_id)
            .bind(permission.codename())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_session(&self, session: Session) -> Result<(), DatabaseError> {
        sqlx::query("INSERT INTO sessions (key_digest, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&session.key_digest)
            .bind(session.user_id)
            .bind(session.expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_session(&self, key_digest: &str) -> Result<Option<Session>, DatabaseError> {
        let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE key_digest = $1")
            .bind(key_digest)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    async fn delete_session(&self, key_digest: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM sessions WHERE key_digest = $1")
            .bind(key_digest)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired_sessions(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= now()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// In-memory accounts, keyed the same way as the tables.
#[derive(Default)]
pub struct MemoryAccountRepository {
    users: RwLock<BTreeMap<i64, User>>,
    permissions: RwLock<HashMap<i64, BTreeSet<Permission>>>,
    sessions: RwLock<HashMap<String, Session>>,
    next_id: AtomicI64,
}

impl MemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn find_user(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        Ok(self.users.read().await.values().cloned().collect())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(DatabaseError::Conflict(duplicate_username(&user.username)));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let created = User {
            id,
            username: user.username,
            password_hash: user.password_hash,
            is_superuser: user.is_superuser,
            is_active: true,
            created_at: Utc::now(),
        };
        users.insert(id, created.clone());
        Ok(created)
    }

    async fn set_active(&self, user_id: i64, is_active: bool) -> Result<bool, DatabaseError> {
        let mut users = self.users.write().await;
        Ok(users
            .get_mut(&user_id)
            .map(|u| u.is_active = is_active)
            .is_some())
    }

    async fn permissions(&self, user_id: i64) -> Result<BTreeSet<Permission>, DatabaseError> {
        Ok(self.permissions.read().await.get(&user_id).cloned().unwrap_or_default())
    }

    async fn grant(&self, user_id: i64, permission: Permission) -> Result<(), DatabaseError> {
        if !self.users.read().await.contains_key(&user_id) {
            return Err(DatabaseError::NotFound(format!("User {} not found", user_id)));
        }
        self.permissions
            .write()
            .await
            .entry(user_id)
            .or_default()
            .insert(permission);
        Ok(())
    }

    async fn revoke(&self, user_id: i64, permission: Permission) -> Result<bool, DatabaseError> {
        let mut permissions = self.permissions.write().await;
        Ok(permissions
            .get_mut(&user_id)
            .map(|set| set.remove(&permission))
            .unwrap_or(false))
    }

    async fn create_session(&self, session: Session) -> Result<(), DatabaseError> {
        self.sessions
            .write()
            .await
            .insert(session.key_digest.clone(), session);
        Ok(())
    }

    async fn find_session(&self, key_digest: &str) -> Result<Option<Session>, DatabaseError> {
        Ok(self.sessions.read().await.get(key_digest).cloned())
    }

    async fn delete_session(&self, key_digest: &str) -> Result<bool, DatabaseError> {
        Ok(self.sessions.write().await.remove(key_digest).is_some())
    }

    async fn purge_expired_sessions(&self) -> Result<u64, DatabaseError> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - sessions.len()) as u64)
    }
}
