use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Server-side login session. Only the digest of the cookie value is stored.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub key_digest: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
