use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub username: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: i64, username: String, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            user_id,
            username,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
    #[error("Invalid JWT secret")]
    InvalidSecret,
}

pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Validate signature and expiry, returning the claims.
pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| JwtError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-with-enough-bytes-0123456789";

    #[test]
    fn round_trips_claims() {
        let token = generate_jwt(&Claims::new(4, "alice".into(), 1), SECRET).unwrap();
        let claims = validate_jwt(&token, SECRET).unwrap();
        assert_eq!(claims.user_id, 4);
        assert_eq!(claims.username, "alice");
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let token = generate_jwt(&Claims::new(4, "alice".into(), 1), SECRET).unwrap();
        assert!(validate_jwt(&token, "another-secret").is_err());

        let mut stale = Claims::new(4, "alice".into(), 1);
        stale.exp = Utc::now().timestamp() - 3600;
        let token = generate_jwt(&stale, SECRET).unwrap();
        assert!(matches!(validate_jwt(&token, SECRET), Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(matches!(
            generate_jwt(&Claims::new(1, "a".into(), 1), ""),
            Err(JwtError::InvalidSecret)
        ));
    }
}
