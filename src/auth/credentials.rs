use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Credentials carried in the `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    Basic { username: String, password: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("Invalid Authorization header format")]
    Malformed,
    #[error("Empty JWT token")]
    EmptyToken,
    #[error("Invalid basic header. Credentials not correctly base64 encoded.")]
    BadBasicEncoding,
    #[error("Unsupported authorization scheme")]
    UnsupportedScheme,
}

/// `Ok(None)` when no `Authorization` header is present.
pub fn parse_authorization(headers: &HeaderMap) -> Result<Option<Credentials>, CredentialError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| CredentialError::Malformed)?.trim();
    let (scheme, rest) = value.split_once(' ').ok_or(CredentialError::Malformed)?;
    let rest = rest.trim();

    if scheme.eq_ignore_ascii_case("bearer") {
        if rest.is_empty() {
            return Err(CredentialError::EmptyToken);
        }
        return Ok(Some(Credentials::Bearer(rest.to_string())));
    }

    if scheme.eq_ignore_ascii_case("basic") {
        let decoded = STANDARD.decode(rest).map_err(|_| CredentialError::BadBasicEncoding)?;
        let decoded = String::from_utf8(decoded).map_err(|_| CredentialError::BadBasicEncoding)?;
        let (username, password) = decoded.split_once(':').ok_or(CredentialError::BadBasicEncoding)?;
        return Ok(Some(Credentials::Basic {
            username: username.to_string(),
            password: password.to_string(),
        }));
    }

    Err(CredentialError::UnsupportedScheme)
}
