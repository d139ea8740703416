//! Credential primitives: signed tokens, password hashes, session keys and
//! the `Authorization` header.

pub mod credentials;
pub mod jwt;
pub mod password;
pub mod session;

pub use credentials::{parse_authorization, CredentialError, Credentials};
pub use jwt::{generate_jwt, validate_jwt, Claims, JwtError};
pub use password::{hash_password, verify_password, PasswordError};
pub use session::{
    clear_session_cookie, csrf_token, digest_key, generate_session_key, parse_cookie, set_csrf_cookie,
    set_session_cookie, CSRF_HEADER, SESSION_COOKIE,
};
