pub mod auth;
pub mod response;

pub use auth::{authenticate, require_principal, AuthGate};
pub use response::{ApiResponse, ApiResult};
