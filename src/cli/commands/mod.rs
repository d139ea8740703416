pub mod fixture;
pub mod server;
pub mod session;
pub mod user;
