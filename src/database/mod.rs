pub mod accounts;
pub mod manager;
pub mod memory;
pub mod models;
pub mod query_builder;
pub mod repository;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use repository::{Entity, Repository};
pub use store::Store;
