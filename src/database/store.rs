use sqlx::PgPool;
use std::sync::Arc;

use crate::database::accounts::{AccountRepository, MemoryAccountRepository, PgAccountRepository};
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::memory::MemoryRepository;
use crate::database::models::{OwnedPerson, Person, Position, Team};
use crate::database::repository::{PgRepository, Repository};

/// Handles to every table, shared by all requests.
#[derive(Clone)]
pub struct Store {
    pub teams: Arc<dyn Repository<Team>>,
    pub persons: Arc<dyn Repository<Person>>,
    pub positions: Arc<dyn Repository<Position>>,
    pub owned_persons: Arc<dyn Repository<OwnedPerson>>,
    pub accounts: Arc<dyn AccountRepository>,
    pool: Option<PgPool>,
}

impl Store {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            teams: Arc::new(PgRepository::<Team>::new(pool.clone())),
            persons: Arc::new(PgRepository::<Person>::new(pool.clone())),
            positions: Arc::new(PgRepository::<Position>::new(pool.clone())),
            owned_persons: Arc::new(PgRepository::<OwnedPerson>::new(pool.clone())),
            accounts: Arc::new(PgAccountRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    pub fn memory() -> Self {
        Self {
            teams: Arc::new(MemoryRepository::<Team>::new()),
            persons: Arc::new(MemoryRepository::<Person>::new()),
            positions: Arc::new(MemoryRepository::<Position>::new()),
            owned_persons: Arc::new(MemoryRepository::<OwnedPerson>::new()),
            accounts: Arc::new(MemoryAccountRepository::new()),
            pool: None,
        }
    }

    pub fn backend(&self) -> &'static str {
        if self.pool.is_some() { "postgres" } else { "memory" }
    }

    pub fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        match self.pool {
            Some(ref pool) => DatabaseManager::health_check(pool).await,
            None => Ok(()),
        }
    }
}
