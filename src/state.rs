use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::Store;
use crate::services::AccountService;

/// Shared by every handler; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Store, config: AppConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn accounts(&self) -> AccountService {
        AccountService::new(self.store.clone(), self.config.clone())
    }
}
