use std::sync::Arc;

use crate::config::Config;
use crate::session::SessionRegistry;
use crate::store::SqlStore;
use axum::extract::FromRef;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub store: Arc<SqlStore>,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        Self {
            store: Arc::new(SqlStore::new(pool.clone())),
            pool,
            config,
            sessions: SessionRegistry::new(),
        }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
