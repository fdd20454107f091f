use crate::config;
use crate::db::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub env: config::Config,
}

impl AppState {
    pub fn new(store: Store, env: config::Config) -> Self {
        Self { store, env }
    }
}
