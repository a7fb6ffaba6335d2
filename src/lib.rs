use std::sync::Arc;

use crate::config::Config;
use crate::database::GroupStore;

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod router;
pub mod routes;
pub mod utils;

pub use router::create_router;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn GroupStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn GroupStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}
