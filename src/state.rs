//! Shared application state for all routes.

use crate::store::Database;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// Opens one connection per invocation; nothing else is shared between requests.
    pub db: Arc<dyn Database>,
}

impl AppState {
    pub fn new(db: Arc<dyn Database>) -> Self {
        AppState { db }
    }
}
