pub mod auth;
pub mod common;
pub mod products;
pub mod uploads;

use crate::{
    db::DbPool,
    services::{ingestion::IngestionService, products::ProductService},
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<ProductService>,
    pub ingestion: Arc<IngestionService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            products: Arc::new(ProductService::new(db_pool.clone())),
            ingestion: Arc::new(IngestionService::new(db_pool)),
        }
    }
}
