use std::sync::Arc;

use crate::services::{Inventory, Recommender};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
    pub inventory: Inventory,
}

impl AppState {
    pub fn new(recommender: Recommender, inventory: Inventory) -> Self {
        Self {
            recommender: Arc::new(recommender),
            inventory,
        }
    }
}
