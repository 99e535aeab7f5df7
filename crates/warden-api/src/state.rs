use std::sync::Arc;
use warden_properties::{PropertyQuery, QueryLimits};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub query: Arc<PropertyQuery>,
    pub limits: QueryLimits,
}

impl AppState {
    pub fn new(query: PropertyQuery, limits: QueryLimits) -> Self {
        Self {
            query: Arc::new(query),
            limits,
        }
    }
}
