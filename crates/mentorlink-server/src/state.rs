//! Shared server state

use std::sync::Arc;

use mentorlink_core::ServiceConfig;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::auth::TokenKeys;
use crate::index::IndexRegistry;
use crate::store::MemoryStore;

pub struct AppState {
    pub config: ServiceConfig,
    pub store: MemoryStore,
    pub indexes: IndexRegistry,
    pub tokens: TokenKeys,
    // absent when no Prometheus recorder is installed (tests)
    pub metrics_handle: Option<PrometheusHandle>,
}

/// Shared server state type
pub type SharedState = Arc<AppState>;

/// Create shared state from config and the token signing secret
pub fn create_shared_state(
    config: ServiceConfig,
    secret: &str,
    metrics_handle: Option<PrometheusHandle>,
) -> SharedState {
    let tokens = TokenKeys::new(secret, config.token_ttl_hours);
    Arc::new(AppState {
        config,
        store: MemoryStore::new(),
        indexes: IndexRegistry::new(),
        tokens,
        metrics_handle,
    })
}
