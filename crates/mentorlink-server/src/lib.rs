//! mentorlink-server: HTTP service for the matchmaking platform
//!
//! Serves prefix suggestions from rebuildable in-memory indexes,
//! registers users with capacity-aware mentor assignment, and carries
//! the dashboard and announcement surface around them.

pub mod auth;
pub mod error;
pub mod index;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod state;
pub mod store;

pub use error::ServerError;
pub use index::{IndexKind, IndexRegistry, IndexStats, RebuildReport, SuggestionSource};
pub use routes::create_router;
pub use server::{Server, ServerBuilder};
pub use state::{create_shared_state, AppState, SharedState};
pub use store::MemoryStore;
