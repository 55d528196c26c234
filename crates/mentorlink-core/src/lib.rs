//! mentorlink-core: Core types and matching logic for the mentorlink platform
//!
//! This crate holds the pure, synchronous building blocks of the
//! student/mentor matchmaking service:
//! - [`PrefixIndex`]: an in-memory trie answering bounded prefix queries
//!   over case-folded keys (autocomplete for skills and users)
//! - [`assign`]: the capacity-aware least-loaded mentor selection policy
//! - shared record types (roles, summaries, candidates) and the
//!   service configuration
//!
//! Everything here is deterministic and free of I/O. Snapshots,
//! rebuilds, and the HTTP surface live in the server crate.

mod assign;
mod config;
mod error;
mod model;
mod trie;

pub use assign::{assign, Assignment};
pub use config::{ServiceConfig, PLATFORM_VERSION};
pub use error::Error;
pub use model::{Location, MentorCandidate, Role, SkillRef, UserSummary};
pub use trie::PrefixIndex;

pub type Result<T> = std::result::Result<T, Error>;

/// Store-assigned user identifier
pub type UserId = u64;

/// Store-assigned skill identifier
pub type SkillId = u64;

/// Constants for the matchmaking platform
pub mod constants {
    /// Suggestions returned by a prefix query when no limit is given
    pub const DEFAULT_SUGGESTION_LIMIT: usize = 10;

    /// Hard cap on caller-supplied suggestion limits
    pub const MAX_SUGGESTION_LIMIT: usize = 100;

    /// Students a mentor takes per skill before being skipped
    pub const DEFAULT_MENTOR_CAPACITY: u32 = 5;

    /// Default announcement page size
    pub const DEFAULT_PAGE_SIZE: usize = 5;
}
