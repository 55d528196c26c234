//! Suggestion indexes: named prefix indexes with rebuild-and-swap
//!
//! Each kind ("skills", "users") is published behind an atomic Arc
//! swap. Readers load the current Arc and keep it for the whole
//! request; a rebuild constructs a private [`PrefixIndex`] from a
//! fresh store snapshot and publishes it with a single swap, so a
//! reader sees the fully-old or fully-new index, never a mix. Query
//! results are stale by at most the time since the last successful
//! rebuild.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwapOption;
use mentorlink_core::{PrefixIndex, SkillRef, UserSummary};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{Result, ServerError};
use crate::metrics;

/// Index identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Skill names -> skill records
    Skills,
    /// User display names and emails -> compact user summaries
    Users,
}

impl IndexKind {
    pub const ALL: [IndexKind; 2] = [IndexKind::Skills, IndexKind::Users];
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Skills => write!(f, "skills"),
            IndexKind::Users => write!(f, "users"),
        }
    }
}

impl FromStr for IndexKind {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "skills" => Ok(IndexKind::Skills),
            "users" => Ok(IndexKind::Users),
            _ => Err(ServerError::InvalidQuery(format!(
                "Invalid index kind: {s}"
            ))),
        }
    }
}

/// Snapshot reads the registry needs from the record store.
///
/// Implemented by the store; test doubles stand in to exercise fetch
/// failures. Skills produce one entry per skill; users produce two
/// entries per user, keyed by display name and by email.
pub trait SuggestionSource {
    fn skill_entries(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<(String, SkillRef)>>> + Send;

    fn user_entries(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<(String, UserSummary)>>> + Send;
}

/// Outcome of a successful rebuild, returned to the operator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebuildReport {
    pub kind: IndexKind,
    pub entries: usize,
    pub duration_ms: u64,
}

/// Per-kind readiness and entry counts, for health and info endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub skills_ready: bool,
    pub users_ready: bool,
    pub skills_entries: usize,
    pub users_entries: usize,
}

/// The currently published indexes plus rebuild coordination
pub struct IndexRegistry {
    skills: ArcSwapOption<PrefixIndex<SkillRef>>,
    users: ArcSwapOption<PrefixIndex<UserSummary>>,
    // one in-flight rebuild per kind; kinds rebuild independently
    skills_rebuild: Mutex<()>,
    users_rebuild: Mutex<()>,
}

impl Default for IndexRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexRegistry {
    /// Create a registry with no published indexes; queries fail until
    /// the first successful rebuild of each kind
    pub fn new() -> Self {
        Self {
            skills: ArcSwapOption::empty(),
            users: ArcSwapOption::empty(),
            skills_rebuild: Mutex::new(()),
            users_rebuild: Mutex::new(()),
        }
    }

    /// Current skills index, if one was ever published
    pub fn skills_snapshot(&self) -> Option<Arc<PrefixIndex<SkillRef>>> {
        self.skills.load_full()
    }

    /// Current users index, if one was ever published
    pub fn users_snapshot(&self) -> Option<Arc<PrefixIndex<UserSummary>>> {
        self.users.load_full()
    }

    pub fn suggest_skills(&self, prefix: &str, limit: usize) -> Result<Vec<SkillRef>> {
        let index = self
            .skills
            .load_full()
            .ok_or(ServerError::UnknownIndex(IndexKind::Skills))?;
        Ok(index.search(prefix, limit))
    }

    pub fn suggest_users(&self, prefix: &str, limit: usize) -> Result<Vec<UserSummary>> {
        let index = self
            .users
            .load_full()
            .ok_or(ServerError::UnknownIndex(IndexKind::Users))?;
        Ok(index.search(prefix, limit))
    }

    pub fn is_ready(&self) -> bool {
        self.skills.load().is_some() && self.users.load().is_some()
    }

    pub fn stats(&self) -> IndexStats {
        let skills = self.skills.load();
        let users = self.users.load();
        IndexStats {
            skills_ready: skills.is_some(),
            users_ready: users.is_some(),
            skills_entries: skills.as_ref().map(|i| i.entry_count()).unwrap_or(0),
            users_entries: users.as_ref().map(|i| i.entry_count()).unwrap_or(0),
        }
    }

    /// Rebuild one index from a fresh store snapshot and publish it.
    ///
    /// Concurrent rebuilds of the same kind are serialized; readers in
    /// flight keep the instance they loaded. If the snapshot fetch
    /// fails the previously published index stays live and the error
    /// is returned.
    pub async fn rebuild<S: SuggestionSource>(
        &self,
        kind: IndexKind,
        source: &S,
    ) -> Result<RebuildReport> {
        match kind {
            IndexKind::Skills => {
                rebuild_slot(
                    kind,
                    &self.skills,
                    &self.skills_rebuild,
                    source.skill_entries(),
                )
                .await
            }
            IndexKind::Users => {
                rebuild_slot(kind, &self.users, &self.users_rebuild, source.user_entries()).await
            }
        }
    }

    /// Rebuild every index kind in turn
    pub async fn rebuild_all<S: SuggestionSource>(&self, source: &S) -> Result<Vec<RebuildReport>> {
        let mut reports = Vec::with_capacity(IndexKind::ALL.len());
        for kind in IndexKind::ALL {
            reports.push(self.rebuild(kind, source).await?);
        }
        Ok(reports)
    }
}

async fn rebuild_slot<V, Fut>(
    kind: IndexKind,
    slot: &ArcSwapOption<PrefixIndex<V>>,
    serialize: &Mutex<()>,
    fetch: Fut,
) -> Result<RebuildReport>
where
    Fut: std::future::Future<Output = Result<Vec<(String, V)>>>,
{
    let _in_flight = serialize.lock().await;
    let started = Instant::now();

    // The fetch is polled only here, under the per-kind lock, so the
    // snapshot belongs to this rebuild alone.
    let entries = match fetch.await {
        Ok(entries) => entries,
        Err(err) => {
            metrics::record_rebuild(kind, metrics::STATUS_FAILED, started.elapsed());
            tracing::warn!(kind = %kind, error = %err, "Index rebuild failed, previous index kept");
            return Err(ServerError::SnapshotFetch {
                kind,
                reason: err.to_string(),
            });
        }
    };

    let mut index = PrefixIndex::new();
    for (key, value) in entries {
        index.insert(&key, value);
    }
    let count = index.entry_count();
    slot.store(Some(Arc::new(index)));

    let duration = started.elapsed();
    metrics::record_rebuild(kind, metrics::STATUS_OK, duration);
    metrics::set_index_entries(kind, count);
    metrics::set_index_ready(kind, true);
    tracing::info!(kind = %kind, entries = count, "Suggestion index rebuilt");

    Ok(RebuildReport {
        kind,
        entries: count,
        duration_ms: duration.as_millis() as u64,
    })
}
