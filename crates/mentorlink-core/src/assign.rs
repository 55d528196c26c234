//! Capacity-aware mentor selection
//!
//! A greedy least-loaded pick under a hard capacity cap, decided per
//! (student, skill) pair at registration time. Existing assignments are
//! never rebalanced; the decision is a single pass over the candidate
//! snapshot and has no side effects, so it can run synchronously inside
//! a registration request. Callers own the consistency of the load
//! snapshot they pass in; a race between two concurrent registrations
//! may briefly push a mentor one past the cap and is left to periodic
//! reconciliation.

use crate::model::MentorCandidate;
use crate::UserId;

/// Outcome of a mentor selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// The chosen mentor
    Assigned(UserId),
    /// No candidate below the capacity cap; a normal outcome, not an
    /// error
    NoneAvailable,
}

impl Assignment {
    /// The chosen mentor id, if any
    pub fn assigned(&self) -> Option<UserId> {
        match self {
            Assignment::Assigned(id) => Some(*id),
            Assignment::NoneAvailable => None,
        }
    }
}

/// Pick the least-loaded candidate with `current_load < capacity`.
///
/// Ties go to the candidate appearing first in `candidates`; callers
/// must supply a stable order (the store lists mentors by id) so
/// repeated calls over the same snapshot pick the same mentor.
pub fn assign(candidates: &[MentorCandidate], capacity: u32) -> Assignment {
    let mut best: Option<&MentorCandidate> = None;
    for candidate in candidates {
        if candidate.current_load >= capacity {
            continue;
        }
        let better = match best {
            Some(current) => candidate.current_load < current.current_load,
            None => true,
        };
        if better {
            best = Some(candidate);
        }
    }
    match best {
        Some(candidate) => Assignment::Assigned(candidate.mentor_id),
        None => Assignment::NoneAvailable,
    }
}
