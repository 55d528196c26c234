//! Shared record types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{SkillId, UserId};

/// Platform role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Mentor,
    Admin,
}

impl Role {
    pub fn is_student(&self) -> bool {
        matches!(self, Role::Student)
    }

    pub fn is_mentor(&self) -> bool {
        matches!(self, Role::Mentor)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Mentor => write!(f, "mentor"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Where a user lives; mentors are matched within the same village
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub village: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
}

impl Location {
    pub fn new(village: impl Into<String>) -> Self {
        Self {
            village: village.into(),
            district: None,
        }
    }
}

/// A stored skill; the value type of the skills index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRef {
    pub id: SkillId,
    pub name: String,
}

/// Compact user record; the value type of the users index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// A mentor considered for assignment, annotated with the number of
/// students already assigned to them for the skill in question.
///
/// Constructed fresh from store data for every assignment request,
/// never cached across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorCandidate {
    pub mentor_id: UserId,
    pub current_load: u32,
}

impl MentorCandidate {
    pub fn new(mentor_id: UserId, current_load: u32) -> Self {
        Self {
            mentor_id,
            current_load,
        }
    }
}
