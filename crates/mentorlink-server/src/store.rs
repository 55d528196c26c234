//! In-memory record store
//!
//! The relational backing of the platform: users, skills, user-skill
//! links, mentor/student pairings, and announcements. All state lives
//! behind one async RwLock; BTreeMap iteration keeps every listing
//! deterministic, which matters for the stable candidate order the
//! assignment policy depends on.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use mentorlink_core::{
    Location, MentorCandidate, Role, SkillId, SkillRef, UserId, UserSummary,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{Result, ServerError};
use crate::index::SuggestionSource;

/// Full user record as stored
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub location: Location,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// New-user payload handed to the store by the registration handler
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub location: Location,
}

/// An announcement joined with its skill and mentor names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementView {
    pub id: u64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub skill: String,
    pub mentor_name: String,
}

/// A mentor/student pairing as shown on dashboards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairingView {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub location: Location,
    pub skill: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Statistics {
    pub total_skills: usize,
    pub total_mentors: usize,
    pub total_students: usize,
}

#[derive(Debug, Clone)]
struct AnnouncementRecord {
    id: u64,
    mentor_id: UserId,
    skill_id: SkillId,
    content: String,
    created_at: DateTime<Utc>,
}

struct StoreInner {
    users: BTreeMap<UserId, UserRecord>,
    // key: case-folded email
    users_by_email: HashMap<String, UserId>,
    skills: BTreeMap<SkillId, String>,
    // key: case-folded skill name
    skills_by_name: HashMap<String, SkillId>,
    user_skills: BTreeSet<(UserId, SkillId)>,
    // (mentor, skill, student): range scans give a mentor's per-skill load
    pairings: BTreeSet<(UserId, SkillId, UserId)>,
    announcements: Vec<AnnouncementRecord>,
    next_user_id: UserId,
    next_skill_id: SkillId,
    next_announcement_id: u64,
}

impl StoreInner {
    fn new() -> Self {
        Self {
            users: BTreeMap::new(),
            users_by_email: HashMap::new(),
            skills: BTreeMap::new(),
            skills_by_name: HashMap::new(),
            user_skills: BTreeSet::new(),
            pairings: BTreeSet::new(),
            announcements: Vec::new(),
            next_user_id: 1,
            next_skill_id: 1,
            next_announcement_id: 1,
        }
    }

    fn announcement_view(&self, record: &AnnouncementRecord) -> AnnouncementView {
        AnnouncementView {
            id: record.id,
            content: record.content.clone(),
            created_at: record.created_at,
            skill: self
                .skills
                .get(&record.skill_id)
                .cloned()
                .unwrap_or_default(),
            mentor_name: self
                .users
                .get(&record.mentor_id)
                .map(|u| u.name.clone())
                .unwrap_or_default(),
        }
    }

    fn page_newest_first<F>(&self, filter: F, offset: usize, limit: usize) -> Vec<AnnouncementView>
    where
        F: Fn(&AnnouncementRecord) -> bool,
    {
        let mut matched: Vec<&AnnouncementRecord> =
            self.announcements.iter().filter(|a| filter(a)).collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|record| self.announcement_view(record))
            .collect()
    }
}

/// The platform's record store
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner::new()),
        }
    }

    /// Create a user; the email must be unused (case-insensitive)
    pub async fn create_user(&self, new: NewUser) -> Result<UserRecord> {
        let mut inner = self.inner.write().await;
        let email_key = new.email.to_lowercase();
        if inner.users_by_email.contains_key(&email_key) {
            return Err(ServerError::EmailTaken);
        }
        let id = inner.next_user_id;
        inner.next_user_id += 1;
        let record = UserRecord {
            id,
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            location: new.location,
            created_at: Utc::now(),
        };
        inner.users_by_email.insert(email_key, id);
        inner.users.insert(id, record.clone());
        Ok(record)
    }

    /// Look a user up by email, restricted to one role (login checks
    /// credentials against the role the caller claims)
    pub async fn find_by_email(&self, email: &str, role: Role) -> Option<UserRecord> {
        let inner = self.inner.read().await;
        let id = inner.users_by_email.get(&email.to_lowercase())?;
        inner.users.get(id).filter(|u| u.role == role).cloned()
    }

    pub async fn get_user(&self, id: UserId) -> Option<UserRecord> {
        self.inner.read().await.users.get(&id).cloned()
    }

    /// Find a skill by name (case-insensitive) or create it
    pub async fn ensure_skill(&self, name: &str) -> SkillRef {
        let mut inner = self.inner.write().await;
        let key = name.to_lowercase();
        if let Some(&id) = inner.skills_by_name.get(&key) {
            let stored = inner.skills.get(&id).cloned().unwrap_or_default();
            return SkillRef { id, name: stored };
        }
        let id = inner.next_skill_id;
        inner.next_skill_id += 1;
        inner.skills.insert(id, name.to_string());
        inner.skills_by_name.insert(key, id);
        SkillRef {
            id,
            name: name.to_string(),
        }
    }

    pub async fn find_skill(&self, name: &str) -> Option<SkillRef> {
        let inner = self.inner.read().await;
        let id = *inner.skills_by_name.get(&name.to_lowercase())?;
        let name = inner.skills.get(&id).cloned()?;
        Some(SkillRef { id, name })
    }

    /// Skill names containing `fragment` (case-insensitive), for the
    /// "did you mean" suggestions on unknown skills
    pub async fn similar_skills(&self, fragment: &str, limit: usize) -> Vec<String> {
        let inner = self.inner.read().await;
        let folded = fragment.to_lowercase();
        inner
            .skills
            .values()
            .filter(|name| name.to_lowercase().contains(&folded))
            .take(limit)
            .cloned()
            .collect()
    }

    /// All skills, ordered by name
    pub async fn list_skills(&self) -> Vec<SkillRef> {
        let inner = self.inner.read().await;
        let mut skills: Vec<SkillRef> = inner
            .skills
            .iter()
            .map(|(&id, name)| SkillRef {
                id,
                name: name.clone(),
            })
            .collect();
        skills.sort_by(|a, b| a.name.cmp(&b.name));
        skills
    }

    pub async fn add_user_skill(&self, user: UserId, skill: SkillId) {
        self.inner.write().await.user_skills.insert((user, skill));
    }

    pub async fn skills_of_user(&self, user: UserId) -> Vec<String> {
        let inner = self.inner.read().await;
        inner
            .user_skills
            .range((user, 0)..=(user, SkillId::MAX))
            .filter_map(|&(_, skill_id)| inner.skills.get(&skill_id).cloned())
            .collect()
    }

    /// Mentors holding `skill` in `village`, annotated with their
    /// current student count for that skill, ordered by mentor id.
    ///
    /// The stable order is what makes the assignment tie-break
    /// reproducible.
    pub async fn eligible_mentors(&self, skill: SkillId, village: &str) -> Result<Vec<MentorCandidate>> {
        let inner = self.inner.read().await;
        let mut candidates = Vec::new();
        for (&id, user) in &inner.users {
            if user.role != Role::Mentor {
                continue;
            }
            if user.location.village != village {
                continue;
            }
            if !inner.user_skills.contains(&(id, skill)) {
                continue;
            }
            let load = inner
                .pairings
                .range((id, skill, 0)..=(id, skill, UserId::MAX))
                .count() as u32;
            candidates.push(MentorCandidate::new(id, load));
        }
        Ok(candidates)
    }

    /// Persist the outcome of a successful assignment
    pub async fn record_assignment(
        &self,
        mentor: UserId,
        student: UserId,
        skill: SkillId,
    ) -> Result<()> {
        self.inner
            .write()
            .await
            .pairings
            .insert((mentor, skill, student));
        Ok(())
    }

    /// Students assigned to a mentor, with the skill they share
    pub async fn students_of(&self, mentor: UserId) -> Vec<PairingView> {
        let inner = self.inner.read().await;
        inner
            .pairings
            .range((mentor, 0, 0)..=(mentor, SkillId::MAX, UserId::MAX))
            .filter_map(|&(_, skill_id, student_id)| {
                let student = inner.users.get(&student_id)?;
                Some(PairingView {
                    id: student.id,
                    name: student.name.clone(),
                    email: student.email.clone(),
                    location: student.location.clone(),
                    skill: inner.skills.get(&skill_id).cloned().unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Mentors assigned to a student, with the skill they share
    pub async fn mentors_of(&self, student: UserId) -> Vec<PairingView> {
        let inner = self.inner.read().await;
        inner
            .pairings
            .iter()
            .filter(|&&(_, _, student_id)| student_id == student)
            .filter_map(|&(mentor_id, skill_id, _)| {
                let mentor = inner.users.get(&mentor_id)?;
                Some(PairingView {
                    id: mentor.id,
                    name: mentor.name.clone(),
                    email: mentor.email.clone(),
                    location: mentor.location.clone(),
                    skill: inner.skills.get(&skill_id).cloned().unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Name of the student's first mentor, for the profile card
    pub async fn mentor_name_of(&self, student: UserId) -> Option<String> {
        let inner = self.inner.read().await;
        inner
            .pairings
            .iter()
            .find(|&&(_, _, student_id)| student_id == student)
            .and_then(|&(mentor_id, _, _)| inner.users.get(&mentor_id))
            .map(|mentor| mentor.name.clone())
    }

    /// A mentor's students for one skill
    pub async fn group_members(&self, mentor: UserId, skill: SkillId) -> Vec<PairingView> {
        let inner = self.inner.read().await;
        inner
            .pairings
            .range((mentor, skill, 0)..=(mentor, skill, UserId::MAX))
            .filter_map(|&(_, skill_id, student_id)| {
                let student = inner.users.get(&student_id)?;
                Some(PairingView {
                    id: student.id,
                    name: student.name.clone(),
                    email: student.email.clone(),
                    location: student.location.clone(),
                    skill: inner.skills.get(&skill_id).cloned().unwrap_or_default(),
                })
            })
            .collect()
    }

    pub async fn create_announcement(
        &self,
        mentor: UserId,
        skill: SkillId,
        content: String,
    ) -> Result<AnnouncementView> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&mentor) {
            return Err(ServerError::not_found("User"));
        }
        let id = inner.next_announcement_id;
        inner.next_announcement_id += 1;
        let record = AnnouncementRecord {
            id,
            mentor_id: mentor,
            skill_id: skill,
            content,
            created_at: Utc::now(),
        };
        let view = inner.announcement_view(&record);
        inner.announcements.push(record);
        Ok(view)
    }

    /// Announcements for the skills a student holds, newest first
    pub async fn announcements_for_student(
        &self,
        student: UserId,
        offset: usize,
        limit: usize,
    ) -> Vec<AnnouncementView> {
        let inner = self.inner.read().await;
        let skill_ids: BTreeSet<SkillId> = inner
            .user_skills
            .range((student, 0)..=(student, SkillId::MAX))
            .map(|&(_, skill_id)| skill_id)
            .collect();
        inner.page_newest_first(|a| skill_ids.contains(&a.skill_id), offset, limit)
    }

    /// A mentor's own announcements, optionally filtered by skill name
    pub async fn announcements_for_mentor(
        &self,
        mentor: UserId,
        skill: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Vec<AnnouncementView> {
        let inner = self.inner.read().await;
        let skill_id = skill.and_then(|name| inner.skills_by_name.get(&name.to_lowercase()).copied());
        if skill.is_some() && skill_id.is_none() {
            return Vec::new();
        }
        inner.page_newest_first(
            |a| a.mentor_id == mentor && skill_id.map_or(true, |id| a.skill_id == id),
            offset,
            limit,
        )
    }

    /// All announcements, newest first
    pub async fn announcements_all(&self, offset: usize, limit: usize) -> Vec<AnnouncementView> {
        let inner = self.inner.read().await;
        inner.page_newest_first(|_| true, offset, limit)
    }

    /// Delete announcements created before `cutoff`; returns the count
    pub async fn delete_announcements_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut inner = self.inner.write().await;
        let before = inner.announcements.len();
        inner.announcements.retain(|a| a.created_at >= cutoff);
        before - inner.announcements.len()
    }

    pub async fn statistics(&self) -> Statistics {
        let inner = self.inner.read().await;
        Statistics {
            total_skills: inner.skills.len(),
            total_mentors: inner
                .users
                .values()
                .filter(|u| u.role == Role::Mentor)
                .count(),
            total_students: inner
                .users
                .values()
                .filter(|u| u.role == Role::Student)
                .count(),
        }
    }
}

impl SuggestionSource for MemoryStore {
    async fn skill_entries(&self) -> Result<Vec<(String, SkillRef)>> {
        let inner = self.inner.read().await;
        Ok(inner
            .skills
            .iter()
            .map(|(&id, name)| {
                (
                    name.clone(),
                    SkillRef {
                        id,
                        name: name.clone(),
                    },
                )
            })
            .collect())
    }

    async fn user_entries(&self) -> Result<Vec<(String, UserSummary)>> {
        let inner = self.inner.read().await;
        let mut entries = Vec::with_capacity(inner.users.len() * 2);
        for user in inner.users.values() {
            let summary = user.summary();
            entries.push((user.name.clone(), summary.clone()));
            entries.push((user.email.clone(), summary));
        }
        Ok(entries)
    }
}
