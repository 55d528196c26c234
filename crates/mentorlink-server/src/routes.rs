//! HTTP routes for the matchmaking service

use std::collections::HashSet;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use mentorlink_core::{
    assign, Assignment, Location, Role, SkillId, SkillRef, UserId, UserSummary, PLATFORM_VERSION,
};

use crate::auth::{self, AuthUser};
use crate::error::{Result, ServerError};
use crate::index::{IndexKind, IndexStats, RebuildReport};
use crate::metrics;
use crate::state::SharedState;
use crate::store::{AnnouncementView, NewUser, PairingView, Statistics};

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub indexes: IndexStats,
}

/// Service info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub suggestion_limit: usize,
    pub mentor_capacity: u32,
    pub skills_entries: usize,
    pub users_entries: usize,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub location: Location,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: UserId,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Deserialize)]
pub struct SuggestParams {
    #[serde(default)]
    pub query: String,
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct PageParams {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    pub skill: Option<String>,
}

#[derive(Deserialize)]
pub struct AnnouncementRequest {
    pub skill_name: String,
    pub content: String,
}

#[derive(Serialize)]
pub struct StudentProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub skills: Vec<String>,
    pub mentor: Option<String>,
}

#[derive(Serialize)]
pub struct StudentBrief {
    pub id: UserId,
    pub name: String,
}

#[derive(Serialize)]
pub struct MentorProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub skills: Vec<String>,
    pub students: Vec<StudentBrief>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub suggestions: Vec<UserSummary>,
}

#[derive(Deserialize)]
pub struct UserDetailParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub ann_limit: Option<usize>,
    pub ann_offset: Option<usize>,
}

#[derive(Serialize)]
pub struct UserDetail {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub location: Location,
    pub skills: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mentor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mentees: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub announcements: Option<Vec<AnnouncementView>>,
}

#[derive(Deserialize)]
pub struct PurgeRequest {
    pub before: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct PurgeResponse {
    pub deleted: usize,
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let indexes = state.indexes.stats();
    let status = if state.indexes.is_ready() {
        "ready"
    } else {
        "building"
    };
    Json(HealthResponse {
        status: status.to_string(),
        indexes,
    })
}

/// Service info endpoint
async fn info(State(state): State<SharedState>) -> Json<InfoResponse> {
    let stats = state.indexes.stats();
    Json(InfoResponse {
        version: PLATFORM_VERSION.to_string(),
        suggestion_limit: state.config.suggestion_limit,
        mentor_capacity: state.config.mentor_capacity,
        skills_entries: stats.skills_entries,
        users_entries: stats.users_entries,
    })
}

/// Prometheus exposition endpoint
async fn metrics_text(State(state): State<SharedState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Register a user; students are paired with the least-loaded
/// in-village mentor per skill
async fn register(
    State(state): State<SharedState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    if req.name.trim().is_empty() || req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ServerError::InvalidQuery(
            "Missing required fields".to_string(),
        ));
    }

    let password_hash = auth::hash_password(&req.password)?;
    let user = state
        .store
        .create_user(NewUser {
            name: req.name,
            email: req.email,
            password_hash,
            role: req.role,
            location: req.location,
        })
        .await?;
    metrics::record_registration(&user.role.to_string());

    for skill_name in &req.skills {
        let skill_name = skill_name.trim();
        if skill_name.is_empty() {
            continue;
        }
        let skill = state.store.ensure_skill(skill_name).await;
        state.store.add_user_skill(user.id, skill.id).await;

        if user.role.is_student() {
            let candidates = state
                .store
                .eligible_mentors(skill.id, &user.location.village)
                .await?;
            match assign(&candidates, state.config.mentor_capacity) {
                Assignment::Assigned(mentor_id) => {
                    state
                        .store
                        .record_assignment(mentor_id, user.id, skill.id)
                        .await?;
                    metrics::record_assignment(metrics::ASSIGN_ASSIGNED);
                    tracing::info!(
                        student = user.id,
                        mentor = mentor_id,
                        skill = %skill.name,
                        "Mentor assigned"
                    );
                }
                Assignment::NoneAvailable => {
                    metrics::record_assignment(metrics::ASSIGN_UNASSIGNED);
                    tracing::info!(student = user.id, skill = %skill.name, "No mentor available");
                }
            }
        }
    }

    let token = state.tokens.issue(user.id, user.role)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user_id: user.id,
        }),
    ))
}

async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let user = state
        .store
        .find_by_email(&req.email, req.role)
        .await
        .ok_or(ServerError::InvalidCredentials)?;
    if !auth::verify_password(&req.password, &user.password_hash) {
        return Err(ServerError::InvalidCredentials);
    }
    let token = state.tokens.issue(user.id, user.role)?;
    Ok(Json(AuthResponse {
        token,
        user_id: user.id,
    }))
}

/// Prefix suggestions from the published index of `kind`
async fn suggest(
    State(state): State<SharedState>,
    Path(kind): Path<String>,
    Query(params): Query<SuggestParams>,
) -> Result<Response> {
    let kind: IndexKind = kind.parse()?;
    let started = Instant::now();
    let limit = state.config.clamp_limit(params.limit);
    let result = suggest_kind(&state, kind, &params.query, limit);
    let outcome = match &result {
        Ok(_) => metrics::OUTCOME_OK,
        Err(err) if err.status().is_client_error() => metrics::OUTCOME_CLIENT_ERROR,
        Err(_) => metrics::OUTCOME_SERVER_ERROR,
    };
    metrics::record_suggest_request(kind, outcome, started.elapsed());
    result
}

fn suggest_kind(state: &SharedState, kind: IndexKind, query: &str, limit: usize) -> Result<Response> {
    if query.is_empty() {
        // an empty prefix would match the whole index; the route keeps
        // the contract of returning nothing instead
        return Ok(match kind {
            IndexKind::Skills => Json(Vec::<SkillRef>::new()).into_response(),
            IndexKind::Users => Json(Vec::<UserSummary>::new()).into_response(),
        });
    }
    match kind {
        IndexKind::Skills => {
            let hits = state.indexes.suggest_skills(query, limit)?;
            Ok(Json(hits).into_response())
        }
        IndexKind::Users => {
            let hits = state.indexes.suggest_users(query, limit)?;
            Ok(Json(dedup_users(hits)).into_response())
        }
    }
}

/// A user keyed by both name and email can match one prefix twice;
/// responses carry each record once
fn dedup_users(hits: Vec<UserSummary>) -> Vec<UserSummary> {
    let mut seen = HashSet::new();
    hits.into_iter().filter(|user| seen.insert(user.id)).collect()
}

/// Rebuild every suggestion index from a fresh store snapshot
async fn rebuild_all(State(state): State<SharedState>) -> Result<Json<Vec<RebuildReport>>> {
    let reports = state.indexes.rebuild_all(&state.store).await?;
    Ok(Json(reports))
}

/// Rebuild a single suggestion index
async fn rebuild_one(
    State(state): State<SharedState>,
    Path(kind): Path<String>,
) -> Result<Json<RebuildReport>> {
    let kind: IndexKind = kind.parse()?;
    let report = state.indexes.rebuild(kind, &state.store).await?;
    Ok(Json(report))
}

/// All skills, ordered by name
async fn list_skills(State(state): State<SharedState>) -> Json<Vec<SkillRef>> {
    Json(state.store.list_skills().await)
}

async fn student_profile(
    State(state): State<SharedState>,
    user: AuthUser,
) -> Result<Json<StudentProfile>> {
    let user = user.require(Role::Student)?;
    let record = state
        .store
        .get_user(user.id)
        .await
        .ok_or_else(|| ServerError::not_found("User"))?;
    let skills = state.store.skills_of_user(user.id).await;
    let mentor = state.store.mentor_name_of(user.id).await;
    Ok(Json(StudentProfile {
        id: record.id,
        name: record.name,
        email: record.email,
        created_at: record.created_at,
        skills,
        mentor,
    }))
}

async fn mentor_profile(
    State(state): State<SharedState>,
    user: AuthUser,
) -> Result<Json<MentorProfile>> {
    let user = user.require(Role::Mentor)?;
    let record = state
        .store
        .get_user(user.id)
        .await
        .ok_or_else(|| ServerError::not_found("User"))?;
    let skills = state.store.skills_of_user(user.id).await;
    let mut seen = HashSet::new();
    let students = state
        .store
        .students_of(user.id)
        .await
        .into_iter()
        .filter(|pairing| seen.insert(pairing.id))
        .map(|pairing| StudentBrief {
            id: pairing.id,
            name: pairing.name,
        })
        .collect();
    Ok(Json(MentorProfile {
        id: record.id,
        name: record.name,
        email: record.email,
        created_at: record.created_at,
        skills,
        students,
    }))
}

async fn mentor_students(
    State(state): State<SharedState>,
    user: AuthUser,
) -> Result<Json<Vec<PairingView>>> {
    let user = user.require(Role::Mentor)?;
    Ok(Json(state.store.students_of(user.id).await))
}

async fn student_mentors(
    State(state): State<SharedState>,
    user: AuthUser,
) -> Result<Json<Vec<PairingView>>> {
    let user = user.require(Role::Student)?;
    Ok(Json(state.store.mentors_of(user.id).await))
}

/// A mentor's student group for one skill
async fn group_members(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(skill_id): Path<SkillId>,
) -> Result<Json<Vec<PairingView>>> {
    let user = user.require(Role::Mentor)?;
    Ok(Json(state.store.group_members(user.id, skill_id).await))
}

async fn create_announcement(
    State(state): State<SharedState>,
    user: AuthUser,
    Json(req): Json<AnnouncementRequest>,
) -> Result<Json<AnnouncementView>> {
    let user = user.require(Role::Mentor)?;
    if req.skill_name.trim().is_empty() || req.content.trim().is_empty() {
        return Err(ServerError::InvalidQuery("Missing fields".to_string()));
    }
    let Some(skill) = state.store.find_skill(&req.skill_name).await else {
        let suggestions = state.store.similar_skills(&req.skill_name, 3).await;
        return Err(ServerError::NotFound {
            resource: "Skill".to_string(),
            suggestions,
        });
    };
    let view = state
        .store
        .create_announcement(user.id, skill.id, req.content)
        .await?;
    Ok(Json(view))
}

/// Role-shaped announcement feed: students see their skills' feed,
/// mentors their own posts, admins everything
async fn list_announcements(
    State(state): State<SharedState>,
    user: AuthUser,
    Query(page): Query<PageParams>,
) -> Result<Json<Vec<AnnouncementView>>> {
    let offset = page.offset.unwrap_or(0);
    let limit = page.limit.unwrap_or(state.config.announcement_page_size);
    let items = match user.role {
        Role::Student => {
            state
                .store
                .announcements_for_student(user.id, offset, limit)
                .await
        }
        Role::Mentor => {
            state
                .store
                .announcements_for_mentor(user.id, page.skill.as_deref(), offset, limit)
                .await
        }
        Role::Admin => state.store.announcements_all(offset, limit).await,
    };
    Ok(Json(items))
}

async fn admin_statistics(
    State(state): State<SharedState>,
    user: AuthUser,
) -> Result<Json<Statistics>> {
    user.require(Role::Admin)?;
    Ok(Json(state.store.statistics().await))
}

/// User search over the published users index (name and email keys)
async fn admin_search(
    State(state): State<SharedState>,
    user: AuthUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>> {
    user.require(Role::Admin)?;
    if params.q.is_empty() {
        return Ok(Json(SearchResponse {
            suggestions: Vec::new(),
        }));
    }
    let hits = state
        .indexes
        .suggest_users(&params.q, state.config.suggestion_limit)?;
    Ok(Json(SearchResponse {
        suggestions: dedup_users(hits),
    }))
}

async fn admin_user_details(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<UserId>,
    Query(params): Query<UserDetailParams>,
) -> Result<Json<UserDetail>> {
    user.require(Role::Admin)?;
    let record = state
        .store
        .get_user(id)
        .await
        .ok_or_else(|| ServerError::not_found("User"))?;
    let skills = state.store.skills_of_user(id).await;

    let mut detail = UserDetail {
        id: record.id,
        name: record.name,
        email: record.email,
        role: record.role,
        location: record.location,
        skills,
        mentor: None,
        mentees: None,
        announcements: None,
    };

    match record.role {
        Role::Student => {
            detail.mentor = state.store.mentor_name_of(id).await;
        }
        Role::Mentor => {
            let limit = params.limit.unwrap_or(state.config.announcement_page_size);
            let offset = params.offset.unwrap_or(0);
            let mentees = state
                .store
                .students_of(id)
                .await
                .into_iter()
                .skip(offset)
                .take(limit)
                .map(|pairing| pairing.name)
                .collect();
            detail.mentees = Some(mentees);

            let ann_limit = params
                .ann_limit
                .unwrap_or(state.config.announcement_page_size);
            let ann_offset = params.ann_offset.unwrap_or(0);
            detail.announcements = Some(
                state
                    .store
                    .announcements_for_mentor(id, None, ann_offset, ann_limit)
                    .await,
            );
        }
        Role::Admin => {}
    }

    Ok(Json(detail))
}

/// Delete announcements older than the given cutoff
async fn purge_announcements(
    State(state): State<SharedState>,
    user: AuthUser,
    Json(req): Json<PurgeRequest>,
) -> Result<Json<PurgeResponse>> {
    user.require(Role::Admin)?;
    let deleted = state.store.delete_announcements_before(req.before).await;
    Ok(Json(PurgeResponse { deleted }))
}

/// Create the router with all routes
pub fn create_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .route("/metrics", get(metrics_text))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/suggest/:kind", get(suggest))
        .route("/admin/rebuild", post(rebuild_all))
        .route("/admin/rebuild/:kind", post(rebuild_one))
        .route("/skills", get(list_skills))
        .route("/dashboard/student/profile", get(student_profile))
        .route("/dashboard/mentor/profile", get(mentor_profile))
        .route("/dashboard/mentor/students", get(mentor_students))
        .route("/dashboard/student/mentors", get(student_mentors))
        .route("/dashboard/group/:skill_id", get(group_members))
        .route(
            "/announcements",
            post(create_announcement).get(list_announcements),
        )
        .route("/admin/statistics", get(admin_statistics))
        .route("/admin/search", get(admin_search))
        .route("/admin/user/:id", get(admin_user_details))
        .route("/admin/announcements", delete(purge_announcements))
        .layer(cors)
        .with_state(state)
}
