//! End-to-end server integration tests
//!
//! Drives the full flow over HTTP: register -> rebuild -> suggest,
//! plus assignment, announcements, and admin surfaces.

use std::net::SocketAddr;
use std::sync::Arc;

use mentorlink_core::{PrefixIndex, ServiceConfig, SkillRef, UserSummary};
use mentorlink_server::{create_router, create_shared_state, IndexKind, SharedState};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;

/// Test harness running the service on an ephemeral port
pub struct TestHarness {
    pub server_url: String,
    pub state: SharedState,
    pub http: Client,
    _shutdown: tokio::sync::oneshot::Sender<()>,
}

impl TestHarness {
    /// Start a server with the default config and built (empty) indexes
    pub async fn new() -> Self {
        Self::with_config(ServiceConfig::default(), true).await
    }

    /// Start a server without running the initial index build
    pub async fn new_unbuilt() -> Self {
        Self::with_config(ServiceConfig::default(), false).await
    }

    pub async fn with_config(config: ServiceConfig, initial_rebuild: bool) -> Self {
        let state = create_shared_state(config, "e2e-test-secret", None);
        if initial_rebuild {
            state
                .indexes
                .rebuild_all(&state.store)
                .await
                .expect("initial rebuild");
        }

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("Bind should succeed");
        let addr = listener.local_addr().expect("local addr");
        let server_url = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let router = create_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Self {
            server_url,
            state,
            http: Client::new(),
            _shutdown: shutdown_tx,
        }
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        role: &str,
        village: &str,
        skills: &[&str],
    ) -> AuthResponse {
        let resp = self
            .http
            .post(format!("{}/auth/register", self.server_url))
            .json(&json!({
                "name": name,
                "email": email,
                "password": "correct-horse",
                "role": role,
                "location": { "village": village },
                "skills": skills,
            }))
            .send()
            .await
            .expect("register request");
        assert_eq!(resp.status().as_u16(), 201, "register should return 201");
        resp.json().await.expect("register response")
    }

    pub async fn login(&self, email: &str, password: &str, role: &str) -> reqwest::Response {
        self.http
            .post(format!("{}/auth/login", self.server_url))
            .json(&json!({ "email": email, "password": password, "role": role }))
            .send()
            .await
            .expect("login request")
    }

    pub async fn suggest_raw(&self, kind: &str, query: &str) -> reqwest::Response {
        self.http
            .get(format!("{}/suggest/{kind}", self.server_url))
            .query(&[("query", query)])
            .send()
            .await
            .expect("suggest request")
    }

    pub async fn suggest_skills(&self, query: &str) -> Vec<SkillRef> {
        let resp = self.suggest_raw("skills", query).await;
        assert_eq!(resp.status().as_u16(), 200);
        resp.json().await.expect("skill suggestions")
    }

    pub async fn suggest_users(&self, query: &str) -> Vec<UserSummary> {
        let resp = self.suggest_raw("users", query).await;
        assert_eq!(resp.status().as_u16(), 200);
        resp.json().await.expect("user suggestions")
    }

    pub async fn rebuild(&self) -> Vec<RebuildReport> {
        let resp = self
            .http
            .post(format!("{}/admin/rebuild", self.server_url))
            .send()
            .await
            .expect("rebuild request");
        assert_eq!(resp.status().as_u16(), 200);
        resp.json().await.expect("rebuild reports")
    }

    pub async fn health(&self) -> HealthResponse {
        self.http
            .get(format!("{}/health", self.server_url))
            .send()
            .await
            .expect("health request")
            .json()
            .await
            .expect("health response")
    }

    pub async fn get_authed(&self, path: &str, token: &str) -> reqwest::Response {
        self.http
            .get(format!("{}{path}", self.server_url))
            .bearer_auth(token)
            .send()
            .await
            .expect("authed request")
    }

    pub fn skills_snapshot(&self) -> Option<Arc<PrefixIndex<SkillRef>>> {
        self.state.indexes.skills_snapshot()
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct RebuildReport {
    pub kind: IndexKind,
    pub entries: usize,
}

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub indexes: IndexStats,
}

#[derive(Debug, Deserialize)]
pub struct IndexStats {
    pub skills_ready: bool,
    pub users_ready: bool,
    pub skills_entries: usize,
    pub users_entries: usize,
}

#[derive(Debug, Deserialize)]
pub struct PairingView {
    pub id: u64,
    pub name: String,
    pub skill: String,
}

#[derive(Debug, Deserialize)]
pub struct AnnouncementView {
    pub content: String,
    pub skill: String,
    pub mentor_name: String,
}

#[derive(Debug, Serialize)]
struct AnnouncementRequest<'a> {
    skill_name: &'a str,
    content: &'a str,
}

// ============================================================================
// Health and startup contract
// ============================================================================

#[tokio::test]
async fn test_server_health_after_startup_build() {
    let harness = TestHarness::new().await;
    let health = harness.health().await;

    assert_eq!(health.status, "ready");
    assert!(health.indexes.skills_ready);
    assert!(health.indexes.users_ready);
    assert_eq!(health.indexes.skills_entries, 0);
}

#[tokio::test]
async fn test_unbuilt_index_returns_503() {
    let harness = TestHarness::new_unbuilt().await;

    let health = harness.health().await;
    assert_eq!(health.status, "building");

    let resp = harness.suggest_raw("skills", "po").await;
    assert_eq!(resp.status().as_u16(), 503);
}

#[tokio::test]
async fn test_invalid_suggest_kind_returns_400() {
    let harness = TestHarness::new().await;
    let resp = harness.suggest_raw("mentors", "po").await;
    assert_eq!(resp.status().as_u16(), 400);
}

// ============================================================================
// Registration and login
// ============================================================================

#[tokio::test]
async fn test_register_and_login() {
    let harness = TestHarness::new().await;
    let registered = harness
        .register("Ada", "ada@x.com", "mentor", "Eldoret", &["Weaving"])
        .await;
    assert!(registered.user_id > 0);
    assert!(!registered.token.is_empty());

    let ok = harness.login("ada@x.com", "correct-horse", "mentor").await;
    assert_eq!(ok.status().as_u16(), 200);

    let wrong_password = harness.login("ada@x.com", "wrong", "mentor").await;
    assert_eq!(wrong_password.status().as_u16(), 401);

    let wrong_role = harness.login("ada@x.com", "correct-horse", "student").await;
    assert_eq!(wrong_role.status().as_u16(), 401);
}

#[tokio::test]
async fn test_duplicate_email_returns_409() {
    let harness = TestHarness::new().await;
    harness
        .register("Ada", "ada@x.com", "mentor", "Eldoret", &[])
        .await;

    let resp = harness
        .http
        .post(format!("{}/auth/register", harness.server_url))
        .json(&json!({
            "name": "Ada Again",
            "email": "ada@x.com",
            "password": "pw-enough",
            "role": "student",
            "location": { "village": "Eldoret" },
        }))
        .send()
        .await
        .expect("register request");
    assert_eq!(resp.status().as_u16(), 409);
}

// ============================================================================
// Suggestions end to end
// ============================================================================

#[tokio::test]
async fn test_suggest_end_to_end() {
    let harness = TestHarness::new().await;
    harness
        .register(
            "Mentor One",
            "m1@x.com",
            "mentor",
            "Eldoret",
            &["Python", "Pottery"],
        )
        .await;
    harness
        .register("Pat", "pat@x.com", "student", "Eldoret", &[])
        .await;

    // indexes reflect the store as of the last rebuild, not live state
    assert!(harness.suggest_skills("p").await.is_empty());

    let reports = harness.rebuild().await;
    assert_eq!(reports.len(), 2);

    let hits = harness.suggest_skills("p").await;
    assert_eq!(
        hits.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        vec!["Python", "Pottery"],
        "insertion order preserved"
    );
    assert_eq!(harness.suggest_skills("po").await.len(), 1);
    assert_eq!(harness.suggest_skills("po").await[0].name, "Pottery");
    assert!(harness.suggest_skills("zzz").await.is_empty());

    // "pat" matches both the name key and the email key; the response
    // carries the record once
    let users = harness.suggest_users("pat").await;
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].name, "Pat");
    assert_eq!(users[0].email, "pat@x.com");

    // case insensitivity over the HTTP surface
    let upper = harness.suggest_users("PAT").await;
    assert_eq!(upper.len(), 1);
    assert_eq!(upper[0].name, "Pat");
}

#[tokio::test]
async fn test_suggest_limit_default_and_override() {
    let harness = TestHarness::new().await;
    let skills: Vec<String> = (0..15).map(|i| format!("Craft {i:02}")).collect();
    let skill_refs: Vec<&str> = skills.iter().map(|s| s.as_str()).collect();
    harness
        .register("Mentor", "m@x.com", "mentor", "Eldoret", &skill_refs)
        .await;
    harness.rebuild().await;

    // default limit is 10
    assert_eq!(harness.suggest_skills("craft").await.len(), 10);

    let resp = harness
        .http
        .get(format!("{}/suggest/skills", harness.server_url))
        .query(&[("query", "craft"), ("limit", "3")])
        .send()
        .await
        .expect("suggest request");
    let hits: Vec<SkillRef> = resp.json().await.expect("suggestions");
    assert_eq!(hits.len(), 3);
}

#[tokio::test]
async fn test_empty_query_returns_empty_list() {
    let harness = TestHarness::new().await;
    harness
        .register("Mentor", "m@x.com", "mentor", "Eldoret", &["Pottery"])
        .await;
    harness.rebuild().await;

    assert!(harness.suggest_skills("").await.is_empty());
}

// ============================================================================
// Rebuild semantics
// ============================================================================

#[tokio::test]
async fn test_rebuild_swaps_snapshot() {
    let harness = TestHarness::new().await;

    let before = harness.skills_snapshot().expect("built at startup");
    harness.rebuild().await;
    let after = harness.skills_snapshot().expect("rebuilt");

    assert!(
        !Arc::ptr_eq(&before, &after),
        "Snapshot should change after rebuild"
    );
}

#[tokio::test]
async fn test_rebuild_one_kind() {
    let harness = TestHarness::new_unbuilt().await;
    harness
        .register("Mentor", "m@x.com", "mentor", "Eldoret", &["Pottery"])
        .await;

    let resp = harness
        .http
        .post(format!("{}/admin/rebuild/skills", harness.server_url))
        .send()
        .await
        .expect("rebuild request");
    assert_eq!(resp.status().as_u16(), 200);
    let report: RebuildReport = resp.json().await.expect("report");
    assert_eq!(report.kind, IndexKind::Skills);
    assert_eq!(report.entries, 1);

    // the users index is still unbuilt
    assert_eq!(harness.suggest_raw("users", "m").await.status().as_u16(), 503);
    assert_eq!(harness.suggest_raw("skills", "po").await.status().as_u16(), 200);
}

#[tokio::test]
async fn test_concurrent_suggests_during_rebuild() {
    let harness = TestHarness::new().await;
    harness
        .register("Mentor", "m@x.com", "mentor", "Eldoret", &["Pottery"])
        .await;
    harness.rebuild().await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let url = harness.server_url.clone();
        handles.push(tokio::spawn(async move {
            let client = Client::new();
            let resp = client
                .get(format!("{url}/suggest/skills"))
                .query(&[("query", "po")])
                .send()
                .await?;
            Ok::<u16, reqwest::Error>(resp.status().as_u16())
        }));
    }

    harness.rebuild().await;

    for handle in handles {
        let status = handle.await.expect("task").expect("request");
        assert_eq!(status, 200, "suggests overlapping a rebuild must succeed");
    }
}

// ============================================================================
// Mentor assignment
// ============================================================================

async fn mentor_ids_of(harness: &TestHarness, token: &str) -> Vec<u64> {
    let resp = harness
        .get_authed("/dashboard/student/mentors", token)
        .await;
    assert_eq!(resp.status().as_u16(), 200);
    let pairings: Vec<PairingView> = resp.json().await.expect("pairings");
    pairings.into_iter().map(|p| p.id).collect()
}

#[tokio::test]
async fn test_students_spread_across_least_loaded_mentors() {
    let harness = TestHarness::new().await;
    let m1 = harness
        .register("M1", "m1@x.com", "mentor", "Eldoret", &["Pottery"])
        .await;
    let m2 = harness
        .register("M2", "m2@x.com", "mentor", "Eldoret", &["Pottery"])
        .await;

    let s1 = harness
        .register("S1", "s1@x.com", "student", "Eldoret", &["Pottery"])
        .await;
    let s2 = harness
        .register("S2", "s2@x.com", "student", "Eldoret", &["Pottery"])
        .await;
    let s3 = harness
        .register("S3", "s3@x.com", "student", "Eldoret", &["Pottery"])
        .await;

    // tie on zero load goes to the lower mentor id, then the load
    // balance alternates
    assert_eq!(mentor_ids_of(&harness, &s1.token).await, vec![m1.user_id]);
    assert_eq!(mentor_ids_of(&harness, &s2.token).await, vec![m2.user_id]);
    assert_eq!(mentor_ids_of(&harness, &s3.token).await, vec![m1.user_id]);
}

#[tokio::test]
async fn test_capacity_cap_leaves_student_unassigned() {
    let config = ServiceConfig::default().with_mentor_capacity(1);
    let harness = TestHarness::with_config(config, true).await;
    harness
        .register("M", "m@x.com", "mentor", "Eldoret", &["Pottery"])
        .await;

    let s1 = harness
        .register("S1", "s1@x.com", "student", "Eldoret", &["Pottery"])
        .await;
    let s2 = harness
        .register("S2", "s2@x.com", "student", "Eldoret", &["Pottery"])
        .await;

    assert_eq!(mentor_ids_of(&harness, &s1.token).await.len(), 1);
    assert!(
        mentor_ids_of(&harness, &s2.token).await.is_empty(),
        "an unassigned student is a normal outcome"
    );
}

#[tokio::test]
async fn test_assignment_is_village_scoped() {
    let harness = TestHarness::new().await;
    harness
        .register("M", "m@x.com", "mentor", "Nakuru", &["Pottery"])
        .await;

    let student = harness
        .register("S", "s@x.com", "student", "Eldoret", &["Pottery"])
        .await;

    assert!(mentor_ids_of(&harness, &student.token).await.is_empty());
}

#[tokio::test]
async fn test_mentor_sees_assigned_students() {
    let harness = TestHarness::new().await;
    let mentor = harness
        .register("M", "m@x.com", "mentor", "Eldoret", &["Pottery"])
        .await;
    harness
        .register("S", "s@x.com", "student", "Eldoret", &["Pottery"])
        .await;

    let resp = harness
        .get_authed("/dashboard/mentor/students", &mentor.token)
        .await;
    assert_eq!(resp.status().as_u16(), 200);
    let students: Vec<PairingView> = resp.json().await.expect("students");
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].name, "S");
    assert_eq!(students[0].skill, "Pottery");
}

// ============================================================================
// Announcements
// ============================================================================

#[tokio::test]
async fn test_announcement_flow() {
    let harness = TestHarness::new().await;
    let mentor = harness
        .register("M", "m@x.com", "mentor", "Eldoret", &["Pottery"])
        .await;
    let student = harness
        .register("S", "s@x.com", "student", "Eldoret", &["Pottery"])
        .await;

    let created = harness
        .http
        .post(format!("{}/announcements", harness.server_url))
        .bearer_auth(&mentor.token)
        .json(&AnnouncementRequest {
            skill_name: "pottery",
            content: "Kiln day on Friday",
        })
        .send()
        .await
        .expect("create announcement");
    assert_eq!(created.status().as_u16(), 200);

    let feed = harness.get_authed("/announcements", &student.token).await;
    assert_eq!(feed.status().as_u16(), 200);
    let items: Vec<AnnouncementView> = feed.json().await.expect("feed");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].content, "Kiln day on Friday");
    assert_eq!(items[0].skill, "Pottery");
    assert_eq!(items[0].mentor_name, "M");
}

#[tokio::test]
async fn test_announcement_unknown_skill_suggests_similar() {
    let harness = TestHarness::new().await;
    let mentor = harness
        .register("M", "m@x.com", "mentor", "Eldoret", &["Pottery"])
        .await;

    let resp = harness
        .http
        .post(format!("{}/announcements", harness.server_url))
        .bearer_auth(&mentor.token)
        .json(&AnnouncementRequest {
            skill_name: "otter",
            content: "close enough",
        })
        .send()
        .await
        .expect("create announcement");
    assert_eq!(resp.status().as_u16(), 404);
    let body: serde_json::Value = resp.json().await.expect("error body");
    assert_eq!(body["suggestions"][0], "Pottery");
}

#[tokio::test]
async fn test_student_cannot_post_announcements() {
    let harness = TestHarness::new().await;
    let student = harness
        .register("S", "s@x.com", "student", "Eldoret", &["Pottery"])
        .await;

    let resp = harness
        .http
        .post(format!("{}/announcements", harness.server_url))
        .bearer_auth(&student.token)
        .json(&AnnouncementRequest {
            skill_name: "Pottery",
            content: "not allowed",
        })
        .send()
        .await
        .expect("create announcement");
    assert_eq!(resp.status().as_u16(), 403);
}

// ============================================================================
// Admin surface
// ============================================================================

#[tokio::test]
async fn test_admin_statistics_and_role_gate() {
    let harness = TestHarness::new().await;
    let admin = harness
        .register("Root", "root@x.com", "admin", "Eldoret", &[])
        .await;
    harness
        .register("M", "m@x.com", "mentor", "Eldoret", &["Pottery"])
        .await;
    harness
        .register("S", "s@x.com", "student", "Eldoret", &["Pottery"])
        .await;

    let resp = harness.get_authed("/admin/statistics", &admin.token).await;
    assert_eq!(resp.status().as_u16(), 200);
    let stats: serde_json::Value = resp.json().await.expect("stats");
    assert_eq!(stats["total_skills"], 1);
    assert_eq!(stats["total_mentors"], 1);
    assert_eq!(stats["total_students"], 1);

    let student = harness.login("s@x.com", "correct-horse", "student").await;
    let student: AuthResponse = student.json().await.expect("login");
    let forbidden = harness
        .get_authed("/admin/statistics", &student.token)
        .await;
    assert_eq!(forbidden.status().as_u16(), 403);

    let unauthenticated = harness
        .http
        .get(format!("{}/admin/statistics", harness.server_url))
        .send()
        .await
        .expect("request");
    assert_eq!(unauthenticated.status().as_u16(), 401);
}

#[tokio::test]
async fn test_admin_search_uses_published_users_index() {
    let harness = TestHarness::new().await;
    let admin = harness
        .register("Root", "root@x.com", "admin", "Eldoret", &[])
        .await;
    harness
        .register("Pat", "pat@x.com", "student", "Eldoret", &[])
        .await;
    harness.rebuild().await;

    let resp = harness
        .http
        .get(format!("{}/admin/search", harness.server_url))
        .query(&[("q", "pat")])
        .bearer_auth(&admin.token)
        .send()
        .await
        .expect("search request");
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().await.expect("search body");
    let suggestions = body["suggestions"].as_array().expect("array");
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0]["name"], "Pat");
}
