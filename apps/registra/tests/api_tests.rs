//! Integration tests for the Registra HTTP API.
//!
//! Uses axum-test to test the API handlers without starting a real
//! server. Auth tests modify environment variables, so every test
//! serializes on a shared mutex.

// Allow unwrap and panic in tests - these are standard for test code
// Allow holding MutexGuard across await in auth tests - tests are serialized
// intentionally to avoid env var conflicts
#![allow(clippy::unwrap_used, clippy::panic, clippy::await_holding_lock)]

use axum_test::TestServer;
use registra::api::{
    AppState, CallerJson, GradeStatusResponse, HealthResponse, RegisterResponse, StatusResponse,
    create_router,
};
use registra::seed::{SeedFile, build_registry};
use registra_core::{
    Caller, EnrollmentId, GradeStatus, Marks, ReevalDecision, RegistryError, RejectReason, Role,
    SubjectId, UserId,
};
use serde_json::json;
use std::sync::Mutex;

/// Mutex to serialize tests since auth tests modify env vars.
static AUTH_TEST_MUTEX: Mutex<()> = Mutex::new(());

// Template seed user ids, in file order.
const ADMIN: u64 = 0;
const FACULTY: u64 = 1;
const STUDENT: u64 = 2;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Guard wrapper that holds the mutex and ensures cleanup on drop.
struct TestGuard {
    _guard: std::sync::MutexGuard<'static, ()>,
}

impl Drop for TestGuard {
    fn drop(&mut self) {
        // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
        unsafe { std::env::remove_var("REGISTRA_API_KEY") };
    }
}

/// Create a test server seeded with the template registry (one admin,
/// one faculty, one student, one parent, two subjects).
/// Returns a guard that must be kept alive during the test.
fn create_test_server() -> (TestServer, TestGuard) {
    let guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::remove_var("REGISTRA_API_KEY") };
    let registry = build_registry(&SeedFile::template()).unwrap();
    let state = AppState::new(registry);
    let router = create_router(state);
    (
        TestServer::new(router).unwrap(),
        TestGuard { _guard: guard },
    )
}

fn caller(user_id: u64, role: Role) -> serde_json::Value {
    serde_json::to_value(CallerJson { user_id, role }).unwrap()
}

/// Create a subject through the API, returning its id.
async fn create_subject(
    server: &TestServer,
    code: &str,
    credits: u8,
    slots: &[u16],
    faculty_user_id: u64,
) -> u64 {
    let response = server
        .post("/subjects")
        .json(&json!({
            "caller": caller(ADMIN, Role::Admin),
            "code": code,
            "title": format!("{code} title"),
            "credits": credits,
            "slots": slots,
            "faculty_user_id": faculty_user_id,
        }))
        .await;
    response.assert_status_ok();
    response.json::<serde_json::Value>()["subject_id"]
        .as_u64()
        .unwrap()
}

/// Create an extra faculty user through the API, returning their id.
async fn create_faculty(server: &TestServer, name: &str) -> u64 {
    let response = server
        .post("/users")
        .json(&json!({
            "caller": caller(ADMIN, Role::Admin),
            "full_name": name,
            "role": "faculty",
        }))
        .await;
    response.assert_status_ok();
    response.json::<serde_json::Value>()["user_id"]
        .as_u64()
        .unwrap()
}

async fn register(server: &TestServer, student: u64, subjects: &[u64]) -> RegisterResponse {
    let response = server
        .post("/register")
        .json(&json!({
            "caller": caller(student, Role::Student),
            "subjects": subjects,
        }))
        .await;
    response.assert_status_ok();
    response.json()
}

// =============================================================================
// HEALTH & STATUS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _guard) = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_status_reports_seed_counts() {
    let (server, _guard) = create_test_server();

    let response = server.get("/status").await;

    response.assert_status_ok();
    let status: StatusResponse = response.json();
    assert_eq!(status.users, 4);
    assert_eq!(status.subjects, 2);
    assert_eq!(status.enrollments, 0);
    assert!(status.window_open);
}

// =============================================================================
// REGISTRATION
// =============================================================================

#[tokio::test]
async fn test_register_clean_batch() {
    let (server, _guard) = create_test_server();

    let outcome = register(&server, STUDENT, &[0, 1]).await;
    assert_eq!(outcome.accepted, vec![0, 1]);
    assert_eq!(outcome.newly_accepted, vec![0, 1]);
    assert!(outcome.rejected.is_empty());

    let status: StatusResponse = server.get("/status").await.json();
    assert_eq!(status.enrollments, 2);
}

#[tokio::test]
async fn test_register_credit_ceiling_partial_accept() {
    let (server, _guard) = create_test_server();

    // 25 + 2 fills the 27-credit ceiling; the 3-credit subject overruns.
    let heavy = create_subject(&server, "HV490", 25, &[3], FACULTY).await;
    let small = create_subject(&server, "SM101", 2, &[4], FACULTY).await;
    let over = create_subject(&server, "OV200", 3, &[5], FACULTY).await;

    let outcome = register(&server, STUDENT, &[heavy, small, over]).await;
    assert_eq!(outcome.accepted, vec![heavy, small]);
    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(outcome.rejected[0].subject_id, over);
    assert_eq!(outcome.rejected[0].reason, RejectReason::CreditLimitExceeded);
}

#[tokio::test]
async fn test_register_slot_clash_in_same_batch() {
    let (server, _guard) = create_test_server();

    // Subjects from different faculty so both may occupy slot 20.
    let other_faculty = create_faculty(&server, "Dr. Second").await;
    let first = create_subject(&server, "CL301", 3, &[20], FACULTY).await;
    let second = create_subject(&server, "CL302", 3, &[20], other_faculty).await;

    let outcome = register(&server, STUDENT, &[first, second]).await;
    assert_eq!(outcome.accepted, vec![first]);
    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(
        outcome.rejected[0].reason,
        RejectReason::SlotClash {
            with: SubjectId(first)
        }
    );
}

#[tokio::test]
async fn test_register_unknown_subject_is_not_found() {
    let (server, _guard) = create_test_server();

    // The whole batch fails, including the valid subject alongside it.
    let response = server
        .post("/register")
        .json(&json!({
            "caller": caller(STUDENT, Role::Student),
            "subjects": [0, 999],
        }))
        .await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);

    let status: serde_json::Value = server.get("/status").await.json();
    assert_eq!(status["enrollments"], 0);
}

#[tokio::test]
async fn test_closed_window_returns_conflict() {
    let (server, _guard) = create_test_server();

    server
        .post("/window")
        .json(&json!({ "caller": caller(ADMIN, Role::Admin), "open": false }))
        .await
        .assert_status_ok();

    let response = server
        .post("/register")
        .json(&json!({
            "caller": caller(STUDENT, Role::Student),
            "subjects": [0],
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CONFLICT);
}

// =============================================================================
// TIMETABLE
// =============================================================================

#[tokio::test]
async fn test_timetable_views() {
    let (server, _guard) = create_test_server();
    register(&server, STUDENT, &[0]).await;

    let student_grid: serde_json::Value = server
        .get(&format!("/timetable/{STUDENT}"))
        .await
        .json();
    assert_eq!(student_grid["cells"].as_array().unwrap().len(), 2);

    let faculty_grid: serde_json::Value = server
        .get(&format!("/timetable/{FACULTY}?view=faculty"))
        .await
        .json();
    // Faculty teaches both template subjects, two slots each.
    assert_eq!(faculty_grid["cells"].as_array().unwrap().len(), 4);

    let bad = server.get(&format!("/timetable/{STUDENT}?view=weird")).await;
    bad.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

// =============================================================================
// ATTENDANCE
// =============================================================================

#[tokio::test]
async fn test_attendance_mark_and_summary() {
    let (server, _guard) = create_test_server();
    register(&server, STUDENT, &[0]).await;
    let enrollment = 0u64;

    // No sessions yet: summary is null.
    let empty: serde_json::Value = server
        .get(&format!("/attendance/{enrollment}"))
        .await
        .json();
    assert!(empty["summary"].is_null());

    for (date, present) in [("2026-04-01", true), ("2026-04-02", false), ("2026-04-03", true)] {
        server
            .post("/attendance")
            .json(&json!({
                "caller": caller(FACULTY, Role::Faculty),
                "enrollment_id": enrollment,
                "date": date,
                "present": present,
            }))
            .await
            .assert_status_ok();
    }

    let summary: serde_json::Value = server
        .get(&format!("/attendance/{enrollment}"))
        .await
        .json();
    assert_eq!(summary["summary"]["present"], 2);
    assert_eq!(summary["summary"]["total"], 3);
    assert_eq!(summary["summary"]["percent_bp"], 6666);

    let records = summary["records"].as_array().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["date"], "2026-04-01");
    assert_eq!(records[1]["present"], false);
}

#[tokio::test]
async fn test_student_attendance_listing() {
    let (server, _guard) = create_test_server();
    register(&server, STUDENT, &[0, 1]).await;

    server
        .post("/attendance")
        .json(&json!({
            "caller": caller(FACULTY, Role::Faculty),
            "enrollment_id": 0,
            "date": "2026-04-01",
            "present": true,
        }))
        .await
        .assert_status_ok();

    let listing: serde_json::Value = server
        .get(&format!("/attendance/student/{STUDENT}"))
        .await
        .json();
    let subjects = listing["subjects"].as_array().unwrap();
    assert_eq!(subjects.len(), 2);
    assert_eq!(subjects[0]["code"], "CS101");
    assert_eq!(subjects[0]["summary"]["present"], 1);
    assert!(subjects[1]["summary"].is_null());

    // Unknown student id is a straight not-found.
    server
        .get("/attendance/student/999")
        .await
        .assert_status(axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_attendance_forbidden_for_unassigned_caller() {
    let (server, _guard) = create_test_server();
    register(&server, STUDENT, &[0]).await;

    let response = server
        .post("/attendance")
        .json(&json!({
            "caller": caller(STUDENT, Role::Student),
            "enrollment_id": 0,
            "date": "2026-04-01",
            "present": true,
        }))
        .await;
    response.assert_status(axum::http::StatusCode::FORBIDDEN);
}

// =============================================================================
// GRADING
// =============================================================================

async fn grade_action(
    server: &TestServer,
    path: &str,
    body: serde_json::Value,
) -> GradeStatusResponse {
    let response = server.post(path).json(&body).await;
    response.assert_status_ok();
    response.json()
}

#[tokio::test]
async fn test_grade_denied_reeval_is_terminal() {
    let (server, _guard) = create_test_server();
    register(&server, STUDENT, &[0]).await;
    let enrollment = 0u64;

    grade_action(
        &server,
        "/grades/submit",
        json!({
            "caller": caller(FACULTY, Role::Faculty),
            "enrollment_id": enrollment,
            "marks": 58,
        }),
    )
    .await;
    grade_action(
        &server,
        "/grades/finalize",
        json!({
            "caller": caller(FACULTY, Role::Faculty),
            "enrollment_id": enrollment,
        }),
    )
    .await;
    grade_action(
        &server,
        "/grades/reeval/request",
        json!({
            "caller": caller(STUDENT, Role::Student),
            "enrollment_id": enrollment,
        }),
    )
    .await;
    let denied = grade_action(
        &server,
        "/grades/reeval/resolve",
        json!({
            "caller": caller(ADMIN, Role::Admin),
            "enrollment_id": enrollment,
            "decision": "deny",
        }),
    )
    .await;
    assert_eq!(denied.status, GradeStatus::ReevalDenied);

    // Denied is terminal: re-request and score application both 409.
    server
        .post("/grades/reeval/request")
        .json(&json!({
            "caller": caller(STUDENT, Role::Student),
            "enrollment_id": enrollment,
        }))
        .await
        .assert_status(axum::http::StatusCode::CONFLICT);
    server
        .post("/grades/reeval/apply")
        .json(&json!({
            "caller": caller(FACULTY, Role::Faculty),
            "enrollment_id": enrollment,
            "marks": 90,
        }))
        .await
        .assert_status(axum::http::StatusCode::CONFLICT);

    // Marks unchanged, visible to the student as 58/C.
    let grades: serde_json::Value = server
        .get(&format!("/grades/{STUDENT}?viewer_role=student"))
        .await
        .json();
    assert_eq!(grades["grades"][0]["marks"], 58);
    assert_eq!(grades["grades"][0]["letter"], "C");
}

#[tokio::test]
async fn test_approved_reeval_writes_audit_trail() {
    let (server, _guard) = create_test_server();
    register(&server, STUDENT, &[0]).await;
    let enrollment = 0u64;

    for (path, body) in [
        (
            "/grades/submit",
            json!({ "caller": caller(FACULTY, Role::Faculty), "enrollment_id": enrollment, "marks": 64 }),
        ),
        (
            "/grades/finalize",
            json!({ "caller": caller(FACULTY, Role::Faculty), "enrollment_id": enrollment }),
        ),
        (
            "/grades/reeval/request",
            json!({ "caller": caller(STUDENT, Role::Student), "enrollment_id": enrollment }),
        ),
        (
            "/grades/reeval/resolve",
            json!({ "caller": caller(ADMIN, Role::Admin), "enrollment_id": enrollment, "decision": "approve" }),
        ),
        (
            "/grades/reeval/apply",
            json!({ "caller": caller(FACULTY, Role::Faculty), "enrollment_id": enrollment, "marks": 71 }),
        ),
    ] {
        grade_action(&server, path, body).await;
    }

    let audit: serde_json::Value = server.get(&format!("/audit/{enrollment}")).await.json();
    let revisions = audit["revisions"].as_array().unwrap();
    assert_eq!(revisions.len(), 1);
    assert_eq!(revisions[0]["old_marks"], 64);
    assert_eq!(revisions[0]["new_marks"], 71);
    assert_eq!(revisions[0]["actor_user_id"], FACULTY);
}

#[tokio::test]
async fn test_draft_grade_hidden_from_student_viewer() {
    let (server, _guard) = create_test_server();
    register(&server, STUDENT, &[0]).await;

    grade_action(
        &server,
        "/grades/submit",
        json!({
            "caller": caller(FACULTY, Role::Faculty),
            "enrollment_id": 0,
            "marks": 88,
        }),
    )
    .await;

    let student_view: serde_json::Value = server
        .get(&format!("/grades/{STUDENT}?viewer_role=student"))
        .await
        .json();
    assert!(student_view["grades"].as_array().unwrap().is_empty());

    let faculty_view: serde_json::Value = server
        .get(&format!("/grades/{STUDENT}?viewer_role=faculty"))
        .await
        .json();
    assert_eq!(faculty_view["grades"].as_array().unwrap().len(), 1);
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

#[tokio::test]
async fn test_error_status_mapping() {
    let (server, _guard) = create_test_server();

    // Forbidden: student creating a user.
    server
        .post("/users")
        .json(&json!({
            "caller": caller(STUDENT, Role::Student),
            "full_name": "Eve",
            "role": "student",
        }))
        .await
        .assert_status(axum::http::StatusCode::FORBIDDEN);

    // Not found: unknown enrollment.
    server
        .get("/attendance/999")
        .await
        .assert_status(axum::http::StatusCode::NOT_FOUND);

    // Bad request: slot ordinal outside the weekly grid.
    server
        .post("/subjects")
        .json(&json!({
            "caller": caller(ADMIN, Role::Admin),
            "code": "BAD01",
            "title": "Bad slots",
            "credits": 3,
            "slots": [99],
            "faculty_user_id": FACULTY,
        }))
        .await
        .assert_status(axum::http::StatusCode::BAD_REQUEST);

    // Conflict: duplicate subject code.
    server
        .post("/subjects")
        .json(&json!({
            "caller": caller(ADMIN, Role::Admin),
            "code": "CS101",
            "title": "Duplicate",
            "credits": 3,
            "slots": [30],
            "faculty_user_id": FACULTY,
        }))
        .await
        .assert_status(axum::http::StatusCode::CONFLICT);
}

// =============================================================================
// AUTH MIDDLEWARE
// =============================================================================

#[tokio::test]
async fn test_api_key_auth() {
    let guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::set_var("REGISTRA_API_KEY", "secret-key") };
    let _guard = TestGuard { _guard: guard };

    let registry = build_registry(&SeedFile::template()).unwrap();
    let server = TestServer::new(create_router(AppState::new(registry))).unwrap();

    // Health is always open.
    server.get("/health").await.assert_status_ok();

    // Everything else requires the key.
    server
        .get("/status")
        .await
        .assert_status(axum::http::StatusCode::UNAUTHORIZED);
    server
        .get("/status")
        .add_header(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_static("Bearer wrong-key"),
        )
        .await
        .assert_status(axum::http::StatusCode::UNAUTHORIZED);
    server
        .get("/status")
        .add_header(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_static("Bearer secret-key"),
        )
        .await
        .assert_status_ok();
}

// =============================================================================
// CONCURRENT RE-EVALUATION RESOLUTION
// =============================================================================

/// Two concurrent resolutions of the same pending request: exactly one
/// wins, the other observes the committed transition and fails.
#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_reeval_resolution_single_winner() {
    let guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::remove_var("REGISTRA_API_KEY") };
    let _guard = TestGuard { _guard: guard };

    let mut registry = build_registry(&SeedFile::template()).unwrap();
    let admin = Caller::new(UserId(ADMIN), Role::Admin);
    let faculty = Caller::new(UserId(FACULTY), Role::Faculty);
    let student = Caller::new(UserId(STUDENT), Role::Student);

    registry.register(student, &[SubjectId(0)]).unwrap();
    let enrollment = EnrollmentId(0);
    registry
        .submit_grade(faculty, enrollment, Marks(50))
        .unwrap();
    registry.finalize_grade(faculty, enrollment).unwrap();
    registry.request_reeval(student, enrollment).unwrap();

    let state = AppState::new(registry);

    let approve_state = state.clone();
    let deny_state = state.clone();
    let approve = tokio::spawn(async move {
        let mut registry = approve_state.registry.write().await;
        registry.resolve_reeval(admin, enrollment, ReevalDecision::Approve)
    });
    let deny = tokio::spawn(async move {
        let mut registry = deny_state.registry.write().await;
        registry.resolve_reeval(admin, enrollment, ReevalDecision::Deny)
    });

    let results = [approve.await.unwrap(), deny.await.unwrap()];
    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);

    // The loser saw the committed state, not the pending request.
    let loss = results
        .iter()
        .find(|r| r.is_err())
        .and_then(|r| r.as_ref().err())
        .unwrap();
    assert!(matches!(loss, RegistryError::InvalidTransition { .. }));
}
