//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Handlers hold the registry lock for the shortest possible span:
//! reads take the shared lock, mutations the exclusive one. The write
//! lock is what serializes concurrent registration and re-evaluation
//! calls; any request that loses the race observes the committed state
//! and gets the core's structured error back.

use super::{
    AppState,
    types::{
        AssignRoleRequest, AttendanceRecordJson, AttendanceResponse, AuditResponse,
        CreateSubjectRequest, CreateSubjectResponse, CreateUserRequest, CreateUserResponse,
        ErrorResponse, GradeActionRequest, GradeScoreRequest, GradeStatusResponse, GradeViewJson,
        GradeViewerQuery, GradesResponse, HealthResponse, MarkAttendanceRequest,
        ReevalResolveRequest, RegisterRequest, RegisterResponse, ScoreRevisionJson, StatusResponse,
        StudentAttendanceJson, StudentAttendanceResponse, SubjectJson, TimetableQuery,
        TimetableResponse, WindowRequest, error_status,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use registra_core::{EnrollmentId, RegistryError, UserId, UserSpec};

/// Convert a core error into its HTTP response.
fn error_response(error: &RegistryError) -> Response {
    (error_status(error), Json(ErrorResponse::new(error))).into_response()
}

// =============================================================================
// HEALTH & STATUS
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// Registry status: entity counts and window state.
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.registry.read().await;
    let counts = registry.counts();

    let response = StatusResponse {
        semester: registry.semester().0,
        users: counts.users,
        subjects: counts.subjects,
        enrollments: counts.enrollments,
        grades: counts.grades,
        window_open: counts.window_open,
    };

    (StatusCode::OK, Json(response))
}

// =============================================================================
// DIRECTORY
// =============================================================================

/// Create a user (Admin).
pub async fn create_user_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Response {
    let spec = UserSpec {
        full_name: request.full_name.clone(),
        role: request.role,
        child: request.child_user_id.map(UserId),
    };

    let mut registry = state.registry.write().await;
    match registry.add_user(request.caller.to_caller(), spec) {
        Ok(user_id) => (
            StatusCode::OK,
            Json(CreateUserResponse { user_id: user_id.0 }),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// Reassign a user's role (Admin).
pub async fn assign_role_handler(
    State(state): State<AppState>,
    Json(request): Json<AssignRoleRequest>,
) -> Response {
    let mut registry = state.registry.write().await;
    match registry.assign_role(
        request.caller.to_caller(),
        UserId(request.user_id),
        request.role,
    ) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response(&e),
    }
}

// =============================================================================
// CATALOG
// =============================================================================

/// Create a subject (Admin or Faculty).
pub async fn create_subject_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateSubjectRequest>,
) -> Response {
    let spec = match request.to_spec() {
        Ok(spec) => spec,
        Err(e) => return error_response(&e),
    };

    let mut registry = state.registry.write().await;
    match registry.add_subject(request.caller.to_caller(), spec) {
        Ok(subject_id) => (
            StatusCode::OK,
            Json(CreateSubjectResponse {
                subject_id: subject_id.0,
            }),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// List the catalog.
pub async fn list_subjects_handler(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.registry.read().await;
    let subjects: Vec<SubjectJson> = registry
        .catalog()
        .list()
        .map(SubjectJson::from_subject)
        .collect();
    (StatusCode::OK, Json(subjects))
}

// =============================================================================
// REGISTRATION
// =============================================================================

/// Register a batch of subjects (Student).
pub async fn register_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Response {
    let subjects = request.subject_ids();

    let mut registry = state.registry.write().await;
    match registry.register(request.caller.to_caller(), &subjects) {
        Ok(outcome) => (
            StatusCode::OK,
            Json(RegisterResponse::from_outcome(&outcome)),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// Open or close the registration window (Admin).
pub async fn window_handler(
    State(state): State<AppState>,
    Json(request): Json<WindowRequest>,
) -> Response {
    let mut registry = state.registry.write().await;
    match registry.set_registration_window(request.caller.to_caller(), request.open) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response(&e),
    }
}

// =============================================================================
// TIMETABLE
// =============================================================================

/// Derived weekly grid for a student or faculty member.
pub async fn timetable_handler(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
    Query(query): Query<TimetableQuery>,
) -> Response {
    let registry = state.registry.read().await;
    let result = match query.view.as_deref() {
        None | Some("student") => registry.timetable_for_student(UserId(user_id)),
        Some("faculty") => registry.timetable_for_faculty(UserId(user_id)),
        Some(other) => {
            let e = RegistryError::InvalidInput(format!("unknown timetable view '{other}'"));
            return error_response(&e);
        }
    };

    match result {
        Ok(timetable) => (
            StatusCode::OK,
            Json(TimetableResponse::from_timetable(&timetable)),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

// =============================================================================
// ATTENDANCE
// =============================================================================

/// Upsert one session's presence record (assigned Faculty).
pub async fn mark_attendance_handler(
    State(state): State<AppState>,
    Json(request): Json<MarkAttendanceRequest>,
) -> Response {
    let mut registry = state.registry.write().await;
    match registry.mark_attendance(
        request.caller.to_caller(),
        EnrollmentId(request.enrollment_id),
        request.date,
        request.present,
    ) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response(&e),
    }
}

/// Attendance summary and session records for an enrollment.
pub async fn attendance_summary_handler(
    State(state): State<AppState>,
    Path(enrollment_id): Path<u64>,
) -> Response {
    let registry = state.registry.read().await;
    let id = EnrollmentId(enrollment_id);
    let summary = match registry.attendance_summary(id) {
        Ok(summary) => summary,
        Err(e) => return error_response(&e),
    };
    match registry.attendance_records(id) {
        Ok(records) => (
            StatusCode::OK,
            Json(AttendanceResponse {
                enrollment_id,
                summary,
                records: records
                    .into_iter()
                    .map(|(date, present)| AttendanceRecordJson { date, present })
                    .collect(),
            }),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// Per-subject attendance listing for a student.
pub async fn student_attendance_handler(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> Response {
    let registry = state.registry.read().await;
    match registry.attendance_for_student(UserId(user_id)) {
        Ok(rows) => (
            StatusCode::OK,
            Json(StudentAttendanceResponse {
                user_id,
                subjects: rows.into_iter().map(StudentAttendanceJson::from_row).collect(),
            }),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

// =============================================================================
// GRADING
// =============================================================================

/// Submit or update a draft score (assigned Faculty).
pub async fn submit_grade_handler(
    State(state): State<AppState>,
    Json(request): Json<GradeScoreRequest>,
) -> Response {
    let marks = match request.to_marks() {
        Ok(marks) => marks,
        Err(e) => return error_response(&e),
    };

    let mut registry = state.registry.write().await;
    match registry.submit_grade(request.caller.to_caller(), request.enrollment(), marks) {
        Ok(status) => grade_status_response(request.enrollment_id, status),
        Err(e) => error_response(&e),
    }
}

/// Finalize a draft grade (assigned Faculty).
pub async fn finalize_grade_handler(
    State(state): State<AppState>,
    Json(request): Json<GradeActionRequest>,
) -> Response {
    let mut registry = state.registry.write().await;
    match registry.finalize_grade(
        request.caller.to_caller(),
        EnrollmentId(request.enrollment_id),
    ) {
        Ok(status) => grade_status_response(request.enrollment_id, status),
        Err(e) => error_response(&e),
    }
}

/// Contest a finalized grade (enrolled Student).
pub async fn request_reeval_handler(
    State(state): State<AppState>,
    Json(request): Json<GradeActionRequest>,
) -> Response {
    let mut registry = state.registry.write().await;
    match registry.request_reeval(
        request.caller.to_caller(),
        EnrollmentId(request.enrollment_id),
    ) {
        Ok(status) => grade_status_response(request.enrollment_id, status),
        Err(e) => error_response(&e),
    }
}

/// Approve or deny a pending re-evaluation (Admin).
pub async fn resolve_reeval_handler(
    State(state): State<AppState>,
    Json(request): Json<ReevalResolveRequest>,
) -> Response {
    let mut registry = state.registry.write().await;
    match registry.resolve_reeval(
        request.caller.to_caller(),
        EnrollmentId(request.enrollment_id),
        request.decision,
    ) {
        Ok(status) => grade_status_response(request.enrollment_id, status),
        Err(e) => error_response(&e),
    }
}

/// Apply a revised score to an approved re-evaluation (assigned
/// Faculty). The revision timestamp is taken here, at the boundary.
pub async fn apply_reeval_handler(
    State(state): State<AppState>,
    Json(request): Json<GradeScoreRequest>,
) -> Response {
    let marks = match request.to_marks() {
        Ok(marks) => marks,
        Err(e) => return error_response(&e),
    };

    let mut registry = state.registry.write().await;
    match registry.apply_reeval_score(
        request.caller.to_caller(),
        request.enrollment(),
        marks,
        Utc::now(),
    ) {
        Ok(status) => grade_status_response(request.enrollment_id, status),
        Err(e) => error_response(&e),
    }
}

fn grade_status_response(enrollment_id: u64, status: registra_core::GradeStatus) -> Response {
    (
        StatusCode::OK,
        Json(GradeStatusResponse {
            enrollment_id,
            status,
        }),
    )
        .into_response()
}

/// A student's grades filtered by viewer role.
pub async fn grades_handler(
    State(state): State<AppState>,
    Path(student_id): Path<u64>,
    Query(query): Query<GradeViewerQuery>,
) -> Response {
    let registry = state.registry.read().await;
    match registry.visible_grades(UserId(student_id), query.viewer_role) {
        Ok(views) => (
            StatusCode::OK,
            Json(GradesResponse {
                student_id,
                grades: views.iter().map(GradeViewJson::from_view).collect(),
            }),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

// =============================================================================
// AUDIT
// =============================================================================

/// The append-only score revision log for an enrollment.
pub async fn audit_handler(
    State(state): State<AppState>,
    Path(enrollment_id): Path<u64>,
) -> Response {
    let registry = state.registry.read().await;
    match registry.audit_trail(EnrollmentId(enrollment_id)) {
        Ok(revisions) => (
            StatusCode::OK,
            Json(AuditResponse {
                enrollment_id,
                revisions: revisions
                    .iter()
                    .map(|r| ScoreRevisionJson {
                        old_marks: r.old_marks.value(),
                        new_marks: r.new_marks.value(),
                        at: r.at,
                        actor_user_id: r.actor.0,
                    })
                    .collect(),
            }),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}
