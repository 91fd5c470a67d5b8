//! # API Request/Response Types
//!
//! JSON structures for the HTTP API, plus the error-to-status mapping.
//!
//! Every mutating request carries a `caller` object: the verified
//! `(user_id, role)` pair produced by the deployment's access gate.
//! This layer transports it to the core unchanged; all role decisions
//! happen there.

use axum::http::StatusCode;
use chrono::NaiveDate;
use registra_core::{
    AttendanceSummary, Caller, EnrollmentId, GradeStatus, GradeView, Marks, ReevalDecision,
    RegistrationOutcome, RegistryError, RejectReason, Role, StudentAttendance, Subject, SubjectId,
    SubjectSpec, TimeSlot, Timetable, UserId,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// CALLER
// =============================================================================

/// The verified identity pair attached to every mutating request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CallerJson {
    pub user_id: u64,
    pub role: Role,
}

impl CallerJson {
    #[must_use]
    pub fn to_caller(self) -> Caller {
        Caller::new(UserId(self.user_id), self.role)
    }
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// Generic error payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(error: &RegistryError) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}

/// Map a core error to its HTTP status.
#[must_use]
pub fn error_status(error: &RegistryError) -> StatusCode {
    match error {
        RegistryError::SubjectNotFound(_)
        | RegistryError::UserNotFound(_)
        | RegistryError::EnrollmentNotFound(_) => StatusCode::NOT_FOUND,
        RegistryError::Forbidden { .. } => StatusCode::FORBIDDEN,
        RegistryError::InvalidTransition { .. }
        | RegistryError::WindowClosed
        | RegistryError::SubjectLocked(_)
        | RegistryError::DuplicateCode(_) => StatusCode::CONFLICT,
        RegistryError::InvalidMarks(_)
        | RegistryError::InvalidSlot(_)
        | RegistryError::InvalidCredits(_)
        | RegistryError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        RegistryError::IntegrityViolation(_)
        | RegistryError::Io(_)
        | RegistryError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// =============================================================================
// HEALTH / STATUS
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Registry status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub semester: u16,
    pub users: usize,
    pub subjects: usize,
    pub enrollments: usize,
    pub grades: usize,
    pub window_open: bool,
}

// =============================================================================
// DIRECTORY
// =============================================================================

/// Create-user request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub caller: CallerJson,
    pub full_name: String,
    pub role: Role,
    /// Linked student, for parent accounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_user_id: Option<u64>,
}

/// Create-user response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserResponse {
    pub user_id: u64,
}

/// Role assignment request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRoleRequest {
    pub caller: CallerJson,
    pub user_id: u64,
    pub role: Role,
}

// =============================================================================
// CATALOG
// =============================================================================

/// Create-subject request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubjectRequest {
    pub caller: CallerJson,
    pub code: String,
    pub title: String,
    pub credits: u8,
    /// Weekly grid slot ordinals.
    pub slots: Vec<u16>,
    pub faculty_user_id: u64,
}

impl CreateSubjectRequest {
    /// Convert to a validated core spec.
    pub fn to_spec(&self) -> Result<SubjectSpec, RegistryError> {
        let slots = self
            .slots
            .iter()
            .map(|&ordinal| TimeSlot::new(ordinal))
            .collect::<Result<_, _>>()?;
        Ok(SubjectSpec {
            code: self.code.clone(),
            title: self.title.clone(),
            credits: self.credits,
            slots,
            faculty: UserId(self.faculty_user_id),
        })
    }
}

/// Create-subject response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubjectResponse {
    pub subject_id: u64,
}

/// One subject in a catalog listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectJson {
    pub subject_id: u64,
    pub code: String,
    pub title: String,
    pub credits: u8,
    pub slots: Vec<u16>,
    pub faculty_user_id: u64,
}

impl SubjectJson {
    #[must_use]
    pub fn from_subject(subject: &Subject) -> Self {
        Self {
            subject_id: subject.id.0,
            code: subject.code.clone(),
            title: subject.title.clone(),
            credits: subject.credits,
            slots: subject.slots.iter().map(|slot| slot.ordinal()).collect(),
            faculty_user_id: subject.faculty.0,
        }
    }
}

// =============================================================================
// REGISTRATION
// =============================================================================

/// Registration batch request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub caller: CallerJson,
    pub subjects: Vec<u64>,
}

impl RegisterRequest {
    #[must_use]
    pub fn subject_ids(&self) -> Vec<SubjectId> {
        self.subjects.iter().map(|&id| SubjectId(id)).collect()
    }
}

/// One rejected subject with its structured reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedSubjectJson {
    pub subject_id: u64,
    pub reason: RejectReason,
}

/// Registration batch response: a disposition for every submitted
/// subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub accepted: Vec<u64>,
    pub newly_accepted: Vec<u64>,
    pub rejected: Vec<RejectedSubjectJson>,
}

impl RegisterResponse {
    #[must_use]
    pub fn from_outcome(outcome: &RegistrationOutcome) -> Self {
        Self {
            accepted: outcome.accepted.iter().map(|id| id.0).collect(),
            newly_accepted: outcome.newly_accepted.iter().map(|id| id.0).collect(),
            rejected: outcome
                .rejected
                .iter()
                .map(|(&subject, reason)| RejectedSubjectJson {
                    subject_id: subject.0,
                    reason: reason.clone(),
                })
                .collect(),
        }
    }
}

/// Registration window request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowRequest {
    pub caller: CallerJson,
    pub open: bool,
}

// =============================================================================
// TIMETABLE
// =============================================================================

/// One occupied cell of a derived timetable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimetableCellJson {
    pub slot: u16,
    pub day: u16,
    pub period: u16,
    pub subject_id: u64,
}

/// Derived timetable response, cells in grid order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimetableResponse {
    pub cells: Vec<TimetableCellJson>,
}

impl TimetableResponse {
    #[must_use]
    pub fn from_timetable(timetable: &Timetable) -> Self {
        Self {
            cells: timetable
                .iter()
                .map(|(slot, subject)| TimetableCellJson {
                    slot: slot.ordinal(),
                    day: slot.day(),
                    period: slot.period(),
                    subject_id: subject.0,
                })
                .collect(),
        }
    }
}

// =============================================================================
// ATTENDANCE
// =============================================================================

/// Mark-attendance request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkAttendanceRequest {
    pub caller: CallerJson,
    pub enrollment_id: u64,
    /// ISO calendar date of the session.
    pub date: NaiveDate,
    pub present: bool,
}

/// One recorded session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AttendanceRecordJson {
    pub date: NaiveDate,
    pub present: bool,
}

/// Attendance response for one enrollment. `summary` is null when no
/// sessions have been recorded; `records` lists the sessions in date
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceResponse {
    pub enrollment_id: u64,
    pub summary: Option<AttendanceSummary>,
    pub records: Vec<AttendanceRecordJson>,
}

/// One row of a student's attendance listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentAttendanceJson {
    pub enrollment_id: u64,
    pub subject_id: u64,
    pub code: String,
    pub title: String,
    pub summary: Option<AttendanceSummary>,
}

impl StudentAttendanceJson {
    #[must_use]
    pub fn from_row(row: StudentAttendance) -> Self {
        Self {
            enrollment_id: row.enrollment.0,
            subject_id: row.subject.0,
            code: row.code,
            title: row.title,
            summary: row.summary,
        }
    }
}

/// Per-subject attendance listing for one student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentAttendanceResponse {
    pub user_id: u64,
    pub subjects: Vec<StudentAttendanceJson>,
}

// =============================================================================
// GRADING
// =============================================================================

/// Grade submission request (also used for re-evaluation score
/// application).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeScoreRequest {
    pub caller: CallerJson,
    pub enrollment_id: u64,
    pub marks: u32,
}

impl GradeScoreRequest {
    pub fn to_marks(&self) -> Result<Marks, RegistryError> {
        Marks::new(self.marks)
    }

    #[must_use]
    pub fn enrollment(&self) -> EnrollmentId {
        EnrollmentId(self.enrollment_id)
    }
}

/// Grade transition request with no score payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeActionRequest {
    pub caller: CallerJson,
    pub enrollment_id: u64,
}

/// Re-evaluation resolution request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReevalResolveRequest {
    pub caller: CallerJson,
    pub enrollment_id: u64,
    pub decision: ReevalDecision,
}

/// Grade transition response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeStatusResponse {
    pub enrollment_id: u64,
    pub status: GradeStatus,
}

/// One row of a grade listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeViewJson {
    pub enrollment_id: u64,
    pub subject_id: u64,
    pub code: String,
    pub title: String,
    pub marks: u32,
    pub letter: String,
    pub status: GradeStatus,
}

impl GradeViewJson {
    #[must_use]
    pub fn from_view(view: &GradeView) -> Self {
        Self {
            enrollment_id: view.enrollment.0,
            subject_id: view.subject.0,
            code: view.code.clone(),
            title: view.title.clone(),
            marks: view.marks,
            letter: view.letter.clone(),
            status: view.status,
        }
    }
}

/// Grade listing response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradesResponse {
    pub student_id: u64,
    pub grades: Vec<GradeViewJson>,
}

/// Viewer query parameters for the grade listing.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GradeViewerQuery {
    pub viewer_role: Role,
}

/// Timetable view query parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct TimetableQuery {
    /// "student" (default) or "faculty".
    #[serde(default)]
    pub view: Option<String>,
}

// =============================================================================
// AUDIT
// =============================================================================

/// One score revision in an audit listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRevisionJson {
    pub old_marks: u32,
    pub new_marks: u32,
    pub at: chrono::DateTime<chrono::Utc>,
    pub actor_user_id: u64,
}

/// Audit trail response, oldest revision first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResponse {
    pub enrollment_id: u64,
    pub revisions: Vec<ScoreRevisionJson>,
}
