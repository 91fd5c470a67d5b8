//! # Grade Lifecycle Tests
//!
//! End-to-end exercises of the grading state machine through the
//! public `Registry` API, including the re-evaluation branches and
//! the audit trail.

use chrono::{DateTime, Utc};
use registra_core::{
    Caller, EnrollmentId, GradeStatus, Marks, ReevalDecision, Registry, RegistryError, Role,
    Semester, SubjectSpec, TimeSlot, UserId, UserSpec,
};

fn stamp(offset: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_767_225_600 + offset, 0).expect("valid timestamp")
}

struct World {
    registry: Registry,
    admin: Caller,
    faculty: Caller,
    student: Caller,
    enrollment: EnrollmentId,
}

/// One admin, one faculty, one student, one subject, one committed
/// enrollment.
fn world() -> World {
    let mut registry = Registry::new(Semester(1));
    let admin = Caller::new(UserId(0), Role::Admin);

    registry
        .add_user(
            admin,
            UserSpec {
                full_name: "Root Admin".to_string(),
                role: Role::Admin,
                child: None,
            },
        )
        .expect("admin");
    let faculty_id = registry
        .add_user(
            admin,
            UserSpec {
                full_name: "Dr. Yun".to_string(),
                role: Role::Faculty,
                child: None,
            },
        )
        .expect("faculty");
    let student_id = registry
        .add_user(
            admin,
            UserSpec {
                full_name: "Sam".to_string(),
                role: Role::Student,
                child: None,
            },
        )
        .expect("student");

    let subject = registry
        .add_subject(
            admin,
            SubjectSpec {
                code: "CS2101".to_string(),
                title: "Data Structures".to_string(),
                credits: 4,
                slots: [TimeSlot(0), TimeSlot(9)].into_iter().collect(),
                faculty: faculty_id,
            },
        )
        .expect("subject");

    let student = Caller::new(student_id, Role::Student);
    let outcome = registry.register(student, &[subject]).expect("register");
    assert!(outcome.is_clean());
    let enrollment = registry
        .enrollment_of(student_id, subject)
        .expect("enrollment");

    World {
        registry,
        admin,
        faculty: Caller::new(faculty_id, Role::Faculty),
        student,
        enrollment,
    }
}

#[test]
fn full_approved_reeval_cycle() {
    let mut w = world();

    w.registry
        .submit_grade(w.faculty, w.enrollment, Marks(58))
        .expect("submit");
    w.registry
        .finalize_grade(w.faculty, w.enrollment)
        .expect("finalize");
    w.registry
        .request_reeval(w.student, w.enrollment)
        .expect("request");
    w.registry
        .resolve_reeval(w.admin, w.enrollment, ReevalDecision::Approve)
        .expect("approve");
    let status = w
        .registry
        .apply_reeval_score(w.faculty, w.enrollment, Marks(62), stamp(60))
        .expect("apply");

    assert_eq!(status, GradeStatus::ReevalFinalized);
    let trail = w.registry.audit_trail(w.enrollment).expect("trail");
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].old_marks, Marks(58));
    assert_eq!(trail[0].new_marks, Marks(62));
    assert_eq!(trail[0].actor, w.faculty.user);

    // Terminal state: no further transitions.
    assert!(matches!(
        w.registry.request_reeval(w.student, w.enrollment),
        Err(RegistryError::InvalidTransition { .. })
    ));
}

#[test]
fn denied_reeval_is_terminal_and_keeps_marks() {
    let mut w = world();

    w.registry
        .submit_grade(w.faculty, w.enrollment, Marks(58))
        .expect("submit");
    w.registry
        .finalize_grade(w.faculty, w.enrollment)
        .expect("finalize");
    w.registry
        .request_reeval(w.student, w.enrollment)
        .expect("request");
    let status = w
        .registry
        .resolve_reeval(w.admin, w.enrollment, ReevalDecision::Deny)
        .expect("deny");
    assert_eq!(status, GradeStatus::ReevalDenied);

    // Denied is terminal: no second request, no score application.
    assert!(matches!(
        w.registry.request_reeval(w.student, w.enrollment),
        Err(RegistryError::InvalidTransition { .. })
    ));
    assert!(matches!(
        w.registry
            .apply_reeval_score(w.faculty, w.enrollment, Marks(90), stamp(60)),
        Err(RegistryError::InvalidTransition { .. })
    ));
    assert!(w.registry.audit_trail(w.enrollment).expect("trail").is_empty());

    let views = w
        .registry
        .visible_grades(w.student.user, Role::Student)
        .expect("views");
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].marks, 58);
}

#[test]
fn second_resolution_of_same_request_fails() {
    let mut w = world();

    w.registry
        .submit_grade(w.faculty, w.enrollment, Marks(70))
        .expect("submit");
    w.registry
        .finalize_grade(w.faculty, w.enrollment)
        .expect("finalize");
    w.registry
        .request_reeval(w.student, w.enrollment)
        .expect("request");
    w.registry
        .resolve_reeval(w.admin, w.enrollment, ReevalDecision::Approve)
        .expect("first resolution");

    // The state already moved; a second resolution observes it and
    // fails instead of double-applying.
    assert!(matches!(
        w.registry
            .resolve_reeval(w.admin, w.enrollment, ReevalDecision::Deny),
        Err(RegistryError::InvalidTransition {
            from: Some(GradeStatus::ReevalApproved),
            ..
        })
    ));
}

#[test]
fn draft_updates_overwrite_without_audit() {
    let mut w = world();

    w.registry
        .submit_grade(w.faculty, w.enrollment, Marks(40))
        .expect("first submit");
    w.registry
        .submit_grade(w.faculty, w.enrollment, Marks(45))
        .expect("draft update");

    assert!(w.registry.audit_trail(w.enrollment).expect("trail").is_empty());
    let views = w
        .registry
        .visible_grades(w.student.user, Role::Faculty)
        .expect("views");
    assert_eq!(views[0].marks, 45);
}

#[test]
fn finalize_requires_existing_draft() {
    let mut w = world();
    assert!(matches!(
        w.registry.finalize_grade(w.faculty, w.enrollment),
        Err(RegistryError::InvalidTransition { from: None, .. })
    ));
}

#[test]
fn missing_enrollment_is_not_found() {
    let mut w = world();
    let ghost = EnrollmentId(999);
    assert!(matches!(
        w.registry.submit_grade(w.faculty, ghost, Marks(10)),
        Err(RegistryError::EnrollmentNotFound(_))
    ));
    assert!(matches!(
        w.registry.audit_trail(ghost),
        Err(RegistryError::EnrollmentNotFound(_))
    ));
}
