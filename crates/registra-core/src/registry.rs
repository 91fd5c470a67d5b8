//! # Registry
//!
//! The single stateful aggregate combining the catalog, the user
//! directory, committed enrollments, the attendance ledger and the
//! grade book. Every mutating operation takes the caller's verified
//! `(user, role)` pair and enforces its role guard here, at the top of
//! the operation, rather than scattering checks across a route layer.
//!
//! The Registry itself is synchronous and single-writer: callers that
//! need concurrent access wrap it in a lock. Taking `&mut self` for
//! every mutation makes the read-modify-write of a student's committed
//! set atomic by construction, so two racing registration calls cannot
//! lose updates.

use crate::attendance::{AttendanceLedger, AttendanceSummary};
use crate::catalog::{Catalog, SubjectSpec};
use crate::directory::{Directory, UserSpec};
use crate::grading::{GradeBook, ReevalDecision};
use crate::registration::{RegistrationEngine, RegistrationOutcome};
use crate::timetable::{Timetable, build_timetable};
use crate::{
    Caller, Enrollment, EnrollmentId, GradeStatus, Marks, RegistryError, Role, ScoreRevision,
    Semester, Subject, SubjectId, UserId,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// VIEWS
// =============================================================================

/// One row of a grade listing, filtered by viewer role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeView {
    pub enrollment: EnrollmentId,
    pub subject: SubjectId,
    pub code: String,
    pub title: String,
    pub marks: u32,
    pub letter: String,
    pub status: GradeStatus,
}

/// One row of a student's attendance listing: the enrollment, its
/// subject and the aggregate summary (`None` until a session is marked).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentAttendance {
    pub enrollment: EnrollmentId,
    pub subject: SubjectId,
    pub code: String,
    pub title: String,
    pub summary: Option<AttendanceSummary>,
}

/// Entity counts for the status surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryCounts {
    pub users: usize,
    pub subjects: usize,
    pub enrollments: usize,
    pub grades: usize,
    pub window_open: bool,
}

// =============================================================================
// REGISTRY
// =============================================================================

/// The academic-state aggregate for one active semester.
#[derive(Debug, Clone)]
pub struct Registry {
    semester: Semester,
    /// Whether the registration window accepts commits.
    window_open: bool,
    catalog: Catalog,
    directory: Directory,
    /// Enrollment storage: EnrollmentId -> Enrollment.
    enrollments: BTreeMap<EnrollmentId, Enrollment>,
    /// Uniqueness index: (student, subject) -> EnrollmentId.
    enrollment_index: BTreeMap<(UserId, SubjectId), EnrollmentId>,
    attendance: AttendanceLedger,
    grades: GradeBook,
    next_enrollment_id: u64,
}

impl Registry {
    /// Create an empty registry for the given semester. The
    /// registration window starts open.
    #[must_use]
    pub fn new(semester: Semester) -> Self {
        Self {
            semester,
            window_open: true,
            catalog: Catalog::new(),
            directory: Directory::new(),
            enrollments: BTreeMap::new(),
            enrollment_index: BTreeMap::new(),
            attendance: AttendanceLedger::new(),
            grades: GradeBook::new(),
            next_enrollment_id: 0,
        }
    }

    /// The active semester.
    #[must_use]
    pub fn semester(&self) -> Semester {
        self.semester
    }

    /// Whether the registration window is open.
    #[must_use]
    pub fn window_open(&self) -> bool {
        self.window_open
    }

    /// Read access to the catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Read access to the directory.
    #[must_use]
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Entity counts for status reporting.
    #[must_use]
    pub fn counts(&self) -> RegistryCounts {
        RegistryCounts {
            users: self.directory.len(),
            subjects: self.catalog.len(),
            enrollments: self.enrollments.len(),
            grades: self.grades.len(),
            window_open: self.window_open,
        }
    }

    // =========================================================================
    // ROLE GUARDS
    // =========================================================================

    fn require_role(caller: Caller, required: Role) -> Result<(), RegistryError> {
        if caller.role == required {
            Ok(())
        } else {
            Err(RegistryError::Forbidden { required })
        }
    }

    fn require_admin_or_faculty(caller: Caller) -> Result<(), RegistryError> {
        if matches!(caller.role, Role::Admin | Role::Faculty) {
            Ok(())
        } else {
            Err(RegistryError::Forbidden {
                required: Role::Admin,
            })
        }
    }

    /// Resolve an enrollment and verify the caller is the faculty
    /// member assigned to its subject.
    fn require_assigned_faculty(
        &self,
        caller: Caller,
        enrollment: EnrollmentId,
    ) -> Result<Enrollment, RegistryError> {
        let enrollment = self.enrollment(enrollment)?;
        let subject = self.subject_of(&enrollment)?;
        if caller.role != Role::Faculty || caller.user != subject.faculty {
            return Err(RegistryError::Forbidden {
                required: Role::Faculty,
            });
        }
        Ok(enrollment)
    }

    // =========================================================================
    // DIRECTORY MANAGEMENT (Admin)
    // =========================================================================

    /// Admin: add a user to the directory.
    pub fn add_user(&mut self, caller: Caller, spec: UserSpec) -> Result<UserId, RegistryError> {
        Self::require_role(caller, Role::Admin)?;
        self.directory.add(spec)
    }

    /// Admin: reassign a user's role.
    pub fn assign_role(
        &mut self,
        caller: Caller,
        user: UserId,
        role: Role,
    ) -> Result<(), RegistryError> {
        Self::require_role(caller, Role::Admin)?;
        self.directory.assign_role(user, role)
    }

    // =========================================================================
    // CATALOG MANAGEMENT (Admin or Faculty)
    // =========================================================================

    /// Admin/Faculty: add a subject to the catalog.
    ///
    /// The assigned faculty's existing subjects must stay mutually
    /// clash-free so their derived timetable is always a valid grid.
    pub fn add_subject(
        &mut self,
        caller: Caller,
        spec: SubjectSpec,
    ) -> Result<SubjectId, RegistryError> {
        Self::require_admin_or_faculty(caller)?;
        self.check_faculty_schedule(&spec, None)?;
        self.catalog.add(spec)
    }

    /// Admin/Faculty: replace a subject definition.
    ///
    /// Rejected with `SubjectLocked` once students are enrolled:
    /// subjects are immutable during the semester.
    pub fn update_subject(
        &mut self,
        caller: Caller,
        id: SubjectId,
        spec: SubjectSpec,
    ) -> Result<(), RegistryError> {
        Self::require_admin_or_faculty(caller)?;
        if !self.catalog.contains(id) {
            return Err(RegistryError::SubjectNotFound(id));
        }
        if self.subject_has_enrollments(id) {
            return Err(RegistryError::SubjectLocked(id));
        }
        self.check_faculty_schedule(&spec, Some(id))?;
        self.catalog.replace(id, spec)
    }

    fn subject_has_enrollments(&self, id: SubjectId) -> bool {
        self.enrollments.values().any(|e| e.subject == id)
    }

    /// Reject a subject definition whose slots intersect another
    /// subject assigned to the same faculty member.
    fn check_faculty_schedule(
        &self,
        spec: &SubjectSpec,
        replacing: Option<SubjectId>,
    ) -> Result<(), RegistryError> {
        for other in self.catalog.list() {
            if other.faculty != spec.faculty || Some(other.id) == replacing {
                continue;
            }
            if other.slots.intersection(&spec.slots).next().is_some() {
                return Err(RegistryError::InvalidInput(format!(
                    "faculty {:?} already teaches {} in an overlapping slot",
                    spec.faculty, other.code
                )));
            }
        }
        Ok(())
    }

    // =========================================================================
    // REGISTRATION WINDOW (Admin)
    // =========================================================================

    /// Admin: open or close the registration window.
    pub fn set_registration_window(
        &mut self,
        caller: Caller,
        open: bool,
    ) -> Result<(), RegistryError> {
        Self::require_role(caller, Role::Admin)?;
        self.window_open = open;
        Ok(())
    }

    // =========================================================================
    // REGISTRATION (Student)
    // =========================================================================

    /// Student: register for a batch of subjects.
    ///
    /// Validation is per subject (credit ceiling in submitted order,
    /// then slot clash); all accepted subjects commit atomically at the
    /// end of the call. A closed window or an unknown subject id fails
    /// the whole call before any validation and mutates nothing.
    pub fn register(
        &mut self,
        caller: Caller,
        proposed: &[SubjectId],
    ) -> Result<RegistrationOutcome, RegistryError> {
        Self::require_role(caller, Role::Student)?;
        self.directory.get(caller.user)?;
        if !self.window_open {
            return Err(RegistryError::WindowClosed);
        }

        let committed = self.committed_subjects(caller.user);
        let outcome = RegistrationEngine::evaluate(&self.catalog, &committed, proposed)?;

        // Atomic commit: enrollment rows for everything newly accepted.
        for &subject in &outcome.newly_accepted {
            let id = EnrollmentId(self.next_enrollment_id);
            self.next_enrollment_id = self.next_enrollment_id.saturating_add(1);
            self.enrollments.insert(
                id,
                Enrollment {
                    id,
                    student: caller.user,
                    subject,
                    semester: self.semester,
                },
            );
            self.enrollment_index.insert((caller.user, subject), id);
        }

        Ok(outcome)
    }

    /// The student's committed subject set.
    #[must_use]
    pub fn committed_subjects(&self, student: UserId) -> BTreeSet<SubjectId> {
        self.enrollment_index
            .range((student, SubjectId(0))..=(student, SubjectId(u64::MAX)))
            .map(|(&(_, subject), _)| subject)
            .collect()
    }

    /// Look up an enrollment by id.
    pub fn enrollment(&self, id: EnrollmentId) -> Result<Enrollment, RegistryError> {
        self.enrollments
            .get(&id)
            .copied()
            .ok_or(RegistryError::EnrollmentNotFound(id))
    }

    /// The enrollment linking a student to a subject, if committed.
    #[must_use]
    pub fn enrollment_of(&self, student: UserId, subject: SubjectId) -> Option<EnrollmentId> {
        self.enrollment_index.get(&(student, subject)).copied()
    }

    /// A student's enrollments in deterministic order.
    pub fn enrollments_for_student(
        &self,
        student: UserId,
    ) -> impl Iterator<Item = Enrollment> + '_ {
        self.enrollment_index
            .range((student, SubjectId(0))..=(student, SubjectId(u64::MAX)))
            .filter_map(|(_, id)| self.enrollments.get(id).copied())
    }

    /// Admin: drop an enrollment. Cascades to the grade, the audit
    /// trail and all attendance records.
    pub fn drop_enrollment(
        &mut self,
        caller: Caller,
        id: EnrollmentId,
    ) -> Result<(), RegistryError> {
        Self::require_role(caller, Role::Admin)?;
        let enrollment = self.enrollment(id)?;
        self.enrollments.remove(&id);
        self.enrollment_index
            .remove(&(enrollment.student, enrollment.subject));
        self.attendance.remove_enrollment(id);
        self.grades.remove_enrollment(id);
        Ok(())
    }

    // =========================================================================
    // TIMETABLES
    // =========================================================================

    /// Derive a student's weekly grid from their committed enrollments.
    pub fn timetable_for_student(&self, student: UserId) -> Result<Timetable, RegistryError> {
        self.directory.get(student)?;
        let subjects = self
            .committed_subjects(student)
            .into_iter()
            .map(|id| self.catalog.get(id))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| {
                RegistryError::IntegrityViolation(format!(
                    "enrollment for {student:?} references a missing subject"
                ))
            })?;
        build_timetable(subjects)
    }

    /// Derive a faculty member's weekly grid from the subjects they
    /// teach. Clash-free by construction: `add_subject` rejects
    /// overlapping assignments.
    pub fn timetable_for_faculty(&self, faculty: UserId) -> Result<Timetable, RegistryError> {
        self.directory.get(faculty)?;
        build_timetable(self.catalog.list().filter(|s| s.faculty == faculty))
    }

    // =========================================================================
    // ATTENDANCE
    // =========================================================================

    /// Assigned faculty: upsert one session's presence record.
    pub fn mark_attendance(
        &mut self,
        caller: Caller,
        enrollment: EnrollmentId,
        date: NaiveDate,
        present: bool,
    ) -> Result<(), RegistryError> {
        self.require_assigned_faculty(caller, enrollment)?;
        self.attendance.mark(enrollment, date, present);
        Ok(())
    }

    /// Attendance summary for an enrollment. `Ok(None)` means no
    /// sessions recorded yet.
    pub fn attendance_summary(
        &self,
        enrollment: EnrollmentId,
    ) -> Result<Option<AttendanceSummary>, RegistryError> {
        self.enrollment(enrollment)?;
        Ok(self.attendance.summary(enrollment))
    }

    /// Session records for an enrollment in date order.
    pub fn attendance_records(
        &self,
        enrollment: EnrollmentId,
    ) -> Result<Vec<(NaiveDate, bool)>, RegistryError> {
        self.enrollment(enrollment)?;
        Ok(self.attendance.records_for(enrollment).collect())
    }

    /// Attendance listing across a student's committed subjects, one
    /// row per enrollment in subject order.
    pub fn attendance_for_student(
        &self,
        student: UserId,
    ) -> Result<Vec<StudentAttendance>, RegistryError> {
        self.directory.get(student)?;
        let mut rows = Vec::new();
        for enrollment in self.enrollments_for_student(student) {
            let subject = self.subject_of(&enrollment)?;
            rows.push(StudentAttendance {
                enrollment: enrollment.id,
                subject: subject.id,
                code: subject.code.clone(),
                title: subject.title.clone(),
                summary: self.attendance.summary(enrollment.id),
            });
        }
        Ok(rows)
    }

    // =========================================================================
    // GRADING
    // =========================================================================

    /// Assigned faculty: submit or update a draft score.
    pub fn submit_grade(
        &mut self,
        caller: Caller,
        enrollment: EnrollmentId,
        marks: Marks,
    ) -> Result<GradeStatus, RegistryError> {
        self.require_assigned_faculty(caller, enrollment)?;
        self.grades.submit(enrollment, marks)
    }

    /// Assigned faculty: finalize a draft grade.
    pub fn finalize_grade(
        &mut self,
        caller: Caller,
        enrollment: EnrollmentId,
    ) -> Result<GradeStatus, RegistryError> {
        self.require_assigned_faculty(caller, enrollment)?;
        self.grades.finalize(enrollment)
    }

    /// Enrolled student: contest a finalized grade.
    pub fn request_reeval(
        &mut self,
        caller: Caller,
        enrollment: EnrollmentId,
    ) -> Result<GradeStatus, RegistryError> {
        let record = self.enrollment(enrollment)?;
        if caller.role != Role::Student || caller.user != record.student {
            return Err(RegistryError::Forbidden {
                required: Role::Student,
            });
        }
        self.grades.request_reeval(enrollment)
    }

    /// Admin: approve or deny a pending re-evaluation request.
    pub fn resolve_reeval(
        &mut self,
        caller: Caller,
        enrollment: EnrollmentId,
        decision: ReevalDecision,
    ) -> Result<GradeStatus, RegistryError> {
        Self::require_role(caller, Role::Admin)?;
        self.enrollment(enrollment)?;
        self.grades.resolve_reeval(enrollment, decision)
    }

    /// Assigned faculty: apply the revised score of an approved
    /// re-evaluation. The prior score is appended to the audit trail.
    pub fn apply_reeval_score(
        &mut self,
        caller: Caller,
        enrollment: EnrollmentId,
        marks: Marks,
        at: DateTime<Utc>,
    ) -> Result<GradeStatus, RegistryError> {
        self.require_assigned_faculty(caller, enrollment)?;
        self.grades.apply_reeval(enrollment, marks, at, caller.user)
    }

    /// The append-only score revision trail for an enrollment.
    pub fn audit_trail(
        &self,
        enrollment: EnrollmentId,
    ) -> Result<&[ScoreRevision], RegistryError> {
        self.enrollment(enrollment)?;
        Ok(self.grades.audit_trail(enrollment))
    }

    /// A student's grades, filtered to what the viewer role may see.
    pub fn visible_grades(
        &self,
        student: UserId,
        viewer: Role,
    ) -> Result<Vec<GradeView>, RegistryError> {
        self.directory.get(student)?;
        let mut views = Vec::new();
        for enrollment in self.enrollments_for_student(student) {
            let Some(grade) = self.grades.get(enrollment.id) else {
                continue;
            };
            if !grade.status.visible_to(viewer) {
                continue;
            }
            let subject = self.subject_of(&enrollment)?;
            views.push(GradeView {
                enrollment: enrollment.id,
                subject: subject.id,
                code: subject.code.clone(),
                title: subject.title.clone(),
                marks: grade.marks.value(),
                letter: grade.marks.letter().to_string(),
                status: grade.status,
            });
        }
        Ok(views)
    }

    /// Parent: the linked student's grades, parent-visible states only.
    pub fn grades_for_parent(&self, caller: Caller) -> Result<Vec<GradeView>, RegistryError> {
        Self::require_role(caller, Role::Parent)?;
        let child = self.directory.child_of(caller.user)?.ok_or_else(|| {
            RegistryError::InvalidInput("parent account has no linked student".to_string())
        })?;
        self.visible_grades(child, Role::Parent)
    }

    // =========================================================================
    // INTERNAL
    // =========================================================================

    /// Resolve the subject of an enrollment; a dangling reference is an
    /// integrity bug, not a not-found.
    fn subject_of(&self, enrollment: &Enrollment) -> Result<&Subject, RegistryError> {
        self.catalog.get(enrollment.subject).map_err(|_| {
            RegistryError::IntegrityViolation(format!(
                "enrollment {:?} references missing subject {:?}",
                enrollment.id, enrollment.subject
            ))
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
