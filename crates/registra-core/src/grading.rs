//! # Grading & Re-evaluation State Machine
//!
//! Owns the grade lifecycle per enrollment:
//!
//! ```text
//! (no grade) --submit-->   Draft
//! Draft      --submit-->   Draft            (score update)
//! Draft      --finalize--> Finalized
//! Finalized  --request-->  ReevalRequested
//! ReevalRequested --approve--> ReevalApproved
//! ReevalRequested --deny-->    ReevalDenied     (terminal)
//! ReevalApproved  --apply-->   ReevalFinalized  (terminal)
//! ```
//!
//! Any other edge fails with `InvalidTransition` and leaves the state
//! unchanged. Role gating (who may drive which edge) is layered on top
//! by the Registry; this module enforces the pure transition graph.
//!
//! Applying a re-evaluation score overwrites the single current grade
//! in place and appends a [`ScoreRevision`] to the enrollment's
//! append-only audit trail, so the pre-re-eval score remains part of
//! the academic record.

use crate::{EnrollmentId, Grade, GradeStatus, Marks, RegistryError, ScoreRevision, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An admin's verdict on a pending re-evaluation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReevalDecision {
    Approve,
    Deny,
}

/// Grade storage and transition enforcement for all enrollments.
#[derive(Debug, Clone, Default)]
pub struct GradeBook {
    /// Exactly one current grade per enrollment, mutated in place.
    grades: BTreeMap<EnrollmentId, Grade>,
    /// Append-only score revision log per enrollment.
    audit: BTreeMap<EnrollmentId, Vec<ScoreRevision>>,
}

impl GradeBook {
    /// Create an empty grade book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current grade of an enrollment, if one exists.
    #[must_use]
    pub fn get(&self, enrollment: EnrollmentId) -> Option<Grade> {
        self.grades.get(&enrollment).copied()
    }

    /// The append-only score revision trail for an enrollment.
    #[must_use]
    pub fn audit_trail(&self, enrollment: EnrollmentId) -> &[ScoreRevision] {
        self.audit.get(&enrollment).map_or(&[], Vec::as_slice)
    }

    /// Number of graded enrollments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.grades.len()
    }

    /// Whether no grade has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grades.is_empty()
    }

    /// Submit a score: creates a `Draft` grade, or updates the score of
    /// an existing `Draft`.
    pub fn submit(
        &mut self,
        enrollment: EnrollmentId,
        marks: Marks,
    ) -> Result<GradeStatus, RegistryError> {
        match self.grades.get_mut(&enrollment) {
            None => {
                self.grades.insert(
                    enrollment,
                    Grade {
                        marks,
                        status: GradeStatus::Draft,
                    },
                );
                Ok(GradeStatus::Draft)
            }
            Some(grade) if grade.status == GradeStatus::Draft => {
                grade.marks = marks;
                Ok(GradeStatus::Draft)
            }
            Some(grade) => Err(RegistryError::InvalidTransition {
                from: Some(grade.status),
                action: "submit",
            }),
        }
    }

    /// Finalize a draft grade.
    pub fn finalize(&mut self, enrollment: EnrollmentId) -> Result<GradeStatus, RegistryError> {
        self.transition(enrollment, GradeStatus::Draft, GradeStatus::Finalized, "finalize")
    }

    /// Raise a re-evaluation request against a finalized grade.
    pub fn request_reeval(
        &mut self,
        enrollment: EnrollmentId,
    ) -> Result<GradeStatus, RegistryError> {
        self.transition(
            enrollment,
            GradeStatus::Finalized,
            GradeStatus::ReevalRequested,
            "request re-evaluation",
        )
    }

    /// Resolve a pending re-evaluation request.
    pub fn resolve_reeval(
        &mut self,
        enrollment: EnrollmentId,
        decision: ReevalDecision,
    ) -> Result<GradeStatus, RegistryError> {
        let to = match decision {
            ReevalDecision::Approve => GradeStatus::ReevalApproved,
            ReevalDecision::Deny => GradeStatus::ReevalDenied,
        };
        self.transition(
            enrollment,
            GradeStatus::ReevalRequested,
            to,
            "resolve re-evaluation",
        )
    }

    /// Apply the revised score of an approved re-evaluation.
    ///
    /// Overwrites the current marks and appends the old/new pair to the
    /// audit trail.
    pub fn apply_reeval(
        &mut self,
        enrollment: EnrollmentId,
        marks: Marks,
        at: DateTime<Utc>,
        actor: UserId,
    ) -> Result<GradeStatus, RegistryError> {
        let grade = self
            .grades
            .get_mut(&enrollment)
            .ok_or(RegistryError::InvalidTransition {
                from: None,
                action: "apply re-evaluation score",
            })?;
        if grade.status != GradeStatus::ReevalApproved {
            return Err(RegistryError::InvalidTransition {
                from: Some(grade.status),
                action: "apply re-evaluation score",
            });
        }

        let old_marks = grade.marks;
        grade.marks = marks;
        grade.status = GradeStatus::ReevalFinalized;

        self.audit.entry(enrollment).or_default().push(ScoreRevision {
            old_marks,
            new_marks: marks,
            at,
            actor,
        });
        Ok(GradeStatus::ReevalFinalized)
    }

    /// Drop the grade and audit trail of an enrollment (cascade).
    pub fn remove_enrollment(&mut self, enrollment: EnrollmentId) {
        self.grades.remove(&enrollment);
        self.audit.remove(&enrollment);
    }

    /// Move a grade along one required edge, or fail leaving state
    /// untouched.
    fn transition(
        &mut self,
        enrollment: EnrollmentId,
        required: GradeStatus,
        to: GradeStatus,
        action: &'static str,
    ) -> Result<GradeStatus, RegistryError> {
        let grade = self
            .grades
            .get_mut(&enrollment)
            .ok_or(RegistryError::InvalidTransition { from: None, action })?;
        if grade.status != required {
            return Err(RegistryError::InvalidTransition {
                from: Some(grade.status),
                action,
            });
        }
        grade.status = to;
        Ok(to)
    }
}

// =============================================================================
// TESTS
// =============================================================================
