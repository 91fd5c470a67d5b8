//! # Core Type Definitions
//!
//! This module contains all core types for the Registra engine:
//! - Entity identifiers (`UserId`, `SubjectId`, `EnrollmentId`, `Semester`)
//! - The weekly grid cell (`TimeSlot`)
//! - Catalog entities (`Subject`)
//! - Enrollment and grading entities (`Enrollment`, `Marks`, `Grade`,
//!   `GradeStatus`, `ScoreRevision`)
//! - The verified caller identity (`Caller`, `Role`)
//! - Error types (`RegistryError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`

use crate::primitives::{CREDIT_LIMIT, DAYS_PER_WEEK, MAX_MARKS, PERIODS_PER_DAY, SLOT_COUNT};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

// =============================================================================
// ENTITY IDENTIFIERS
// =============================================================================

/// Unique identifier for a user in any role (admin, student, faculty, parent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Unique identifier for a subject in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubjectId(pub u64);

/// Unique identifier for an enrollment (one student × one subject × one semester).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EnrollmentId(pub u64);

/// The active semester. Registra manages a single registration window
/// at a time; the semester tags enrollments for migration fidelity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Semester(pub u16);

// =============================================================================
// ROLES & CALLER IDENTITY
// =============================================================================

/// The role a verified caller acts under.
///
/// Role resolution happens outside the core (the Access Gate); the core
/// receives the already-verified pair and enforces the per-operation guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
    Faculty,
    Parent,
}

impl Role {
    /// Human-readable role name as used in the external API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Student => "student",
            Self::Faculty => "faculty",
            Self::Parent => "parent",
        }
    }
}

/// A verified `(user, role)` pair handed in per call.
///
/// The core never re-derives identity and holds no process-wide
/// authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// The authenticated user.
    pub user: UserId,
    /// The role the user acts under for this call.
    pub role: Role,
}

impl Caller {
    /// Create a new caller identity.
    #[must_use]
    pub const fn new(user: UserId, role: Role) -> Self {
        Self { user, role }
    }
}

// =============================================================================
// TIME SLOT
// =============================================================================

/// An opaque ordinal identifying one (day, period) cell in the fixed
/// weekly grid (5 days × 8 periods, ordinals `0..40`).
///
/// Two subjects clash iff their slot sets intersect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeSlot(pub u16);

impl TimeSlot {
    /// Construct a slot from its ordinal, rejecting out-of-grid values.
    pub fn new(ordinal: u16) -> Result<Self, RegistryError> {
        if ordinal >= SLOT_COUNT {
            return Err(RegistryError::InvalidSlot(ordinal));
        }
        Ok(Self(ordinal))
    }

    /// Construct a slot from a (day, period) pair. Both components are
    /// bounds-checked before the ordinal is computed, so oversized day
    /// values cannot wrap the `u16` arithmetic.
    pub fn from_day_period(day: u16, period: u16) -> Result<Self, RegistryError> {
        if day >= DAYS_PER_WEEK {
            return Err(RegistryError::InvalidSlot(day));
        }
        if period >= PERIODS_PER_DAY {
            return Err(RegistryError::InvalidSlot(period));
        }
        Self::new(day * PERIODS_PER_DAY + period)
    }

    /// Day index within the week (0 = Monday).
    #[must_use]
    pub const fn day(self) -> u16 {
        self.0 / PERIODS_PER_DAY
    }

    /// Period index within the day.
    #[must_use]
    pub const fn period(self) -> u16 {
        self.0 % PERIODS_PER_DAY
    }

    /// Raw ordinal value.
    #[must_use]
    pub const fn ordinal(self) -> u16 {
        self.0
    }
}

// =============================================================================
// SUBJECT
// =============================================================================

/// A subject in the catalog.
///
/// Subjects are immutable once any enrollment references them for the
/// active semester (enforced by the Registry, not by this struct).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Catalog identifier.
    pub id: SubjectId,
    /// Unique subject code, e.g. "CS2101".
    pub code: String,
    /// Display title.
    pub title: String,
    /// Credit weight, `1..=27`.
    pub credits: u8,
    /// The weekly grid cells this subject occupies.
    pub slots: BTreeSet<TimeSlot>,
    /// The assigned faculty member. Only this user may grade the
    /// subject's enrollments.
    pub faculty: UserId,
}

// =============================================================================
// ENROLLMENT
// =============================================================================

/// The relationship entity linking one student to one subject for one
/// semester. Created only by a successful registration commit; anchor
/// for the grade, the attendance records and the score audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub student: UserId,
    pub subject: SubjectId,
    pub semester: Semester,
}

// =============================================================================
// MARKS & GRADE
// =============================================================================

/// An integer score in `0..=100`.
///
/// Letter grades are derived, never stored; the bands match the original
/// academic scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Marks(pub u32);

impl Marks {
    /// Construct marks, rejecting values above 100.
    pub fn new(value: u32) -> Result<Self, RegistryError> {
        if value > MAX_MARKS {
            return Err(RegistryError::InvalidMarks(value));
        }
        Ok(Self(value))
    }

    /// Raw score value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Derived letter grade.
    #[must_use]
    pub const fn letter(self) -> &'static str {
        match self.0 {
            90.. => "A+",
            80..=89 => "A",
            70..=79 => "B+",
            60..=69 => "B",
            50..=59 => "C",
            40..=49 => "D",
            _ => "F",
        }
    }
}

/// Lifecycle state of a grade.
///
/// The full transition graph is enforced by [`crate::grading::GradeBook`];
/// `ReevalDenied` and `ReevalFinalized` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeStatus {
    Draft,
    Finalized,
    ReevalRequested,
    ReevalApproved,
    ReevalDenied,
    ReevalFinalized,
}

impl GradeStatus {
    /// Whether a grade in this state is exposed to the given viewer role.
    ///
    /// Students and parents only ever see settled grades; draft scores
    /// and in-flight re-evaluation states are faculty/admin internal.
    #[must_use]
    pub const fn visible_to(self, viewer: Role) -> bool {
        match viewer {
            Role::Admin | Role::Faculty => true,
            Role::Student | Role::Parent => matches!(
                self,
                Self::Finalized | Self::ReevalDenied | Self::ReevalFinalized
            ),
        }
    }

    /// Whether this state admits no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::ReevalDenied | Self::ReevalFinalized)
    }
}

/// The single current grade of an enrollment, mutated in place.
///
/// Prior scores survive in the enrollment's append-only audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    pub marks: Marks,
    pub status: GradeStatus,
}

/// One entry of the append-only score audit trail. Written whenever a
/// re-evaluation overwrites a finalized score, so the academic record
/// is never silently lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRevision {
    pub old_marks: Marks,
    pub new_marks: Marks,
    pub at: DateTime<Utc>,
    pub actor: UserId,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors surfaced by the Registra engine.
///
/// Registration validation failures (`SlotClash`, `CreditLimitExceeded`)
/// are NOT errors: they are collected per subject in
/// [`crate::registration::RegistrationOutcome`] so the caller gets
/// actionable per-subject feedback instead of one opaque failure.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The referenced subject does not exist in the catalog.
    #[error("Subject not found: {0:?}")]
    SubjectNotFound(SubjectId),

    /// The referenced user does not exist in the directory.
    #[error("User not found: {0:?}")]
    UserNotFound(UserId),

    /// The referenced enrollment does not exist.
    #[error("Enrollment not found: {0:?}")]
    EnrollmentNotFound(EnrollmentId),

    /// A subject with this code already exists.
    #[error("Duplicate subject code: {0}")]
    DuplicateCode(String),

    /// The subject has enrollments this semester and is immutable.
    #[error("Subject {0:?} is locked: students are enrolled this semester")]
    SubjectLocked(SubjectId),

    /// An illegal grade-state move. The state is left unchanged.
    #[error("Invalid transition: cannot {action} from {from:?}")]
    InvalidTransition {
        /// Current state, `None` when no grade exists yet.
        from: Option<GradeStatus>,
        /// The attempted operation, for diagnostics.
        action: &'static str,
    },

    /// The caller's role (or identity) does not permit this operation.
    #[error("Forbidden: operation requires role {required:?}")]
    Forbidden {
        /// The role the operation is gated on.
        required: Role,
    },

    /// The registration window is closed; no mutation occurred.
    #[error("Registration window is closed")]
    WindowClosed,

    /// An internal invariant was broken. Should never occur in correct
    /// operation; logged and surfaced as an internal error.
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    /// Marks outside `0..=100`.
    #[error("Invalid marks: {0} (maximum 100)")]
    InvalidMarks(u32),

    /// Slot ordinal outside the weekly grid.
    #[error("Invalid time slot ordinal: {0}")]
    InvalidSlot(u16),

    /// Credit weight outside `1..=27`.
    #[error("Invalid credit weight: {0} (allowed 1..={CREDIT_LIMIT})")]
    InvalidCredits(u8),

    /// Malformed input at the operation boundary.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An I/O error occurred (app layer only; the core performs no I/O).
    #[error("I/O error: {0}")]
    Io(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_slot_day_period_round_trip() {
        let slot = TimeSlot::from_day_period(2, 3).expect("slot");
        assert_eq!(slot.day(), 2);
        assert_eq!(slot.period(), 3);
        assert_eq!(slot.ordinal(), 2 * PERIODS_PER_DAY + 3);
    }

    #[test]
    fn time_slot_rejects_out_of_grid() {
        assert!(TimeSlot::new(SLOT_COUNT).is_err());
        assert!(TimeSlot::from_day_period(5, 0).is_err());
        assert!(TimeSlot::from_day_period(0, PERIODS_PER_DAY).is_err());
    }

    /// Day values large enough to wrap `day * PERIODS_PER_DAY` in u16
    /// must be rejected by the bounds check, not by wrapped arithmetic.
    #[test]
    fn time_slot_rejects_oversized_day_without_overflow() {
        assert!(TimeSlot::from_day_period(8192, 0).is_err());
        assert!(TimeSlot::from_day_period(u16::MAX, 0).is_err());
    }

    #[test]
    fn marks_letter_bands() {
        assert_eq!(Marks(95).letter(), "A+");
        assert_eq!(Marks(90).letter(), "A+");
        assert_eq!(Marks(89).letter(), "A");
        assert_eq!(Marks(72).letter(), "B+");
        assert_eq!(Marks(60).letter(), "B");
        assert_eq!(Marks(50).letter(), "C");
        assert_eq!(Marks(40).letter(), "D");
        assert_eq!(Marks(39).letter(), "F");
        assert_eq!(Marks(0).letter(), "F");
    }

    #[test]
    fn marks_rejects_over_100() {
        assert!(Marks::new(101).is_err());
        assert!(Marks::new(100).is_ok());
    }

    #[test]
    fn grade_visibility_by_role() {
        assert!(GradeStatus::Draft.visible_to(Role::Faculty));
        assert!(GradeStatus::Draft.visible_to(Role::Admin));
        assert!(!GradeStatus::Draft.visible_to(Role::Student));
        assert!(!GradeStatus::Draft.visible_to(Role::Parent));
        assert!(!GradeStatus::ReevalRequested.visible_to(Role::Parent));
        assert!(!GradeStatus::ReevalApproved.visible_to(Role::Student));
        assert!(GradeStatus::Finalized.visible_to(Role::Student));
        assert!(GradeStatus::ReevalDenied.visible_to(Role::Parent));
        assert!(GradeStatus::ReevalFinalized.visible_to(Role::Student));
    }

    #[test]
    fn terminal_states() {
        assert!(GradeStatus::ReevalDenied.is_terminal());
        assert!(GradeStatus::ReevalFinalized.is_terminal());
        assert!(!GradeStatus::Finalized.is_terminal());
        assert!(!GradeStatus::Draft.is_terminal());
    }
}
