//! # registra-core
//!
//! The deterministic registration and academic-state engine - THE LOGIC.
//!
//! This crate implements the core semester substrate: subject
//! registration with credit-ceiling and time-slot validation, pure
//! timetable derivation, the attendance ledger, and the grading
//! state machine with its append-only score audit trail.
//!
//! ## Architectural Constraints
//!
//! The core:
//! - Is the ONLY place where academic state exists (stateful via `Registry`)
//! - Enforces every role gate itself; transport layers only authenticate
//! - Is deterministic: ordered collections, integer arithmetic, and
//!   timestamps supplied by the caller
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod attendance;
pub mod catalog;
pub mod directory;
pub mod grading;
pub mod primitives;
pub mod registration;
pub mod registry;
pub mod timetable;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Caller, Enrollment, EnrollmentId, Grade, GradeStatus, Marks, RegistryError, Role,
    ScoreRevision, Semester, Subject, SubjectId, TimeSlot, UserId,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use attendance::{AttendanceLedger, AttendanceSummary};
pub use catalog::{Catalog, SubjectSpec};
pub use directory::{Directory, User, UserSpec};
pub use grading::{GradeBook, ReevalDecision};
pub use registration::{RegistrationEngine, RegistrationOutcome, RejectReason};
pub use registry::{GradeView, Registry, RegistryCounts, StudentAttendance};
pub use timetable::{Timetable, build_timetable};
