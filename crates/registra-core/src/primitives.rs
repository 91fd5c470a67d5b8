//! # Academic Primitives
//!
//! Hardcoded runtime constants for the Registra engine.
//!
//! These describe the fixed academic frame for the active semester and
//! are compiled into the binary; they are immutable at runtime.

/// Maximum total credit weight a student may carry concurrently in a
/// semester. The registration engine rejects proposed subjects that
/// would push the committed sum past this ceiling.
pub const CREDIT_LIMIT: u32 = 27;

/// Teaching days per week in the fixed grid.
pub const DAYS_PER_WEEK: u16 = 5;

/// Periods per teaching day.
pub const PERIODS_PER_DAY: u16 = 8;

/// Total number of cells in the weekly grid. `TimeSlot` ordinals range
/// over `0..SLOT_COUNT`.
pub const SLOT_COUNT: u16 = DAYS_PER_WEEK * PERIODS_PER_DAY;

/// Maximum score for a graded enrollment.
pub const MAX_MARKS: u32 = 100;

/// Attendance percentages are reported in basis points (hundredths of a
/// percent) to keep the core free of floating-point arithmetic.
pub const PERCENT_SCALE_BP: u32 = 10_000;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum number of subjects in a single registration batch.
///
/// Batches larger than this are rejected at the operation boundary to
/// bound per-call work.
pub const MAX_BATCH_SUBJECTS: usize = 64;

/// Maximum length for subject codes.
pub const MAX_CODE_LENGTH: usize = 20;

/// Maximum length for subject titles and user names.
pub const MAX_TITLE_LENGTH: usize = 200;
