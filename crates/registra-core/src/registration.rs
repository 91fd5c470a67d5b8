//! # Registration Engine
//!
//! Validates a proposed registration batch for one student against the
//! credit ceiling and the slot-clash constraint.
//!
//! The engine is a pure function over the catalog and the student's
//! committed subject set: it decides, it does not commit. The Registry
//! applies all accepted subjects atomically at the end of one call, so
//! a batch is never half-committed even though validation is
//! per-subject.
//!
//! Credit and clash failures are collected per subject and returned as
//! data. An unknown subject id is different: it means the caller built
//! the batch against a stale or fabricated catalog, so the whole call
//! fails with `SubjectNotFound` and nothing is evaluated.

use crate::catalog::Catalog;
use crate::primitives::{CREDIT_LIMIT, MAX_BATCH_SUBJECTS};
use crate::{RegistryError, SubjectId, TimeSlot};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// OUTCOME TYPES
// =============================================================================

/// Why a proposed subject was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// Accepting the subject would push the committed credit sum past
    /// the ceiling. Once the ceiling is hit, every remaining proposed
    /// subject is rejected with this reason.
    CreditLimitExceeded,
    /// The subject's slots intersect a committed subject or one
    /// accepted earlier in this batch.
    SlotClash {
        /// The conflicting subject.
        with: SubjectId,
    },
}

/// Per-subject result of one registration call.
///
/// `accepted` preserves caller-submitted order and includes idempotent
/// re-registrations of already-committed subjects. `newly_accepted` is
/// the subset that actually creates enrollments.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegistrationOutcome {
    pub accepted: Vec<SubjectId>,
    pub newly_accepted: Vec<SubjectId>,
    pub rejected: BTreeMap<SubjectId, RejectReason>,
}

impl RegistrationOutcome {
    /// Whether every proposed subject was accepted.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// The registration validator.
pub struct RegistrationEngine;

impl RegistrationEngine {
    /// Evaluate a proposed batch against the student's committed set.
    ///
    /// Any id that does not reference a catalog subject fails the whole
    /// call with `SubjectNotFound` before anything is evaluated.
    ///
    /// Processing order per subject, in caller-submitted order after
    /// deduplication:
    /// 1. already committed -> idempotent accept (no new enrollment);
    /// 2. credit check: accept only if the running total stays within
    ///    the ceiling; the first overrun trips the ceiling and every
    ///    later proposed subject is rejected `CreditLimitExceeded`;
    /// 3. slot-clash check against committed plus accepted-so-far.
    ///
    /// A committed subject missing from the catalog is an
    /// `IntegrityViolation`, and an oversized batch is rejected at the
    /// boundary.
    pub fn evaluate(
        catalog: &Catalog,
        committed: &BTreeSet<SubjectId>,
        proposed: &[SubjectId],
    ) -> Result<RegistrationOutcome, RegistryError> {
        if proposed.len() > MAX_BATCH_SUBJECTS {
            return Err(RegistryError::InvalidInput(format!(
                "registration batch of {} exceeds maximum {MAX_BATCH_SUBJECTS}",
                proposed.len()
            )));
        }

        if let Some(&unknown) = proposed.iter().find(|&&id| !catalog.contains(id)) {
            return Err(RegistryError::SubjectNotFound(unknown));
        }

        // Committed credit total and occupied slots. A committed subject
        // absent from the catalog means the commit invariant was broken.
        let mut total_credits: u32 = 0;
        let mut occupied: BTreeMap<TimeSlot, SubjectId> = BTreeMap::new();
        for &id in committed {
            let subject = catalog.get(id).map_err(|_| {
                RegistryError::IntegrityViolation(format!(
                    "committed subject {id:?} missing from catalog"
                ))
            })?;
            total_credits = total_credits.saturating_add(u32::from(subject.credits));
            for &slot in &subject.slots {
                occupied.insert(slot, id);
            }
        }

        let mut outcome = RegistrationOutcome::default();
        let mut seen: BTreeSet<SubjectId> = BTreeSet::new();
        let mut ceiling_hit = false;

        for &id in proposed {
            // Duplicates within the batch are deduplicated.
            if !seen.insert(id) {
                continue;
            }

            // Re-registration of an enrolled subject is a no-op success.
            if committed.contains(&id) {
                outcome.accepted.push(id);
                continue;
            }

            if ceiling_hit {
                outcome
                    .rejected
                    .insert(id, RejectReason::CreditLimitExceeded);
                continue;
            }

            let subject = catalog.get(id)?;

            let candidate_total = total_credits.saturating_add(u32::from(subject.credits));
            if candidate_total > CREDIT_LIMIT {
                ceiling_hit = true;
                outcome
                    .rejected
                    .insert(id, RejectReason::CreditLimitExceeded);
                continue;
            }

            if let Some(&with) = subject.slots.iter().find_map(|slot| occupied.get(slot)) {
                outcome.rejected.insert(id, RejectReason::SlotClash { with });
                continue;
            }

            total_credits = candidate_total;
            for &slot in &subject.slots {
                occupied.insert(slot, id);
            }
            outcome.accepted.push(id);
            outcome.newly_accepted.push(id);
        }

        Ok(outcome)
    }
}

// =============================================================================
// TESTS
// =============================================================================
