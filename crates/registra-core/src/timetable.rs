//! # Timetable Builder
//!
//! Derives an ordered weekly grid from a set of committed subjects.
//!
//! A pure function of its input: the registration engine guarantees the
//! committed set is clash-free at commit time, so the builder only
//! aggregates. Finding a clash here means the commit invariant was
//! broken somewhere, which is surfaced as `IntegrityViolation` rather
//! than silently overwriting a cell.

use crate::{RegistryError, Subject, SubjectId, TimeSlot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A conflict-free weekly grid: each occupied cell maps to exactly one
/// subject. Iteration order is deterministic (slot ordinal order).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Timetable {
    cells: BTreeMap<TimeSlot, SubjectId>,
}

impl Timetable {
    /// The subject occupying a cell, if any.
    #[must_use]
    pub fn get(&self, slot: TimeSlot) -> Option<SubjectId> {
        self.cells.get(&slot).copied()
    }

    /// Occupied cells in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (TimeSlot, SubjectId)> + '_ {
        self.cells.iter().map(|(&slot, &subject)| (slot, subject))
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether no cell is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Build the grid for a set of subjects.
///
/// Deterministic for a given input set; no side effects.
pub fn build_timetable<'a>(
    subjects: impl IntoIterator<Item = &'a Subject>,
) -> Result<Timetable, RegistryError> {
    let mut cells: BTreeMap<TimeSlot, SubjectId> = BTreeMap::new();
    for subject in subjects {
        for &slot in &subject.slots {
            if let Some(&existing) = cells.get(&slot) {
                return Err(RegistryError::IntegrityViolation(format!(
                    "slot {slot:?} claimed by both {existing:?} and {:?}",
                    subject.id
                )));
            }
            cells.insert(slot, subject.id);
        }
    }
    Ok(Timetable { cells })
}

// =============================================================================
// TESTS
// =============================================================================
