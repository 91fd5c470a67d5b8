//! # Catalog Store
//!
//! The subject catalog for the active semester.
//!
//! Subjects are read-mostly: many registration calls may read the
//! catalog concurrently (through a shared reference) since subjects are
//! immutable while students are enrolled. The lock that makes a subject
//! immutable lives in [`crate::registry::Registry`], which knows which
//! subjects carry enrollments.

use crate::primitives::{CREDIT_LIMIT, MAX_CODE_LENGTH, MAX_TITLE_LENGTH};
use crate::{RegistryError, Subject, SubjectId, TimeSlot, UserId};
use std::collections::{BTreeMap, BTreeSet};

/// Payload for creating (or replacing) a subject definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectSpec {
    pub code: String,
    pub title: String,
    pub credits: u8,
    pub slots: BTreeSet<TimeSlot>,
    pub faculty: UserId,
}

impl SubjectSpec {
    /// Validate field bounds common to create and replace.
    fn validate(&self) -> Result<(), RegistryError> {
        if self.code.is_empty() || self.code.len() > MAX_CODE_LENGTH {
            return Err(RegistryError::InvalidInput(format!(
                "subject code must be 1..={MAX_CODE_LENGTH} bytes"
            )));
        }
        if self.title.is_empty() || self.title.len() > MAX_TITLE_LENGTH {
            return Err(RegistryError::InvalidInput(format!(
                "subject title must be 1..={MAX_TITLE_LENGTH} bytes"
            )));
        }
        if self.credits == 0 || u32::from(self.credits) > CREDIT_LIMIT {
            return Err(RegistryError::InvalidCredits(self.credits));
        }
        if self.slots.is_empty() {
            return Err(RegistryError::InvalidInput(
                "subject must occupy at least one time slot".to_string(),
            ));
        }
        Ok(())
    }
}

/// The in-memory subject catalog.
///
/// Uses `BTreeMap` exclusively for deterministic iteration order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Subject storage: SubjectId -> Subject.
    subjects: BTreeMap<SubjectId, Subject>,
    /// Reverse lookup: code -> SubjectId.
    code_index: BTreeMap<String, SubjectId>,
    /// Next available SubjectId.
    next_subject_id: u64,
}

impl Catalog {
    /// Create a new empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subject, enforcing code uniqueness and field bounds.
    pub fn add(&mut self, spec: SubjectSpec) -> Result<SubjectId, RegistryError> {
        spec.validate()?;
        if self.code_index.contains_key(&spec.code) {
            return Err(RegistryError::DuplicateCode(spec.code));
        }

        let id = SubjectId(self.next_subject_id);
        self.next_subject_id = self.next_subject_id.saturating_add(1);

        self.code_index.insert(spec.code.clone(), id);
        self.subjects.insert(
            id,
            Subject {
                id,
                code: spec.code,
                title: spec.title,
                credits: spec.credits,
                slots: spec.slots,
                faculty: spec.faculty,
            },
        );
        Ok(id)
    }

    /// Replace an existing subject's definition.
    ///
    /// The enrollment-lock check ("immutable during semester") is the
    /// Registry's responsibility; the catalog only enforces code
    /// uniqueness against other subjects.
    pub fn replace(&mut self, id: SubjectId, spec: SubjectSpec) -> Result<(), RegistryError> {
        spec.validate()?;
        let existing = self
            .subjects
            .get(&id)
            .ok_or(RegistryError::SubjectNotFound(id))?;

        if let Some(&holder) = self.code_index.get(&spec.code)
            && holder != id
        {
            return Err(RegistryError::DuplicateCode(spec.code));
        }

        self.code_index.remove(&existing.code);
        self.code_index.insert(spec.code.clone(), id);
        self.subjects.insert(
            id,
            Subject {
                id,
                code: spec.code,
                title: spec.title,
                credits: spec.credits,
                slots: spec.slots,
                faculty: spec.faculty,
            },
        );
        Ok(())
    }

    /// Get a subject by id.
    pub fn get(&self, id: SubjectId) -> Result<&Subject, RegistryError> {
        self.subjects
            .get(&id)
            .ok_or(RegistryError::SubjectNotFound(id))
    }

    /// Look up a subject by its unique code.
    #[must_use]
    pub fn get_by_code(&self, code: &str) -> Option<&Subject> {
        self.code_index.get(code).and_then(|id| self.subjects.get(id))
    }

    /// Whether a subject exists.
    #[must_use]
    pub fn contains(&self, id: SubjectId) -> bool {
        self.subjects.contains_key(&id)
    }

    /// All subjects in deterministic (id) order.
    pub fn list(&self) -> impl Iterator<Item = &Subject> {
        self.subjects.values()
    }

    /// Number of subjects in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(code: &str, credits: u8, slots: &[u16]) -> SubjectSpec {
        SubjectSpec {
            code: code.to_string(),
            title: format!("{code} title"),
            credits,
            slots: slots.iter().map(|&s| TimeSlot(s)).collect(),
            faculty: UserId(1),
        }
    }

    #[test]
    fn add_assigns_sequential_ids() {
        let mut catalog = Catalog::new();
        let a = catalog.add(spec("CS1", 4, &[0])).expect("add");
        let b = catalog.add(spec("CS2", 4, &[1])).expect("add");
        assert_ne!(a, b);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn duplicate_code_rejected() {
        let mut catalog = Catalog::new();
        catalog.add(spec("CS1", 4, &[0])).expect("add");
        let err = catalog.add(spec("CS1", 3, &[1])).expect_err("dup");
        assert!(matches!(err, RegistryError::DuplicateCode(_)));
    }

    #[test]
    fn lookup_by_code() {
        let mut catalog = Catalog::new();
        let id = catalog.add(spec("MA201", 3, &[5])).expect("add");
        assert_eq!(catalog.get_by_code("MA201").map(|s| s.id), Some(id));
        assert!(catalog.get_by_code("XX999").is_none());
    }

    #[test]
    fn zero_credits_rejected() {
        let mut catalog = Catalog::new();
        let err = catalog.add(spec("CS1", 0, &[0])).expect_err("zero");
        assert!(matches!(err, RegistryError::InvalidCredits(0)));
    }

    #[test]
    fn over_limit_credits_rejected() {
        let mut catalog = Catalog::new();
        let err = catalog.add(spec("CS1", 28, &[0])).expect_err("over");
        assert!(matches!(err, RegistryError::InvalidCredits(28)));
    }

    #[test]
    fn empty_slot_set_rejected() {
        let mut catalog = Catalog::new();
        let err = catalog.add(spec("CS1", 4, &[])).expect_err("no slots");
        assert!(matches!(err, RegistryError::InvalidInput(_)));
    }

    #[test]
    fn replace_keeps_code_index_consistent() {
        let mut catalog = Catalog::new();
        let id = catalog.add(spec("CS1", 4, &[0])).expect("add");
        catalog.replace(id, spec("CS1R", 4, &[0])).expect("replace");
        assert!(catalog.get_by_code("CS1").is_none());
        assert_eq!(catalog.get_by_code("CS1R").map(|s| s.id), Some(id));
    }

    #[test]
    fn replace_rejects_code_held_by_other_subject() {
        let mut catalog = Catalog::new();
        catalog.add(spec("CS1", 4, &[0])).expect("add");
        let b = catalog.add(spec("CS2", 4, &[1])).expect("add");
        let err = catalog.replace(b, spec("CS1", 4, &[1])).expect_err("dup");
        assert!(matches!(err, RegistryError::DuplicateCode(_)));
    }
}
