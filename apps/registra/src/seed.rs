//! # Seed Loading
//!
//! JSON seed files let an operator start the server with users and
//! subjects already in place. A seed file is operator convenience, not
//! persistence: the registry stays in memory for its lifetime.
//!
//! Seed users are applied in file order, so parent entries must come
//! after the student they link to (the link is by list index, which is
//! stable and survives id assignment).

use registra_core::{
    Caller, Registry, RegistryError, Role, Semester, SubjectSpec, TimeSlot, UserId, UserSpec,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Maximum seed file size (10 MB). Seeds are operator-written; anything
/// larger is a mistake.
const MAX_SEED_FILE_SIZE: u64 = 10 * 1024 * 1024;

// =============================================================================
// SEED FILE FORMAT
// =============================================================================

/// One user entry in a seed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedUser {
    pub full_name: String,
    pub role: Role,
    /// Zero-based index into the `users` list of the linked student.
    /// Only valid on parent entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_index: Option<usize>,
}

/// One subject entry in a seed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedSubject {
    pub code: String,
    pub title: String,
    pub credits: u8,
    /// Slot ordinals in the weekly grid.
    pub slots: Vec<u16>,
    /// Zero-based index into the `users` list of the assigned faculty.
    pub faculty_index: usize,
}

/// A complete seed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedFile {
    /// Active semester number.
    pub semester: u16,
    pub users: Vec<SeedUser>,
    pub subjects: Vec<SeedSubject>,
}

impl SeedFile {
    /// A small template seed: one admin, one faculty member, one
    /// student, one parent and two subjects.
    #[must_use]
    pub fn template() -> Self {
        Self {
            semester: 1,
            users: vec![
                SeedUser {
                    full_name: "Root Admin".to_string(),
                    role: Role::Admin,
                    child_index: None,
                },
                SeedUser {
                    full_name: "Dr. Example Faculty".to_string(),
                    role: Role::Faculty,
                    child_index: None,
                },
                SeedUser {
                    full_name: "Example Student".to_string(),
                    role: Role::Student,
                    child_index: None,
                },
                SeedUser {
                    full_name: "Example Parent".to_string(),
                    role: Role::Parent,
                    child_index: Some(2),
                },
            ],
            subjects: vec![
                SeedSubject {
                    code: "CS101".to_string(),
                    title: "Introduction to Programming".to_string(),
                    credits: 4,
                    slots: vec![0, 1],
                    faculty_index: 1,
                },
                SeedSubject {
                    code: "MA102".to_string(),
                    title: "Discrete Mathematics".to_string(),
                    credits: 3,
                    slots: vec![8, 9],
                    faculty_index: 1,
                },
            ],
        }
    }
}

// =============================================================================
// LOADING
// =============================================================================

/// Read and parse a seed file, rejecting oversized inputs.
pub fn read_seed_file(path: &Path) -> Result<SeedFile, RegistryError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| RegistryError::Io(format!("Cannot read seed metadata: {}", e)))?;
    if metadata.len() > MAX_SEED_FILE_SIZE {
        return Err(RegistryError::Serialization(format!(
            "Seed file size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_SEED_FILE_SIZE
        )));
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| RegistryError::Io(format!("Cannot read seed '{}': {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| {
        RegistryError::Serialization(format!("Invalid seed '{}': {}", path.display(), e))
    })
}

/// Build a registry from a parsed seed.
///
/// All entries pass through the normal registry operations under a
/// bootstrap admin identity, so the seed obeys every domain rule
/// (duplicate codes, credit bounds, faculty schedule clashes).
pub fn build_registry(seed: &SeedFile) -> Result<Registry, RegistryError> {
    let mut registry = Registry::new(Semester(seed.semester));

    // Bootstrap identity: the directory assigns ids from zero, and the
    // first seed user is conventionally the admin, so UserId(0) works
    // for the whole seed pass even before any user exists.
    let boot = Caller::new(UserId(0), Role::Admin);

    let mut assigned: Vec<UserId> = Vec::with_capacity(seed.users.len());
    for (i, user) in seed.users.iter().enumerate() {
        let child = match user.child_index {
            Some(index) => Some(*assigned.get(index).ok_or_else(|| {
                RegistryError::InvalidInput(format!(
                    "seed user {i}: child_index {index} does not precede it"
                ))
            })?),
            None => None,
        };
        let id = registry.add_user(
            boot,
            UserSpec {
                full_name: user.full_name.clone(),
                role: user.role,
                child,
            },
        )?;
        assigned.push(id);
    }

    for (i, subject) in seed.subjects.iter().enumerate() {
        let faculty = *assigned.get(subject.faculty_index).ok_or_else(|| {
            RegistryError::InvalidInput(format!(
                "seed subject {i}: faculty_index {} out of range",
                subject.faculty_index
            ))
        })?;
        let slots = subject
            .slots
            .iter()
            .map(|&ordinal| TimeSlot::new(ordinal))
            .collect::<Result<_, _>>()?;
        registry.add_subject(
            boot,
            SubjectSpec {
                code: subject.code.clone(),
                title: subject.title.clone(),
                credits: subject.credits,
                slots,
                faculty,
            },
        )?;
    }

    Ok(registry)
}

// =============================================================================
// TESTS
// =============================================================================
