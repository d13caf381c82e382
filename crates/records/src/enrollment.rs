use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clinicore_core::RecordId;

use crate::{PatientId, ProgramId};

/// Enrollment identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnrollmentId(pub RecordId);

impl EnrollmentId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for EnrollmentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A patient's membership in a care program.
///
/// At most one enrollment may exist per (patient, program) pair; the store
/// rejects duplicates with a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub patient_id: PatientId,
    pub program_id: ProgramId,
    pub enrolled_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn new(
        id: EnrollmentId,
        patient_id: PatientId,
        program_id: ProgramId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            patient_id,
            program_id,
            enrolled_at: now,
        }
    }
}
