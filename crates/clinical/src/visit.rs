use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clinicore_core::{DomainError, DomainResult, ProviderId, RecordId};
use clinicore_records::PatientId;

/// Medical-visit identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitId(pub RecordId);

impl VisitId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for VisitId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A documented encounter between a patient and their provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub id: VisitId,
    pub patient_id: PatientId,
    pub owner: ProviderId,
    pub occurred_at: DateTime<Utc>,
    pub chief_complaint: String,
    pub notes: Option<String>,
    pub diagnosis: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Visit {
    pub fn document(
        id: VisitId,
        patient_id: PatientId,
        owner: ProviderId,
        occurred_at: DateTime<Utc>,
        chief_complaint: &str,
        notes: Option<String>,
        diagnosis: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let chief_complaint = chief_complaint.trim();
        if chief_complaint.is_empty() {
            return Err(DomainError::validation("chief complaint is required"));
        }

        Ok(Self {
            id,
            patient_id,
            owner,
            occurred_at,
            chief_complaint: chief_complaint.to_string(),
            notes,
            diagnosis,
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chief_complaint_is_required() {
        let err = Visit::document(
            VisitId::new(RecordId::new()),
            PatientId::new(RecordId::new()),
            ProviderId::new(),
            Utc::now(),
            "  ",
            None,
            None,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
