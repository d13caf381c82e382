use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use clinicore_core::{DomainError, DomainResult, ProviderId, RecordId};
use clinicore_numbering::DocumentNumber;

/// Patient identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(pub RecordId);

impl PatientId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PatientId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
    Other,
}

/// Optional patient demographics.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Demographics {
    pub date_of_birth: Option<NaiveDate>,
    pub sex: Option<Sex>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// A registered patient.
///
/// The MRN is minted by the store at registration time from the per-day
/// sequence counter; it never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub mrn: DocumentNumber,
    pub owner: ProviderId,
    pub name: String,
    pub demographics: Demographics,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    /// Register a patient. The only hard requirement is a non-empty name.
    pub fn register(
        id: PatientId,
        mrn: DocumentNumber,
        owner: ProviderId,
        name: &str,
        demographics: Demographics,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("patient name is required"));
        }

        Ok(Self {
            id,
            mrn,
            owner,
            name: name.to_string(),
            demographics,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update. Absent fields are left untouched.
    pub fn update(
        &mut self,
        name: Option<&str>,
        demographics: Option<Demographics>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if let Some(name) = name {
            let name = name.trim();
            if name.is_empty() {
                return Err(DomainError::validation("patient name is required"));
            }
            self.name = name.to_string();
        }
        if let Some(demographics) = demographics {
            self.demographics = demographics;
        }
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinicore_numbering::DocumentKind;

    fn mrn() -> DocumentNumber {
        DocumentNumber::new(
            DocumentKind::MedicalRecord,
            NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            1,
        )
        .unwrap()
    }

    #[test]
    fn register_requires_a_name() {
        let err = Patient::register(
            PatientId::new(RecordId::new()),
            mrn(),
            ProviderId::new(),
            "   ",
            Demographics::default(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn register_trims_the_name() {
        let p = Patient::register(
            PatientId::new(RecordId::new()),
            mrn(),
            ProviderId::new(),
            "  Jane Doe ",
            Demographics::default(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(p.name, "Jane Doe");
    }

    #[test]
    fn update_cannot_blank_the_name() {
        let mut p = Patient::register(
            PatientId::new(RecordId::new()),
            mrn(),
            ProviderId::new(),
            "Jane",
            Demographics::default(),
            Utc::now(),
        )
        .unwrap();

        assert!(p.update(Some(""), None, Utc::now()).is_err());
        assert_eq!(p.name, "Jane");

        p.update(Some("Jane Q. Doe"), None, Utc::now()).unwrap();
        assert_eq!(p.name, "Jane Q. Doe");
    }
}
