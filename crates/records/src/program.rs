use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clinicore_core::{DomainError, DomainResult, ProviderId, RecordId};

/// Care-program identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramId(pub RecordId);

impl ProgramId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProgramId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A care program patients can be enrolled in (e.g. hypertension follow-up).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: ProgramId,
    pub owner: ProviderId,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Program {
    pub fn create(
        id: ProgramId,
        owner: ProviderId,
        name: &str,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("program name is required"));
        }

        Ok(Self {
            id,
            owner,
            name: name.to_string(),
            description,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update(
        &mut self,
        name: Option<&str>,
        description: Option<Option<String>>,
        active: Option<bool>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if let Some(name) = name {
            let name = name.trim();
            if name.is_empty() {
                return Err(DomainError::validation("program name is required"));
            }
            self.name = name.to_string();
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(active) = active {
            self.active = active;
        }
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_a_name() {
        let err = Program::create(
            ProgramId::new(RecordId::new()),
            ProviderId::new(),
            "",
            None,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn new_programs_start_active() {
        let p = Program::create(
            ProgramId::new(RecordId::new()),
            ProviderId::new(),
            "TB follow-up",
            Some("directly observed therapy".to_string()),
            Utc::now(),
        )
        .unwrap();
        assert!(p.active);
    }
}
