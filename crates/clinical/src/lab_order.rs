use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clinicore_core::{DomainError, DomainResult, ProviderId, RecordId};
use clinicore_records::PatientId;

/// Lab-order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabOrderId(pub RecordId);

impl LabOrderId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for LabOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Lab-order lifecycle.
///
/// Legal moves: Ordered → InProgress | Cancelled, InProgress → Completed.
/// Completing attaches the result text.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LabOrderStatus {
    Ordered,
    InProgress,
    Completed,
    Cancelled,
}

impl LabOrderStatus {
    pub fn can_transition_to(self, next: LabOrderStatus) -> bool {
        use LabOrderStatus::*;
        matches!(
            (self, next),
            (Ordered, InProgress) | (Ordered, Cancelled) | (InProgress, Completed)
        )
    }
}

/// An ordered laboratory test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabOrder {
    pub id: LabOrderId,
    pub patient_id: PatientId,
    pub owner: ProviderId,
    pub test_name: String,
    pub status: LabOrderStatus,
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LabOrder {
    pub fn order(
        id: LabOrderId,
        patient_id: PatientId,
        owner: ProviderId,
        test_name: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let test_name = test_name.trim();
        if test_name.is_empty() {
            return Err(DomainError::validation("test name is required"));
        }

        Ok(Self {
            id,
            patient_id,
            owner,
            test_name: test_name.to_string(),
            status: LabOrderStatus::Ordered,
            result: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Move to `next`; completion may carry the result text.
    pub fn transition(
        &mut self,
        next: LabOrderStatus,
        result: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::invariant(format!(
                "cannot move lab order from {:?} to {:?}",
                self.status, next
            )));
        }
        if result.is_some() && next != LabOrderStatus::Completed {
            return Err(DomainError::validation(
                "results may only be attached on completion",
            ));
        }
        self.status = next;
        if next == LabOrderStatus::Completed {
            self.result = result;
        }
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ordered() -> LabOrder {
        LabOrder::order(
            LabOrderId::new(RecordId::new()),
            PatientId::new(RecordId::new()),
            ProviderId::new(),
            "CBC",
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn completion_carries_the_result() {
        let mut o = ordered();
        o.transition(LabOrderStatus::InProgress, None, Utc::now())
            .unwrap();
        o.transition(
            LabOrderStatus::Completed,
            Some("WBC 6.1".to_string()),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(o.result.as_deref(), Some("WBC 6.1"));
    }

    #[test]
    fn results_cannot_be_attached_early() {
        let mut o = ordered();
        assert!(
            o.transition(
                LabOrderStatus::InProgress,
                Some("too soon".to_string()),
                Utc::now()
            )
            .is_err()
        );
    }

    #[test]
    fn completed_orders_are_immutable() {
        let mut o = ordered();
        o.transition(LabOrderStatus::InProgress, None, Utc::now())
            .unwrap();
        o.transition(LabOrderStatus::Completed, None, Utc::now())
            .unwrap();
        assert!(
            o.transition(LabOrderStatus::Cancelled, None, Utc::now())
                .is_err()
        );
    }

    #[test]
    fn in_progress_cannot_be_cancelled() {
        let mut o = ordered();
        o.transition(LabOrderStatus::InProgress, None, Utc::now())
            .unwrap();
        assert!(
            o.transition(LabOrderStatus::Cancelled, None, Utc::now())
                .is_err()
        );
    }
}
