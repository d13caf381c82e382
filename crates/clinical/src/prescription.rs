use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clinicore_core::{DomainError, DomainResult, ProviderId, RecordId};
use clinicore_pharmacy::MedicineId;
use clinicore_records::PatientId;

/// Prescription identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrescriptionId(pub RecordId);

impl PrescriptionId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PrescriptionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Prescription lifecycle. Dispensed and Cancelled are terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrescriptionStatus {
    Ordered,
    Dispensed,
    Cancelled,
}

/// An order for medication.
///
/// Dispensing decrements the medicine's stock in the same store transaction
/// that flips this status, so a failed decrement leaves the order untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: PrescriptionId,
    pub patient_id: PatientId,
    pub owner: ProviderId,
    pub medicine_id: MedicineId,
    pub quantity: u32,
    pub dosage: String,
    pub status: PrescriptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Prescription {
    pub fn order(
        id: PrescriptionId,
        patient_id: PatientId,
        owner: ProviderId,
        medicine_id: MedicineId,
        quantity: u32,
        dosage: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if quantity == 0 {
            return Err(DomainError::validation(
                "prescription quantity must be positive",
            ));
        }
        let dosage = dosage.trim();
        if dosage.is_empty() {
            return Err(DomainError::validation("dosage instructions are required"));
        }

        Ok(Self {
            id,
            patient_id,
            owner,
            medicine_id,
            quantity,
            dosage: dosage.to_string(),
            status: PrescriptionStatus::Ordered,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn dispense(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != PrescriptionStatus::Ordered {
            return Err(DomainError::invariant(format!(
                "cannot dispense a {:?} prescription",
                self.status
            )));
        }
        self.status = PrescriptionStatus::Dispensed;
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != PrescriptionStatus::Ordered {
            return Err(DomainError::invariant(format!(
                "cannot cancel a {:?} prescription",
                self.status
            )));
        }
        self.status = PrescriptionStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ordered() -> Prescription {
        Prescription::order(
            PrescriptionId::new(RecordId::new()),
            PatientId::new(RecordId::new()),
            ProviderId::new(),
            MedicineId::new(RecordId::new()),
            21,
            "1 capsule three times daily",
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let err = Prescription::order(
            PrescriptionId::new(RecordId::new()),
            PatientId::new(RecordId::new()),
            ProviderId::new(),
            MedicineId::new(RecordId::new()),
            0,
            "as needed",
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn dispense_is_one_way() {
        let mut p = ordered();
        p.dispense(Utc::now()).unwrap();
        assert_eq!(p.status, PrescriptionStatus::Dispensed);
        assert!(p.dispense(Utc::now()).is_err());
        assert!(p.cancel(Utc::now()).is_err());
    }

    #[test]
    fn cancelled_orders_cannot_be_dispensed() {
        let mut p = ordered();
        p.cancel(Utc::now()).unwrap();
        assert!(p.dispense(Utc::now()).is_err());
    }
}
