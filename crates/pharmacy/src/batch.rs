use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use clinicore_core::{DomainError, DomainResult, RecordId};

use crate::MedicineId;

/// Batch identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub RecordId);

impl BatchId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for BatchId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A received stock batch. Receipt increments the medicine's stock in the
/// same store transaction that persists the batch row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicineBatch {
    pub id: BatchId,
    pub medicine_id: MedicineId,
    pub batch_number: String,
    pub quantity: u32,
    pub expiry_date: NaiveDate,
    pub received_at: DateTime<Utc>,
}

impl MedicineBatch {
    pub fn receive(
        id: BatchId,
        medicine_id: MedicineId,
        batch_number: &str,
        quantity: u32,
        expiry_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let batch_number = batch_number.trim();
        if batch_number.is_empty() {
            return Err(DomainError::validation("batch number is required"));
        }
        if quantity == 0 {
            return Err(DomainError::validation("batch quantity must be positive"));
        }

        Ok(Self {
            id,
            medicine_id,
            batch_number: batch_number.to_string(),
            quantity,
            expiry_date,
            received_at: now,
        })
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date < today
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_validates_number_and_quantity() {
        let id = BatchId::new(RecordId::new());
        let med = MedicineId::new(RecordId::new());
        let expiry = NaiveDate::from_ymd_opt(2027, 1, 1).unwrap();

        assert!(MedicineBatch::receive(id, med, " ", 10, expiry, Utc::now()).is_err());
        assert!(MedicineBatch::receive(id, med, "LOT-7", 0, expiry, Utc::now()).is_err());

        let batch = MedicineBatch::receive(id, med, " LOT-7 ", 10, expiry, Utc::now()).unwrap();
        assert_eq!(batch.batch_number, "LOT-7");
    }

    #[test]
    fn expiry_is_a_strict_cutoff() {
        let batch = MedicineBatch::receive(
            BatchId::new(RecordId::new()),
            MedicineId::new(RecordId::new()),
            "LOT-1",
            5,
            NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            Utc::now(),
        )
        .unwrap();

        assert!(!batch.is_expired(NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()));
        assert!(batch.is_expired(NaiveDate::from_ymd_opt(2026, 6, 2).unwrap()));
    }
}
