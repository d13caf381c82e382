use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clinicore_core::{DomainError, DomainResult, Money, RecordId};

/// Medicine identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MedicineId(pub RecordId);

impl MedicineId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for MedicineId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A catalog entry with its stock on hand.
///
/// Stock is only ever changed through [`Medicine::receive`] and
/// [`Medicine::dispense`], which keep it non-negative. Both run inside the
/// same store transaction as the batch/prescription write that caused them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medicine {
    pub id: MedicineId,
    pub name: String,
    pub generic_name: Option<String>,
    pub form: Option<String>,
    pub unit_price: Money,
    pub reorder_level: u32,
    pub stock_on_hand: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Medicine {
    pub fn create(
        id: MedicineId,
        name: &str,
        generic_name: Option<String>,
        form: Option<String>,
        unit_price: Money,
        reorder_level: u32,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("medicine name is required"));
        }

        Ok(Self {
            id,
            name: name.to_string(),
            generic_name,
            form,
            unit_price,
            reorder_level,
            stock_on_hand: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Add received stock (batch intake).
    pub fn receive(&mut self, quantity: u32, now: DateTime<Utc>) -> DomainResult<()> {
        if quantity == 0 {
            return Err(DomainError::validation("received quantity must be positive"));
        }
        self.stock_on_hand = self
            .stock_on_hand
            .checked_add(quantity)
            .ok_or_else(|| DomainError::invariant("stock overflow"))?;
        self.updated_at = now;
        Ok(())
    }

    /// Remove dispensed stock; never goes negative.
    pub fn dispense(&mut self, quantity: u32, now: DateTime<Utc>) -> DomainResult<()> {
        if quantity == 0 {
            return Err(DomainError::validation("dispensed quantity must be positive"));
        }
        if quantity > self.stock_on_hand {
            return Err(DomainError::invariant(format!(
                "insufficient stock: {} on hand, {} requested",
                self.stock_on_hand, quantity
            )));
        }
        self.stock_on_hand -= quantity;
        self.updated_at = now;
        Ok(())
    }

    pub fn is_below_reorder_level(&self) -> bool {
        self.stock_on_hand < self.reorder_level
    }

    pub fn update(
        &mut self,
        name: Option<&str>,
        unit_price: Option<Money>,
        reorder_level: Option<u32>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if let Some(name) = name {
            let name = name.trim();
            if name.is_empty() {
                return Err(DomainError::validation("medicine name is required"));
            }
            self.name = name.to_string();
        }
        if let Some(unit_price) = unit_price {
            self.unit_price = unit_price;
        }
        if let Some(reorder_level) = reorder_level {
            self.reorder_level = reorder_level;
        }
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amoxicillin() -> Medicine {
        Medicine::create(
            MedicineId::new(RecordId::new()),
            "Amoxicillin 500mg",
            Some("amoxicillin".to_string()),
            Some("capsule".to_string()),
            Money::from_cents(250).unwrap(),
            20,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn stock_never_goes_negative() {
        let mut m = amoxicillin();
        m.receive(10, Utc::now()).unwrap();
        let err = m.dispense(11, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(m.stock_on_hand, 10);
    }

    #[test]
    fn dispense_to_zero_is_allowed() {
        let mut m = amoxicillin();
        m.receive(5, Utc::now()).unwrap();
        m.dispense(5, Utc::now()).unwrap();
        assert_eq!(m.stock_on_hand, 0);
        assert!(m.is_below_reorder_level());
    }

    #[test]
    fn zero_quantities_are_rejected() {
        let mut m = amoxicillin();
        assert!(m.receive(0, Utc::now()).is_err());
        assert!(m.dispense(0, Utc::now()).is_err());
    }
}
