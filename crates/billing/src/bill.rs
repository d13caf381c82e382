use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clinicore_core::{DomainError, DomainResult, Money, ProviderId, RecordId};
use clinicore_numbering::DocumentNumber;
use clinicore_records::PatientId;

/// Flat tax rate applied after the discount.
pub const TAX_RATE_PERCENT: u8 = 15;

/// Bill identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BillId(pub RecordId);

impl BillId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for BillId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// What a bill line charges for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    Consultation,
    Procedure,
    Medication,
    LabTest,
    Other,
}

/// Bill lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillStatus {
    Pending,
    Partial,
    Paid,
    Cancelled,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    MobileMoney,
    Insurance,
}

/// One charged line. `line_total` is computed at construction and never
/// recomputed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillLine {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub item_type: ItemType,
    pub line_total: Money,
}

impl BillLine {
    pub fn new(
        description: &str,
        quantity: u32,
        unit_price: Money,
        item_type: ItemType,
    ) -> DomainResult<Self> {
        let description = description.trim();
        if description.is_empty() {
            return Err(DomainError::validation("line description is required"));
        }
        if quantity == 0 {
            return Err(DomainError::validation("line quantity must be positive"));
        }
        let line_total = unit_price.checked_mul(quantity)?;

        Ok(Self {
            description: description.to_string(),
            quantity,
            unit_price,
            item_type,
            line_total,
        })
    }
}

/// Derived amounts for a bill.
///
/// `total == subtotal - discount + tax`, where
/// `discount = subtotal * discount_percent / 100` and
/// `tax = (subtotal - discount) * 15 / 100`, both rounded half-up to cents.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillTotals {
    pub subtotal: Money,
    pub discount_percent: u8,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
}

impl BillTotals {
    pub fn compute(lines: &[BillLine], discount_percent: u8) -> DomainResult<Self> {
        if discount_percent > 100 {
            return Err(DomainError::validation(
                "discount percent must be between 0 and 100",
            ));
        }

        let mut subtotal = Money::ZERO;
        for line in lines {
            subtotal = subtotal.checked_add(line.line_total)?;
        }

        let discount = subtotal.percent_round(discount_percent);
        let after_discount = subtotal.checked_sub(discount)?;
        let tax = after_discount.percent_round(TAX_RATE_PERCENT);
        let total = after_discount.checked_add(tax)?;

        Ok(Self {
            subtotal,
            discount_percent,
            discount,
            tax,
            total,
        })
    }
}

/// One recorded payment against a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: RecordId,
    pub bill_id: BillId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub recorded_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        id: RecordId,
        bill_id: BillId,
        amount: Money,
        method: PaymentMethod,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            bill_id,
            amount,
            method,
            recorded_at,
        }
    }
}

/// An issued bill.
///
/// Created once with its lines and totals; afterwards only payment recording
/// and cancellation touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    pub id: BillId,
    pub number: DocumentNumber,
    pub patient_id: PatientId,
    pub owner: ProviderId,
    pub lines: Vec<BillLine>,
    pub totals: BillTotals,
    pub notes: Option<String>,
    pub status: BillStatus,
    pub paid_amount: Money,
    pub paid_at: Option<DateTime<Utc>>,
    pub last_payment_method: Option<PaymentMethod>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    /// Issue a bill. At least one line is required.
    pub fn issue(
        id: BillId,
        number: DocumentNumber,
        patient_id: PatientId,
        owner: ProviderId,
        lines: Vec<BillLine>,
        discount_percent: u8,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if lines.is_empty() {
            return Err(DomainError::validation("cannot issue a bill without lines"));
        }
        let totals = BillTotals::compute(&lines, discount_percent)?;

        Ok(Self {
            id,
            number,
            patient_id,
            owner,
            lines,
            totals,
            notes,
            status: BillStatus::Pending,
            paid_amount: Money::ZERO,
            paid_at: None,
            last_payment_method: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn outstanding(&self) -> Money {
        // paid_amount never exceeds total, so this cannot underflow.
        Money::from_cents(self.totals.total.cents() - self.paid_amount.cents())
            .unwrap_or(Money::ZERO)
    }

    /// Whether further payment can be taken.
    pub fn can_accept_payment(&self) -> bool {
        matches!(self.status, BillStatus::Pending | BillStatus::Partial)
            && !self.outstanding().is_zero()
    }

    /// Record a payment of `amount`.
    ///
    /// The running paid amount accumulates; the bill flips to Paid exactly
    /// when it reaches the total. Paying past the total is rejected, so a
    /// blindly retried payment request fails loudly instead of
    /// double-counting.
    pub fn record_payment(
        &mut self,
        amount: Money,
        method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if !self.can_accept_payment() {
            return Err(DomainError::invariant(format!(
                "cannot record payment on a {:?} bill",
                self.status
            )));
        }
        if amount.is_zero() {
            return Err(DomainError::validation("payment amount must be positive"));
        }

        let new_paid = self.paid_amount.checked_add(amount)?;
        if new_paid > self.totals.total {
            return Err(DomainError::invariant("cannot overpay bill"));
        }

        self.paid_amount = new_paid;
        self.status = if new_paid >= self.totals.total {
            BillStatus::Paid
        } else {
            BillStatus::Partial
        };
        self.paid_at = Some(now);
        self.last_payment_method = Some(method);
        self.updated_at = now;
        Ok(())
    }

    /// Cancel an unpaid bill. Bills with recorded payments cannot be
    /// cancelled.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == BillStatus::Cancelled {
            return Err(DomainError::conflict("bill is already cancelled"));
        }
        if !self.paid_amount.is_zero() {
            return Err(DomainError::invariant(
                "cannot cancel a bill with recorded payments",
            ));
        }
        self.status = BillStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use clinicore_numbering::DocumentKind;

    fn bill_number() -> DocumentNumber {
        DocumentNumber::new(
            DocumentKind::Bill,
            NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            1,
        )
        .unwrap()
    }

    fn line(qty: u32, cents: i64) -> BillLine {
        BillLine::new(
            "consultation",
            qty,
            Money::from_cents(cents).unwrap(),
            ItemType::Consultation,
        )
        .unwrap()
    }

    fn issue(lines: Vec<BillLine>, discount: u8) -> Bill {
        Bill::issue(
            BillId::new(RecordId::new()),
            bill_number(),
            PatientId::new(RecordId::new()),
            ProviderId::new(),
            lines,
            discount,
            None,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn worked_example_two_lines_ten_percent_discount() {
        // 2 x 50.00 + 1 x 30.00, 10% discount:
        // subtotal 130.00, discount 13.00, tax 17.55, total 134.55.
        let bill = issue(vec![line(2, 5_000), line(1, 3_000)], 10);
        assert_eq!(bill.totals.subtotal.cents(), 13_000);
        assert_eq!(bill.totals.discount.cents(), 1_300);
        assert_eq!(bill.totals.tax.cents(), 1_755);
        assert_eq!(bill.totals.total.cents(), 13_455);
        assert_eq!(bill.status, BillStatus::Pending);
    }

    #[test]
    fn empty_bills_are_rejected() {
        let err = Bill::issue(
            BillId::new(RecordId::new()),
            bill_number(),
            PatientId::new(RecordId::new()),
            ProviderId::new(),
            vec![],
            0,
            None,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn discount_above_hundred_percent_is_rejected() {
        assert!(BillTotals::compute(&[line(1, 1_000)], 101).is_err());
    }

    #[test]
    fn full_discount_still_yields_zero_tax_and_total() {
        let totals = BillTotals::compute(&[line(1, 1_000)], 100).unwrap();
        assert_eq!(totals.discount.cents(), 1_000);
        assert_eq!(totals.tax.cents(), 0);
        assert_eq!(totals.total.cents(), 0);
    }

    #[test]
    fn partial_then_full_payment_flips_status() {
        let mut bill = issue(vec![line(2, 5_000), line(1, 3_000)], 10);

        bill.record_payment(
            Money::from_cents(5_000).unwrap(),
            PaymentMethod::Cash,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(bill.status, BillStatus::Partial);
        assert_eq!(bill.paid_amount.cents(), 5_000);
        assert_eq!(bill.outstanding().cents(), 8_455);
        assert!(bill.paid_at.is_some());

        bill.record_payment(
            Money::from_cents(8_455).unwrap(),
            PaymentMethod::Card,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(bill.status, BillStatus::Paid);
        assert_eq!(bill.outstanding().cents(), 0);
        assert!(!bill.can_accept_payment());
    }

    #[test]
    fn overpayment_is_rejected() {
        let mut bill = issue(vec![line(1, 10_000)], 0);
        let err = bill
            .record_payment(
                Money::from_cents(11_501).unwrap(),
                PaymentMethod::Cash,
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(bill.status, BillStatus::Pending);
        assert_eq!(bill.paid_amount, Money::ZERO);
    }

    #[test]
    fn cancelled_bills_take_no_payments() {
        let mut bill = issue(vec![line(1, 2_000)], 0);
        bill.cancel(Utc::now()).unwrap();
        assert!(
            bill.record_payment(
                Money::from_cents(100).unwrap(),
                PaymentMethod::Cash,
                Utc::now()
            )
            .is_err()
        );
    }

    #[test]
    fn paid_bills_cannot_be_cancelled() {
        let mut bill = issue(vec![line(1, 1_000)], 0);
        bill.record_payment(
            Money::from_cents(100).unwrap(),
            PaymentMethod::Cash,
            Utc::now(),
        )
        .unwrap();
        assert!(bill.cancel(Utc::now()).is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_lines() -> impl Strategy<Value = Vec<BillLine>> {
            prop::collection::vec((1u32..50, 0i64..100_000), 1..8).prop_map(|specs| {
                specs
                    .into_iter()
                    .map(|(qty, cents)| line(qty, cents))
                    .collect()
            })
        }

        proptest! {
            /// total == subtotal - discount + tax, and the tax is 15% of the
            /// discounted subtotal rounded half-up.
            #[test]
            fn totals_identity_holds(lines in arb_lines(), discount in 0u8..=100) {
                let t = BillTotals::compute(&lines, discount).unwrap();

                prop_assert_eq!(
                    t.total.cents(),
                    t.subtotal.cents() - t.discount.cents() + t.tax.cents()
                );

                let after = t.subtotal.cents() - t.discount.cents();
                prop_assert_eq!(t.tax.cents(), (after * 15 + 50) / 100);
                prop_assert!(t.discount.cents() <= t.subtotal.cents());
            }

            /// Any accepted payment accumulates exactly, and the status is
            /// Paid iff the running total reached the bill total.
            #[test]
            fn payment_accumulates_and_flips_at_total(
                lines in arb_lines(),
                discount in 0u8..=100,
                first_fraction in 1u32..100,
            ) {
                let mut bill = issue(lines, discount);
                let total = bill.totals.total.cents();
                prop_assume!(total > 0);

                let first = (total * i64::from(first_fraction) / 100).max(1);
                let prior = bill.paid_amount.cents();
                bill.record_payment(
                    Money::from_cents(first).unwrap(),
                    PaymentMethod::Cash,
                    Utc::now(),
                )
                .unwrap();

                prop_assert_eq!(bill.paid_amount.cents(), prior + first);
                if bill.paid_amount.cents() >= total {
                    prop_assert_eq!(bill.status, BillStatus::Paid);
                } else {
                    prop_assert_eq!(bill.status, BillStatus::Partial);
                }
            }
        }
    }
}
