//! `clinicore-billing` — bills, line items, totals, and payments.

pub mod bill;

pub use bill::{
    Bill, BillId, BillLine, BillStatus, BillTotals, ItemType, Payment, PaymentMethod,
    TAX_RATE_PERCENT,
};
