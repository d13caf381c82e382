//! `clinicore-pharmacy` — medicine catalog, batches, and stock rules.

pub mod batch;
pub mod medicine;

pub use batch::{BatchId, MedicineBatch};
pub use medicine::{Medicine, MedicineId};
