//! `clinicore-store` — persistence for the clinic.
//!
//! Two backends behind the same operation surface:
//!
//! - [`MemStore`]: `Mutex<HashMap>`-backed, complete, used for dev and tests.
//! - [`PgStore`]: Postgres via sqlx; document-number sequences are an atomic
//!   per-day counter row, and every multi-step write (bill + counter,
//!   dispense + stock decrement, batch + stock increment) is one
//!   transaction.
//!
//! The API layer dispatches over the two with an enum; neither backend leaks
//! its types through the operation results, which are plain domain values.

pub mod error;
pub mod input;
pub mod mem;
pub mod pg;

pub use error::{Access, OwnedResource, StoreError, StoreResult};
pub use input::{
    AnalyticsSummary, MedicineUpdate, NewAppointment, NewBatch, NewBill, NewEnrollment,
    NewLabOrder, NewMedicine, NewPatient, NewPrescription, NewProgram, NewVisit, NewVitals,
    PatientUpdate, ProgramUpdate,
};
pub use mem::MemStore;
pub use pg::PgStore;
