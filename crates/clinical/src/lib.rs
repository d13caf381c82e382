//! `clinicore-clinical` — visits, vitals, prescriptions, lab orders.

pub mod lab_order;
pub mod prescription;
pub mod visit;
pub mod vitals;

pub use lab_order::{LabOrder, LabOrderId, LabOrderStatus};
pub use prescription::{Prescription, PrescriptionId, PrescriptionStatus};
pub use visit::{Visit, VisitId};
pub use vitals::{VitalsId, VitalsReading};
