//! `clinicore-records` — patient registry, care programs, enrollments.

pub mod enrollment;
pub mod patient;
pub mod program;

pub use enrollment::{Enrollment, EnrollmentId};
pub use patient::{Demographics, Patient, PatientId, Sex};
pub use program::{Program, ProgramId};
