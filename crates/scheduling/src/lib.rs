//! `clinicore-scheduling` — appointments and their status lifecycle.

pub mod appointment;

pub use appointment::{Appointment, AppointmentId, AppointmentStatus};
