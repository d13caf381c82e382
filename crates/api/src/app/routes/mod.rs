use axum::{Router, routing::get};

pub mod analytics;
pub mod appointments;
pub mod batches;
pub mod billing;
pub mod enrollments;
pub mod lab_orders;
pub mod medicines;
pub mod patients;
pub mod prescriptions;
pub mod programs;
pub mod system;
pub mod visits;
pub mod vitals;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/patients", patients::router())
        .nest("/programs", programs::router())
        .nest("/enrollments", enrollments::router())
        .nest("/appointments", appointments::router())
        .nest("/medical-visits", visits::router())
        .nest("/vitals", vitals::router())
        .nest("/prescriptions", prescriptions::router())
        .nest("/lab-orders", lab_orders::router())
        .nest("/medicines", medicines::router())
        .nest("/medicine-batches", batches::router())
        .nest("/billing", billing::router())
        .nest("/analytics", analytics::router())
}
