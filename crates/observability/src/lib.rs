//! `clinicore-observability` — process-wide tracing setup.

pub mod tracing_init;

pub use tracing_init::init;
