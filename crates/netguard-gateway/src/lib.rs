//! NetGuard Gateway
//!
//! Axum server around one shared [`netguard_core::Detector`]: agents POST
//! interface samples, the gateway scores them, keeps recent records in memory,
//! raises alerts and optionally journals them to disk.

pub mod api;
pub mod error;
pub mod journal;
pub mod store;
pub mod telemetry;

pub use api::{AppState, router};
pub use error::{GatewayError, GatewayResult};
pub use journal::{AlertJournal, JournalError, JournalWorker};
pub use store::{AlertRecord, MetricRecord, Store};
