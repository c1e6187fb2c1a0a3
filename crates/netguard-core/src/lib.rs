//! NetGuard detection core
//!
//! Online anomaly detection over per-interface traffic rates. Samples are
//! encoded into a fixed 8-feature vector, kept in a rolling window, and scored
//! by an isolation forest that is periodically refit from that window.
//!
//! ```text
//! sample -> FeatureVector -> Detector::ingest -> RollingWindow
//!                                   |-> (due) trainer::fit -> Arc<TrainedModel>
//!                                   '-> scorer::score -> ScoreResult
//! ```
//!
//! The core does no I/O; the gateway and simulator crates sit on top of it.

pub mod algo;
pub mod config;
pub mod detector;
pub mod error;
pub mod explain;
pub mod features;
pub mod scorer;
pub mod trainer;
pub mod window;

pub use config::DetectorConfig;
pub use detector::{Detection, Detector, DetectorState, DetectorStatus};
pub use error::{ConfigError, DetectorError, DetectorResult, TrainError};
pub use explain::{DEFAULT_TOP_K, FeatureDeviation, render_reason};
pub use features::{FEATURE_COUNT, FEATURE_NAMES, FeatureVector};
pub use scorer::ScoreResult;
pub use trainer::{ModelSummary, TrainParams, TrainedModel};
pub use window::RollingWindow;
