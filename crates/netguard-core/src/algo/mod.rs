pub mod isolation_forest;
pub mod matrix;
pub mod quantile;
pub mod standardizer;

// Re-exports for convenience
pub use isolation_forest::{ForestParams, IsolationForest, average_path_length};
pub use matrix::FeatureMatrix;
pub use quantile::{quantile, quantile_sorted};
pub use standardizer::Standardizer;
