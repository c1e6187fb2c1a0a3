//! Scorer
//!
//! Applies whichever trained model is current to one vector.

use serde::Serialize;

use crate::features::FeatureVector;
use crate::trainer::TrainedModel;

/// Verdict for one ingested vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreResult {
    /// Anomaly-ness, higher = more anomalous. 0.0 during warm-up.
    pub score: f64,
    pub is_anomaly: bool,
    /// Threshold the score was compared against, +inf during warm-up
    pub threshold: f64,
    pub model_ready: bool,
}

impl ScoreResult {
    /// Verdict returned before the first model is published
    pub const fn warmup() -> Self {
        Self {
            score: 0.0,
            is_anomaly: false,
            threshold: f64::INFINITY,
            model_ready: false,
        }
    }
}

/// Score `vector` against `model`, or return the warm-up verdict when there is none.
pub fn score(model: Option<&TrainedModel>, vector: &FeatureVector) -> ScoreResult {
    let Some(model) = model else {
        return ScoreResult::warmup();
    };

    let score = model.anomaly_score(vector);
    let threshold = model.threshold();
    ScoreResult {
        score,
        is_anomaly: score > threshold,
        threshold,
        model_ready: true,
    }
}
