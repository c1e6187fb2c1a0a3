//! Explainer: ranks features by standardized deviation from the training mean.

use std::fmt;

use serde::Serialize;

use crate::algo::Standardizer;
use crate::features::{FEATURE_NAMES, FeatureVector};

/// Default number of features reported per explanation
pub const DEFAULT_TOP_K: usize = 2;

/// One feature's contribution to an explanation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureDeviation {
    pub feature: &'static str,
    /// `|x - mean| / scale`
    pub deviation: f64,
}

impl fmt::Display for FeatureDeviation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (z={:.2})", self.feature, self.deviation)
    }
}

/// Top `top_k` features of `vector` by deviation, largest first.
///
/// Ties keep feature order. Empty without a standardizer.
pub fn explain(standardizer: Option<&Standardizer>, vector: &FeatureVector, top_k: usize) -> Vec<FeatureDeviation> {
    let Some(standardizer) = standardizer else {
        return Vec::new();
    };

    let mut ranked: Vec<FeatureDeviation> = standardizer
        .abs_deviation(&vector.to_f64())
        .into_iter()
        .zip(FEATURE_NAMES)
        .map(|(deviation, feature)| FeatureDeviation { feature, deviation })
        .collect();

    // sort_by is stable
    ranked.sort_by(|a, b| b.deviation.total_cmp(&a.deviation));
    ranked.truncate(top_k);
    ranked
}

/// Alert reason text, e.g. `anomaly: bps_in (z=12.34), pps_in (z=3.10)`
pub fn render_reason(explanation: &[FeatureDeviation]) -> String {
    if explanation.is_empty() {
        return "anomaly: high anomaly score".to_string();
    }
    let parts: Vec<String> = explanation.iter().map(ToString::to_string).collect();
    format!("anomaly: {}", parts.join(", "))
}
