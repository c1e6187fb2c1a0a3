//! Model Trainer
//!
//! Fits the standardizer, the forest and the threshold from one window
//! snapshot and bundles them into an immutable [`TrainedModel`].

use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::algo::{FeatureMatrix, ForestParams, IsolationForest, Standardizer, quantile};
use crate::error::TrainError;
use crate::features::{FEATURE_COUNT, FEATURE_NAMES, FeatureVector};

/// Training inputs that are not part of the snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainParams {
    pub forest: ForestParams,
    /// Quantile of training anomaly scores used as threshold
    pub threshold_q: f64,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            forest: ForestParams::default(),
            threshold_q: 0.99,
        }
    }
}

/// One training generation: standardizer, forest and threshold fit together.
///
/// Never mutated after [`fit`] returns; the detector swaps whole models.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    standardizer: Standardizer,
    forest: IsolationForest,
    threshold: f64,
    generation: u64,
    trained_rows: usize,
}

impl TrainedModel {
    /// Anomaly-ness of an already standardized row
    pub fn anomaly_score_standardized(&self, row: &[f64]) -> f64 {
        self.forest.anomaly_score(row)
    }

    /// Anomaly-ness of a raw feature vector
    pub fn anomaly_score(&self, vector: &FeatureVector) -> f64 {
        let z = self.standardizer.transform_row(&vector.to_f64());
        self.forest.anomaly_score(&z)
    }

    pub fn standardizer(&self) -> &Standardizer {
        &self.standardizer
    }

    pub fn forest(&self) -> &IsolationForest {
        &self.forest
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn trained_rows(&self) -> usize {
        self.trained_rows
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            generation: self.generation,
            trained_rows: self.trained_rows,
            threshold: self.threshold,
            offset: self.forest.offset(),
            n_trees: self.forest.n_trees(),
            sample_size: self.forest.sample_size(),
            mean: self.standardizer.mean().to_vec(),
            scale: self.standardizer.scale().to_vec(),
        }
    }
}

/// Serializable view of a published model
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub generation: u64,
    pub trained_rows: usize,
    pub threshold: f64,
    pub offset: f64,
    pub n_trees: usize,
    pub sample_size: usize,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// Fit a model from a window snapshot.
///
/// The snapshot must be non-empty, have one column per feature and contain
/// only finite values; anything else is rejected before any fitting starts.
pub fn fit(snapshot: &FeatureMatrix, params: &TrainParams, generation: u64) -> Result<TrainedModel, TrainError> {
    if snapshot.is_empty() {
        return Err(TrainError::EmptySnapshot);
    }
    if snapshot.n_cols() != FEATURE_COUNT {
        return Err(TrainError::ColumnMismatch {
            found: snapshot.n_cols(),
            expected: FEATURE_COUNT,
        });
    }
    if let Some((row, col)) = snapshot.find_non_finite() {
        return Err(TrainError::NonFiniteValue {
            row,
            feature: FEATURE_NAMES[col],
        });
    }

    let started = Instant::now();

    let standardizer = Standardizer::fit(snapshot);
    let standardized = standardizer.transform(snapshot);
    let forest = IsolationForest::fit(&standardized, &params.forest)?;

    let train_scores: Vec<f64> = standardized.rows().map(|row| forest.anomaly_score(row)).collect();
    let threshold = quantile(&train_scores, params.threshold_q).ok_or(TrainError::EmptySnapshot)?;

    debug!(
        generation,
        rows = snapshot.n_rows(),
        threshold,
        offset = forest.offset(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Model fit complete"
    );

    Ok(TrainedModel {
        standardizer,
        forest,
        threshold,
        generation,
        trained_rows: snapshot.n_rows(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> TrainParams {
        TrainParams {
            forest: ForestParams {
                n_estimators: 50,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn noisy_snapshot(n: usize) -> FeatureMatrix {
        let rows: Vec<[f64; FEATURE_COUNT]> = (0..n)
            .map(|i| {
                let t = i as f64;
                [
                    1000.0 + (t * 0.7).sin() * 50.0,
                    800.0 + (t * 1.3).cos() * 40.0,
                    90.0 + (t * 0.4).sin() * 5.0,
                    70.0 + (t * 0.9).cos() * 4.0,
                    (i % 7) as f64 * 0.1,
                    0.0,
                    (i % 11) as f64 * 0.05,
                    0.0,
                ]
            })
            .collect();
        FeatureMatrix::from_rows(&rows)
    }

    #[test]
    fn test_threshold_is_training_quantile() {
        let snapshot = noisy_snapshot(200);
        let p = TrainParams { threshold_q: 1.0, ..params() };
        let model = fit(&snapshot, &p, 1).unwrap();

        let max = snapshot
            .rows()
            .map(|row| model.anomaly_score_standardized(&model.standardizer().transform_row(row)))
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(model.threshold().to_bits(), max.to_bits());
        assert_eq!(model.trained_rows(), 200);
        assert_eq!(model.generation(), 1);
    }

    #[test]
    fn test_zero_variance_columns_use_unit_scale() {
        let model = fit(&noisy_snapshot(150), &params(), 1).unwrap();
        assert_eq!(model.standardizer().scale()[5], 1.0);
        assert_eq!(model.standardizer().scale()[7], 1.0);
        assert!(model.standardizer().scale().iter().all(|s| *s > 0.0));
    }

    #[test]
    fn test_spike_scores_above_threshold() {
        let model = fit(&noisy_snapshot(200), &params(), 1).unwrap();
        let spike = FeatureVector::new([5.0e6, 800.0, 90.0, 70.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(model.anomaly_score(&spike) > model.threshold());
    }

    #[test]
    fn test_rejects_degenerate_snapshots() {
        assert_eq!(
            fit(&FeatureMatrix::with_capacity(FEATURE_COUNT, 0), &params(), 1).unwrap_err(),
            TrainError::EmptySnapshot
        );

        let narrow = FeatureMatrix::from_rows(&[[1.0, 2.0]]);
        assert!(matches!(
            fit(&narrow, &params(), 1),
            Err(TrainError::ColumnMismatch { found: 2, .. })
        ));

        let mut rows = vec![[1.0; FEATURE_COUNT]; 10];
        rows[4][2] = f64::INFINITY;
        let err = fit(&FeatureMatrix::from_rows(&rows), &params(), 1).unwrap_err();
        assert_eq!(err, TrainError::NonFiniteValue { row: 4, feature: "pps_in" });
    }

    #[test]
    fn test_summary_reflects_model() {
        let model = fit(&noisy_snapshot(130), &params(), 7).unwrap();
        let summary = model.summary();
        assert_eq!(summary.generation, 7);
        assert_eq!(summary.n_trees, 50);
        assert_eq!(summary.sample_size, 130);
        assert_eq!(summary.mean.len(), FEATURE_COUNT);
    }
}
