//! Offline replay: feed a generated stream through an in-process detector
//! and measure how well injected spikes are caught.

use netguard_core::{Detector, FeatureVector};
use serde::Serialize;
use tracing::{debug, warn};

use crate::profile::TrafficGenerator;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    pub samples: u64,
    /// Samples answered with the warm-up verdict
    pub warmup_ticks: u64,
    /// Ticks flagged as anomalous
    pub flagged: Vec<u64>,
    /// Spiked ticks scored by a ready model
    pub spikes_scored: u64,
    pub true_positives: u64,
    pub false_positives: u64,
    pub training_failures: u64,
}

impl ReplayReport {
    /// Share of scored spikes that were flagged
    pub fn recall(&self) -> Option<f64> {
        (self.spikes_scored > 0).then(|| self.true_positives as f64 / self.spikes_scored as f64)
    }

    /// Share of flagged ticks that were spikes
    pub fn precision(&self) -> Option<f64> {
        let flagged = self.true_positives + self.false_positives;
        (flagged > 0).then(|| self.true_positives as f64 / flagged as f64)
    }
}

pub fn replay(detector: &Detector, generator: &mut TrafficGenerator, samples: u64) -> ReplayReport {
    let mut report = ReplayReport {
        samples,
        warmup_ticks: 0,
        flagged: Vec::new(),
        spikes_scored: 0,
        true_positives: 0,
        false_positives: 0,
        training_failures: 0,
    };

    for sample in generator.take(samples as usize) {
        let vector = FeatureVector::from_pairs(sample.rates.pairs());
        let result = match detector.ingest_vector(vector) {
            Ok(result) => result,
            Err(e) => {
                warn!(tick = sample.tick, error = %e, "Retrain failed during replay");
                report.training_failures += 1;
                continue;
            }
        };

        if !result.model_ready {
            report.warmup_ticks += 1;
            continue;
        }

        if sample.spiked {
            report.spikes_scored += 1;
        }
        if result.is_anomaly {
            debug!(tick = sample.tick, score = result.score, threshold = result.threshold, "Flagged");
            report.flagged.push(sample.tick);
            if sample.spiked {
                report.true_positives += 1;
            } else {
                report.false_positives += 1;
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratios() {
        let report = ReplayReport {
            samples: 10,
            warmup_ticks: 2,
            flagged: vec![3, 5, 7],
            spikes_scored: 4,
            true_positives: 2,
            false_positives: 1,
            training_failures: 0,
        };
        assert_eq!(report.recall(), Some(0.5));
        assert!((report.precision().unwrap() - 2.0 / 3.0).abs() < 1e-12);

        let empty = ReplayReport {
            spikes_scored: 0,
            true_positives: 0,
            false_positives: 0,
            ..report
        };
        assert_eq!(empty.recall(), None);
        assert_eq!(empty.precision(), None);
    }
}
