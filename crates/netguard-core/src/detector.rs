//! Detector: the online pipeline
//!
//! Owns the rolling window and the published model. Each ingestion appends to
//! the window, retrains on the configured cadence and scores the new vector
//! against whichever model is current.
//!
//! Ingestion is serialized by one mutex, and training runs while holding it,
//! so snapshots are never taken mid-push and retrains follow ingestion order.
//! Status counters live under their own small lock and are only taken briefly,
//! so status reads stay responsive during a retrain.
//! The published model sits behind a separate read-write lock as an
//! `Arc<TrainedModel>`; readers clone the `Arc` and always see one complete
//! generation.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::DetectorConfig;
use crate::error::{DetectorError, DetectorResult};
use crate::explain::{FeatureDeviation, explain};
use crate::features::FeatureVector;
use crate::scorer::{ScoreResult, score};
use crate::trainer::{self, TrainParams, TrainedModel};
use crate::window::RollingWindow;

/// Lifecycle of a detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorState {
    /// No model published yet
    Cold,
    /// At least one model published; never reverts
    Ready,
}

/// Point-in-time view for status endpoints and logs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectorStatus {
    pub state: DetectorState,
    /// Ingestions so far
    pub seen: u64,
    pub window_len: usize,
    pub capacity: usize,
    /// Generation of the current model, 0 while cold
    pub generation: u64,
    /// `None` while cold
    pub threshold: Option<f64>,
    /// Ingestion count at which the current model was fit
    pub trained_at_seen: Option<u64>,
    pub failed_retrains: u64,
}

/// Score plus the explanation computed from the same model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    #[serde(flatten)]
    pub result: ScoreResult,
    /// Filled whenever a model was available
    pub explanation: Vec<FeatureDeviation>,
    /// Generation that produced the verdict, 0 during warm-up
    pub generation: u64,
}

struct IngestState {
    window: RollingWindow,
}

/// Counters read by [`Detector::status`]. Updated by ingestion but never held
/// across a fit, so status reads do not wait on training.
#[derive(Debug, Clone, Copy, Default)]
struct Progress {
    seen: u64,
    window_len: usize,
    generation: u64,
    trained_at_seen: Option<u64>,
    failed_retrains: u64,
}

pub struct Detector {
    config: DetectorConfig,
    train_params: TrainParams,
    state: Mutex<IngestState>,
    progress: Mutex<Progress>,
    model: RwLock<Option<Arc<TrainedModel>>>,
}

impl Detector {
    /// Build a cold detector, rejecting invalid configurations.
    pub fn new(config: DetectorConfig) -> DetectorResult<Self> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: DetectorConfig) -> Self {
        Self {
            train_params: config.train_params(),
            state: Mutex::new(IngestState {
                window: RollingWindow::new(config.buffer_size),
            }),
            progress: Mutex::new(Progress::default()),
            model: RwLock::new(None),
            config,
        }
    }

    /// Encode a raw sample and ingest it.
    pub fn ingest(&self, sample: &Map<String, Value>) -> DetectorResult<ScoreResult> {
        self.ingest_vector(FeatureVector::from_fields(sample))
    }

    /// Ingest a pre-encoded vector.
    ///
    /// A vector with a NaN or infinite feature is rejected with
    /// [`DetectorError::NonFiniteInput`] and neither stored nor counted.
    /// Returns [`DetectorError::Training`] when a due retrain fails; the vector
    /// stays in the window and the previous model stays published.
    pub fn ingest_vector(&self, vector: FeatureVector) -> DetectorResult<ScoreResult> {
        let model = self.advance(checked(vector)?)?;
        Ok(score(model.as_deref(), &vector))
    }

    /// Ingest a raw sample and explain the verdict with the model that scored it.
    pub fn detect(&self, sample: &Map<String, Value>, top_k: usize) -> DetectorResult<Detection> {
        let vector = checked(FeatureVector::from_fields(sample))?;
        let model = self.advance(vector)?;
        let model = model.as_deref();

        Ok(Detection {
            result: score(model, &vector),
            explanation: explain(model.map(TrainedModel::standardizer), &vector, top_k),
            generation: model.map_or(0, TrainedModel::generation),
        })
    }

    /// Rank the features of `vector` by deviation under the current model.
    pub fn explain(&self, vector: &FeatureVector, top_k: usize) -> Vec<FeatureDeviation> {
        let model = self.current_model();
        explain(model.as_deref().map(TrainedModel::standardizer), vector, top_k)
    }

    /// Currently published model, if any
    pub fn current_model(&self) -> Option<Arc<TrainedModel>> {
        self.model.read().clone()
    }

    /// Does not wait for an in-flight retrain.
    pub fn status(&self) -> DetectorStatus {
        let progress = self.progress.lock();
        let model = self.current_model();

        DetectorStatus {
            state: if model.is_some() {
                DetectorState::Ready
            } else {
                DetectorState::Cold
            },
            seen: progress.seen,
            window_len: progress.window_len,
            capacity: self.config.buffer_size,
            generation: progress.generation,
            threshold: model.as_ref().map(|m| m.threshold()),
            trained_at_seen: progress.trained_at_seen,
            failed_retrains: progress.failed_retrains,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Push, retrain when due, and hand back the model to score with.
    ///
    /// Lock order: ingest state, then progress, then the model slot.
    fn advance(&self, vector: FeatureVector) -> DetectorResult<Option<Arc<TrainedModel>>> {
        let mut state = self.state.lock();
        state.window.push(vector);

        let (seen, generation) = {
            let mut progress = self.progress.lock();
            progress.seen += 1;
            progress.window_len = state.window.len();
            (progress.seen, progress.generation + 1)
        };

        let cold = self.model.read().is_none();
        let due = state.window.len() >= self.config.min_train && (cold || seen % self.config.retrain_every == 0);

        if due {
            let started = Instant::now();
            let fitted = trainer::fit(&state.window.snapshot(), &self.train_params, generation);

            let mut progress = self.progress.lock();
            match fitted {
                Ok(model) => {
                    info!(
                        generation,
                        seen,
                        rows = model.trained_rows(),
                        threshold = model.threshold(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Published model"
                    );
                    if cold {
                        debug!(seen, "Detector ready");
                    }
                    progress.generation = generation;
                    progress.trained_at_seen = Some(seen);
                    *self.model.write() = Some(Arc::new(model));
                }
                Err(source) => {
                    progress.failed_retrains += 1;
                    warn!(
                        seen,
                        failed_retrains = progress.failed_retrains,
                        error = %source,
                        "Retrain failed, keeping previous model"
                    );
                    return Err(DetectorError::Training { seen, source });
                }
            }
        }

        Ok(self.current_model())
    }
}

fn checked(vector: FeatureVector) -> DetectorResult<FeatureVector> {
    match vector.non_finite_feature() {
        Some(feature) => Err(DetectorError::NonFiniteInput { feature }),
        None => Ok(vector),
    }
}

impl Default for Detector {
    fn default() -> Self {
        Self::with_valid_config(DetectorConfig::default())
    }
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("config", &self.config)
            .field("status", &self.status())
            .finish()
    }
}
