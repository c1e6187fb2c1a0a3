//! HTTP surface
//!
//! - `POST /ingest`       score one sample, store it, raise an alert if anomalous
//! - `GET  /api/metrics`  newest stored samples
//! - `GET  /api/alerts`   newest alerts
//! - `GET  /api/status`   detector and store state
//! - `GET  /metrics`      Prometheus exposition
//! - `GET  /health`       liveness

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{FromRequest, Query, Request, State},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use netguard_core::{
    DEFAULT_TOP_K, Detection, Detector, DetectorError, DetectorStatus, FeatureVector, ModelSummary, render_reason,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::journal::AlertJournal;
use crate::store::{AlertRecord, MetricRecord, Store};
use crate::telemetry::{
    ALERT_TOTAL, ANOMALY_TOTAL, INGEST_LATENCY, INGEST_TOTAL, MODEL_GENERATION, TRAINING_FAILURES,
    WINDOW_OCCUPANCY,
};

pub const MAX_LABEL_LEN: usize = 128;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<Detector>,
    pub store: Arc<Store>,
    pub journal: Option<AlertJournal>,
    /// Features listed per explanation
    pub top_k: usize,
}

impl AppState {
    pub fn new(detector: Detector, store: Store) -> Self {
        Self {
            detector: Arc::new(detector),
            store: Arc::new(store),
            journal: None,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_journal(mut self, journal: AlertJournal) -> Self {
        self.journal = Some(journal);
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ingest", post(ingest))
        .route("/api/metrics", get(list_metrics))
        .route("/api/alerts", get(list_alerts))
        .route("/api/status", get(status))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

// ============================================================================
// SIMD-JSON EXTRACTOR
// ============================================================================

pub struct SimdJson<T>(pub T);

impl<T, S> FromRequest<S> for SimdJson<T>
where
    T: for<'de> Deserialize<'de> + Send,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| e.into_response())?;
        let mut bytes_vec = bytes.to_vec();

        let val = simd_json::from_slice::<T>(&mut bytes_vec)
            .map_err(|e| GatewayError::BadJson(e.to_string()).into_response())?;

        Ok(SimdJson(val))
    }
}

// ============================================================================
// INGEST
// ============================================================================

/// Body of `POST /ingest`; metric fields are collected untyped for the encoder
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub iface: Option<String>,
    /// RFC 3339; receive time when absent
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub interval_s: Option<f64>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Request after validation
#[derive(Debug, Clone)]
struct ValidIngest {
    host: String,
    iface: String,
    ts: DateTime<Utc>,
    interval_s: f64,
    fields: Map<String, Value>,
}

impl IngestRequest {
    fn validate(self) -> GatewayResult<ValidIngest> {
        let host = match self.host {
            Some(host) if !host.is_empty() => host,
            _ => return Err(GatewayError::Validation("host is required".into())),
        };
        if host.chars().count() > MAX_LABEL_LEN {
            return Err(GatewayError::Validation(format!(
                "host exceeds {MAX_LABEL_LEN} characters"
            )));
        }

        let iface = self.iface.unwrap_or_else(|| "unknown".to_string());
        if iface.chars().count() > MAX_LABEL_LEN {
            return Err(GatewayError::Validation(format!(
                "iface exceeds {MAX_LABEL_LEN} characters"
            )));
        }

        let ts = match self.ts {
            Some(raw) => DateTime::parse_from_rfc3339(&raw)
                .map_err(|e| GatewayError::Validation(format!("ts is not RFC 3339: {e}")))?
                .with_timezone(&Utc),
            None => Utc::now(),
        };

        Ok(ValidIngest {
            host,
            iface,
            ts,
            interval_s: self.interval_s.unwrap_or(5.0),
            fields: self.fields,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    pub ok: bool,
    pub id: u64,
    pub model_ready: bool,
    pub anomaly_score: f64,
    /// `None` during warm-up
    pub threshold: Option<f64>,
    pub is_anomaly: bool,
    pub explanation: Vec<String>,
}

pub async fn ingest(
    State(state): State<AppState>,
    SimdJson(request): SimdJson<IngestRequest>,
) -> GatewayResult<Json<IngestResponse>> {
    let timer = INGEST_LATENCY.start_timer();
    INGEST_TOTAL.inc();

    let sample = request.validate()?;
    let detection = run_detection(&state, &sample.fields).await?;
    let result = detection.result;
    let vector = FeatureVector::from_fields(&sample.fields);

    debug!(
        host = %sample.host,
        iface = %sample.iface,
        interval_s = sample.interval_s,
        score = result.score,
        "Sample scored"
    );

    let metric = state.store.insert_metric(|id| MetricRecord {
        id,
        host: sample.host.clone(),
        iface: sample.iface.clone(),
        ts: sample.ts,
        bps_in: vector.values()[0],
        bps_out: vector.values()[1],
        pps_in: vector.values()[2],
        pps_out: vector.values()[3],
        score: result.score,
        is_anomaly: result.is_anomaly,
    });

    if result.model_ready && result.is_anomaly {
        ANOMALY_TOTAL.inc();
        raise_alert(&state, &sample, &detection);
    }

    let explanation = detection.explanation.iter().map(ToString::to_string).collect();
    timer.observe_duration();

    Ok(Json(IngestResponse {
        ok: true,
        id: metric.id,
        model_ready: result.model_ready,
        anomaly_score: result.score,
        threshold: result.threshold.is_finite().then_some(result.threshold),
        is_anomaly: result.is_anomaly,
        explanation,
    }))
}

/// Detection is CPU bound and may retrain, so it runs on the blocking pool.
async fn run_detection(state: &AppState, fields: &Map<String, Value>) -> GatewayResult<Detection> {
    let detector = Arc::clone(&state.detector);
    let fields = fields.clone();
    let top_k = state.top_k;

    let outcome = tokio::task::spawn_blocking(move || {
        let detection = detector.detect(&fields, top_k);
        (detection, detector.status())
    })
    .await
    .map_err(|e| GatewayError::Internal(format!("detection task failed: {e}")))?;

    let (detection, status) = outcome;
    MODEL_GENERATION.set(status.generation as f64);
    WINDOW_OCCUPANCY.set(status.window_len as f64);

    detection.map_err(|e| {
        if matches!(e, DetectorError::Training { .. }) {
            TRAINING_FAILURES.inc();
        }
        GatewayError::from(e)
    })
}

fn raise_alert(state: &AppState, sample: &ValidIngest, detection: &Detection) {
    let reason = render_reason(&detection.explanation);
    let alert = state.store.insert_alert(|id| AlertRecord {
        id,
        host: sample.host.clone(),
        iface: sample.iface.clone(),
        ts: sample.ts,
        score: detection.result.score,
        threshold: detection.result.threshold,
        reason,
    });
    ALERT_TOTAL.inc();

    warn!(
        alert_id = alert.id,
        host = %alert.host,
        iface = %alert.iface,
        score = alert.score,
        threshold = alert.threshold,
        generation = detection.generation,
        reason = %alert.reason,
        "ANOMALY"
    );

    if let Some(journal) = &state.journal {
        journal.append(&alert);
    }
}

// ============================================================================
// LISTINGS
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

impl ListParams {
    fn clamped(&self, default: i64, max: i64) -> usize {
        self.limit.unwrap_or(default).clamp(1, max) as usize
    }
}

pub async fn list_metrics(State(state): State<AppState>, Query(params): Query<ListParams>) -> Json<Vec<MetricRecord>> {
    Json(state.store.recent_metrics(params.clamped(50, 500)))
}

pub async fn list_alerts(State(state): State<AppState>, Query(params): Query<ListParams>) -> Json<Vec<AlertRecord>> {
    Json(state.store.recent_alerts(params.clamped(20, 200)))
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub detector: DetectorStatus,
    /// Published model parameters, `None` while cold
    pub model: Option<ModelSummary>,
    pub metrics_stored: usize,
    pub alerts_stored: usize,
    pub journal_enabled: bool,
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        detector: state.detector.status(),
        model: state.detector.current_model().map(|m| m.summary()),
        metrics_stored: state.store.metric_count(),
        alerts_stored: state.store.alert_count(),
        journal_enabled: state.journal.is_some(),
    })
}

pub async fn metrics_handler() -> GatewayResult<String> {
    crate::telemetry::render()
}

pub async fn health_handler() -> &'static str {
    "OK"
}
