//! Prometheus metrics
//!
//! All collectors live in the default registry and are registered on first
//! use; [`init`] forces registration so `/metrics` lists them from the start.

use once_cell::sync::Lazy;
use prometheus::{Counter, Encoder, Gauge, Histogram, TextEncoder};

use crate::error::{GatewayError, GatewayResult};

pub static INGEST_TOTAL: Lazy<Counter> = Lazy::new(|| {
    let c = Counter::new("netguard_ingest_total", "Total metric samples ingested").unwrap();
    prometheus::register(Box::new(c.clone())).unwrap();
    c
});

pub static ANOMALY_TOTAL: Lazy<Counter> = Lazy::new(|| {
    let c = Counter::new("netguard_anomalies_total", "Samples scored above threshold").unwrap();
    prometheus::register(Box::new(c.clone())).unwrap();
    c
});

pub static ALERT_TOTAL: Lazy<Counter> = Lazy::new(|| {
    let c = Counter::new("netguard_alerts_total", "Alerts raised").unwrap();
    prometheus::register(Box::new(c.clone())).unwrap();
    c
});

pub static TRAINING_FAILURES: Lazy<Counter> = Lazy::new(|| {
    let c = Counter::new("netguard_training_failures_total", "Retrains that were rejected").unwrap();
    prometheus::register(Box::new(c.clone())).unwrap();
    c
});

pub static JOURNAL_DROPPED: Lazy<Counter> = Lazy::new(|| {
    let c = Counter::new(
        "netguard_journal_dropped_total",
        "Alert lines dropped because the journal queue was full",
    )
    .unwrap();
    prometheus::register(Box::new(c.clone())).unwrap();
    c
});

pub static INGEST_LATENCY: Lazy<Histogram> = Lazy::new(|| {
    let h = Histogram::with_opts(prometheus::HistogramOpts::new(
        "netguard_ingest_duration_seconds",
        "Histogram of ingest handling latency",
    ))
    .unwrap();
    prometheus::register(Box::new(h.clone())).unwrap();
    h
});

pub static MODEL_GENERATION: Lazy<Gauge> = Lazy::new(|| {
    let g = Gauge::new("netguard_model_generation", "Generation of the published model").unwrap();
    prometheus::register(Box::new(g.clone())).unwrap();
    g
});

pub static WINDOW_OCCUPANCY: Lazy<Gauge> = Lazy::new(|| {
    let g = Gauge::new("netguard_window_occupancy", "Vectors held in the rolling window").unwrap();
    prometheus::register(Box::new(g.clone())).unwrap();
    g
});

pub fn init() {
    let _ = &*INGEST_TOTAL;
    let _ = &*ANOMALY_TOTAL;
    let _ = &*ALERT_TOTAL;
    let _ = &*TRAINING_FAILURES;
    let _ = &*JOURNAL_DROPPED;
    let _ = &*INGEST_LATENCY;
    let _ = &*MODEL_GENERATION;
    let _ = &*WINDOW_OCCUPANCY;
}

/// Text exposition of the default registry
pub fn render() -> GatewayResult<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| GatewayError::Internal(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| GatewayError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lists_collectors() {
        init();
        INGEST_TOTAL.inc();
        let text = render().unwrap();
        assert!(text.contains("netguard_ingest_total"));
        assert!(text.contains("netguard_model_generation"));
    }
}
