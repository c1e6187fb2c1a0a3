//! Bounded in-memory record stores
//!
//! Ids start at 1 and keep increasing after old records are evicted.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

pub const DEFAULT_METRIC_CAPACITY: usize = 10_000;
pub const DEFAULT_ALERT_CAPACITY: usize = 2_000;

/// Stored sample, as listed by `/api/metrics`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRecord {
    pub id: u64,
    pub host: String,
    pub iface: String,
    pub ts: DateTime<Utc>,
    pub bps_in: f32,
    pub bps_out: f32,
    pub pps_in: f32,
    pub pps_out: f32,
    pub score: f64,
    pub is_anomaly: bool,
}

/// Raised alert, as listed by `/api/alerts` and written to the journal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRecord {
    pub id: u64,
    pub host: String,
    pub iface: String,
    pub ts: DateTime<Utc>,
    pub score: f64,
    pub threshold: f64,
    pub reason: String,
}

/// FIFO of at most `capacity` records with its own id sequence
#[derive(Debug)]
struct Ring<T> {
    items: VecDeque<T>,
    capacity: usize,
    next_id: u64,
}

impl<T: Clone> Ring<T> {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            next_id: 1,
        }
    }

    fn insert(&mut self, build: impl FnOnce(u64) -> T) -> T {
        let id = self.next_id;
        self.next_id += 1;
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        let record = build(id);
        self.items.push_back(record.clone());
        record
    }

    fn newest(&self, limit: usize) -> Vec<T> {
        self.items.iter().rev().take(limit).cloned().collect()
    }
}

#[derive(Debug)]
pub struct Store {
    metrics: Mutex<Ring<MetricRecord>>,
    alerts: Mutex<Ring<AlertRecord>>,
}

impl Store {
    pub fn new(metric_capacity: usize, alert_capacity: usize) -> Self {
        Self {
            metrics: Mutex::new(Ring::new(metric_capacity)),
            alerts: Mutex::new(Ring::new(alert_capacity)),
        }
    }

    /// Store a metric; `build` receives the assigned id.
    pub fn insert_metric(&self, build: impl FnOnce(u64) -> MetricRecord) -> MetricRecord {
        self.metrics.lock().insert(build)
    }

    pub fn insert_alert(&self, build: impl FnOnce(u64) -> AlertRecord) -> AlertRecord {
        self.alerts.lock().insert(build)
    }

    /// Newest first
    pub fn recent_metrics(&self, limit: usize) -> Vec<MetricRecord> {
        self.metrics.lock().newest(limit)
    }

    /// Newest first
    pub fn recent_alerts(&self, limit: usize) -> Vec<AlertRecord> {
        self.alerts.lock().newest(limit)
    }

    pub fn metric_count(&self) -> usize {
        self.metrics.lock().items.len()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.lock().items.len()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(DEFAULT_METRIC_CAPACITY, DEFAULT_ALERT_CAPACITY)
    }
}
