//! Traffic profile and sample generator
//!
//! Byte rates are log-normal around a median, packet rates follow from a
//! log-normal packet size, and error/drop counts per interval are Poisson.
//! Every `spike_every`-th tick (never tick 0) byte and packet rates are
//! multiplied by `spike_multiplier`.

use chrono::{DateTime, Duration, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, LogNormal, Poisson};
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Baseline behaviour of one interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficProfile {
    /// Median inbound bytes per second
    pub bps_in_median: f64,
    /// Median outbound bytes per second
    pub bps_out_median: f64,
    /// Log-space standard deviation of byte rates
    pub rate_sigma: f64,
    /// Median packet size in bytes
    pub packet_size: f64,
    /// Mean errors per second, per direction
    pub error_rate: f64,
    /// Mean drops per second, per direction
    pub drop_rate: f64,
}

impl Default for TrafficProfile {
    fn default() -> Self {
        Self {
            bps_in_median: 250_000.0,
            bps_out_median: 80_000.0,
            rate_sigma: 0.2,
            packet_size: 900.0,
            error_rate: 0.01,
            drop_rate: 0.02,
        }
    }
}

/// Which ticks carry an injected spike
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpikeSchedule {
    /// 0 disables spikes
    pub every: u64,
    pub multiplier: f64,
}

impl Default for SpikeSchedule {
    fn default() -> Self {
        Self {
            every: 25,
            multiplier: 50.0,
        }
    }
}

impl SpikeSchedule {
    pub fn disabled() -> Self {
        Self {
            every: 0,
            multiplier: 1.0,
        }
    }

    pub fn is_spike(&self, tick: u64) -> bool {
        self.every > 0 && tick > 0 && tick % self.every == 0
    }
}

/// Per-second rates for one interval, field names as the gateway expects them
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rates {
    pub bps_in: f64,
    pub bps_out: f64,
    pub pps_in: f64,
    pub pps_out: f64,
    pub err_in: f64,
    pub err_out: f64,
    pub drop_in: f64,
    pub drop_out: f64,
}

impl Rates {
    /// (name, value) pairs for the feature encoder
    pub fn pairs(&self) -> [(&'static str, f64); 8] {
        [
            ("bps_in", self.bps_in),
            ("bps_out", self.bps_out),
            ("pps_in", self.pps_in),
            ("pps_out", self.pps_out),
            ("err_in", self.err_in),
            ("err_out", self.err_out),
            ("drop_in", self.drop_in),
            ("drop_out", self.drop_out),
        ]
    }
}

/// One generated sample, serialized as a gateway ingest body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub host: String,
    pub iface: String,
    pub ts: DateTime<Utc>,
    pub interval_s: f64,
    #[serde(flatten)]
    pub rates: Rates,
    /// Not sent to the gateway
    #[serde(skip)]
    pub tick: u64,
    #[serde(skip)]
    pub spiked: bool,
}

struct Distributions {
    bps_in: LogNormal<f64>,
    bps_out: LogNormal<f64>,
    packet_size: LogNormal<f64>,
    errors: Option<Poisson<f64>>,
    drops: Option<Poisson<f64>>,
}

/// Seeded, deterministic sample stream for one (host, iface)
pub struct TrafficGenerator {
    host: String,
    iface: String,
    interval_s: f64,
    spikes: SpikeSchedule,
    dist: Distributions,
    rng: StdRng,
    tick: u64,
    start: DateTime<Utc>,
}

impl TrafficGenerator {
    pub fn new(
        profile: &TrafficProfile,
        spikes: SpikeSchedule,
        interval_s: f64,
        seed: u64,
    ) -> SimResult<Self> {
        if !(interval_s > 0.0) {
            return Err(SimError::InvalidProfile(format!("interval_s must be positive, got {interval_s}")));
        }
        if !(spikes.multiplier > 0.0) {
            return Err(SimError::InvalidProfile(format!(
                "spike multiplier must be positive, got {}",
                spikes.multiplier
            )));
        }

        let log_normal = |median: f64, sigma: f64, name: &str| {
            if !(median > 0.0) {
                return Err(SimError::InvalidProfile(format!("{name} must be positive, got {median}")));
            }
            LogNormal::new(median.ln(), sigma).map_err(|e| SimError::InvalidProfile(format!("{name}: {e}")))
        };
        let poisson = |rate: f64, name: &str| -> SimResult<Option<Poisson<f64>>> {
            let lambda = rate * interval_s;
            if lambda == 0.0 {
                return Ok(None);
            }
            Poisson::new(lambda)
                .map(Some)
                .map_err(|e| SimError::InvalidProfile(format!("{name}: {e}")))
        };

        Ok(Self {
            host: "sim-host".to_string(),
            iface: "eth0".to_string(),
            interval_s,
            spikes,
            dist: Distributions {
                bps_in: log_normal(profile.bps_in_median, profile.rate_sigma, "bps_in_median")?,
                bps_out: log_normal(profile.bps_out_median, profile.rate_sigma, "bps_out_median")?,
                packet_size: log_normal(profile.packet_size, 0.1, "packet_size")?,
                errors: poisson(profile.error_rate, "error_rate")?,
                drops: poisson(profile.drop_rate, "drop_rate")?,
            },
            rng: StdRng::seed_from_u64(seed),
            tick: 0,
            start: Utc::now(),
        })
    }

    pub fn with_labels(mut self, host: impl Into<String>, iface: impl Into<String>) -> Self {
        self.host = host.into();
        self.iface = iface.into();
        self
    }

    /// Timestamp of tick 0; later ticks are spaced by the interval
    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = start;
        self
    }

    pub fn next_sample(&mut self) -> Sample {
        let tick = self.tick;
        self.tick += 1;

        let mut bps_in = self.dist.bps_in.sample(&mut self.rng);
        let mut bps_out = self.dist.bps_out.sample(&mut self.rng);
        let mut pps_in = bps_in / self.dist.packet_size.sample(&mut self.rng);
        let mut pps_out = bps_out / self.dist.packet_size.sample(&mut self.rng);

        let per_second = |count: f64| count / self.interval_s;
        let mut count = |d: &Option<Poisson<f64>>| d.as_ref().map_or(0.0, |p| p.sample(&mut self.rng));
        let err_in = per_second(count(&self.dist.errors));
        let err_out = per_second(count(&self.dist.errors));
        let drop_in = per_second(count(&self.dist.drops));
        let drop_out = per_second(count(&self.dist.drops));

        let spiked = self.spikes.is_spike(tick);
        if spiked {
            let m = self.spikes.multiplier;
            bps_in *= m;
            bps_out *= m;
            pps_in *= m;
            pps_out *= m;
        }

        let offset_ms = (tick as f64 * self.interval_s * 1000.0) as i64;
        Sample {
            host: self.host.clone(),
            iface: self.iface.clone(),
            ts: self.start + Duration::milliseconds(offset_ms),
            interval_s: self.interval_s,
            rates: Rates {
                bps_in,
                bps_out,
                pps_in,
                pps_out,
                err_in,
                err_out,
                drop_in,
                drop_out,
            },
            tick,
            spiked,
        }
    }
}

impl Iterator for TrafficGenerator {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        Some(self.next_sample())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(seed: u64) -> TrafficGenerator {
        TrafficGenerator::new(&TrafficProfile::default(), SpikeSchedule::default(), 5.0, seed).unwrap()
    }

    #[test]
    fn test_spike_schedule() {
        let s = SpikeSchedule::default();
        assert!(!s.is_spike(0));
        assert!(!s.is_spike(24));
        assert!(s.is_spike(25));
        assert!(s.is_spike(50));
        assert!(!SpikeSchedule::disabled().is_spike(25));
    }

    #[test]
    fn test_same_seed_same_stream() {
        let a: Vec<Rates> = generator(9).take(50).map(|s| s.rates).collect();
        let b: Vec<Rates> = generator(9).take(50).map(|s| s.rates).collect();
        assert_eq!(a, b);
        let c: Vec<Rates> = generator(10).take(50).map(|s| s.rates).collect();
        assert_ne!(a, c);
    }

    #[test]
    fn test_rates_are_non_negative_and_spiked_on_schedule() {
        for sample in generator(1).take(200) {
            for (name, value) in sample.rates.pairs() {
                assert!(value.is_finite() && value >= 0.0, "{name} = {value}");
            }
            assert_eq!(sample.spiked, sample.tick > 0 && sample.tick % 25 == 0);
            if sample.spiked {
                assert!(sample.rates.bps_in > 1_000_000.0);
            }
        }
    }

    #[test]
    fn test_serializes_as_ingest_body() {
        let start = "2026-10-18T00:00:00Z".parse().unwrap();
        let sample = generator(3).with_labels("edge-9", "wan0").with_start(start).nth(2).unwrap();
        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["host"], "edge-9");
        assert_eq!(json["iface"], "wan0");
        assert_eq!(json["ts"], "2026-10-18T00:00:10Z");
        assert!(json["bps_in"].is_number());
        assert!(json.get("tick").is_none());
    }

    #[test]
    fn test_rejects_bad_profile() {
        let profile = TrafficProfile {
            bps_in_median: 0.0,
            ..Default::default()
        };
        assert!(TrafficGenerator::new(&profile, SpikeSchedule::default(), 5.0, 1).is_err());
        assert!(TrafficGenerator::new(&TrafficProfile::default(), SpikeSchedule::default(), 0.0, 1).is_err());
    }
}
