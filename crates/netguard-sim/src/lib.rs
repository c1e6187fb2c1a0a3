//! NetGuard synthetic metric agent
//!
//! Produces per-interval interface rates from a seeded traffic profile with
//! periodic spikes, and either prints them, posts them to a gateway, or
//! replays them through an in-process detector.

pub mod client;
pub mod error;
pub mod profile;
pub mod replay;

pub use client::{GatewayClient, IngestReply};
pub use error::{SimError, SimResult};
pub use profile::{Rates, Sample, SpikeSchedule, TrafficGenerator, TrafficProfile};
pub use replay::{ReplayReport, replay};
