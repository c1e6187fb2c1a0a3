//! Feature Encoding
//!
//! Turns a loosely-typed metric sample into the fixed-order feature vector
//! shared by the window, the trainer, the scorer and the explainer.
//!
//! The encoder is deliberately tolerant: agents evolve, and a sample missing a
//! field (or carrying garbage in it) is encoded with 0.0 in that slot instead
//! of being rejected.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Number of features in a [`FeatureVector`]
pub const FEATURE_COUNT: usize = 8;

/// Feature names, in vector order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "bps_in", "bps_out", "pps_in", "pps_out", "err_in", "err_out", "drop_in", "drop_out",
];

/// Interface rates for one sampling interval, in [`FEATURE_NAMES`] order
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector([f32; FEATURE_COUNT]);

impl FeatureVector {
    pub const fn new(values: [f32; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub const fn zeros() -> Self {
        Self([0.0; FEATURE_COUNT])
    }

    /// Encode a sample given as a JSON object.
    ///
    /// Each recognized name is looked up in order. Numbers are taken as-is,
    /// strings are parsed when they hold a finite decimal number, and anything
    /// else (absent, null, bool, array, object, NaN, infinity) becomes 0.0.
    /// Unrecognized keys are ignored.
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        let mut values = [0.0f32; FEATURE_COUNT];
        for (slot, name) in values.iter_mut().zip(FEATURE_NAMES) {
            *slot = fields.get(name).map(coerce).unwrap_or(0.0);
        }
        Self(values)
    }

    /// Encode from (name, value) pairs, e.g. a typed request body.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut values = [0.0f32; FEATURE_COUNT];
        for (name, value) in pairs {
            if let Some(idx) = feature_index(name) {
                values[idx] = narrow(value);
            }
        }
        Self(values)
    }

    pub fn values(&self) -> &[f32; FEATURE_COUNT] {
        &self.0
    }

    /// Value of a named feature, `None` for unknown names
    pub fn get(&self, name: &str) -> Option<f32> {
        feature_index(name).map(|idx| self.0[idx])
    }

    /// Widened copy used for all arithmetic
    pub fn to_f64(&self) -> [f64; FEATURE_COUNT] {
        self.0.map(f64::from)
    }

    pub fn is_finite(&self) -> bool {
        self.non_finite_feature().is_none()
    }

    /// Name of the first NaN or infinite feature
    pub fn non_finite_feature(&self) -> Option<&'static str> {
        self.0.iter().zip(FEATURE_NAMES).find(|(v, _)| !v.is_finite()).map(|(_, name)| name)
    }
}

impl From<[f32; FEATURE_COUNT]> for FeatureVector {
    fn from(values: [f32; FEATURE_COUNT]) -> Self {
        Self(values)
    }
}

/// Position of a feature name in the vector
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_NAMES.iter().position(|n| *n == name)
}

fn coerce(value: &Value) -> f32 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).map(narrow).unwrap_or(0.0)
}

/// f64 -> f32 without producing infinities
fn narrow(value: f64) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    value.clamp(f32::MIN as f64, f32::MAX as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    #[test]
    fn test_encodes_in_fixed_order() {
        let sample = object(json!({
            "drop_out": 8.0, "drop_in": 7.0, "err_out": 6.0, "err_in": 5.0,
            "pps_out": 4.0, "pps_in": 3.0, "bps_out": 2.0, "bps_in": 1.0,
        }));

        let v = FeatureVector::from_fields(&sample);
        assert_eq!(v.values(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_missing_and_garbage_fields_default_to_zero() {
        let sample = object(json!({
            "bps_in": "1500.5",
            "bps_out": "fast",
            "pps_in": null,
            "pps_out": true,
            "err_in": [1, 2],
            "host": "edge-1",
        }));

        let v = FeatureVector::from_fields(&sample);
        assert_eq!(v.get("bps_in"), Some(1500.5));
        assert_eq!(v.get("bps_out"), Some(0.0));
        assert_eq!(v.get("pps_in"), Some(0.0));
        assert_eq!(v.get("pps_out"), Some(0.0));
        assert_eq!(v.get("err_in"), Some(0.0));
        assert_eq!(v.get("drop_out"), Some(0.0));
        assert_eq!(v.get("host"), None);
    }

    #[test]
    fn test_out_of_range_values_saturate() {
        let sample = object(json!({ "bps_in": 1e300, "bps_out": -1e300 }));
        let v = FeatureVector::from_fields(&sample);
        assert_eq!(v.get("bps_in"), Some(f32::MAX));
        assert_eq!(v.get("bps_out"), Some(f32::MIN));
        assert!(v.is_finite());
    }

    #[test]
    fn test_non_finite_feature_names_first_offender() {
        let v = FeatureVector::new([1.0, 2.0, f32::INFINITY, 0.0, f32::NAN, 0.0, 0.0, 0.0]);
        assert_eq!(v.non_finite_feature(), Some("pps_in"));
        assert!(!v.is_finite());
        assert_eq!(FeatureVector::new([0.0; FEATURE_COUNT]).non_finite_feature(), None);
    }

    #[test]
    fn test_from_pairs_ignores_unknown_names() {
        let v = FeatureVector::from_pairs([("pps_in", 12.0), ("latency", 3.0), ("drop_in", f64::NAN)]);
        assert_eq!(v.get("pps_in"), Some(12.0));
        assert_eq!(v.get("drop_in"), Some(0.0));
        assert_eq!(v.to_f64().iter().sum::<f64>(), 12.0);
    }
}
