//! Property-based tests for the encoder, window, quantile and explainer

use netguard_core::algo::{Standardizer, quantile};
use netguard_core::explain::explain;
use netguard_core::{FEATURE_COUNT, FEATURE_NAMES, FeatureVector, RollingWindow};
use proptest::prelude::*;
use serde_json::{Map, Value};

fn field_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<f64>().prop_map(|v| serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)),
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[a-z0-9.]{0,8}".prop_map(Value::from),
        Just(Value::Null),
    ]
}

fn vector() -> impl Strategy<Value = FeatureVector> {
    prop::array::uniform8(-1.0e6f32..1.0e6f32).prop_map(FeatureVector::new)
}

/// Property: encoding never fails and always yields finite values.
#[test]
fn prop_encoder_is_total_and_finite() {
    proptest!(|(
        fields in prop::collection::vec((prop::sample::select(FEATURE_NAMES.to_vec()), field_value()), 0..12),
        extra in field_value(),
    )| {
        let mut map = Map::new();
        for (name, value) in fields {
            map.insert(name.to_string(), value);
        }
        map.insert("host".to_string(), extra);

        let v = FeatureVector::from_fields(&map);
        prop_assert!(v.is_finite());
        for (i, name) in FEATURE_NAMES.iter().enumerate() {
            if !map.contains_key(*name) {
                prop_assert_eq!(v.values()[i], 0.0);
            }
        }
    });
}

/// Property: the window never exceeds capacity and keeps the newest vectors in order.
#[test]
fn prop_window_keeps_newest() {
    proptest!(|(capacity in 1usize..64, pushes in prop::collection::vec(vector(), 0..200))| {
        let mut window = RollingWindow::new(capacity);
        for v in &pushes {
            window.push(*v);
            prop_assert!(window.len() <= capacity);
        }

        let kept = pushes.len().min(capacity);
        prop_assert_eq!(window.len(), kept);
        prop_assert_eq!(window.is_full(), pushes.len() >= capacity);

        let snapshot = window.snapshot();
        prop_assert_eq!(snapshot.n_rows(), kept);
        prop_assert_eq!(snapshot.n_cols(), FEATURE_COUNT);
        for (row, v) in snapshot.rows().zip(&pushes[pushes.len() - kept..]) {
            prop_assert_eq!(row, &v.to_f64()[..]);
        }
    });
}

/// Property: quantiles are bounded by the sample and non-decreasing in q.
#[test]
fn prop_quantile_is_monotonic() {
    proptest!(|(
        values in prop::collection::vec(-1.0e9f64..1.0e9, 1..100),
        a in 0.0f64..=1.0,
        b in 0.0f64..=1.0,
    )| {
        let (lo_q, hi_q) = if a <= b { (a, b) } else { (b, a) };
        let lo = quantile(&values, lo_q).unwrap();
        let hi = quantile(&values, hi_q).unwrap();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        prop_assert!(lo <= hi);
        prop_assert!(lo >= min && hi <= max);
        prop_assert_eq!(quantile(&values, 1.0).unwrap(), max);
        prop_assert_eq!(quantile(&values, 0.0).unwrap(), min);
    });
}

/// Property: explanations are bounded by top_k, use known names, and are sorted.
#[test]
fn prop_explain_is_sorted() {
    proptest!(|(
        mean in prop::array::uniform8(-1.0e3f64..1.0e3),
        scale in prop::array::uniform8(0.01f64..1.0e3),
        v in vector(),
        top_k in 0usize..12,
    )| {
        let standardizer = Standardizer::from_parts(mean.to_vec(), scale.to_vec());
        let out = explain(Some(&standardizer), &v, top_k);

        prop_assert_eq!(out.len(), top_k.min(FEATURE_COUNT));
        for d in &out {
            prop_assert!(FEATURE_NAMES.contains(&d.feature));
            prop_assert!(d.deviation >= 0.0);
        }
        for pair in out.windows(2) {
            prop_assert!(pair[0].deviation >= pair[1].deviation);
        }
    });
}
