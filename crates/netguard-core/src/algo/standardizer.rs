use serde::{Deserialize, Serialize};

use super::FeatureMatrix;

/// Per-feature mean and scale fit from a training snapshot.
///
/// Uses the population standard deviation. A column whose values are all
/// identical gets a scale of 1.0, so `scale` never contains a zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl Standardizer {
    /// Fit column statistics. An empty matrix yields mean 0 / scale 1.
    pub fn fit(data: &FeatureMatrix) -> Self {
        let n_cols = data.n_cols();
        if data.is_empty() {
            return Self {
                mean: vec![0.0; n_cols],
                scale: vec![1.0; n_cols],
            };
        }

        let n = data.n_rows() as f64;
        let mut mean = vec![0.0; n_cols];
        let mut lo = vec![f64::INFINITY; n_cols];
        let mut hi = vec![f64::NEG_INFINITY; n_cols];
        for row in data.rows() {
            for (j, x) in row.iter().enumerate() {
                mean[j] += x;
                lo[j] = lo[j].min(*x);
                hi[j] = hi[j].max(*x);
            }
        }
        for (j, m) in mean.iter_mut().enumerate() {
            // a constant column keeps its exact value as the mean
            *m = if lo[j] == hi[j] { lo[j] } else { *m / n };
        }

        // two-pass variance
        let mut var = vec![0.0; n_cols];
        for row in data.rows() {
            for ((v, x), m) in var.iter_mut().zip(row).zip(&mean) {
                let d = x - m;
                *v += d * d;
            }
        }

        let scale = var
            .iter()
            .enumerate()
            .map(|(j, v)| {
                let std = (v / n).sqrt();
                if lo[j] == hi[j] || std == 0.0 { 1.0 } else { std }
            })
            .collect();

        Self { mean, scale }
    }

    /// Build from known statistics, replacing zero scales with 1.0.
    pub fn from_parts(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        let scale = scale
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect();
        Self { mean, scale }
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((x, m), s)| (x - m) / s)
            .collect()
    }

    pub fn transform(&self, data: &FeatureMatrix) -> FeatureMatrix {
        let mut out = FeatureMatrix::with_capacity(data.n_cols(), data.n_rows());
        for row in data.rows() {
            out.push_row(&self.transform_row(row));
        }
        out
    }

    /// `|x - mean| / scale` per feature
    pub fn abs_deviation(&self, row: &[f64]) -> Vec<f64> {
        self.transform_row(row).into_iter().map(f64::abs).collect()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_population_std() {
        let m = FeatureMatrix::from_rows(&[[1.0, 10.0], [3.0, 10.0], [5.0, 10.0], [7.0, 10.0]]);
        let s = Standardizer::fit(&m);

        assert_eq!(s.mean(), &[4.0, 10.0]);
        assert!((s.scale()[0] - 5.0f64.sqrt()).abs() < 1e-12);
        // constant column
        assert_eq!(s.scale()[1], 1.0);
    }

    #[test]
    fn test_constant_large_values_get_unit_scale() {
        let rows: Vec<[f64; 1]> = (0..1500).map(|_| [123_456_789.123]).collect();
        let s = Standardizer::fit(&FeatureMatrix::from_rows(&rows));
        assert_eq!(s.scale(), &[1.0]);
    }

    #[test]
    fn test_transform_centers_data() {
        let m = FeatureMatrix::from_rows(&[[2.0], [4.0], [6.0]]);
        let s = Standardizer::fit(&m);
        let t = s.transform(&m);

        let sum: f64 = t.rows().map(|r| r[0]).sum();
        assert!(sum.abs() < 1e-12);
        assert!(t.row(0)[0] < 0.0 && t.row(2)[0] > 0.0);
    }

    #[test]
    fn test_abs_deviation() {
        let s = Standardizer::from_parts(vec![0.0, 10.0], vec![2.0, 0.0]);
        assert_eq!(s.scale(), &[2.0, 1.0]);
        assert_eq!(s.abs_deviation(&[-4.0, 7.0]), vec![2.0, 3.0]);
    }

    #[test]
    fn test_empty_matrix() {
        let s = Standardizer::fit(&FeatureMatrix::with_capacity(3, 0));
        assert_eq!(s.mean(), &[0.0, 0.0, 0.0]);
        assert_eq!(s.scale(), &[1.0, 1.0, 1.0]);
    }
}
