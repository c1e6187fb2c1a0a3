//! Isolation Forest for Multivariate Outlier Scoring
//!
//! Anomalies are few and different, so random axis-aligned cuts isolate them
//! in fewer steps than normal points. Each tree is grown on a random subsample
//! and a point's score is derived from its average isolation depth.
//!
//! Every node keeps the bounding box of the rows it was grown from. A scored
//! point that falls outside a node's box can be cut away from it right there,
//! with the probability a uniform cut over the enlarged box would separate it
//! (the same displacement argument random cut forests use). Rows inside the box
//! never take that branch, so training rows get the classic path length while
//! points far beyond the training hull are isolated near the root instead of
//! inheriting the depth of the most extreme training row.
//!
//! Reference: "Isolation Forest" (Liu, Ting, Zhou, ICDM 2008)

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{FeatureMatrix, quantile};
use crate::error::TrainError;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Ensemble hyper-parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of trees
    pub n_estimators: usize,
    /// Upper bound on the per-tree subsample size
    pub max_samples: usize,
    /// Expected fraction of outliers, sets the decision offset
    pub contamination: f64,
    /// Seed for subsampling and cuts
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_samples: 256,
            contamination: 0.01,
            seed: 42,
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` keys, c(n).
///
/// Used both to normalize depths and to estimate the unexplored depth below a
/// leaf that still holds `n` rows.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Axis-aligned bounding box of the rows held by a node
#[derive(Serialize, Deserialize, Clone, Debug)]
struct Bounds {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl Bounds {
    fn of(data: &FeatureMatrix, rows: &[usize]) -> Self {
        let n_cols = data.n_cols();
        let mut min = vec![f64::INFINITY; n_cols];
        let mut max = vec![f64::NEG_INFINITY; n_cols];
        for &r in rows {
            for (j, &x) in data.row(r).iter().enumerate() {
                min[j] = min[j].min(x);
                max[j] = max[j].max(x);
            }
        }
        Self { min, max }
    }

    fn is_constant(&self, feature: usize) -> bool {
        !(self.max[feature] > self.min[feature])
    }

    /// Probability that a uniform random cut over the box enlarged to contain
    /// `point` falls in the enlargement, i.e. separates `point` from the box.
    fn separation_probability(&self, point: &[f64]) -> f64 {
        let mut base = 0.0;
        let mut grown = 0.0;
        for ((&lo, &hi), &x) in self.min.iter().zip(&self.max).zip(point) {
            base += hi - lo;
            grown += hi.max(x) - lo.min(x);
        }
        if grown > 0.0 {
            ((grown - base) / grown).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// A node in an isolation tree
#[derive(Serialize, Deserialize, Clone, Debug)]
enum IsolationNode {
    /// Rows with `x[feature] <= threshold` went left
    Split {
        feature: usize,
        threshold: f64,
        bounds: Bounds,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
    /// Unsplit remainder of the subsample
    Leaf { size: usize, bounds: Bounds },
}

impl IsolationNode {
    fn bounds(&self) -> &Bounds {
        match self {
            Self::Split { bounds, .. } | Self::Leaf { bounds, .. } => bounds,
        }
    }
}

/// A single isolation tree
#[derive(Serialize, Deserialize, Clone, Debug)]
struct IsolationTree {
    root: IsolationNode,
}

impl IsolationTree {
    fn grow<R: Rng>(data: &FeatureMatrix, rows: &mut [usize], max_depth: usize, rng: &mut R) -> Self {
        Self {
            root: grow_node(data, rows, 0, max_depth, rng),
        }
    }

    /// Expected isolation depth of `point`
    fn path_length(&self, point: &[f64]) -> f64 {
        let mut node = &self.root;
        let mut depth = 0.0;
        let mut survive = 1.0;
        let mut expected = 0.0;

        loop {
            let p = node.bounds().separation_probability(point);
            expected += survive * p * (depth + 1.0);
            survive *= 1.0 - p;

            match node {
                IsolationNode::Leaf { size, .. } => {
                    return expected + survive * (depth + average_path_length(*size));
                }
                IsolationNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if point[*feature] <= *threshold { &**left } else { &**right };
                    depth += 1.0;
                }
            }
        }
    }

    fn node_count(&self) -> usize {
        fn count(node: &IsolationNode) -> usize {
            match node {
                IsolationNode::Leaf { .. } => 1,
                IsolationNode::Split { left, right, .. } => 1 + count(left) + count(right),
            }
        }
        count(&self.root)
    }
}

/// Recursive growth over a slice of row indices, partitioned in place
fn grow_node<R: Rng>(
    data: &FeatureMatrix,
    rows: &mut [usize],
    depth: usize,
    max_depth: usize,
    rng: &mut R,
) -> IsolationNode {
    let bounds = Bounds::of(data, rows);

    if depth >= max_depth || rows.len() <= 1 {
        return IsolationNode::Leaf {
            size: rows.len(),
            bounds,
        };
    }

    let candidates: Vec<usize> = (0..data.n_cols()).filter(|&j| !bounds.is_constant(j)).collect();
    if candidates.is_empty() {
        // duplicates only
        return IsolationNode::Leaf {
            size: rows.len(),
            bounds,
        };
    }

    let feature = candidates[rng.random_range(0..candidates.len())];
    let threshold = rng.random_range(bounds.min[feature]..bounds.max[feature]);

    let mut split = 0;
    for i in 0..rows.len() {
        if data.get(rows[i], feature) <= threshold {
            rows.swap(i, split);
            split += 1;
        }
    }
    if split == 0 || split == rows.len() {
        return IsolationNode::Leaf {
            size: rows.len(),
            bounds,
        };
    }

    let (left_rows, right_rows) = rows.split_at_mut(split);
    let left = grow_node(data, left_rows, depth + 1, max_depth, rng);
    let right = grow_node(data, right_rows, depth + 1, max_depth, rng);

    IsolationNode::Split {
        feature,
        threshold,
        bounds,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// Isolation Forest
///
/// Native scores follow the "more normal = higher" convention
/// ([`score_samples`](Self::score_samples), [`decision_function`](Self::decision_function));
/// [`anomaly_score`](Self::anomaly_score) flips the sign.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    /// Subsample size actually used per tree
    sample_size: usize,
    /// c(sample_size), depth normalization
    path_norm: f64,
    /// Contamination quantile of the native training scores
    offset: f64,
    n_features: usize,
}

impl IsolationForest {
    /// Grow the forest on `data` and calibrate the contamination offset on it.
    pub fn fit(data: &FeatureMatrix, params: &ForestParams) -> Result<Self, TrainError> {
        if data.is_empty() {
            return Err(TrainError::EmptySnapshot);
        }

        let n = data.n_rows();
        let sample_size = params.max_samples.clamp(1, n);
        let max_depth = (sample_size.max(2) as f64).log2().ceil() as usize;

        let mut master = StdRng::seed_from_u64(params.seed);
        let trees = (0..params.n_estimators.max(1))
            .map(|_| {
                let mut rng = StdRng::seed_from_u64(master.random());
                let mut rows = index::sample(&mut rng, n, sample_size).into_vec();
                IsolationTree::grow(data, &mut rows, max_depth, &mut rng)
            })
            .collect();

        let norm = average_path_length(sample_size);
        let mut forest = Self {
            trees,
            sample_size,
            path_norm: if norm > 0.0 { norm } else { 1.0 },
            offset: 0.0,
            n_features: data.n_cols(),
        };

        let native: Vec<f64> = data.rows().map(|row| forest.score_samples(row)).collect();
        forest.offset = quantile(&native, params.contamination).unwrap_or(0.0);

        Ok(forest)
    }

    /// Mean expected isolation depth across trees
    pub fn path_length(&self, point: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.path_length(point)).sum();
        total / self.trees.len() as f64
    }

    /// Native score in [-1, 0): `-2^(-E[h(x)] / c(psi))`, higher = more normal
    pub fn score_samples(&self, point: &[f64]) -> f64 {
        -(2.0f64).powf(-self.path_length(point) / self.path_norm)
    }

    /// Native score shifted by the contamination offset; negative = outlier side
    pub fn decision_function(&self, point: &[f64]) -> f64 {
        self.score_samples(point) - self.offset
    }

    /// Anomaly-ness: higher = more anomalous
    pub fn anomaly_score(&self, point: &[f64]) -> f64 {
        -self.decision_function(point)
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Total node count, for memory diagnostics
    pub fn node_count(&self) -> usize {
        self.trees.iter().map(IsolationTree::node_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize) -> FeatureMatrix {
        let rows: Vec<[f64; 2]> = (0..n)
            .map(|i| [(i % 10) as f64, (i / 10) as f64])
            .collect();
        FeatureMatrix::from_rows(&rows)
    }

    fn params(n_estimators: usize) -> ForestParams {
        ForestParams {
            n_estimators,
            ..Default::default()
        }
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        assert!((average_path_length(256) - 10.244_77).abs() < 1e-4);
        assert!(average_path_length(1000) > average_path_length(100));
    }

    #[test]
    fn test_outlier_scores_higher_than_inlier() {
        let forest = IsolationForest::fit(&grid(100), &params(100)).unwrap();

        let inlier = forest.anomaly_score(&[4.5, 4.5]);
        let outlier = forest.anomaly_score(&[60.0, -40.0]);
        assert!(outlier > inlier, "outlier {outlier} <= inlier {inlier}");
        assert!(forest.path_length(&[60.0, -40.0]) < 1.5);
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let data = grid(100);
        let a = IsolationForest::fit(&data, &params(50)).unwrap();
        let b = IsolationForest::fit(&data, &params(50)).unwrap();

        assert_eq!(a.offset().to_bits(), b.offset().to_bits());
        for row in data.rows() {
            assert_eq!(a.anomaly_score(row).to_bits(), b.anomaly_score(row).to_bits());
        }
    }

    #[test]
    fn test_identical_rows_form_single_leaf() {
        let data = FeatureMatrix::from_rows(&vec![[0.0, 0.0]; 120]);
        let forest = IsolationForest::fit(&data, &params(10)).unwrap();

        assert_eq!(forest.node_count(), 10);
        assert_eq!(forest.sample_size(), 120);

        // every training row sits at c(120), which is exactly the normalizer
        assert!((forest.score_samples(&[0.0, 0.0]) + 0.5).abs() < 1e-12);
        assert!(forest.anomaly_score(&[0.0, 0.0]).abs() < 1e-12);

        // anything different is one cut away
        assert!((forest.path_length(&[3.0, 0.0]) - 1.0).abs() < 1e-12);
        assert!(forest.anomaly_score(&[3.0, 0.0]) > 0.3);
    }

    #[test]
    fn test_training_rows_are_inside_every_box() {
        let data = grid(64);
        let forest = IsolationForest::fit(&data, &params(20)).unwrap();
        for tree in &forest.trees {
            for row in data.rows() {
                assert_eq!(tree.root.bounds().separation_probability(row), 0.0);
            }
        }
    }

    #[test]
    fn test_contamination_sets_offset() {
        let data = grid(100);
        let low = IsolationForest::fit(&data, &ForestParams { contamination: 0.01, ..params(50) }).unwrap();
        let high = IsolationForest::fit(&data, &ForestParams { contamination: 0.2, ..params(50) }).unwrap();

        // same seed, same trees: only the offset moves
        assert!(high.offset() > low.offset());
        let row = data.row(0);
        assert_eq!(low.score_samples(row).to_bits(), high.score_samples(row).to_bits());

        let flagged = data.rows().filter(|r| high.anomaly_score(r) > 0.0).count();
        assert!(flagged <= 21, "flagged {flagged}");
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let err = IsolationForest::fit(&FeatureMatrix::with_capacity(2, 0), &params(5)).unwrap_err();
        assert_eq!(err, TrainError::EmptySnapshot);
    }
}
