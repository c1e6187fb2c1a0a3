//! Rolling Window of recent feature vectors
//!
//! Bounded FIFO: pushing past capacity evicts the oldest vector. Snapshots are
//! dense copies taken for training; the window itself is never handed out.

use std::collections::VecDeque;

use crate::algo::FeatureMatrix;
use crate::features::{FEATURE_COUNT, FeatureVector};

#[derive(Debug, Clone)]
pub struct RollingWindow {
    buffer: VecDeque<FeatureVector>,
    capacity: usize,
}

impl RollingWindow {
    /// Create a window holding at most `capacity` vectors (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a vector, returning the evicted one when the window was full.
    pub fn push(&mut self, vector: FeatureVector) -> Option<FeatureVector> {
        let evicted = if self.buffer.len() == self.capacity {
            self.buffer.pop_front()
        } else {
            None
        };
        self.buffer.push_back(vector);
        evicted
    }

    /// Copy the contents, oldest first, into a matrix of widened values.
    pub fn snapshot(&self) -> FeatureMatrix {
        let mut m = FeatureMatrix::with_capacity(FEATURE_COUNT, self.buffer.len());
        for v in &self.buffer {
            m.push_row(&v.to_f64());
        }
        m
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recently pushed vector
    pub fn latest(&self) -> Option<&FeatureVector> {
        self.buffer.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureVector> {
        self.buffer.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(x: f32) -> FeatureVector {
        FeatureVector::new([x; FEATURE_COUNT])
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let mut window = RollingWindow::new(3);

        assert!(window.push(vector(1.0)).is_none());
        assert!(window.push(vector(2.0)).is_none());
        assert!(window.push(vector(3.0)).is_none());
        assert!(window.is_full());

        let evicted = window.push(vector(4.0));
        assert_eq!(evicted, Some(vector(1.0)));
        assert_eq!(window.len(), 3);

        let firsts: Vec<f32> = window.iter().map(|v| v.values()[0]).collect();
        assert_eq!(firsts, vec![2.0, 3.0, 4.0]);
        assert_eq!(window.latest(), Some(&vector(4.0)));
    }

    #[test]
    fn test_snapshot_does_not_mutate() {
        let mut window = RollingWindow::new(10);
        for i in 0..4 {
            window.push(vector(i as f32));
        }

        let snap = window.snapshot();
        assert_eq!(snap.n_rows(), 4);
        assert_eq!(snap.n_cols(), FEATURE_COUNT);
        assert_eq!(snap.row(3)[0], 3.0);
        assert_eq!(window.len(), 4);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut window = RollingWindow::new(0);
        window.push(vector(1.0));
        window.push(vector(2.0));
        assert_eq!(window.capacity(), 1);
        assert_eq!(window.len(), 1);
        assert_eq!(window.latest(), Some(&vector(2.0)));
    }
}
