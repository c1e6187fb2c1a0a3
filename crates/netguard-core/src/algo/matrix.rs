/// Dense row-major matrix of f64 observations.
///
/// Rows are observations and columns are features. Everything the trainer
/// touches goes through this type so the column order fixed by the feature
/// encoder is carried along unchanged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureMatrix {
    data: Vec<f64>,
    n_rows: usize,
    n_cols: usize,
}

impl FeatureMatrix {
    pub fn with_capacity(n_cols: usize, rows: usize) -> Self {
        Self {
            data: Vec::with_capacity(rows * n_cols),
            n_rows: 0,
            n_cols,
        }
    }

    /// Build from row slices. Every row must have the same length.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Self {
        let n_cols = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut m = Self::with_capacity(n_cols, rows.len());
        for row in rows {
            m.push_row(row.as_ref());
        }
        m
    }

    /// Append a row.
    ///
    /// # Panics
    /// If the row length differs from the column count.
    pub fn push_row(&mut self, row: &[f64]) {
        assert_eq!(row.len(), self.n_cols, "row width mismatch");
        self.data.extend_from_slice(row);
        self.n_rows += 1;
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn row(&self, i: usize) -> &[f64] {
        let start = i * self.n_cols;
        &self.data[start..start + self.n_cols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact(0) panics, and a zero-width matrix has no rows to yield anyway
        self.data.chunks_exact(self.n_cols.max(1)).take(self.n_rows)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.n_cols + col]
    }

    /// First non-finite cell as (row, col)
    pub fn find_non_finite(&self) -> Option<(usize, usize)> {
        let idx = self.data.iter().position(|v| !v.is_finite())?;
        Some((idx / self.n_cols, idx % self.n_cols))
    }
}
