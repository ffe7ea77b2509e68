use serde::{Deserialize, Serialize};
use std::ops::Index;

/// A lightweight row-major Matrix abstraction that does almost nothing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Matrix<T> {
    n_rows: usize,
    n_cols: usize,
    values: Vec<T>,
}

impl<T> Matrix<T> {
    /// Create a new Matrix from a vector of row vectors
    ///
    /// # Panics
    /// Panics if the rows do not all have the same length
    pub fn from_vecs(vecs: Vec<Vec<T>>) -> Self {
        let n_rows = vecs.len();
        let n_cols = vecs.first().map_or(0, |row| row.len());
        let mut values = Vec::with_capacity(n_rows * n_cols);

        vecs.into_iter().enumerate().for_each(|(ix, row)| {
            assert_eq!(
                row.len(),
                n_cols,
                "Row {ix} has {} entries but row 0 has {n_cols}",
                row.len()
            );
            values.extend(row);
        });

        Matrix {
            n_rows,
            n_cols,
            values,
        }
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    /// The entries of row `i`
    #[inline]
    pub fn row(&self, i: usize) -> &[T] {
        let start = self.n_cols * i;
        &self.values[start..start + self.n_cols]
    }

    /// Create an iterator through rows
    ///
    /// # Example
    ///
    /// ```rust
    /// # use crosscat_utils::Matrix;
    /// let vecs: Vec<Vec<u8>> = vec![
    ///     vec![0, 1, 2],
    ///     vec![3, 4, 5],
    /// ];
    ///
    /// let mat = Matrix::from_vecs(vecs);
    ///
    /// let rowsum: Vec<u8> = mat.rows().map(|row| {
    ///     row.iter().sum::<u8>()
    /// })
    /// .collect();
    ///
    /// assert_eq!(rowsum, vec![3_u8, 12_u8])
    /// ```
    #[inline]
    pub fn rows(&self) -> std::slice::ChunksExact<'_, T> {
        self.values.chunks_exact(self.n_cols.max(1))
    }

    /// Append a row to the bottom of the matrix
    ///
    /// # Panics
    /// Panics if the row length does not match the number of columns in a
    /// non-empty matrix
    pub fn push_row(&mut self, row: Vec<T>) {
        if self.n_rows == 0 && self.values.is_empty() {
            self.n_cols = row.len();
        } else {
            assert_eq!(row.len(), self.n_cols, "Row length mismatch");
        }
        self.values.extend(row);
        self.n_rows += 1;
    }
}

impl<T: Clone> Matrix<T> {
    /// Copy column `j` out of the matrix
    ///
    /// # Example
    ///
    /// ```rust
    /// # use crosscat_utils::Matrix;
    /// let mat = Matrix::from_vecs(vec![vec![0, 1], vec![2, 3], vec![4, 5]]);
    /// assert_eq!(mat.column(1), vec![1, 3, 5]);
    /// ```
    pub fn column(&self, j: usize) -> Vec<T> {
        assert!(j < self.n_cols, "Column {j} out of bounds");
        (0..self.n_rows).map(|i| self[(i, j)].clone()).collect()
    }
}

impl<T> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &Self::Output {
        &self.values[self.n_cols * i + j]
    }
}
