//! Dense real matrices and Gauss-Jordan reduction.
//!
//! The matrices here are always augmented: the last column holds the
//! right-hand side of the linear system and is never chosen as a pivot.

use crate::error::MatrixError;
use crate::tolerance::Tolerance;

/// A dense row-major `rows x cols` matrix with an augmentation column.
#[derive(Clone, Debug)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
    tolerance: Tolerance,
    reduced: bool,
}

impl Matrix {
    /// An all-zero matrix.
    pub fn zero(rows: usize, cols: usize, tolerance: Tolerance) -> Matrix {
        Matrix {
            rows,
            cols,
            data: vec![0.0; rows * cols],
            tolerance,
            reduced: false,
        }
    }

    /// Build a matrix from explicit rows, which must all have the same
    /// length.
    pub fn from_rows(rows: Vec<Vec<f64>>, tolerance: Tolerance) -> Matrix {
        let cols = rows.first().map_or(0, Vec::len);
        assert!(
            rows.iter().all(|row| row.len() == cols),
            "all rows must have the same length"
        );
        Matrix {
            rows: rows.len(),
            cols,
            data: rows.into_iter().flatten().collect(),
            tolerance,
            reduced: false,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.reduced = false;
        self.data[row * self.cols + col] = value;
    }

    pub fn swap_rows(&mut self, a: usize, b: usize) {
        self.reduced = false;
        self.raw_swap(a, b);
    }

    /// Multiply every entry of `row` by `factor`.
    pub fn scale_row(&mut self, row: usize, factor: f64) -> Result<(), MatrixError> {
        if !factor.is_finite() {
            return Err(MatrixError::NonFiniteFactor(factor));
        }
        self.reduced = false;
        self.raw_scale(row, factor);
        Ok(())
    }

    /// Add `factor` times row `source` to row `target`.
    pub fn add_multiple_of_row(
        &mut self,
        target: usize,
        source: usize,
        factor: f64,
    ) -> Result<(), MatrixError> {
        if !factor.is_finite() {
            return Err(MatrixError::NonFiniteFactor(factor));
        }
        self.reduced = false;
        self.raw_add_multiple(target, source, factor);
        Ok(())
    }

    /// Reduce in place to reduced row echelon form and return the rank.
    ///
    /// Columns are scanned left to right, skipping the augmentation
    /// column; the topmost unprocessed row whose entry exceeds the
    /// tolerance becomes the pivot row, is normalized, and its column is
    /// eliminated from every other row.
    pub fn reduce(&mut self) -> usize {
        let mut processed = 0;
        for col in 0..self.cols.saturating_sub(1) {
            if processed == self.rows {
                break;
            }
            let pivot_row = match (processed..self.rows)
                .find(|&row| !self.tolerance.is_zero(self.get(row, col)))
            {
                Some(row) => row,
                None => continue,
            };
            self.raw_swap(processed, pivot_row);
            let pivot = self.get(processed, col);
            self.raw_scale(processed, 1.0 / pivot);
            self.data[processed * self.cols + col] = 1.0;
            for row in 0..self.rows {
                if row == processed {
                    continue;
                }
                let factor = self.get(row, col);
                if factor != 0.0 {
                    self.raw_add_multiple(row, processed, -factor);
                    self.data[row * self.cols + col] = 0.0;
                }
            }
            processed += 1;
        }
        self.reduced = true;
        processed
    }

    /// Does the reduced system have at least one solution?
    ///
    /// A row whose coefficients are all indistinguishable from zero but
    /// whose augmentation entry is not encodes `0 = b` with `b != 0`.
    /// Fails unless the matrix has been reduced and not mutated since.
    pub fn has_solution(&self) -> Result<bool, MatrixError> {
        if !self.reduced {
            return Err(MatrixError::NotReduced);
        }
        for row in 0..self.rows {
            let coefficients_vanish =
                (0..self.cols - 1).all(|col| self.tolerance.is_zero(self.get(row, col)));
            if coefficients_vanish && !self.tolerance.is_zero(self.get(row, self.cols - 1)) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn raw_swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for col in 0..self.cols {
            self.data.swap(a * self.cols + col, b * self.cols + col);
        }
    }

    fn raw_scale(&mut self, row: usize, factor: f64) {
        for col in 0..self.cols {
            self.data[row * self.cols + col] *= factor;
        }
    }

    fn raw_add_multiple(&mut self, target: usize, source: usize, factor: f64) {
        for col in 0..self.cols {
            let addend = factor * self.data[source * self.cols + col];
            self.data[target * self.cols + col] += addend;
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn tolerance() -> Tolerance {
        Tolerance::new(1e-3).expect("test")
    }

    #[test]
    fn test_reduce_solves_a_full_rank_system() {
        let mut matrix = Matrix::from_rows(
            vec![
                vec![2.0, 1.0, -1.0, 8.0],
                vec![-3.0, -1.0, 2.0, -11.0],
                vec![-2.0, 1.0, 2.0, -3.0],
            ],
            tolerance(),
        );
        let rank = matrix.reduce();
        assert_eq!(rank, 3);
        assert!(matrix.has_solution().expect("test"));

        // The augmentation column now carries the unique solution.
        assert_abs_diff_eq!(matrix.get(0, 3), 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(matrix.get(1, 3), 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(matrix.get(2, 3), -1.0, epsilon = 1e-9);

        // Every pivot column holds a single 1.
        for row in 0..3 {
            for col in 0..3 {
                let expected = if row == col { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(matrix.get(row, col), expected, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_duplicate_row_drops_rank_and_contradiction_kills_solvability() {
        let mut matrix = Matrix::from_rows(
            vec![
                vec![1.0, 1.0, 2.0],
                vec![1.0, 1.0, 2.0],
                vec![1.0, 1.0, 3.0],
            ],
            tolerance(),
        );
        let rank = matrix.reduce();
        assert_eq!(rank, 1);
        assert!(!matrix.has_solution().expect("test"));
    }

    #[test]
    fn test_underdetermined_but_consistent() {
        let mut matrix = Matrix::from_rows(
            vec![vec![1.0, 2.0, 3.0], vec![2.0, 4.0, 6.0]],
            tolerance(),
        );
        assert_eq!(matrix.reduce(), 1);
        assert!(matrix.has_solution().expect("test"));
    }

    #[test]
    fn test_has_solution_requires_a_reduced_matrix() {
        let mut matrix = Matrix::zero(2, 3, tolerance());
        assert_eq!(matrix.has_solution(), Err(MatrixError::NotReduced));

        matrix.set(0, 0, 1.0);
        matrix.reduce();
        assert!(matrix.has_solution().is_ok());

        // Any mutation invalidates the reduced state.
        matrix.set(1, 2, 5.0);
        assert_eq!(matrix.has_solution(), Err(MatrixError::NotReduced));
        matrix.reduce();
        assert!(!matrix.has_solution().expect("test"));
    }

    #[test]
    fn test_row_operations_reject_non_finite_factors() {
        let mut matrix = Matrix::zero(2, 3, tolerance());
        assert!(matches!(
            matrix.scale_row(0, f64::NAN),
            Err(MatrixError::NonFiniteFactor(_))
        ));
        assert!(matches!(
            matrix.add_multiple_of_row(0, 1, f64::INFINITY),
            Err(MatrixError::NonFiniteFactor(_))
        ));
        assert!(matrix.scale_row(0, 2.0).is_ok());
        assert!(matrix.add_multiple_of_row(0, 1, -1.5).is_ok());
    }

    #[test]
    fn test_row_operations() {
        let mut matrix = Matrix::from_rows(
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
            tolerance(),
        );
        matrix.swap_rows(0, 1);
        assert_abs_diff_eq!(matrix.get(0, 0), 4.0);

        matrix.scale_row(0, 0.5).expect("test");
        assert_abs_diff_eq!(matrix.get(0, 1), 2.5);

        matrix.add_multiple_of_row(1, 0, -0.5).expect("test");
        assert_abs_diff_eq!(matrix.get(1, 0), 0.0);
        assert_abs_diff_eq!(matrix.get(1, 1), 0.75);
    }

    #[test]
    fn test_zero_matrix_has_rank_zero() {
        let mut matrix = Matrix::zero(3, 4, tolerance());
        assert_eq!(matrix.reduce(), 0);
        assert!(matrix.has_solution().expect("test"));
    }
}
