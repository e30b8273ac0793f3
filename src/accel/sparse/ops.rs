// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Value transforms on CSR matrices.
//!
//! Every transform returns a new matrix; the source is left untouched.

use ndarray::Array1;

use crate::errors::{RecError, Result};

use super::{CsrBuilder, CsrMatrix};

impl CsrMatrix {
    /// Compute the L2 norm of each column.
    ///
    /// Columns with no stored mass get a norm of 1, so dividing by the norms
    /// leaves them unchanged.
    pub fn l2_column_norms(&self) -> Array1<f32> {
        let mut sq = Array1::<f32>::zeros(self.n_cols());
        for row in self.rows() {
            for (c, v) in row.iter() {
                sq[c] += v * v;
            }
        }
        sq.mapv_into(|s| if s > 0.0 { s.sqrt() } else { 1.0 })
    }

    /// Divide each column by the corresponding entry of `divisors`.
    pub fn divide_columns(&self, divisors: &Array1<f32>) -> CsrMatrix {
        assert_eq!(divisors.len(), self.n_cols());
        self.map_rows(|_r, c, v| v / divisors[c])
    }

    /// Multiply every stored value by a constant.
    pub fn scale(&self, factor: f32) -> CsrMatrix {
        self.map_rows(|_r, _c, v| v * factor)
    }

    /// Sum each row.
    pub fn row_sums(&self) -> Array1<f32> {
        self.rows().map(|r| r.vals().iter().sum()).collect()
    }

    /// Divide every row by its largest value.
    ///
    /// Rows whose maximum is not positive are left as they are.
    pub fn max_normalize_rows(&self) -> CsrMatrix {
        let maxes: Array1<f32> = self
            .rows()
            .map(|r| r.vals().iter().copied().fold(f32::NEG_INFINITY, f32::max))
            .collect();
        self.map_rows(|r, _c, v| if maxes[r] > 0.0 { v / maxes[r] } else { v })
    }

    /// Apply a function to every stored value, dropping results that are zero.
    fn map_rows<F: Fn(usize, usize, f32) -> f32>(&self, func: F) -> CsrMatrix {
        let mut bld = CsrBuilder::with_capacity(self.n_cols(), self.n_rows(), self.nnz());
        for (r, row) in self.rows().enumerate() {
            bld.push_row(
                row.iter()
                    .map(|(c, v)| (c as i32, func(r, c, v)))
                    .filter(|(_c, v)| *v != 0.0),
            );
        }
        bld.finish()
    }

    /// Select rows by index, in the order given.
    pub fn select_rows(&self, rows: &[usize]) -> Result<CsrMatrix> {
        let mut bld = CsrBuilder::with_capacity(self.n_cols(), rows.len(), 0);
        for r in rows {
            if *r >= self.n_rows() {
                return Err(RecError::ShapeMismatch(format!(
                    "row {} out of bounds for {} rows",
                    r, self.n_rows()
                )));
            }
            let row = self.row(*r);
            bld.push_row(row.iter().map(|(c, v)| (c as i32, v)));
        }
        Ok(bld.finish())
    }

    /// Select columns by index; column `j` of the result is column `cols[j]` of this matrix.
    pub fn select_columns(&self, cols: &[usize]) -> Result<CsrMatrix> {
        let mut positions = vec![-1i32; self.n_cols()];
        for (j, c) in cols.iter().enumerate() {
            if *c >= self.n_cols() {
                return Err(RecError::ShapeMismatch(format!(
                    "column {} out of bounds for {} columns",
                    c, self.n_cols()
                )));
            }
            positions[*c] = j as i32;
        }

        let mut bld = CsrBuilder::with_capacity(cols.len(), self.n_rows(), 0);
        for row in self.rows() {
            let mut out: Vec<(i32, f32)> = row
                .iter()
                .filter(|(c, _v)| positions[*c] >= 0)
                .map(|(c, v)| (positions[c], v))
                .collect();
            out.sort_by_key(|(c, _v)| *c);
            bld.push_row(out);
        }
        Ok(bld.finish())
    }

    /// Stack another matrix below this one.  Column counts must agree.
    pub fn vstack(&self, other: &CsrMatrix) -> Result<CsrMatrix> {
        if self.n_cols() != other.n_cols() {
            return Err(RecError::ShapeMismatch(format!(
                "cannot stack {} columns on {} columns",
                other.n_cols(), self.n_cols()
            )));
        }
        let mut bld =
            CsrBuilder::with_capacity(self.n_cols(), self.n_rows() + other.n_rows(), self.nnz() + other.nnz());
        for row in self.rows().chain(other.rows()) {
            bld.push_row(row.iter().map(|(c, v)| (c as i32, v)));
        }
        Ok(bld.finish())
    }

    /// Find the first stored value that is negative or not a number.
    pub fn find_invalid(&self) -> Option<(usize, usize, f32)> {
        self.rows().enumerate().find_map(|(r, row)| {
            row.iter()
                .find(|(_c, v)| !(*v >= 0.0))
                .map(|(c, v)| (r, c, v))
        })
    }
}

#[cfg(test)]
fn sample() -> CsrMatrix {
    let mut bld = CsrBuilder::new(3);
    bld.push_row(vec![(0, 3.0), (2, 1.0)]);
    bld.push_row(vec![(0, 4.0)]);
    bld.push_empty();
    bld.finish()
}

#[test]
fn test_column_norms() {
    let norms = sample().l2_column_norms();
    assert_eq!(norms.to_vec(), vec![5.0, 1.0, 1.0]);
}

#[test]
fn test_divide_columns() {
    let m = sample();
    let n = m.divide_columns(&m.l2_column_norms());
    assert_eq!(n.get(0, 0), 0.6);
    assert_eq!(n.get(1, 0), 0.8);
    assert_eq!(n.get(0, 2), 1.0);
}

#[test]
fn test_row_sums() {
    assert_eq!(sample().row_sums().to_vec(), vec![4.0, 4.0, 0.0]);
}

#[test]
fn test_max_normalize() {
    let m = sample().max_normalize_rows();
    assert_eq!(m.get(0, 0), 1.0);
    assert!((m.get(0, 2) - 1.0 / 3.0).abs() < 1e-6);
    assert_eq!(m.get(1, 0), 1.0);
    assert!(m.row(2).is_empty());
}

#[test]
fn test_select_rows() {
    let m = sample().select_rows(&[1, 0]).unwrap();
    assert_eq!(m.shape(), (2, 3));
    assert_eq!(m.get(0, 0), 4.0);
    assert_eq!(m.get(1, 2), 1.0);
    assert!(sample().select_rows(&[3]).is_err());
}

#[test]
fn test_select_columns() {
    let m = sample().select_columns(&[2, 0]).unwrap();
    assert_eq!(m.shape(), (3, 2));
    assert_eq!(m.row_cols(0), &[0, 1]);
    assert_eq!(m.row_vals(0), &[1.0, 3.0]);
    assert_eq!(m.get(1, 1), 4.0);
}

#[test]
fn test_vstack() {
    let m = sample();
    let s = m.vstack(&m.scale(2.0)).unwrap();
    assert_eq!(s.shape(), (6, 3));
    assert_eq!(s.get(4, 0), 8.0);
    assert!(m.vstack(&CsrMatrix::empty(1, 2)).is_err());
}

#[test]
fn test_find_invalid() {
    assert!(sample().find_invalid().is_none());
    let neg = sample().scale(-1.0);
    assert_eq!(neg.find_invalid(), Some((0, 0, -3.0)));
}
