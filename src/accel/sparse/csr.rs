// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use log::*;

use arrow::{
    array::{downcast_array, Array, ArrayRef, Float32Array, Int32Array, LargeListArray, StructArray},
    buffer::OffsetBuffer,
    datatypes::DataType,
};

use crate::arrow::{checked_array_ref, SparseRowType};
use crate::errors::{RecError, Result};
use crate::ok_or_err;

/// A compressed sparse row matrix of `f32` values.
///
/// The matrix is stored as an Arrow large-list array whose elements are
/// `{index, value}` structs, so it can be handed to and from Arrow consumers
/// without copying. Once built, a matrix is never modified; transformations
/// return new matrices.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    array: LargeListArray,
    col_inds: Int32Array,
    values: Float32Array,
}

/// View of the stored entries of a single matrix row.
#[derive(Debug, Clone, Copy)]
pub struct SparseRow<'a> {
    cols: &'a [i32],
    vals: &'a [f32],
}

impl<'a> SparseRow<'a> {
    /// Number of stored entries in the row.
    pub fn len(&self) -> usize {
        self.cols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cols.is_empty()
    }

    /// Iterate over `(column, value)` pairs in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + 'a {
        let cols = self.cols;
        let vals = self.vals;
        cols.iter().zip(vals.iter()).map(|(c, v)| (*c as usize, *v))
    }

    /// Column indices of the stored entries.
    pub fn cols(&self) -> &'a [i32] {
        self.cols
    }

    /// Values of the stored entries.
    pub fn vals(&self) -> &'a [f32] {
        self.vals
    }
}

impl CsrMatrix {
    /// Assemble a matrix from its compressed parts.
    ///
    /// Offsets must have one entry per row plus one, and the index and value
    /// arrays must have the length of the last offset.
    pub(crate) fn from_parts(
        n_cols: usize,
        offsets: OffsetBuffer<i64>,
        col_inds: Int32Array,
        values: Float32Array,
    ) -> CsrMatrix {
        assert_eq!(col_inds.len(), values.len());
        assert_eq!(*offsets.last().unwrap_or(&0) as usize, col_inds.len());
        let fields = SparseRowType::entry_fields(n_cols);
        let entries = StructArray::new(
            fields.clone(),
            vec![
                Arc::new(col_inds.clone()) as ArrayRef,
                Arc::new(values.clone()) as ArrayRef,
            ],
            None,
        );
        let array = LargeListArray::new(
            SparseRowType::list_field(fields),
            offsets,
            Arc::new(entries),
            None,
        );
        CsrMatrix {
            n_rows: array.len(),
            n_cols,
            array,
            col_inds,
            values,
        }
    }

    /// Create a matrix with the given shape and no stored entries.
    pub fn empty(n_rows: usize, n_cols: usize) -> CsrMatrix {
        CsrMatrix::from_parts(
            n_cols,
            OffsetBuffer::new_zeroed(n_rows),
            Int32Array::from(Vec::<i32>::new()),
            Float32Array::from(Vec::<f32>::new()),
        )
    }

    /// Convert an Arrow sparse row array into a CSR matrix, checking for type errors.
    pub fn from_arrow(array: ArrayRef) -> Result<CsrMatrix> {
        let row_type = SparseRowType::try_from(array.data_type())?;
        if row_type.value_type != DataType::Float32 {
            return Err(RecError::InvalidConfig(format!(
                "invalid value column type {}, expected Float32",
                row_type.value_type
            )));
        }
        let list: &LargeListArray = checked_array_ref("sparse row", "LargeList", array.as_ref())?;
        if list.null_count() > 0 {
            return Err(RecError::InvalidConfig(format!(
                "sparse row array has {} null rows",
                list.null_count()
            )));
        }
        let rows: &StructArray = ok_or_err!(
            list.values().as_any().downcast_ref::<StructArray>(),
            InvalidConfig,
            "invalid element type {}, expected Struct",
            list.values().data_type()
        )?;
        debug!(
            "extracted {} x {} sparse matrix from {}",
            list.len(),
            row_type.dimension(),
            array.data_type()
        );

        let csr = CsrMatrix {
            n_rows: list.len(),
            n_cols: row_type.dimension(),
            array: list.clone(),
            col_inds: downcast_array(rows.column(0).as_ref()),
            values: downcast_array(rows.column(1).as_ref()),
        };

        let (sp, ep) = (csr.row_ptrs()[0] as usize, csr.nnz_end());
        if let Some(bad) = csr.col_inds.values()[sp..ep]
            .iter()
            .find(|c| **c < 0 || **c as usize >= csr.n_cols())
        {
            return Err(RecError::ShapeMismatch(format!(
                "column index {} out of bounds for {} columns",
                bad, csr.n_cols()
            )));
        }
        if let Some(r) = (0..csr.n_rows).find(|r| {
            csr.row_cols(*r)
                .windows(2)
                .any(|w| w[0] >= w[1])
        }) {
            return Err(RecError::InvalidConfig(format!(
                "row {} has unsorted or repeated column indices",
                r
            )));
        }

        Ok(csr)
    }

    /// Get the underlying Arrow array of rows.
    pub fn array(&self) -> &LargeListArray {
        &self.array
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns.
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Column indices of all stored entries, addressed by the row pointers.
    pub fn col_inds(&self) -> &Int32Array {
        &self.col_inds
    }

    /// Values of all stored entries, addressed by the row pointers.
    pub fn values(&self) -> &Float32Array {
        &self.values
    }

    /// Get the matrix shape as `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows(), self.n_cols())
    }

    /// Get the "length" (number of rows) in the matrix.
    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the number of stored values in the matrix.
    pub fn nnz(&self) -> usize {
        self.nnz_end() - self.row_ptrs()[0] as usize
    }

    fn nnz_end(&self) -> usize {
        self.row_ptrs()[self.len()] as usize
    }

    /// Get the row pointers as a slice.
    pub fn row_ptrs(&self) -> &[i64] {
        self.array.value_offsets()
    }

    /// Get the extent in the underlying arrays for a row in the matrix.
    pub fn extent(&self, row: usize) -> (usize, usize) {
        let off = self.row_ptrs();
        (off[row] as usize, off[row + 1] as usize)
    }

    /// Get the column indices for a row in the matrix.
    pub fn row_cols(&self, row: usize) -> &[i32] {
        let (start, end) = self.extent(row);
        &self.col_inds.values()[start..end]
    }

    /// Get the values for a row in the matrix.
    pub fn row_vals(&self, row: usize) -> &[f32] {
        let (start, end) = self.extent(row);
        &self.values.values()[start..end]
    }

    /// Get the stored entries of a row.
    pub fn row(&self, row: usize) -> SparseRow<'_> {
        SparseRow {
            cols: self.row_cols(row),
            vals: self.row_vals(row),
        }
    }

    /// Iterate over all rows in order.
    pub fn rows(&self) -> impl Iterator<Item = SparseRow<'_>> + '_ {
        (0..self.n_rows()).map(move |r| self.row(r))
    }

    /// Look up a single cell; cells that are not stored are zero.
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.row(row)
            .iter()
            .find(|(c, _)| *c == col)
            .map(|(_, v)| v)
            .unwrap_or(0.0)
    }
}

impl PartialEq for CsrMatrix {
    /// Matrices are equal when shapes and stored entries match exactly.
    fn eq(&self, other: &Self) -> bool {
        self.shape() == other.shape()
            && (0..self.n_rows()).all(|r| {
                self.row_cols(r) == other.row_cols(r)
                    && self
                        .row_vals(r)
                        .iter()
                        .zip(other.row_vals(r))
                        .all(|(a, b)| a.to_bits() == b.to_bits())
            })
    }
}

#[test]
fn test_empty_matrix() {
    let m = CsrMatrix::empty(3, 5);
    assert_eq!(m.shape(), (3, 5));
    assert_eq!(m.nnz(), 0);
    assert!(m.row(2).is_empty());
    assert_eq!(m.get(1, 4), 0.0);
}

#[test]
fn test_arrow_roundtrip() {
    let m = CsrMatrix::from_parts(
        4,
        OffsetBuffer::from_lengths([2, 0, 1]),
        Int32Array::from(vec![0, 3, 2]),
        Float32Array::from(vec![1.0, 0.5, 2.0]),
    );
    let back = CsrMatrix::from_arrow(Arc::new(m.array().clone())).unwrap();
    assert_eq!(back.shape(), (3, 4));
    assert_eq!(back.nnz(), 3);
    assert_eq!(back.get(0, 3), 0.5);
    assert_eq!(back.get(2, 2), 2.0);
    assert_eq!(back, m);
}

#[test]
fn test_arrow_rejects_bad_type() {
    let arr: ArrayRef = Arc::new(Int32Array::from(vec![1, 2, 3]));
    assert!(CsrMatrix::from_arrow(arr).is_err());
}

#[test]
fn test_arrow_rejects_repeated_columns() {
    let m = CsrMatrix::from_parts(
        3,
        OffsetBuffer::from_lengths([1, 3]),
        Int32Array::from(vec![2, 0, 0, 1]),
        Float32Array::from(vec![1.0, 1.0, 1.0, 1.0]),
    );
    let res = CsrMatrix::from_arrow(Arc::new(m.array().clone()));
    assert!(matches!(res, Err(RecError::InvalidConfig(_))));
}

#[test]
fn test_arrow_rejects_unsorted_columns() {
    let m = CsrMatrix::from_parts(
        3,
        OffsetBuffer::from_lengths([2]),
        Int32Array::from(vec![2, 1]),
        Float32Array::from(vec![1.0, 1.0]),
    );
    let res = CsrMatrix::from_arrow(Arc::new(m.array().clone()));
    assert!(matches!(res, Err(RecError::InvalidConfig(_))));
}

#[test]
fn test_shape_accessors() {
    let m = CsrMatrix::empty(2, 7);
    assert_eq!(m.n_rows(), 2);
    assert_eq!(m.n_cols(), 7);
    assert_eq!(m.col_inds().len(), 0);
    assert_eq!(m.values().len(), 0);
}

#[test]
fn test_row_iteration() {
    let m = CsrMatrix::from_parts(
        3,
        OffsetBuffer::from_lengths([1, 2]),
        Int32Array::from(vec![1, 0, 2]),
        Float32Array::from(vec![1.0, 3.0, 4.0]),
    );
    let row: Vec<_> = m.row(1).iter().collect();
    assert_eq!(row, vec![(0, 3.0), (2, 4.0)]);
    assert_eq!(m.rows().map(|r| r.len()).collect::<Vec<_>>(), vec![1, 2]);
}
