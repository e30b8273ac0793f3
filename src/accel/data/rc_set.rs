// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Row-column sets for quick masking.

use rustc_hash::FxHashSet;

use crate::sparse::CsrMatrix;

/// Set of `(row, column)` pairs holding a non-zero value in a matrix.
pub struct RowColumnSet {
    set: FxHashSet<(u32, u32)>,
}

impl RowColumnSet {
    /// Collect the non-zero cells of a matrix.
    pub fn from_matrix(matrix: &CsrMatrix) -> Self {
        let mut set = FxHashSet::default();
        set.reserve(matrix.nnz());

        for (r, row) in matrix.rows().enumerate() {
            for (c, v) in row.iter() {
                if v != 0.0 {
                    set.insert((r as u32, c as u32));
                }
            }
        }

        RowColumnSet { set }
    }

    pub fn contains_pair(&self, row: usize, col: usize) -> bool {
        self.set.contains(&(row as u32, col as u32))
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

#[test]
fn test_explicit_zeros_excluded() {
    use crate::sparse::CsrBuilder;

    let mut bld = CsrBuilder::new(3);
    bld.push_row(vec![(0, 1.0), (2, 0.0)]);
    bld.push_row(vec![(1, 1.0)]);
    let set = RowColumnSet::from_matrix(&bld.finish());
    assert_eq!(set.len(), 2);
    assert!(set.contains_pair(0, 0));
    assert!(!set.contains_pair(0, 2));
    assert!(set.contains_pair(1, 1));
    assert!(!set.contains_pair(1, 0));
}
