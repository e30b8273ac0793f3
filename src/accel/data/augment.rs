// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Content matrix augmentation with interaction data.

use log::*;

use crate::errors::{RecError, Result};
use crate::sparse::CsrMatrix;

/// Append users as pseudo-attributes of the items they interacted with.
///
/// The result has the content matrix's attribute rows followed by one row per
/// user, holding that user's interactions scaled by `weight`.
pub fn augment_with_interactions(
    content: &CsrMatrix,
    interactions: &CsrMatrix,
    weight: f32,
) -> Result<CsrMatrix> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(RecError::InvalidConfig(format!(
            "interaction weight must be finite and non-negative, got {}",
            weight
        )));
    }
    if content.n_cols() != interactions.n_cols() {
        return Err(RecError::ShapeMismatch(format!(
            "content matrix has {} items, interaction matrix has {}",
            content.n_cols(), interactions.n_cols()
        )));
    }

    debug!(
        "augmenting {} attributes with {} users at weight {}",
        content.n_rows(), interactions.n_rows(), weight
    );
    content.vstack(&interactions.scale(weight))
}

#[test]
fn test_augment_stacks_weighted_users() {
    use crate::sparse::CsrBuilder;

    let mut icm = CsrBuilder::new(3);
    icm.push_row(vec![(0, 1.0), (1, 1.0)]);
    let icm = icm.finish();

    let mut urm = CsrBuilder::new(3);
    urm.push_row(vec![(1, 1.0), (2, 1.0)]);
    urm.push_row(vec![(0, 1.0)]);
    let urm = urm.finish();

    let aug = augment_with_interactions(&icm, &urm, 0.5).unwrap();
    assert_eq!(aug.shape(), (3, 3));
    assert_eq!(aug.get(0, 0), 1.0);
    assert_eq!(aug.get(1, 2), 0.5);
    assert_eq!(aug.get(2, 0), 0.5);
}

#[test]
fn test_augment_rejects_mismatch() {
    let res = augment_with_interactions(&CsrMatrix::empty(1, 3), &CsrMatrix::empty(1, 4), 1.0);
    assert!(matches!(res, Err(RecError::ShapeMismatch(_))));
}

#[test]
fn test_augment_rejects_negative_weight() {
    let res = augment_with_interactions(&CsrMatrix::empty(1, 3), &CsrMatrix::empty(1, 3), -1.0);
    assert!(matches!(res, Err(RecError::InvalidConfig(_))));
}
