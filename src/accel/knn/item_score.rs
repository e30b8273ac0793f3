// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

use log::*;
use rayon::prelude::*;

use crate::{
    data::RowColumnSet,
    errors::{RecError, Result},
    progress::ProgressHandle,
    sparse::{CsrBuilder, CsrMatrix, CsrRow},
};

use super::item_train::NeighborSpace;

/// Dense per-user score buffer over target positions.
struct ScoreScratch {
    scores: Vec<f32>,
    seen: Vec<bool>,
    used: Vec<usize>,
}

impl ScoreScratch {
    fn new(n: usize) -> Self {
        ScoreScratch {
            scores: vec![0.0; n],
            seen: vec![false; n],
            used: Vec::new(),
        }
    }
}

/// Predict ratings for target users and target items.
///
/// `similarity` has one row per target item and one column per entry of
/// `space`.  Row `r` of the result holds user `target_users[r]`, and column
/// `c` holds item `target_items[c]`.  Cells the user already interacted with
/// are left out.
pub fn predict_ratings(
    interactions: &CsrMatrix,
    target_users: &[usize],
    target_items: &[usize],
    similarity: &CsrMatrix,
    space: &NeighborSpace,
) -> Result<CsrMatrix> {
    if interactions.n_cols() != space.n_items() {
        return Err(RecError::ShapeMismatch(format!(
            "interaction matrix has {} items, universe has {}",
            interactions.n_cols(),
            space.n_items()
        )));
    }
    if similarity.n_rows() != target_items.len() || similarity.n_cols() != space.len() {
        return Err(RecError::ShapeMismatch(format!(
            "similarity matrix is {}x{}, expected {}x{}",
            similarity.n_rows(),
            similarity.n_cols(),
            target_items.len(),
            space.len()
        )));
    }

    let urm = interactions.select_rows(target_users)?;
    let known = RowColumnSet::from_matrix(&urm.select_columns(target_items)?);
    debug!(
        "scoring {} users against {} items, masking {} known interactions",
        urm.n_rows(),
        target_items.len(),
        known.len()
    );

    // neighbor column -> (target position, weight)
    let weights = similarity.transpose();
    let n_targets = target_items.len();

    let progress = ProgressHandle::new("scored users", urm.n_rows());
    let rows: Vec<CsrRow> = (0..urm.n_rows())
        .into_par_iter()
        .map_init(
            || ScoreScratch::new(n_targets),
            |scratch, u| {
                let row = score_user(u, &urm, &weights, space, &known, scratch);
                progress.tick();
                row
            },
        )
        .collect();
    progress.finish();

    let nnz = rows.iter().map(Vec::len).sum();
    let mut bld = CsrBuilder::with_capacity(n_targets, rows.len(), nnz);
    bld.extend(rows);
    let ratings = bld.finish();
    debug!(
        "predicted {} ratings for {} users",
        ratings.nnz(),
        ratings.n_rows()
    );
    Ok(ratings)
}

fn score_user(
    user: usize,
    urm: &CsrMatrix,
    weights: &CsrMatrix,
    space: &NeighborSpace,
    known: &RowColumnSet,
    scratch: &mut ScoreScratch,
) -> CsrRow {
    for (item, w) in urm.row(user).iter() {
        let Some(col) = space.column(item) else {
            continue;
        };
        for (t, s) in weights.row(col).iter() {
            if !scratch.seen[t] {
                scratch.seen[t] = true;
                scratch.used.push(t);
            }
            scratch.scores[t] += w * s;
        }
    }

    let mut row: CsrRow = Vec::with_capacity(scratch.used.len());
    for t in scratch.used.drain(..) {
        let score = scratch.scores[t];
        if score > 0.0 && !known.contains_pair(user, t) {
            row.push((t as i32, score));
        }
        scratch.scores[t] = 0.0;
        scratch.seen[t] = false;
    }
    row.sort_unstable_by_key(|(t, _s)| *t);
    row
}

#[test]
fn test_masks_known_items() {
    // items 0 and 1 are mutual neighbors, item 2 follows item 0
    let mut sim = CsrBuilder::new(3);
    sim.push_row(vec![(1, 1.0)]);
    sim.push_row(vec![(0, 1.0)]);
    sim.push_row(vec![(0, 1.0)]);
    let sim = sim.finish();

    let mut urm = CsrBuilder::new(3);
    urm.push_row(vec![(0, 1.0)]);
    urm.push_row(vec![(0, 1.0), (1, 1.0)]);
    let urm = urm.finish();

    let space = NeighborSpace::all_items(3);
    let rhat = predict_ratings(&urm, &[0, 1], &[0, 1, 2], &sim, &space).unwrap();
    assert_eq!(rhat.shape(), (2, 3));
    assert_eq!(rhat.row_cols(0), &[1, 2]);
    assert_eq!(rhat.get(0, 0), 0.0);
    assert_eq!(rhat.row_cols(1), &[2]);
}

#[test]
fn test_shape_mismatch() {
    let sim = CsrMatrix::empty(2, 3);
    let urm = CsrMatrix::empty(1, 4);
    let space = NeighborSpace::all_items(3);
    assert!(matches!(
        predict_ratings(&urm, &[0], &[0, 1], &sim, &space),
        Err(RecError::ShapeMismatch(_))
    ));
}

#[test]
fn test_empty_targets() {
    let urm = CsrMatrix::empty(2, 3);
    let space = NeighborSpace::all_items(3);
    let sim = CsrMatrix::empty(0, 3);
    let rhat = predict_ratings(&urm, &[0, 1], &[], &sim, &space).unwrap();
    assert_eq!(rhat.shape(), (2, 0));
}
