// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Item-item similarity from content attributes.
use log::*;
use rayon::prelude::*;

use crate::{
    config::NeighborScope,
    errors::{RecError, Result},
    progress::ProgressHandle,
    sparse::{CsrBuilder, CsrMatrix, CsrRow},
};

use super::accum::ScoreAccumulator;

/// Parameters for similarity computation.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityParams {
    /// Significance-weighting shrinkage (0 disables it).
    pub shrinkage: f32,
    /// Maximum number of neighbors kept per row.
    pub neighbors: usize,
    /// Number of target rows per batch.
    pub chunk_size: usize,
}

/// Columns of the similarity matrix, as a map from item index to column.
#[derive(Debug, Clone)]
pub struct NeighborSpace {
    n_items: usize,
    n_columns: usize,
    columns: Option<Vec<i32>>,
}

impl NeighborSpace {
    /// Every item is its own column.
    pub fn all_items(n_items: usize) -> Self {
        NeighborSpace {
            n_items,
            n_columns: n_items,
            columns: None,
        }
    }

    /// Only the target items are columns, in target order.
    pub fn targets(n_items: usize, targets: &[usize]) -> Self {
        let mut columns = vec![-1; n_items];
        for (pos, item) in targets.iter().enumerate() {
            columns[*item] = pos as i32;
        }
        NeighborSpace {
            n_items,
            n_columns: targets.len(),
            columns: Some(columns),
        }
    }

    pub fn for_scope(scope: NeighborScope, n_items: usize, targets: &[usize]) -> Self {
        match scope {
            NeighborScope::AllItems => Self::all_items(n_items),
            NeighborScope::TargetItems => Self::targets(n_items, targets),
        }
    }

    /// The similarity column for an item, if the item is a candidate neighbor.
    pub fn column(&self, item: usize) -> Option<usize> {
        match &self.columns {
            None => Some(item),
            Some(cols) => {
                let c = cols[item];
                if c >= 0 {
                    Some(c as usize)
                } else {
                    None
                }
            }
        }
    }

    /// Number of items in the universe.
    pub fn n_items(&self) -> usize {
        self.n_items
    }

    /// Number of similarity columns.
    pub fn len(&self) -> usize {
        self.n_columns
    }

    pub fn is_empty(&self) -> bool {
        self.n_columns == 0
    }
}

/// Dense accumulation buffers, reused across the rows a worker computes.
struct RowScratch {
    dots: Vec<f32>,
    seen: Vec<bool>,
    used: Vec<usize>,
}

impl RowScratch {
    fn new(n: usize) -> Self {
        RowScratch {
            dots: vec![0.0; n],
            seen: vec![false; n],
            used: Vec::new(),
        }
    }

    fn reset(&mut self) {
        for c in self.used.drain(..) {
            self.dots[c] = 0.0;
            self.seen[c] = false;
        }
    }
}

/// Compute the truncated, shrunk, row-normalized cosine similarity matrix.
///
/// Row `r` of the result holds the neighbors of item `targets[r]`, with
/// columns given by `space`.  The content matrix has one row per attribute
/// and one column per item.
pub fn compute_similarities(
    content: &CsrMatrix,
    targets: &[usize],
    space: &NeighborSpace,
    params: &SimilarityParams,
) -> Result<CsrMatrix> {
    if content.n_cols() != space.n_items() {
        return Err(RecError::ShapeMismatch(format!(
            "content matrix has {} items, neighbor space has {}",
            content.n_cols(),
            space.n_items()
        )));
    }
    if let Some(bad) = targets.iter().find(|t| **t >= content.n_cols()) {
        return Err(RecError::ShapeMismatch(format!(
            "target item {} out of bounds for {} items",
            bad, content.n_cols()
        )));
    }
    if params.neighbors == 0 || params.chunk_size == 0 {
        return Err(RecError::InvalidConfig(
            "neighbors and chunk size must be positive".into(),
        ));
    }
    if !params.shrinkage.is_finite() || params.shrinkage < 0.0 {
        return Err(RecError::InvalidConfig(format!(
            "invalid shrinkage {}",
            params.shrinkage
        )));
    }

    debug!(
        "normalizing {} x {} content matrix ({} entries)",
        content.n_rows(),
        content.n_cols(),
        content.nnz()
    );
    let norms = content.l2_column_norms();
    let icm = content.divide_columns(&norms);
    let profiles = icm.transpose();

    debug!(
        "computing similarities for {} targets over {} neighbors in batches of {}",
        targets.len(),
        space.len(),
        params.chunk_size
    );
    let progress = ProgressHandle::new("similarity rows", targets.len());
    let chunks = targets
        .par_chunks(params.chunk_size)
        .map_init(
            || RowScratch::new(space.len()),
            |scratch, chunk| {
                let rows = chunk
                    .iter()
                    .map(|item| sim_row(*item, &profiles, &icm, space, params, scratch))
                    .collect::<Result<Vec<CsrRow>>>();
                progress.advance(chunk.len());
                rows
            },
        )
        .collect::<Result<Vec<_>>>()?;
    progress.finish();

    let n_sim = chunks
        .iter()
        .flat_map(|c| c.iter().map(Vec::len))
        .sum::<usize>();
    debug!(
        "computed {} similarities in {} batches",
        n_sim,
        chunks.len()
    );

    let mut bld = CsrBuilder::with_capacity(space.len(), targets.len(), n_sim);
    for chunk in chunks {
        bld.extend(chunk);
    }
    Ok(bld.finish())
}

/// Compute one similarity row from the normalized content matrix.
fn sim_row(
    item: usize,
    profiles: &CsrMatrix,
    icm: &CsrMatrix,
    space: &NeighborSpace,
    params: &SimilarityParams,
    scratch: &mut RowScratch,
) -> Result<CsrRow> {
    let self_col = space.column(item);

    // loop over the item's attributes
    for (attr, a) in profiles.row(item).iter() {
        // loop over the attribute's items
        for (other, b) in icm.row(attr).iter() {
            let col = match space.column(other) {
                Some(c) if Some(c) != self_col => c,
                _ => continue,
            };
            if !scratch.seen[col] {
                scratch.seen[col] = true;
                scratch.used.push(col);
            }
            scratch.dots[col] += a * b;
        }
    }

    let raw: CsrRow = scratch
        .used
        .iter()
        .map(|c| (*c as i32, scratch.dots[*c]))
        .collect();
    scratch.reset();

    finish_row(raw, params.shrinkage, params.neighbors)
}

/// Apply shrinkage, keep the `k` strongest neighbors, and normalize the row to sum to 1.
///
/// Non-positive similarities are dropped.  A row with nothing left stays empty.
/// The result is sorted by column.
pub fn finish_row(raw: CsrRow, shrinkage: f32, k: usize) -> Result<CsrRow> {
    let mut acc = ScoreAccumulator::new();
    for (c, s) in raw {
        let s = shrink(s, shrinkage);
        if s > 0.0 {
            acc.add(k, c, s)?;
        }
    }
    let mut row = acc.into_row();
    normalize_row(&mut row);
    Ok(row)
}

/// Significance weighting: `s^2 / (s + h)`, and exactly `s` when `h` is 0.
pub fn shrink(s: f32, h: f32) -> f32 {
    if h == 0.0 {
        s
    } else {
        s * s / (s + h)
    }
}

fn normalize_row(row: &mut CsrRow) {
    let total: f64 = row.iter().map(|(_c, v)| *v as f64).sum();
    if total > 0.0 {
        for (_c, v) in row.iter_mut() {
            *v = (*v as f64 / total) as f32;
        }
    } else {
        row.clear();
    }
}

#[test]
fn test_shrink_identity() {
    for s in [0.1f32, 0.333, 0.5, 0.7071, 1.0] {
        assert_eq!(shrink(s, 0.0).to_bits(), s.to_bits());
    }
}

#[test]
fn test_shrink_discounts_weak() {
    let strong = shrink(0.9, 1.0) / 0.9;
    let weak = shrink(0.1, 1.0) / 0.1;
    assert!(strong > weak);
    assert!((shrink(0.5, 0.5) - 0.25).abs() < 1e-7);
}

#[test]
fn test_finish_row_truncates_and_normalizes() {
    let row = finish_row(vec![(3, 0.5), (1, 1.0), (2, 0.25), (0, 0.0)], 0.0, 2).unwrap();
    assert_eq!(row.len(), 2);
    assert_eq!(row[0].0, 1);
    assert_eq!(row[1].0, 3);
    assert!((row[0].1 - 2.0 / 3.0).abs() < 1e-6);
    assert!((row[1].1 - 1.0 / 3.0).abs() < 1e-6);
}

#[test]
fn test_finish_row_empty() {
    assert!(finish_row(vec![(0, 0.0)], 10.0, 5).unwrap().is_empty());
    assert!(finish_row(Vec::new(), 0.0, 5).unwrap().is_empty());
}

#[test]
fn test_neighbor_space_targets() {
    let space = NeighborSpace::targets(5, &[3, 1]);
    assert_eq!(space.len(), 2);
    assert_eq!(space.column(3), Some(0));
    assert_eq!(space.column(1), Some(1));
    assert_eq!(space.column(0), None);
    let all = NeighborSpace::all_items(5);
    assert_eq!(all.column(4), Some(4));
}

#[test]
fn test_repeated_attribute_entries_summed() {
    // attribute 0 lists item 0 twice, so item 0 is (2, 0)
    let mut bld = CsrBuilder::new(3);
    bld.push_row(vec![(0, 1.0), (0, 1.0), (1, 1.0)]);
    bld.push_row(vec![(1, 1.0), (2, 1.0)]);
    let content = bld.finish();

    let norms = content.l2_column_norms();
    assert!((norms[0] - 2.0).abs() < 1e-6);
    assert!((norms[1] - 2.0f32.sqrt()).abs() < 1e-6);

    let params = SimilarityParams {
        shrinkage: 0.0,
        neighbors: 5,
        chunk_size: 2,
    };
    let sim = compute_similarities(&content, &[0, 1, 2], &NeighborSpace::all_items(3), &params)
        .unwrap();
    assert_eq!(sim.row_cols(1), &[0, 2]);
    assert!((sim.get(1, 0) - 0.5).abs() < 1e-6);
    assert!((sim.get(1, 2) - 0.5).abs() < 1e-6);
}

#[test]
fn test_single_row_batches() {
    let mut bld = CsrBuilder::new(3);
    bld.push_row(vec![(0, 1.0), (1, 2.0)]);
    bld.push_row(vec![(1, 1.0), (2, 1.0)]);
    let content = bld.finish();
    let space = NeighborSpace::targets(3, &[2, 1]);
    let run = |chunk_size| {
        let params = SimilarityParams {
            shrinkage: 1.0,
            neighbors: 2,
            chunk_size,
        };
        compute_similarities(&content, &[2, 1], &space, &params).unwrap()
    };
    let one = run(1);
    assert_eq!(one.shape(), (2, 2));
    assert_eq!(one.row_cols(0), &[1]);
    assert_eq!(one, run(10));
}
