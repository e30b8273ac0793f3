// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Bounded top-k accumulator for similarity truncation and ranking.
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ordered_float::NotNan;

use crate::errors::{RecError, Result};

/// Keeps the `limit` best `(index, weight)` entries offered to it.
///
/// "Best" means larger weight; among equal weights the lower index wins, so
/// the retained set never depends on the order entries are offered in.
#[derive(Clone, Default)]
pub(crate) enum ScoreAccumulator {
    #[default]
    Empty,
    Partial(Vec<AccEntry>),
    Full(BinaryHeap<AccEntry>),
}

impl ScoreAccumulator {
    pub fn new() -> Self {
        Self::Empty
    }

    fn heap_mut(&mut self) -> &mut BinaryHeap<AccEntry> {
        match self {
            ScoreAccumulator::Full(h) => h,
            ScoreAccumulator::Empty => {
                *self = ScoreAccumulator::Full(BinaryHeap::new());
                self.heap_mut()
            }
            ScoreAccumulator::Partial(vec) => {
                let heap = BinaryHeap::from(std::mem::take(vec));
                *self = ScoreAccumulator::Full(heap);
                self.heap_mut()
            }
        }
    }

    fn vector_mut(&mut self, limit: usize) -> Option<&mut Vec<AccEntry>> {
        match self {
            ScoreAccumulator::Empty => {
                *self = ScoreAccumulator::Partial(Vec::with_capacity(limit.min(64)));
                self.vector_mut(limit)
            }
            ScoreAccumulator::Partial(vec) if vec.len() < limit => Some(vec),
            _ => None,
        }
    }

    /// Offer an entry, keeping at most `limit` entries.
    pub fn add(&mut self, limit: usize, index: i32, weight: f32) -> Result<()> {
        if limit == 0 {
            return Ok(());
        }
        let entry = AccEntry::new(index, weight)?;
        if let Some(vec) = self.vector_mut(limit) {
            vec.push(entry);
        } else {
            let heap = self.heap_mut();
            let better = match heap.peek() {
                Some(worst) => entry < *worst,
                None => true,
            };
            if better {
                heap.push(entry);
                while heap.len() > limit {
                    heap.pop();
                }
            }
        }

        Ok(())
    }

    /// Take the retained entries, best first.
    pub fn into_ranked(self) -> Vec<(i32, f32)> {
        let mut entries = match self {
            Self::Empty => Vec::new(),
            Self::Partial(vec) => vec,
            Self::Full(heap) => heap.into_vec(),
        };
        entries.sort_unstable();
        entries.into_iter().map(AccEntry::into_pair).collect()
    }

    /// Take the retained entries, sorted by index.
    pub fn into_row(self) -> Vec<(i32, f32)> {
        let mut row = self.into_ranked();
        row.sort_unstable_by_key(|(i, _w)| *i);
        row
    }
}

/// Entries in the accumulator heaps.
///
/// The ordering puts better entries first: `a < b` when `a` has the larger
/// weight, or the same weight and the smaller index.  A max-heap of entries
/// therefore has the worst retained entry on top.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AccEntry {
    weight: NotNan<f32>,
    index: i32,
}

impl AccEntry {
    fn new(index: i32, weight: f32) -> Result<AccEntry> {
        Ok(AccEntry {
            weight: NotNan::new(weight).map_err(|_e| RecError::NotANumber("score"))?,
            index,
        })
    }

    fn into_pair(self) -> (i32, f32) {
        (self.index, self.weight.into_inner())
    }
}

impl PartialEq for AccEntry {
    fn eq(&self, other: &Self) -> bool {
        self.weight == other.weight && self.index == other.index
    }
}

impl Eq for AccEntry {}

impl PartialOrd for AccEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AccEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .weight
            .cmp(&self.weight)
            .then_with(|| self.index.cmp(&other.index))
    }
}

#[test]
fn test_keeps_largest() {
    let mut acc = ScoreAccumulator::new();
    for (i, w) in [(0, 0.1), (1, 0.9), (2, 0.5), (3, 0.7), (4, 0.2)] {
        acc.add(3, i, w).unwrap();
    }
    assert_eq!(acc.into_ranked(), vec![(1, 0.9), (3, 0.7), (2, 0.5)]);
}

#[test]
fn test_under_limit_keeps_all() {
    let mut acc = ScoreAccumulator::new();
    acc.add(5, 4, 1.0).unwrap();
    acc.add(5, 2, 2.0).unwrap();
    assert_eq!(acc.into_row(), vec![(2, 2.0), (4, 1.0)]);
}

#[test]
fn test_ties_prefer_lower_index() {
    // offer in both orders, the retained set must be the same
    let mut fwd = ScoreAccumulator::new();
    let mut rev = ScoreAccumulator::new();
    for i in 0..6 {
        fwd.add(2, i, 1.0).unwrap();
        rev.add(2, 5 - i, 1.0).unwrap();
    }
    assert_eq!(fwd.into_ranked(), vec![(0, 1.0), (1, 1.0)]);
    assert_eq!(rev.into_ranked(), vec![(0, 1.0), (1, 1.0)]);
}

#[test]
fn test_zero_limit() {
    let mut acc = ScoreAccumulator::new();
    acc.add(0, 1, 1.0).unwrap();
    assert!(acc.into_ranked().is_empty());
}

#[test]
fn test_rejects_nan() {
    let mut acc = ScoreAccumulator::new();
    assert!(matches!(
        acc.add(3, 0, f32::NAN),
        Err(RecError::NotANumber(_))
    ));
}
