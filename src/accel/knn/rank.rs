// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Top-N selection from predicted ratings.
use rayon::prelude::*;

use crate::{
    data::{EntityId, IdIndex},
    errors::Result,
    sparse::{CsrMatrix, SparseRow},
};

use super::accum::ScoreAccumulator;

/// Select the `at` best columns of a row, with their scores, best first.
///
/// Only positive entries are candidates.  Equal scores rank the lower
/// column first.
pub fn rank_row(row: SparseRow<'_>, at: usize) -> Result<Vec<(usize, f32)>> {
    let mut acc = ScoreAccumulator::new();
    for (c, v) in row.iter() {
        if v > 0.0 {
            acc.add(at, c as i32, v)?;
        }
    }
    Ok(acc
        .into_ranked()
        .into_iter()
        .map(|(c, v)| (c as usize, v))
        .collect())
}

/// Rank the columns of every row of a rating matrix.
pub fn rank_rows(ratings: &CsrMatrix, at: usize) -> Result<Vec<Vec<usize>>> {
    (0..ratings.n_rows())
        .into_par_iter()
        .map(|r| -> Result<Vec<usize>> {
            let ranked = rank_row(ratings.row(r), at)?;
            Ok(ranked.into_iter().map(|(c, _v)| c).collect())
        })
        .collect()
}

/// Recommendation lists for a set of users, in user order.
#[derive(Debug, Clone)]
pub struct Recommendations<U, I> {
    users: IdIndex<U>,
    lists: Vec<Vec<I>>,
}

impl<U: EntityId, I: EntityId> Recommendations<U, I> {
    /// Map ranked column positions to item IDs.
    pub(crate) fn from_ranked(
        users: IdIndex<U>,
        items: &IdIndex<I>,
        ranked: Vec<Vec<usize>>,
    ) -> Self {
        debug_assert_eq!(users.len(), ranked.len());
        let lists = ranked
            .into_iter()
            .map(|cols| {
                cols.into_iter()
                    .filter_map(|c| items.get_id(c).cloned())
                    .collect()
            })
            .collect();
        Recommendations { users, lists }
    }

    /// Number of users with a list (possibly empty).
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Get the list for a user, or `None` if the user was not a target.
    pub fn get(&self, user: &U) -> Option<&[I]> {
        self.users.get_index(user).map(|u| self.lists[u].as_slice())
    }

    /// Iterate over users and their lists in target order.
    pub fn iter(&self) -> impl Iterator<Item = (&U, &[I])> + '_ {
        self.users
            .ids()
            .iter()
            .zip(self.lists.iter().map(Vec::as_slice))
    }

    /// The users with recommendation lists.
    pub fn users(&self) -> &IdIndex<U> {
        &self.users
    }
}

#[test]
fn test_rank_row_order() {
    use crate::sparse::CsrBuilder;

    let mut bld = CsrBuilder::new(5);
    bld.push_row(vec![(0, 0.2), (1, 0.5), (2, 0.5), (3, 0.9), (4, 0.0)]);
    bld.push_empty();
    let m = bld.finish();

    let ranked = rank_rows(&m, 3).unwrap();
    assert_eq!(ranked, vec![vec![3, 1, 2], vec![]]);
    let ranked = rank_rows(&m, 10).unwrap();
    assert_eq!(ranked[0], vec![3, 1, 2, 0]);
}

#[test]
fn test_recommendations_lookup() {
    let users = IdIndex::new(vec!["u1".to_string(), "u2".to_string()]).unwrap();
    let items = IdIndex::new(vec![10u32, 20, 30]).unwrap();
    let recs = Recommendations::from_ranked(users, &items, vec![vec![2, 0], vec![]]);
    assert_eq!(recs.len(), 2);
    assert_eq!(recs.get(&"u1".to_string()), Some(&[30u32, 10][..]));
    assert_eq!(recs.get(&"u2".to_string()), Some(&[] as &[u32]));
    assert_eq!(recs.get(&"u3".to_string()), None);
    let users: Vec<_> = recs.iter().map(|(u, _l)| u.clone()).collect();
    assert_eq!(users, vec!["u1", "u2"]);
}
