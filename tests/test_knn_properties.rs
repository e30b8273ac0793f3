// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Property tests for the similarity and prediction invariants.

use proptest::prelude::*;

use trackrec::{
    knn::{compute_similarities, predict_ratings, rank_row, NeighborSpace, SimilarityParams},
    ContentKnn, CooMatrixBuilder, CsrMatrix, IdIndex, KnnConfig, NeighborScope, Universe,
};

const USER_BASE: u32 = 100;
const ITEM_BASE: u32 = 1000;

/// Random problem: content, interactions, neighborhood size and shrinkage.
#[derive(Debug, Clone)]
struct Problem {
    content: CsrMatrix,
    interactions: CsrMatrix,
    neighbors: usize,
    shrinkage: f32,
}

fn matrix(n_rows: usize, n_cols: usize, entries: &[(usize, usize, f32)]) -> CsrMatrix {
    let mut bld = CooMatrixBuilder::with_capacity(entries.len());
    for (r, c, v) in entries {
        bld.add_entry(*r as i32, *c as i32, *v);
    }
    bld.finish().to_csr(n_rows, n_cols).unwrap()
}

fn problem_strategy() -> impl Strategy<Value = Problem> {
    (1usize..12, 1usize..8, 1usize..6)
        .prop_flat_map(|(n_items, n_attrs, n_users)| {
            (
                prop::collection::vec((0..n_attrs, 0..n_items, 0.1f32..3.0), 0..40),
                prop::collection::vec((0..n_users, 0..n_items), 0..25),
                1usize..6,
                prop_oneof![Just(0.0f32), 0.1f32..20.0],
                Just((n_items, n_attrs, n_users)),
            )
        })
        .prop_map(|(content, urm, neighbors, shrinkage, (n_items, n_attrs, n_users))| {
            let urm: Vec<_> = urm.into_iter().map(|(u, i)| (u, i, 1.0)).collect();
            Problem {
                content: matrix(n_attrs, n_items, &content),
                interactions: matrix(n_users, n_items, &urm),
                neighbors,
                shrinkage,
            }
        })
}

/// A problem with shuffled subsets of users and items as fit targets.
#[derive(Debug, Clone)]
struct TargetedProblem {
    problem: Problem,
    users: Vec<usize>,
    items: Vec<usize>,
    scope: NeighborScope,
}

fn targeted_strategy() -> impl Strategy<Value = TargetedProblem> {
    (problem_strategy(), any::<bool>())
        .prop_flat_map(|(problem, target_scope)| {
            let n_users = problem.interactions.n_rows();
            let n_items = problem.content.n_cols();
            let scope = if target_scope {
                NeighborScope::TargetItems
            } else {
                NeighborScope::AllItems
            };
            (
                Just(problem),
                prop::sample::subsequence((0..n_users).collect::<Vec<_>>(), 0..=n_users)
                    .prop_shuffle(),
                prop::sample::subsequence((0..n_items).collect::<Vec<_>>(), 0..=n_items)
                    .prop_shuffle(),
                Just(scope),
            )
        })
        .prop_map(|(problem, users, items, scope)| TargetedProblem {
            problem,
            users,
            items,
            scope,
        })
}

/// Fit the engine on a targeted problem, with IDs offset from positions.
fn fit_targets(tp: &TargetedProblem, chunk_size: usize) -> ContentKnn<u32, u32> {
    let p = &tp.problem;
    let universe = Universe::new(
        IdIndex::new((0..p.interactions.n_rows() as u32).map(|u| u + USER_BASE).collect())
            .unwrap(),
        IdIndex::new((0..p.content.n_cols() as u32).map(|i| i + ITEM_BASE).collect()).unwrap(),
    );
    let users: Vec<u32> = tp.users.iter().map(|u| *u as u32 + USER_BASE).collect();
    let items: Vec<u32> = tp.items.iter().map(|i| *i as u32 + ITEM_BASE).collect();
    let config = KnnConfig::default()
        .with_shrinkage(p.shrinkage as f64)
        .with_neighbors(p.neighbors)
        .with_chunk_size(chunk_size)
        .with_scope(tp.scope);

    let mut knn = ContentKnn::new(config);
    knn.fit(&p.interactions, &p.content, &universe, &users, &items)
        .unwrap();
    knn
}

fn similarities(p: &Problem, chunk_size: usize) -> CsrMatrix {
    let n_items = p.content.n_cols();
    let targets: Vec<usize> = (0..n_items).collect();
    let params = SimilarityParams {
        shrinkage: p.shrinkage,
        neighbors: p.neighbors,
        chunk_size,
    };
    compute_similarities(
        &p.content,
        &targets,
        &NeighborSpace::all_items(n_items),
        &params,
    )
    .unwrap()
}

proptest! {
    #[test]
    fn similarity_rows_are_normalized(p in problem_strategy()) {
        let sim = similarities(&p, 3);
        for (i, row) in sim.rows().enumerate() {
            prop_assert!(row.len() <= p.neighbors);
            prop_assert!(row.vals().iter().all(|v| *v > 0.0));
            prop_assert!(row.cols().windows(2).all(|w| w[0] < w[1]));
            prop_assert!(!row.cols().contains(&(i as i32)));
            if !row.is_empty() {
                let sum: f64 = row.vals().iter().map(|v| *v as f64).sum();
                prop_assert!((sum - 1.0).abs() < 1e-4, "row {} sums to {}", i, sum);
            }
        }
    }

    #[test]
    fn similarity_independent_of_chunking(p in problem_strategy()) {
        let one = similarities(&p, 1);
        let all = similarities(&p, p.content.n_cols());
        prop_assert_eq!(one, all);
    }

    #[test]
    fn predictions_mask_history(p in problem_strategy()) {
        let n_items = p.content.n_cols();
        let sim = similarities(&p, 4);
        let users: Vec<usize> = (0..p.interactions.n_rows()).collect();
        let items: Vec<usize> = (0..n_items).collect();
        let rhat = predict_ratings(
            &p.interactions,
            &users,
            &items,
            &sim,
            &NeighborSpace::all_items(n_items),
        )
        .unwrap();

        prop_assert_eq!(rhat.shape(), (users.len(), n_items));
        for (u, row) in rhat.rows().enumerate() {
            for (i, v) in row.iter() {
                prop_assert!(v > 0.0);
                prop_assert_eq!(p.interactions.get(u, i), 0.0);
            }
        }
    }

    #[test]
    fn ranking_is_bounded_and_ordered(p in problem_strategy(), at in 1usize..6) {
        let n_items = p.content.n_cols();
        let sim = similarities(&p, 4);
        let users: Vec<usize> = (0..p.interactions.n_rows()).collect();
        let items: Vec<usize> = (0..n_items).collect();
        let rhat = predict_ratings(
            &p.interactions,
            &users,
            &items,
            &sim,
            &NeighborSpace::all_items(n_items),
        )
        .unwrap();

        for row in rhat.rows() {
            let ranked = rank_row(row, at).unwrap();
            prop_assert_eq!(ranked.len(), row.len().min(at));
            prop_assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
        }
    }

    #[test]
    fn targeted_predictions_mask_history(tp in targeted_strategy()) {
        let knn = fit_targets(&tp, 2);
        let rhat = knn.get_model().unwrap();
        let users = knn.target_users().unwrap();
        let items = knn.target_items().unwrap();
        prop_assert_eq!(rhat.shape(), (tp.users.len(), tp.items.len()));

        for (r, row) in rhat.rows().enumerate() {
            let u = (users.ids()[r] - USER_BASE) as usize;
            prop_assert_eq!(u, tp.users[r]);
            for (c, v) in row.iter() {
                let i = (items.ids()[c] - ITEM_BASE) as usize;
                prop_assert_eq!(i, tp.items[c]);
                prop_assert!(v > 0.0);
                prop_assert_eq!(tp.problem.interactions.get(u, i), 0.0);
            }
        }
    }

    #[test]
    fn targeted_similarity_bounded(tp in targeted_strategy()) {
        let knn = fit_targets(&tp, 3);
        let sim = knn.similarity().unwrap();
        let n_cols = match tp.scope {
            NeighborScope::AllItems => tp.problem.content.n_cols(),
            NeighborScope::TargetItems => tp.items.len(),
        };
        prop_assert_eq!(sim.shape(), (tp.items.len(), n_cols));

        for (r, row) in sim.rows().enumerate() {
            let self_col = match tp.scope {
                NeighborScope::AllItems => tp.items[r],
                NeighborScope::TargetItems => r,
            };
            prop_assert!(row.len() <= tp.problem.neighbors);
            prop_assert!(!row.cols().contains(&(self_col as i32)));
            prop_assert!(row.vals().iter().all(|v| *v > 0.0));
        }
    }

    #[test]
    fn targeted_fit_independent_of_chunking(tp in targeted_strategy()) {
        let one = fit_targets(&tp, 1);
        let all = fit_targets(&tp, tp.items.len().max(1));
        prop_assert_eq!(one.similarity().unwrap(), all.similarity().unwrap());
        prop_assert_eq!(one.get_model().unwrap(), all.get_model().unwrap());
    }
}
