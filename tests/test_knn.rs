// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! End-to-end tests of the k-NN engine on small hand-checked data.

use trackrec::{
    CooMatrixBuilder, ContentKnn, CsrBuilder, CsrMatrix, IdIndex, KnnConfig, NeighborScope,
    RecError, Universe,
};

const ITEMS: [&str; 4] = ["A", "B", "C", "D"];

fn universe(users: &[&'static str]) -> Universe<&'static str, &'static str> {
    Universe::new(
        IdIndex::new(users.to_vec()).unwrap(),
        IdIndex::new(ITEMS.to_vec()).unwrap(),
    )
}

/// Content for four items: A and B share both attributes, C shares one with
/// them, and D has an attribute of its own.
fn content() -> CsrMatrix {
    let mut bld = CooMatrixBuilder::new();
    for (attr, item) in [(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (2, 2), (3, 3)] {
        bld.add_entry(attr, item, 1.0);
    }
    bld.finish().to_csr(4, 4).unwrap()
}

fn interactions(rows: &[&[usize]]) -> CsrMatrix {
    let mut bld = CsrBuilder::new(4);
    for row in rows {
        bld.push_row(row.iter().map(|i| (*i as i32, 1.0)));
    }
    bld.finish()
}

fn config() -> KnnConfig {
    KnnConfig::default().with_shrinkage(0.0).with_neighbors(2)
}

fn assert_close(x: f32, y: f32) {
    assert!((x - y).abs() < 1e-5, "{} != {}", x, y);
}

#[test]
fn test_similarity_rows() {
    let uni = universe(&["u1"]);
    let urm = interactions(&[&[0]]);
    let mut knn = ContentKnn::new(config());
    knn.fit(&urm, &content(), &uni, &["u1"], &ITEMS).unwrap();

    let sim = knn.similarity().unwrap();
    assert_eq!(sim.shape(), (4, 4));

    // A: cos(A, B) = 1, cos(A, C) = 0.5
    assert_eq!(sim.row_cols(0), &[1, 2]);
    assert_close(sim.get(0, 1), 2.0 / 3.0);
    assert_close(sim.get(0, 2), 1.0 / 3.0);

    // C is equally close to A and B
    assert_eq!(sim.row_cols(2), &[0, 1]);
    assert_close(sim.get(2, 0), 0.5);
    assert_close(sim.get(2, 1), 0.5);

    // D has no neighbors
    assert!(sim.row(3).is_empty());

    for i in 0..4 {
        assert_eq!(sim.get(i, i), 0.0);
    }
}

#[test]
fn test_single_interaction_recommends_closest() {
    let uni = universe(&["u1"]);
    let urm = interactions(&[&[0]]);
    let mut knn = ContentKnn::new(config());
    knn.fit(&urm, &content(), &uni, &["u1"], &ITEMS).unwrap();

    let recs = knn.predict(1).unwrap();
    assert_eq!(recs.get(&"u1"), Some(&["B"][..]));

    let recs = knn.predict(5).unwrap();
    assert_eq!(recs.get(&"u1"), Some(&["B", "C"][..]));

    let rhat = knn.get_model().unwrap();
    assert_eq!(rhat.shape(), (1, 4));
    assert_eq!(rhat.get(0, 0), 0.0);
    assert_close(rhat.get(0, 1), 2.0 / 3.0);
    assert_close(rhat.get(0, 2), 0.5);
    assert_eq!(rhat.get(0, 3), 0.0);
}

#[test]
fn test_known_items_masked() {
    let uni = universe(&["u1", "u2"]);
    let urm = interactions(&[&[0, 1], &[3]]);
    let mut knn = ContentKnn::new(config());
    knn.fit(&urm, &content(), &uni, &["u1", "u2"], &ITEMS)
        .unwrap();

    let recs = knn.predict(5).unwrap();
    assert_eq!(recs.len(), 2);
    assert_eq!(recs.get(&"u1"), Some(&["C"][..]));
    // D's only fan gets nothing, D has no neighbors
    assert_eq!(recs.get(&"u2"), Some(&[] as &[&str]));

    let rhat = knn.get_model().unwrap();
    assert_close(rhat.get(0, 2), 1.0);
    assert_eq!(rhat.row_cols(0), &[2]);
}

#[test]
fn test_target_subsets() {
    let uni = universe(&["u1", "u2"]);
    let urm = interactions(&[&[0], &[1]]);
    let mut knn = ContentKnn::new(config());
    knn.fit(&urm, &content(), &uni, &["u2"], &["C", "A"]).unwrap();

    // rows are target items, columns are all items
    let sim = knn.similarity().unwrap();
    assert_eq!(sim.shape(), (2, 4));
    assert_eq!(sim.row_cols(0), &[0, 1]);

    // columns of the model are target positions
    let rhat = knn.get_model().unwrap();
    assert_eq!(rhat.shape(), (1, 2));
    assert_close(rhat.get(0, 0), 0.5);
    assert_close(rhat.get(0, 1), 2.0 / 3.0);

    let recs = knn.predict(5).unwrap();
    assert_eq!(recs.get(&"u2"), Some(&["A", "C"][..]));
    assert_eq!(recs.get(&"u1"), None);
    assert_eq!(knn.target_items().unwrap().ids(), &["C", "A"]);
}

#[test]
fn test_target_item_scope() {
    let uni = universe(&["u1", "u2"]);
    let urm = interactions(&[&[0], &[1]]);
    let mut knn = ContentKnn::new(config().with_scope(NeighborScope::TargetItems));
    knn.fit(&urm, &content(), &uni, &["u1", "u2"], &["A", "C"])
        .unwrap();

    let sim = knn.similarity().unwrap();
    assert_eq!(sim.shape(), (2, 2));
    assert_eq!(sim.row_cols(0), &[1]);
    assert_close(sim.get(0, 1), 1.0);
    assert_close(sim.get(1, 0), 1.0);

    let recs = knn.predict(5).unwrap();
    assert_eq!(recs.get(&"u1"), Some(&["C"][..]));
    // B is not a neighbor candidate, so u2's history is not used
    assert_eq!(recs.get(&"u2"), Some(&[] as &[&str]));
}

#[test]
fn test_item_weights_transposed() {
    let uni = universe(&["u1"]);
    let urm = interactions(&[&[0]]);
    let mut knn = ContentKnn::new(config());
    knn.fit(&urm, &content(), &uni, &["u1"], &["A", "C"]).unwrap();

    let sim = knn.similarity().unwrap();
    let weights = knn.item_weights().unwrap();
    assert_eq!(weights.shape(), (4, 2));
    assert_eq!(weights.get(1, 0), sim.get(0, 1));
    assert_eq!(weights.get(0, 1), sim.get(1, 0));
}

#[test]
fn test_shrinkage_keeps_row_sums() {
    let uni = universe(&["u1"]);
    let urm = interactions(&[&[0]]);
    let mut knn = ContentKnn::new(KnnConfig::default());
    knn.fit_with(&urm, &content(), &uni, &["u1"], &ITEMS, 1.0, 2)
        .unwrap();

    let sim = knn.similarity().unwrap();
    let sums = sim.row_sums();
    assert_close(sums[0], 1.0);
    // shrinkage favors the stronger neighbor more than the raw ratio does
    assert!(sim.get(0, 1) > 2.0 / 3.0);
    assert_eq!(knn.config().shrinkage, 10.0);
}

#[test]
fn test_neighbor_truncation() {
    let uni = universe(&["u1"]);
    let urm = interactions(&[&[0]]);
    let mut knn = ContentKnn::new(config().with_neighbors(1));
    knn.fit(&urm, &content(), &uni, &["u1"], &ITEMS).unwrap();

    let sim = knn.similarity().unwrap();
    assert_eq!(sim.row_cols(0), &[1]);
    assert_close(sim.get(0, 1), 1.0);
    // C's neighbors tie; the lower index wins
    assert_eq!(sim.row_cols(2), &[0]);
}

#[test]
fn test_item_based() {
    let uni = universe(&["u1", "u2", "u3", "u4"]);
    let urm = interactions(&[&[0, 1], &[0, 1], &[2], &[0]]);
    let mut knn = ContentKnn::new(config());
    knn.fit_item_based(&urm, &uni, &["u3", "u4"], &ITEMS)
        .unwrap();

    let sim = knn.similarity().unwrap();
    assert_eq!(sim.row_cols(0), &[1]);
    assert!(sim.row(2).is_empty());

    let recs = knn.predict(5).unwrap();
    assert_eq!(recs.get(&"u4"), Some(&["B"][..]));
    assert_eq!(recs.get(&"u3"), Some(&[] as &[&str]));
}

#[test]
fn test_augmented_content() {
    let uni = universe(&["u1", "u2"]);
    let urm = interactions(&[&[0, 3], &[1]]);

    let mut plain = ContentKnn::new(config());
    plain
        .fit(&urm, &content(), &uni, &["u2"], &ITEMS)
        .unwrap();
    assert!(plain.similarity().unwrap().row(3).is_empty());

    let mut knn = ContentKnn::new(config().with_interaction_weight(Some(1.0)));
    knn.fit(&urm, &content(), &uni, &["u2"], &ITEMS).unwrap();
    // u1 links A and D
    let sim = knn.similarity().unwrap();
    assert_eq!(sim.row_cols(3), &[0]);
    assert_close(sim.get(3, 0), 1.0);
}

#[test]
fn test_refit_replaces_state() {
    let uni = universe(&["u1", "u2"]);
    let urm = interactions(&[&[0], &[2]]);
    let mut knn = ContentKnn::new(config());
    knn.fit(&urm, &content(), &uni, &["u1"], &ITEMS).unwrap();
    knn.fit(&urm, &content(), &uni, &["u2"], &["A"]).unwrap();

    let recs = knn.predict(5).unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs.get(&"u2"), Some(&["A"][..]));
    assert_eq!(knn.get_model().unwrap().shape(), (1, 1));
}

#[test]
fn test_deterministic() {
    let uni = universe(&["u1", "u2"]);
    let urm = interactions(&[&[0, 2], &[3, 1]]);
    let cfg = config().with_interaction_weight(Some(0.5));

    let mut k1 = ContentKnn::new(cfg.clone());
    k1.fit(&urm, &content(), &uni, &["u1", "u2"], &ITEMS)
        .unwrap();
    let mut k2 = ContentKnn::new(cfg.with_chunk_size(1));
    k2.fit(&urm, &content(), &uni, &["u1", "u2"], &ITEMS)
        .unwrap();

    assert_eq!(k1.similarity().unwrap(), k2.similarity().unwrap());
    assert_eq!(k1.get_model().unwrap(), k2.get_model().unwrap());
}

#[test]
fn test_empty_targets() {
    let uni = universe(&["u1"]);
    let urm = interactions(&[&[0]]);
    let mut knn = ContentKnn::new(config());
    knn.fit(&urm, &content(), &uni, &[], &ITEMS).unwrap();
    assert_eq!(knn.get_model().unwrap().shape(), (0, 4));
    assert!(knn.predict(5).unwrap().is_empty());

    knn.fit(&urm, &content(), &uni, &["u1"], &[]).unwrap();
    assert_eq!(knn.get_model().unwrap().shape(), (1, 0));
    assert_eq!(knn.predict(5).unwrap().get(&"u1"), Some(&[] as &[&str]));
}

#[test]
fn test_not_fitted() {
    let knn: ContentKnn<&str, &str> = ContentKnn::new(config());
    assert!(!knn.is_fitted());
    assert!(matches!(knn.predict(5), Err(RecError::NotFitted)));
    assert!(matches!(knn.get_model(), Err(RecError::NotFitted)));
    assert!(matches!(knn.similarity(), Err(RecError::NotFitted)));
}

#[test]
fn test_unknown_ids() {
    let uni = universe(&["u1"]);
    let urm = interactions(&[&[0]]);
    let mut knn = ContentKnn::new(config());

    let res = knn.fit(&urm, &content(), &uni, &["u1"], &["A", "Z"]);
    assert!(matches!(res, Err(RecError::UnknownId { kind: "item", .. })));
    let res = knn.fit(&urm, &content(), &uni, &["nobody"], &ITEMS);
    assert!(matches!(res, Err(RecError::UnknownId { kind: "user", .. })));
}

#[test]
fn test_duplicate_targets() {
    let uni = universe(&["u1"]);
    let urm = interactions(&[&[0]]);
    let mut knn = ContentKnn::new(config());
    let res = knn.fit(&urm, &content(), &uni, &["u1"], &["A", "B", "A"]);
    assert!(matches!(
        res,
        Err(RecError::DuplicateId {
            kind: "item",
            index: 2
        })
    ));
    let res = knn.fit(&urm, &content(), &uni, &["u1", "u1"], &ITEMS);
    assert!(matches!(
        res,
        Err(RecError::DuplicateId {
            kind: "user",
            index: 1
        })
    ));
}

#[test]
fn test_shape_errors() {
    let uni = universe(&["u1"]);
    let urm = interactions(&[&[0]]);
    let mut knn = ContentKnn::new(config());

    let narrow = CsrMatrix::empty(2, 3);
    let res = knn.fit(&urm, &narrow, &uni, &["u1"], &ITEMS);
    assert!(matches!(res, Err(RecError::ShapeMismatch(_))));

    let tall = interactions(&[&[0], &[1]]);
    let res = knn.fit(&tall, &content(), &uni, &["u1"], &ITEMS);
    assert!(matches!(res, Err(RecError::ShapeMismatch(_))));
}

#[test]
fn test_invalid_values() {
    let uni = universe(&["u1"]);
    let urm = interactions(&[&[0]]);
    let mut knn = ContentKnn::new(config());

    let mut bld = CsrBuilder::new(4);
    bld.push_row(vec![(0, 1.0), (2, -0.5)]);
    let res = knn.fit(&urm, &bld.finish(), &uni, &["u1"], &ITEMS);
    assert!(matches!(
        res,
        Err(RecError::NegativeValue {
            name: "content",
            row: 0,
            col: 2,
            ..
        })
    ));

    let res = knn.fit_with(&urm, &content(), &uni, &["u1"], &ITEMS, 0.0, 0);
    assert!(matches!(res, Err(RecError::InvalidConfig(_))));
    let res = knn.fit_with(&urm, &content(), &uni, &["u1"], &ITEMS, -2.0, 5);
    assert!(matches!(res, Err(RecError::InvalidConfig(_))));
}

#[test]
fn test_failed_fit_clears_state() {
    let uni = universe(&["u1"]);
    let urm = interactions(&[&[0]]);
    let mut knn = ContentKnn::new(config());
    knn.fit(&urm, &content(), &uni, &["u1"], &ITEMS).unwrap();
    assert!(knn.is_fitted());

    assert!(knn.fit(&urm, &content(), &uni, &["u1"], &["Z"]).is_err());
    assert!(!knn.is_fitted());
    assert!(matches!(knn.predict(5), Err(RecError::NotFitted)));
}

#[test]
fn test_masking_with_permuted_targets() {
    let uni = universe(&["u1"]);
    let urm = interactions(&[&[0, 2]]);
    let mut knn = ContentKnn::new(config());
    knn.fit(&urm, &content(), &uni, &["u1"], &["C", "B", "A"])
        .unwrap();

    // columns are C, B, A; A and C are known to the user
    let rhat = knn.get_model().unwrap();
    assert_eq!(rhat.shape(), (1, 3));
    assert_eq!(rhat.row_cols(0), &[1]);
    assert_close(rhat.get(0, 1), 1.0);

    let recs = knn.predict(5).unwrap();
    assert_eq!(recs.get(&"u1"), Some(&["B"][..]));
}
