// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! The k-NN recommender engine.
use std::time::Instant;

use log::*;

use crate::{
    config::KnnConfig,
    data::{augment_with_interactions, EntityId, IdIndex, Universe},
    errors::{RecError, Result},
    sparse::CsrMatrix,
};

use super::{
    item_score::predict_ratings,
    item_train::{compute_similarities, NeighborSpace, SimilarityParams},
    rank::{rank_rows, Recommendations},
};

/// Item k-NN recommender over content attributes.
///
/// Fitting computes the item-item similarity matrix of the target items and
/// the predicted rating matrix of the target users; both are kept until the
/// next fit.  A failed fit leaves the engine unfitted.
pub struct ContentKnn<U, I> {
    config: KnnConfig,
    state: Option<FittedState<U, I>>,
}

struct FittedState<U, I> {
    users: IdIndex<U>,
    items: IdIndex<I>,
    similarity: CsrMatrix,
    ratings: CsrMatrix,
}

/// Inputs to a single fit.
struct FitInput<'a, U, I> {
    interactions: &'a CsrMatrix,
    content: &'a CsrMatrix,
    augment: bool,
    universe: &'a Universe<U, I>,
    target_users: &'a [U],
    target_items: &'a [I],
}

impl<U: EntityId, I: EntityId> ContentKnn<U, I> {
    pub fn new(config: KnnConfig) -> Self {
        ContentKnn {
            config,
            state: None,
        }
    }

    pub fn config(&self) -> &KnnConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    /// Fit the model with the configured shrinkage and neighborhood size.
    ///
    /// `interactions` is users × items and `content` is attributes × items,
    /// both indexed by `universe`.
    pub fn fit(
        &mut self,
        interactions: &CsrMatrix,
        content: &CsrMatrix,
        universe: &Universe<U, I>,
        target_users: &[U],
        target_items: &[I],
    ) -> Result<()> {
        let config = self.config.clone();
        self.fit_config(
            &config,
            FitInput {
                interactions,
                content,
                augment: true,
                universe,
                target_users,
                target_items,
            },
        )
    }

    /// Fit the model, overriding the shrinkage and neighborhood size for this call.
    #[allow(clippy::too_many_arguments)]
    pub fn fit_with(
        &mut self,
        interactions: &CsrMatrix,
        content: &CsrMatrix,
        universe: &Universe<U, I>,
        target_users: &[U],
        target_items: &[I],
        shrinkage: f64,
        k_filtering: usize,
    ) -> Result<()> {
        let config = self
            .config
            .clone()
            .with_shrinkage(shrinkage)
            .with_neighbors(k_filtering);
        self.fit_config(
            &config,
            FitInput {
                interactions,
                content,
                augment: true,
                universe,
                target_users,
                target_items,
            },
        )
    }

    /// Fit a collaborative item k-NN, using the users as item attributes.
    pub fn fit_item_based(
        &mut self,
        interactions: &CsrMatrix,
        universe: &Universe<U, I>,
        target_users: &[U],
        target_items: &[I],
    ) -> Result<()> {
        let config = self.config.clone();
        self.fit_config(
            &config,
            FitInput {
                interactions,
                content: interactions,
                augment: false,
                universe,
                target_users,
                target_items,
            },
        )
    }

    fn fit_config(&mut self, config: &KnnConfig, input: FitInput<'_, U, I>) -> Result<()> {
        self.state = None;
        let state = train(config, input)?;
        self.state = Some(state);
        Ok(())
    }

    fn fitted(&self) -> Result<&FittedState<U, I>> {
        self.state.as_ref().ok_or(RecError::NotFitted)
    }

    /// Recommend up to `at` items to each target user, best first.
    pub fn predict(&self, at: usize) -> Result<Recommendations<U, I>> {
        let state = self.fitted()?;
        let ranked = rank_rows(&state.ratings, at)?;
        Ok(Recommendations::from_ranked(
            state.users.clone(),
            &state.items,
            ranked,
        ))
    }

    /// Get the predicted rating matrix (target users × target items).
    pub fn get_model(&self) -> Result<CsrMatrix> {
        Ok(self.fitted()?.ratings.clone())
    }

    /// Get the similarity matrix (target items × neighbor items).
    pub fn similarity(&self) -> Result<&CsrMatrix> {
        Ok(&self.fitted()?.similarity)
    }

    /// Get the similarity matrix transposed, as neighbor items × target items.
    pub fn item_weights(&self) -> Result<CsrMatrix> {
        Ok(self.fitted()?.similarity.transpose())
    }

    /// The target users of the last fit, in row order.
    pub fn target_users(&self) -> Result<&IdIndex<U>> {
        Ok(&self.fitted()?.users)
    }

    /// The target items of the last fit, in column order.
    pub fn target_items(&self) -> Result<&IdIndex<I>> {
        Ok(&self.fitted()?.items)
    }
}

fn train<U: EntityId, I: EntityId>(
    config: &KnnConfig,
    input: FitInput<'_, U, I>,
) -> Result<FittedState<U, I>> {
    let start = Instant::now();
    config.validate()?;

    let universe = input.universe;
    check_shape("interaction", input.interactions, universe.n_users(), universe.n_items())?;
    if input.content.n_cols() != universe.n_items() {
        return Err(RecError::ShapeMismatch(format!(
            "content matrix has {} items, universe has {}",
            input.content.n_cols(),
            universe.n_items()
        )));
    }
    check_values("interaction", input.interactions)?;
    check_values("content", input.content)?;

    let users = IdIndex::from_ids(input.target_users.to_vec(), "user")?;
    let items = IdIndex::from_ids(input.target_items.to_vec(), "item")?;
    let user_nums = universe.users.get_indexes(input.target_users, "user")?;
    let item_nums = universe.items.get_indexes(input.target_items, "item")?;
    debug!(
        "fitting for {} of {} users and {} of {} items",
        users.len(),
        universe.n_users(),
        items.len(),
        universe.n_items()
    );

    let content = match config.interaction_weight {
        Some(w) if input.augment => {
            augment_with_interactions(input.content, input.interactions, w as f32)?
        }
        _ => input.content.clone(),
    };

    let space = NeighborSpace::for_scope(config.scope, universe.n_items(), &item_nums);
    let params = SimilarityParams {
        shrinkage: config.shrinkage as f32,
        neighbors: config.k_filtering,
        chunk_size: config.chunk_size,
    };
    let similarity = compute_similarities(&content, &item_nums, &space, &params)?;
    let ratings = predict_ratings(
        input.interactions,
        &user_nums,
        &item_nums,
        &similarity,
        &space,
    )?;

    info!(
        "fit k-NN with {} similarities and {} predicted ratings in {:.2}s",
        similarity.nnz(),
        ratings.nnz(),
        start.elapsed().as_secs_f64()
    );

    Ok(FittedState {
        users,
        items,
        similarity,
        ratings,
    })
}

fn check_shape(name: &str, matrix: &CsrMatrix, rows: usize, cols: usize) -> Result<()> {
    if matrix.shape() != (rows, cols) {
        Err(RecError::ShapeMismatch(format!(
            "{} matrix is {}x{}, universe is {}x{}",
            name, matrix.n_rows(), matrix.n_cols(), rows, cols
        )))
    } else {
        Ok(())
    }
}

fn check_values(name: &'static str, matrix: &CsrMatrix) -> Result<()> {
    match matrix.find_invalid() {
        Some((row, col, value)) => Err(RecError::NegativeValue {
            name,
            row,
            col,
            value,
        }),
        None => Ok(()),
    }
}
