// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Item k-NN: similarity, scoring, and ranking.
mod accum;
pub mod item_score;
pub mod item_train;
pub mod model;
pub mod rank;

pub use item_score::predict_ratings;
pub use item_train::{compute_similarities, NeighborSpace, SimilarityParams};
pub use model::ContentKnn;
pub use rank::{rank_row, rank_rows, Recommendations};
