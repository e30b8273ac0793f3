// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Content-based and item-based k-NN track recommendation.
//!
//! Item content is an attributes × items sparse matrix, and listening history
//! a users × items interaction matrix.  [ContentKnn] computes cosine item
//! similarities, keeps the strongest neighbors of each target item, and
//! predicts ratings for target users from their history.  Matrices are stored
//! as Arrow sparse-row arrays ([sparse::CsrMatrix]).

pub mod arrow;
pub mod config;
pub mod data;
pub mod errors;
pub mod knn;
pub mod parallel;
mod progress;
pub mod sparse;

pub use config::{KnnConfig, NeighborScope};
pub use data::{IdIndex, IdMapping, Universe};
pub use errors::{RecError, Result};
pub use knn::{ContentKnn, Recommendations};
pub use sparse::{CooMatrixBuilder, CsrBuilder, CsrMatrix};
