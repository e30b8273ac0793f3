// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Error types for the recommendation engine.
use arrow_schema::ArrowError;
use thiserror::Error;

/// Errors raised while fitting or querying a recommender.
#[derive(Error, Debug)]
pub enum RecError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("negative value {value} at ({row}, {col}) in {name} matrix")]
    NegativeValue {
        name: &'static str,
        row: usize,
        col: usize,
        value: f32,
    },
    #[error("unknown {kind} id {id}")]
    UnknownId { kind: &'static str, id: String },
    #[error("duplicate {kind} id at index {index}")]
    DuplicateId { kind: &'static str, index: u32 },
    #[error("model has not been fit")]
    NotFitted,
    #[error("{0} is not a number")]
    NotANumber(&'static str),
    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),
    #[error("configuration parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("thread pool initialization error: {0}")]
    ThreadPool(String),
}

/// Result type for recommender operations.
pub type Result<T> = std::result::Result<T, RecError>;

/// Convert an [Option] into a [Result], formatting an error of the given variant.
#[macro_export]
macro_rules! ok_or_err {
    ($opt:expr, $variant:ident, $($arg:expr),*) => {
        $opt.ok_or_else(|| $crate::errors::RecError::$variant(format!($($arg),*)))
    };
}
