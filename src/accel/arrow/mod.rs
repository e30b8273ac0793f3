// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Utilities and types for working with Arrow data.
pub mod types;

use arrow::array::Array;

pub use types::SparseIndexType;
pub use types::SparseRowType;

use crate::errors::{RecError, Result};

/// Downcast an Arrow array reference, reporting the expected type on failure.
pub fn checked_array_ref<'array, T: Array + 'static>(
    name: &str,
    tstr: &str,
    array: &'array dyn Array,
) -> Result<&'array T> {
    array.as_any().downcast_ref().ok_or_else(|| {
        RecError::InvalidConfig(format!(
            "invalid {} type {}, expected {}",
            name,
            array.data_type(),
            tstr
        ))
    })
}
