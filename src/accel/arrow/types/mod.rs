// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

/// Custom Arrow data types.
mod index;
mod row;

pub use index::SparseIndexType;
pub use row::SparseRowType;
