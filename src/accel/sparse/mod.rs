// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Sparse matrix support.

mod builder;
mod coo;
mod csr;
mod ops;
mod transpose;

pub use builder::{CsrBuilder, CsrRow};
pub use coo::{CooMatrix, CooMatrixBuilder};
pub use csr::{CsrMatrix, SparseRow};
