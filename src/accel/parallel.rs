// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

use log::*;
use rayon::{current_num_threads, ThreadPoolBuilder};

use crate::errors::{RecError, Result};

/// Configure the global worker pool used by similarity and scoring.
///
/// This can only succeed once per process, before any parallel work runs.
pub fn init_thread_pool(n_threads: usize) -> Result<()> {
    debug!("initializing worker thread pool with {} threads", n_threads);
    ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
        .map_err(|e| RecError::ThreadPool(e.to_string()))
}

/// Number of threads in the current worker pool.
pub fn thread_count() -> usize {
    current_num_threads()
}

#[test]
fn test_thread_count() {
    assert!(thread_count() >= 1);
}
