// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

use std::sync::RwLock;
use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Instant,
};

use log::*;

const UPDATE_SECS: f64 = 0.2;

#[derive(Clone, Copy)]
struct UpdateState {
    count: usize,
    time: f64,
    rate: f64,
}

/// Thread-safe progress counter that reports through the log.
///
/// Reports are throttled so that hot loops can tick on every unit of work
/// without flooding the log.
pub(crate) struct ProgressHandle {
    label: &'static str,
    total: usize,
    start: Instant,
    count: AtomicUsize,
    last_update: RwLock<Option<UpdateState>>,
}

impl ProgressHandle {
    pub fn new(label: &'static str, total: usize) -> Self {
        ProgressHandle {
            label,
            total,
            count: AtomicUsize::new(0),
            start: Instant::now(),
            last_update: RwLock::new(None),
        }
    }

    pub fn tick(&self) {
        self.advance(1);
    }

    pub fn advance(&self, n: usize) {
        let count = self.count.fetch_add(n, Ordering::Relaxed) + n;

        let last_update = match self.last_update.read() {
            Ok(lock) => *lock,
            Err(_) => return,
        };

        let thresh = if let Some(lu) = last_update {
            // bail early if the rate estimate says we don't need to update
            let n = (count - lu.count) as f64;
            if lu.rate > 0.0 && n / lu.rate < UPDATE_SECS * 0.95 {
                return;
            }

            lu.time
        } else {
            0.0
        };

        let time = self.start.elapsed().as_secs_f64();
        // bail if we haven't been running long enough
        if time < thresh + UPDATE_SECS {
            return;
        }

        // if someone else is writing, do nothing, they've handled it
        if let Ok(mut lock) = self.last_update.try_write() {
            *lock = Some(UpdateState {
                count,
                time,
                rate: count as f64 / time,
            });
            self.refresh(count, time);
        }
    }

    /// Get the number of completed units.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    /// Report the final count.
    pub fn finish(&self) {
        let time = self.start.elapsed().as_secs_f64();
        debug!(
            "{}: finished {} of {} in {:.2}s",
            self.label,
            self.count(),
            self.total,
            time
        );
    }

    fn refresh(&self, count: usize, time: f64) {
        debug!(
            "{}: {} of {} ({:.1}/s)",
            self.label,
            count,
            self.total,
            count as f64 / time
        );
    }
}

#[test]
fn test_counts_advance() {
    let pb = ProgressHandle::new("test", 10);
    pb.tick();
    pb.advance(4);
    assert_eq!(pb.count(), 5);
    pb.finish();
}
