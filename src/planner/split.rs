//! Distribution of outer iterations over the parallel workers.
use crate::prelude::*;
use serde::{Deserialize, Serialize};

/// Assignment of `total` iterations to workers.
///
/// The assignment is encoded so that every consumer can use a single formula: worker `i`
/// (with `i < used_workers`) runs `iters_per_worker + 1` iterations if
/// `i <= tail_worker_index` and `iters_per_worker` otherwise. When the work divides evenly,
/// `iters_per_worker` is one less than the per-worker share and `tail_worker_index` equals the
/// worker count, so every worker takes the `+ 1` branch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoreSplit {
    pub total: i64,
    pub workers: i64,
    pub used_workers: i64,
    pub iters_per_worker: i64,
    pub tail_worker_index: i64,
}

impl CoreSplit {
    /// Split `total` iterations across `workers` workers.
    ///
    /// # Panics
    /// If `workers` is not positive or `total` is negative. Both are rejected as configuration
    /// errors before splitting.
    pub fn new(total: i64, workers: i64) -> Self {
        assert!(workers > 0, "worker count must be positive");
        assert!(total >= 0, "iteration count cannot be negative");

        let used_workers = min(total, workers);

        let (iters_per_worker, tail_worker_index) = if total == 0 {
            (0, 0)
        } else if used_workers < workers {
            // Fewer iterations than workers: every used worker runs exactly one.
            (0, total - 1)
        } else {
            let quotient = total / workers;
            let remainder = total % workers;

            if remainder != 0 {
                (quotient, remainder - 1)
            } else {
                (quotient - 1, workers)
            }
        };

        Self {
            total,
            workers,
            used_workers,
            iters_per_worker,
            tail_worker_index,
        }
    }

    /// Number of iterations assigned to `worker`.
    pub fn iterations_for(&self, worker: i64) -> i64 {
        worker_iterations(
            worker,
            self.used_workers,
            self.iters_per_worker,
            self.tail_worker_index,
        )
    }

    /// Iterations per "big" worker, `ceil(total / workers)`.
    pub fn big_count(&self) -> i64 {
        ceil_div(self.total, self.workers)
    }

    /// Iterations per "small" worker, `floor(total / workers)`.
    pub fn small_count(&self) -> i64 {
        self.total / self.workers
    }

    /// Number of workers that run [`big_count`](Self::big_count) iterations.
    pub fn big_workers(&self) -> i64 {
        let remainder = self.total % self.workers;
        if self.total < self.workers {
            self.total
        } else if remainder == 0 {
            self.workers
        } else {
            remainder
        }
    }
}

/// Iterations of `worker` under the encoding described on [`CoreSplit`].
pub(crate) fn worker_iterations(
    worker: i64,
    used_workers: i64,
    iters_per_worker: i64,
    tail_worker_index: i64,
) -> i64 {
    if worker < 0 || worker >= used_workers {
        0
    } else if worker <= tail_worker_index {
        iters_per_worker + 1
    } else {
        iters_per_worker
    }
}
