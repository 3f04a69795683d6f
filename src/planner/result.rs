use super::inner::{FoldPlan, InnerPlan, Regime};
use super::split::{worker_iterations, CoreSplit};
use super::variant::Variant;
use crate::error::ConfigurationError;
use crate::prelude::*;
use serde::{Deserialize, Serialize};

/// Bytes per partial result slot when reducing across workers.
const PARTIAL_SLOT_BYTES: i64 = 4;

/// Final partition handed to the serialization layer.
///
/// The first seven fields are the contract with the kernel: which workers run, how many outer
/// iterations each of them takes (see [`CoreSplit`] for the encoding), and how each iteration
/// walks the scratch buffer. The remaining fields are derived values the kernel may use to avoid
/// recomputing them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionResult {
    pub used_workers: i64,
    pub iters_per_worker: i64,
    pub tail_worker_index: i64,
    pub inner_loop_count: i64,
    pub inner_tail_size: i64,
    pub group_size: i64,
    pub tiling_key: i64,

    pub regime: Regime,
    pub outer_loop_count: i64,
    pub tail_group_remainder: i64,
    pub total_iterations: i64,
    pub max_elements_per_pass: i64,
    pub buffer_count: i64,
    pub double_buffered: bool,
    pub big_count: i64,
    pub small_count: i64,
    pub big_workers: i64,
    pub workspace_bytes: i64,
    pub fold: Option<FoldPlan>,
}

impl PartitionResult {
    pub(crate) fn assemble(
        variant: &Variant,
        plan: &InnerPlan,
        split: &CoreSplit,
        max_elements_per_pass: i64,
        buffer_count: i64,
        workspace_bytes: i64,
    ) -> Self {
        Self {
            used_workers: split.used_workers,
            iters_per_worker: split.iters_per_worker,
            tail_worker_index: split.tail_worker_index,
            inner_loop_count: plan.inner_loop_count,
            inner_tail_size: plan.inner_tail_size,
            group_size: plan.group_size,
            tiling_key: variant.key + plan.regime.key_offset(),
            regime: plan.regime,
            outer_loop_count: plan.outer_loop_count,
            tail_group_remainder: plan.tail_group_remainder,
            total_iterations: plan.total_iterations,
            max_elements_per_pass,
            buffer_count,
            double_buffered: plan.double_buffered,
            big_count: split.big_count(),
            small_count: split.small_count(),
            big_workers: split.big_workers(),
            workspace_bytes,
            fold: plan.fold,
        }
    }

    /// Iterations assigned to `worker`, using the same encoding as [`CoreSplit`].
    pub fn iterations_for(&self, worker: i64) -> i64 {
        worker_iterations(
            worker,
            self.used_workers,
            self.iters_per_worker,
            self.tail_worker_index,
        )
    }

    pub(crate) fn log_summary(&self) {
        debug!("tiling key: {}", self.tiling_key);
        debug!("regime: {:?}", self.regime);
        debug!(
            "workers: {} used, {} iterations each, tail index {}",
            self.used_workers, self.iters_per_worker, self.tail_worker_index
        );
        debug!(
            "big/small: {} workers x {}, rest x {}",
            self.big_workers, self.big_count, self.small_count
        );
        debug!(
            "outer loop: {} iterations, group size {}, tail remainder {}",
            self.outer_loop_count, self.group_size, self.tail_group_remainder
        );
        debug!(
            "inner loop: {} passes, tail {}, double buffered {}",
            self.inner_loop_count, self.inner_tail_size, self.double_buffered
        );
        debug!(
            "scratch: {} elements per pass over {} buffers",
            self.max_elements_per_pass, self.buffer_count
        );
        if let Some(fold) = &self.fold {
            debug!("fold: {:?}", fold);
        }
        debug!("workspace: {} bytes", self.workspace_bytes);
    }
}

/// Global-memory workspace a variant needs: the fixed system reservation plus one partial
/// result slot of `block_size` lanes per worker for cross-worker reductions.
pub fn workspace_bytes(
    variant: &Variant,
    worker_count: i64,
    block_size: i64,
    sys_workspace_bytes: i64,
) -> Result<i64, ConfigurationError> {
    let reduction_scratch = if variant.cross_core_reduce {
        worker_count
            .checked_mul(block_size)
            .and_then(|n| n.checked_mul(PARTIAL_SLOT_BYTES))
    } else {
        Some(0)
    };

    reduction_scratch
        .and_then(|n| n.checked_add(sys_workspace_bytes))
        .ok_or_else(|| {
            ConfigurationError::InvalidSetting(format!(
                "workspace for {} workers with blocks of {} bytes overflows",
                worker_count, block_size
            ))
        })
}
