//! Planning of the inner loop: how rows are grouped into, or split across, scratch passes.
use crate::error::ConfigurationError;
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use ubtile_core::{DataType, HardwareGeneration};

/// Logical extents of the workload: `outer_count` independent rows of `inner_count` elements.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkloadShape {
    pub outer_count: i64,
    pub inner_count: i64,
}

impl WorkloadShape {
    pub fn new(outer_count: i64, inner_count: i64) -> Self {
        Self {
            outer_count,
            inner_count,
        }
    }

    /// Rows may be absent, but a row must contain at least one element.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.outer_count < 0 {
            return Err(ConfigurationError::InvalidShape(format!(
                "outer count {} is negative",
                self.outer_count
            )));
        }

        if self.inner_count <= 0 {
            return Err(ConfigurationError::InvalidShape(format!(
                "rows must contain at least one element, got {}",
                self.inner_count
            )));
        }

        Ok(())
    }
}

/// The three mutually exclusive inner-loop strategies.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// Whole rows fit in one pass; several rows are grouped per pass.
    RowGroups,
    /// A row needs several passes, looped with double buffering.
    SplitRow,
    /// Like [`Regime::RowGroups`], with groups aligned to the transpose repeat unit.
    WideRowGroups,
}

impl Regime {
    /// Contribution of the regime to the tiling key.
    pub fn key_offset(&self) -> i64 {
        match self {
            Regime::RowGroups => 1000,
            Regime::SplitRow => 2000,
            Regime::WideRowGroups => 3000,
        }
    }
}

/// Parameters for binary folding of a split row: the first `k_times` passes are folded pairwise
/// in `k_log2` rounds, the remaining `k_times_tail` passes are accumulated into them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FoldPlan {
    pub k_times: i64,
    pub k_log2: i64,
    pub k_times_tail: i64,
    pub once_tail: i64,
    pub once_tail_aligned: i64,
    pub cache_start: i64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InnerPlan {
    pub regime: Regime,

    /// Rows per pass (row groups) or passes per row (split row).
    pub group_size: i64,
    pub outer_loop_count: i64,
    pub tail_group_remainder: i64,
    pub inner_loop_count: i64,
    pub inner_tail_size: i64,

    /// Units of work handed to the core splitter.
    pub total_iterations: i64,
    pub double_buffered: bool,
    pub fold: Option<FoldPlan>,
}

impl InnerPlan {
    /// Number of rows in the last pass of a row-group regime.
    pub fn last_group_rows(&self) -> i64 {
        match self.regime {
            Regime::SplitRow => min(self.outer_loop_count, 1),
            _ if self.outer_loop_count == 0 => 0,
            _ if self.tail_group_remainder == 0 => self.group_size,
            _ => self.tail_group_remainder,
        }
    }
}

/// Knobs of the planner that do not come from the request itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PlannerParams {
    pub generation: HardwareGeneration,
    pub block_size: i64,
    pub vector_register_bytes: Option<i64>,
    pub row_unit: i64,
    pub transpose_block_bytes: i64,
    pub fold: bool,
}

/// Choose a regime for `shape` given the per-pass element budget.
pub fn plan_inner_loop(
    max_elements: i64,
    shape: WorkloadShape,
    dtype: DataType,
    params: &PlannerParams,
) -> Result<InnerPlan, ConfigurationError> {
    shape.validate()?;

    if max_elements <= 0 {
        return Err(ConfigurationError::InvalidSetting(format!(
            "per-pass element budget {} must be positive",
            max_elements
        )));
    }

    let WorkloadShape {
        outer_count: outer,
        inner_count: inner,
    } = shape;

    let repeat = params.transpose_block_bytes / dtype.size_in_bytes();
    let wide = params.generation.supports_wide_passes()
        && repeat > 0
        && inner <= max_elements / repeat;

    let plan = if wide || inner <= max_elements {
        let rows_per_pass = max_elements / inner;
        let (regime, unit) = if wide {
            (Regime::WideRowGroups, repeat)
        } else {
            (Regime::RowGroups, params.row_unit)
        };

        let mut group_size = checked_floor_align(rows_per_pass, unit).ok_or_else(|| {
            ConfigurationError::InvalidSetting(format!("row alignment of {} rows", unit))
        })?;

        if group_size == 0 {
            debug!(
                "{} rows per pass do not fill a unit of {} rows, processing unaligned",
                rows_per_pass, unit
            );
            group_size = rows_per_pass;
        }

        let outer_loop_count = ceil_div(outer, group_size);

        InnerPlan {
            regime,
            group_size,
            outer_loop_count,
            tail_group_remainder: rem_or_self(outer, group_size),
            inner_loop_count: 1,
            inner_tail_size: inner,
            total_iterations: outer_loop_count,
            double_buffered: false,
            fold: None,
        }
    } else {
        let passes = ceil_div(inner, max_elements);
        let total_iterations = outer.checked_mul(passes).ok_or_else(|| {
            ConfigurationError::InvalidShape(format!(
                "{} rows of {} passes overflow the iteration count",
                outer, passes
            ))
        })?;

        let fold = if params.fold {
            Some(plan_fold(max_elements, inner, params))
        } else {
            None
        };

        InnerPlan {
            regime: Regime::SplitRow,
            group_size: passes,
            outer_loop_count: outer,
            tail_group_remainder: 0,
            inner_loop_count: passes,
            inner_tail_size: inner - (passes - 1) * max_elements,
            total_iterations,
            double_buffered: true,
            fold,
        }
    };

    debug!(
        "rows of {} elements with {} elements per pass: {:?}, group size {}, {} iterations",
        inner, max_elements, plan.regime, plan.group_size, plan.total_iterations
    );

    Ok(plan)
}

fn plan_fold(max_elements: i64, inner: i64, params: &PlannerParams) -> FoldPlan {
    let full_passes = inner / max_elements;
    let k_times = nearest_power_of_two(full_passes);
    let k_log2 = floor_log2(k_times);
    let rest = inner - k_times * max_elements;
    let f32_lanes_per_block = max(params.block_size / 4, 1);

    let once_tail = rest % max_elements;
    let cache_start = match params.vector_register_bytes {
        Some(bytes) => k_log2 * (bytes / 4),
        None => 0,
    };

    FoldPlan {
        k_times,
        k_log2,
        k_times_tail: ceil_div(rest, max_elements),
        once_tail,
        once_tail_aligned: ceil_align(once_tail, f32_lanes_per_block),
        cache_start,
    }
}
