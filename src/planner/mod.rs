//! Computation of the partition of a workload over workers and scratch passes.
//!
//! A call to [`Tiler::tile`] runs the stages in a fixed order:
//!
//!  1. [`select_variant`] validates the attributes and fixes the variant key and cost profile.
//!  2. The [`CostTable`] and [`max_elements_per_pass`] turn the scratch budget into a per-pass
//!     element count.
//!  3. [`plan_inner_loop`] picks a regime and derives the number of outer iterations.
//!  4. [`CoreSplit`] distributes those iterations over the workers.
//!
//! Every call builds its own [`TilingContext`]; nothing is shared between calls.

mod budget;
mod costs;
mod inner;
mod result;
mod split;
mod variant;

pub use budget::{max_elements_per_pass, usable_budget};
pub use costs::{CostEntry, CostTable};
pub use inner::{plan_inner_loop, FoldPlan, InnerPlan, PlannerParams, Regime, WorkloadShape};
pub use result::{workspace_bytes, PartitionResult};
pub use split::CoreSplit;
pub use variant::{
    select_variant, Algorithm, Approximation, CostProfile, OptionalInputs, QuantMode,
    QuantSettings, ReductionMode, RoundMode, Variant, VariantAttributes,
};

use crate::config::TilerConfig;
use crate::error::ConfigurationError;
use crate::prelude::*;
use ubtile_core::HardwareProfile;

/// Everything a single tiling call depends on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TilingRequest {
    pub shape: WorkloadShape,
    pub attributes: VariantAttributes,
    pub hardware: HardwareProfile,
}

impl TilingRequest {
    pub fn new(
        shape: WorkloadShape,
        attributes: VariantAttributes,
        hardware: HardwareProfile,
    ) -> Self {
        Self {
            shape,
            attributes,
            hardware,
        }
    }
}

/// Entry point of the planner. Immutable once built, so one instance can serve any number of
/// calls.
#[derive(Debug, Clone)]
pub struct Tiler {
    config: TilerConfig,
    costs: CostTable,
}

impl Tiler {
    pub fn new(config: TilerConfig, costs: CostTable) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self { config, costs })
    }

    /// Build a tiler from `config`, loading the cost table it names.
    pub fn from_config(config: TilerConfig) -> Result<Self> {
        let costs = config.load_cost_table()?;
        Ok(Self::new(config, costs)?)
    }

    pub fn config(&self) -> &TilerConfig {
        &self.config
    }

    pub fn tile(&self, request: &TilingRequest) -> Result<PartitionResult, ConfigurationError> {
        let result = TilingContext {
            request,
            config: &self.config,
            costs: &self.costs,
        }
        .run()?;

        result.log_summary();
        Ok(result)
    }
}

/// State of one tiling call.
struct TilingContext<'a> {
    request: &'a TilingRequest,
    config: &'a TilerConfig,
    costs: &'a CostTable,
}

impl TilingContext<'_> {
    fn run(&self) -> Result<PartitionResult, ConfigurationError> {
        let hw = &self.request.hardware;
        let shape = self.request.shape;
        shape.validate()?;

        let variant = select_variant(&self.request.attributes, hw.generation())?;
        let buffers = self
            .costs
            .lookup(variant.cost_profile, variant.dtype, variant.generation)?;

        let usable = usable_budget(hw.scratch_budget_bytes(), self.config.reserved_ub_bytes)?;
        let max_elements = max_elements_per_pass(
            usable,
            buffers,
            variant.dtype.size_in_bytes(),
            hw.block_size_bytes(),
        )?;

        let params = PlannerParams {
            generation: hw.generation(),
            block_size: hw.block_size_bytes(),
            vector_register_bytes: hw.vector_register_bytes(),
            row_unit: self.config.row_unit,
            transpose_block_bytes: self.config.transpose_block_bytes,
            fold: variant.fold,
        };
        let plan = plan_inner_loop(max_elements, shape, variant.dtype, &params)?;

        let split = CoreSplit::new(plan.total_iterations, hw.worker_count());
        let workspace = workspace_bytes(
            &variant,
            hw.worker_count(),
            hw.block_size_bytes(),
            self.config.sys_workspace_bytes,
        )?;

        Ok(PartitionResult::assemble(
            &variant,
            &plan,
            &split,
            max_elements,
            buffers,
            workspace,
        ))
    }
}
