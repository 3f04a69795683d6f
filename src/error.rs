//! Failures reported by the tiler.
use crate::planner::CostProfile;
use ubtile_core::{DataType, HardwareGeneration, ProfileError};

/// A precondition of the tiling request is violated.
///
/// All of these are detected before a [`PartitionResult`](crate::PartitionResult) is built, so a
/// caller never observes a partially filled result. Retrying with the same input always fails
/// again: the configuration itself has to change.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("invalid hardware profile: {0}")]
    Hardware(#[from] ProfileError),

    #[error("scratch budget of {budget} bytes does not cover the {reserved} reserved bytes")]
    BudgetExhausted { budget: i64, reserved: i64 },

    #[error(
        "scratch budget of {usable} bytes cannot hold one block of {block} bytes \
         for each of {buffers} buffers"
    )]
    BudgetTooSmall {
        usable: i64,
        buffers: i64,
        block: i64,
    },

    #[error("invalid workload shape: {0}")]
    InvalidShape(String),

    #[error("unsupported variant: {0}")]
    UnsupportedVariant(String),

    #[error("no buffer cost for {profile} with {dtype} on {generation}")]
    MissingCost {
        profile: CostProfile,
        dtype: DataType,
        generation: HardwareGeneration,
    },

    #[error("invalid buffer cost table: {0}")]
    InvalidCostTable(String),

    #[error("invalid planner setting: {0}")]
    InvalidSetting(String),
}
