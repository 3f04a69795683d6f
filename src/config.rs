use crate::error::ConfigurationError;
use crate::planner::CostTable;
use crate::prelude::*;
use std::env;
use std::path::PathBuf;

/// Scratch bytes reserved for framework bookkeeping.
pub const DEFAULT_RESERVED_UB_BYTES: i64 = 8 * 1024;

/// Global-memory workspace the runtime always reserves.
pub const DEFAULT_SYS_WORKSPACE_BYTES: i64 = 16 * 1024 * 1024;

/// Size of a hardware transpose block.
pub const DEFAULT_TRANSPOSE_BLOCK_BYTES: i64 = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilerConfig {
    pub reserved_ub_bytes: i64,
    pub sys_workspace_bytes: i64,
    pub row_unit: i64,
    pub transpose_block_bytes: i64,
    pub cost_table: Option<PathBuf>,
}

impl Default for TilerConfig {
    fn default() -> Self {
        Self {
            reserved_ub_bytes: DEFAULT_RESERVED_UB_BYTES,
            sys_workspace_bytes: DEFAULT_SYS_WORKSPACE_BYTES,
            row_unit: 1,
            transpose_block_bytes: DEFAULT_TRANSPOSE_BLOCK_BYTES,
            cost_table: None,
        }
    }
}

impl TilerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut out = Self::default();

        let parse = |key: &str, value: &mut i64| {
            if let Some(text) = lookup(key) {
                match text.trim().parse::<i64>() {
                    Ok(v) if v >= 0 => *value = v,
                    _ => warn!("invalid value {:?} for {}, keeping {}", text, key, value),
                }
            }
        };

        parse("UBTILE_RESERVED_UB", &mut out.reserved_ub_bytes);
        parse("UBTILE_SYS_WORKSPACE", &mut out.sys_workspace_bytes);
        parse("UBTILE_ROW_UNIT", &mut out.row_unit);

        if let Some(filename) = lookup("UBTILE_COST_TABLE") {
            let filename = filename.trim();

            if !filename.is_empty() {
                info!("reading buffer costs from {:?}", filename);
                out.cost_table = Some(filename.into());
            }
        }

        out
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.reserved_ub_bytes < 0 || self.sys_workspace_bytes < 0 {
            return Err(ConfigurationError::InvalidSetting(format!(
                "reservations must not be negative ({} scratch, {} workspace)",
                self.reserved_ub_bytes, self.sys_workspace_bytes
            )));
        }

        if self.row_unit <= 0 {
            return Err(ConfigurationError::InvalidSetting(format!(
                "row unit must be positive, got {}",
                self.row_unit
            )));
        }

        let t = self.transpose_block_bytes;
        if t <= 0 || (t as u64).count_ones() != 1 {
            return Err(ConfigurationError::InvalidSetting(format!(
                "transpose block of {} bytes is not a power of two",
                t
            )));
        }

        Ok(())
    }

    /// The configured cost table, or the built-in one if none is configured.
    pub fn load_cost_table(&self) -> Result<CostTable> {
        match &self.cost_table {
            Some(path) => CostTable::from_file(path),
            None => Ok(CostTable::builtin()?),
        }
    }
}
