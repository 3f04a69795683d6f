//! Conversion of a scratch-memory budget into a per-pass element count.
use crate::error::ConfigurationError;
use crate::prelude::*;

/// Maximum number of elements a single inner-loop pass can hold.
///
/// `usable_bytes` is the scratch budget after the reserved framework overhead has been taken
/// off. It is split evenly across `buffer_count` buffers, each buffer is rounded down to whole
/// blocks, and the result is expressed in elements of `element_size` bytes.
pub fn max_elements_per_pass(
    usable_bytes: i64,
    buffer_count: i64,
    element_size: i64,
    block_size: i64,
) -> Result<i64, ConfigurationError> {
    if buffer_count <= 0 {
        return Err(ConfigurationError::InvalidCostTable(format!(
            "buffer count must be positive, got {}",
            buffer_count
        )));
    }

    if element_size <= 0 || block_size <= 0 {
        return Err(ConfigurationError::InvalidSetting(format!(
            "element size {} and block size {} must be positive",
            element_size, block_size
        )));
    }

    let per_buffer = floor_align(usable_bytes / buffer_count, block_size);
    let elements = per_buffer / element_size;

    if elements <= 0 {
        return Err(ConfigurationError::BudgetTooSmall {
            usable: usable_bytes,
            buffers: buffer_count,
            block: block_size,
        });
    }

    trace!(
        "{} bytes over {} buffers gives {} elements of {} bytes per pass",
        usable_bytes,
        buffer_count,
        elements,
        element_size
    );

    Ok(elements)
}

/// Scratch budget left after the reserved overhead.
pub fn usable_budget(scratch_bytes: i64, reserved_bytes: i64) -> Result<i64, ConfigurationError> {
    let usable = scratch_bytes - reserved_bytes;
    if usable <= 0 {
        return Err(ConfigurationError::BudgetExhausted {
            budget: scratch_bytes,
            reserved: reserved_bytes,
        });
    }

    Ok(usable)
}
