use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Hardware generation of the target NPU.
///
/// `RegBase` parts expose register-based vector units that prefer wide, transpose-friendly
/// passes and support the 8-bit float formats.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Debug)]
#[serde(rename_all = "lowercase")]
pub enum HardwareGeneration {
    Classic,
    RegBase,
}

impl HardwareGeneration {
    pub const ALL: [HardwareGeneration; 2] =
        [HardwareGeneration::Classic, HardwareGeneration::RegBase];

    pub fn supports_wide_passes(&self) -> bool {
        matches!(self, HardwareGeneration::RegBase)
    }
}

impl Display for HardwareGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HardwareGeneration::Classic => f.write_str("classic"),
            HardwareGeneration::RegBase => f.write_str("regbase"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("hardware profile reports {0} workers")]
    NoWorkers(i64),

    #[error("hardware profile reports a scratch budget of {0} bytes")]
    NoScratchBudget(i64),

    #[error("block size of {0} bytes is not a power of two")]
    InvalidBlockSize(i64),

    #[error("vector register width of {0} bytes is too small")]
    InvalidVectorWidth(i64),
}

/// Description of the compute resources available to a single tiling call.
///
/// Supplied by the platform-query layer. The fields are only accessible through getters so
/// that every instance went through the checks in [`HardwareProfile::new`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HardwareProfile {
    worker_count: i64,
    scratch_budget_bytes: i64,
    block_size_bytes: i64,
    generation: HardwareGeneration,
    vector_register_bytes: Option<i64>,
}

impl HardwareProfile {
    pub fn new(
        worker_count: i64,
        scratch_budget_bytes: i64,
        block_size_bytes: i64,
        generation: HardwareGeneration,
    ) -> Result<Self, ProfileError> {
        if worker_count <= 0 {
            return Err(ProfileError::NoWorkers(worker_count));
        }

        if scratch_budget_bytes <= 0 {
            return Err(ProfileError::NoScratchBudget(scratch_budget_bytes));
        }

        if block_size_bytes <= 0 || (block_size_bytes as u64).count_ones() != 1 {
            return Err(ProfileError::InvalidBlockSize(block_size_bytes));
        }

        Ok(Self {
            worker_count,
            scratch_budget_bytes,
            block_size_bytes,
            generation,
            vector_register_bytes: None,
        })
    }

    /// Attach the width of a vector register. Must hold more than one `f32` lane.
    pub fn with_vector_register(mut self, bytes: i64) -> Result<Self, ProfileError> {
        if bytes <= 4 {
            return Err(ProfileError::InvalidVectorWidth(bytes));
        }

        self.vector_register_bytes = Some(bytes);
        Ok(self)
    }

    pub fn worker_count(&self) -> i64 {
        self.worker_count
    }

    pub fn scratch_budget_bytes(&self) -> i64 {
        self.scratch_budget_bytes
    }

    pub fn block_size_bytes(&self) -> i64 {
        self.block_size_bytes
    }

    pub fn generation(&self) -> HardwareGeneration {
        self.generation
    }

    pub fn vector_register_bytes(&self) -> Option<i64> {
        self.vector_register_bytes
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_profile_validation() {
        use HardwareGeneration::*;

        let profile = HardwareProfile::new(48, 196608, 32, Classic).unwrap();
        assert_eq!(profile.worker_count(), 48);
        assert_eq!(profile.vector_register_bytes(), None);

        assert_eq!(
            HardwareProfile::new(0, 196608, 32, Classic),
            Err(ProfileError::NoWorkers(0))
        );
        assert_eq!(
            HardwareProfile::new(8, 0, 32, Classic),
            Err(ProfileError::NoScratchBudget(0))
        );
        assert_eq!(
            HardwareProfile::new(8, 1024, 24, RegBase),
            Err(ProfileError::InvalidBlockSize(24))
        );
        assert_eq!(
            HardwareProfile::new(8, 1024, 0, RegBase),
            Err(ProfileError::InvalidBlockSize(0))
        );

        let profile = profile.with_vector_register(256).unwrap();
        assert_eq!(profile.vector_register_bytes(), Some(256));
        assert!(profile.with_vector_register(4).is_err());
    }
}
