//! Buffer-cost table: how many element-sized buffers each variant keeps alive at once.
//!
//! The counts are tuned empirically per kernel, so they are kept as data rather than derived.
//! A table is validated once when it is loaded: every count must be positive, every key unique,
//! and every reachable `(profile, dtype, generation)` combination must be present. Lookups on a
//! validated table therefore cannot miss for any variant that passed selection.
use super::variant::{CostProfile, INPUT_DTYPES};
use crate::error::ConfigurationError;
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use ubtile_core::{DataType, HardwareGeneration};

const BUILTIN_TABLE: &str = include_str!("costs.json");

#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct CostEntry {
    pub profile: CostProfile,
    pub dtype: DataType,
    pub generation: HardwareGeneration,
    pub buffers: i64,
}

type CostKey = (CostProfile, DataType, HardwareGeneration);

#[derive(Debug, Clone)]
pub struct CostTable {
    entries: HashMap<CostKey, i64>,
}

impl CostTable {
    /// The table shipped with the crate.
    pub fn builtin() -> Result<Self, ConfigurationError> {
        Self::from_json(BUILTIN_TABLE)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigurationError> {
        let entries: Vec<CostEntry> = serde_json::from_str(text)
            .map_err(|e| ConfigurationError::InvalidCostTable(e.to_string()))?;

        Self::from_entries(entries)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read cost table {:?}", path))?;

        let table = Self::from_json(&text)
            .with_context(|| format!("failed to load cost table {:?}", path))?;

        info!("loaded {} buffer costs from {:?}", table.len(), path);
        Ok(table)
    }

    pub fn from_entries<I>(entries: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = CostEntry>,
    {
        let mut map = HashMap::default();

        for entry in entries {
            if entry.buffers <= 0 {
                return Err(ConfigurationError::InvalidCostTable(format!(
                    "{} with {} on {} has a buffer count of {}",
                    entry.profile, entry.dtype, entry.generation, entry.buffers
                )));
            }

            let key = (entry.profile, entry.dtype, entry.generation);
            if map.insert(key, entry.buffers).is_some() {
                return Err(ConfigurationError::InvalidCostTable(format!(
                    "duplicate entry for {} with {} on {}",
                    entry.profile, entry.dtype, entry.generation
                )));
            }
        }

        let table = Self { entries: map };
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        for (&profile, &dtype, &generation) in
            iproduct!(&CostProfile::ALL, &INPUT_DTYPES, &HardwareGeneration::ALL)
        {
            self.lookup(profile, dtype, generation)?;
        }

        Ok(())
    }

    pub fn lookup(
        &self,
        profile: CostProfile,
        dtype: DataType,
        generation: HardwareGeneration,
    ) -> Result<i64, ConfigurationError> {
        self.entries
            .get(&(profile, dtype, generation))
            .copied()
            .ok_or(ConfigurationError::MissingCost {
                profile,
                dtype,
                generation,
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;
    use HardwareGeneration::*;

    fn builtin_entries() -> Vec<CostEntry> {
        serde_json::from_str(BUILTIN_TABLE).unwrap()
    }

    #[test]
    fn test_builtin_table() {
        let table = CostTable::builtin().unwrap();
        assert_eq!(table.len(), CostProfile::ALL.len() * INPUT_DTYPES.len() * 2);

        assert_eq!(table.lookup(CostProfile::QuantStatic, DataType::F32, RegBase), Ok(11));
        assert_eq!(table.lookup(CostProfile::QuantDynamic, DataType::F32, RegBase), Ok(13));
        assert_eq!(table.lookup(CostProfile::Loss, DataType::F32, Classic), Ok(12));
        assert_eq!(table.lookup(CostProfile::LossWeighted, DataType::F32, Classic), Ok(16));

        assert_eq!(
            table.lookup(CostProfile::Loss, DataType::I64, Classic),
            Err(ConfigurationError::MissingCost {
                profile: CostProfile::Loss,
                dtype: DataType::I64,
                generation: Classic,
            })
        );
    }

    #[test]
    fn test_incomplete_table() {
        let mut entries = builtin_entries();
        let removed = entries.pop().unwrap();

        match CostTable::from_entries(entries) {
            Err(ConfigurationError::MissingCost {
                profile,
                dtype,
                generation,
            }) => {
                assert_eq!(
                    (profile, dtype, generation),
                    (removed.profile, removed.dtype, removed.generation)
                );
            }
            other => panic!("expected missing cost, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_entries() {
        let mut entries = builtin_entries();
        entries[3].buffers = 0;
        assert!(matches!(
            CostTable::from_entries(entries),
            Err(ConfigurationError::InvalidCostTable(_))
        ));

        let mut entries = builtin_entries();
        entries.push(entries[0]);
        assert!(matches!(
            CostTable::from_entries(entries),
            Err(ConfigurationError::InvalidCostTable(_))
        ));

        assert!(matches!(
            CostTable::from_json("{\"profile\": 3}"),
            Err(ConfigurationError::InvalidCostTable(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut entries = builtin_entries();
        for entry in &mut entries {
            entry.buffers *= 2;
        }

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&entries).unwrap().as_bytes())
            .unwrap();

        let table = CostTable::from_file(file.path()).unwrap();
        assert_eq!(table.lookup(CostProfile::QuantStatic, DataType::F32, RegBase), Ok(22));

        let missing = file.path().with_extension("missing");
        let err = CostTable::from_file(&missing).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to read cost table"));
    }
}
