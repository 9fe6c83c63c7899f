use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BankError, BankResult};

/// Switches that shape loading and derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankConfig {
    /// Generate one dummy per remaining use for multi-use objects.
    pub auto_generate_used: bool,
    /// Generate labelled variants for `$N` template objects.
    pub auto_generate_variable: bool,
    /// Index descriptions of newly added objects for search.
    pub enable_search: bool,
    /// Honour `nextObjectNumberOffset.txt` when allocating ids.
    pub consider_id_offset: bool,
    /// Seed for person and death marker picks; entropy when unset.
    pub random_seed: Option<u64>,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            auto_generate_used: true,
            auto_generate_variable: true,
            enable_search: true,
            consider_id_offset: false,
            random_seed: None,
        }
    }
}

impl BankConfig {
    /// Loads a JSON config, falling back to defaults when `path` is unset
    /// or does not exist.
    pub fn from_json_file(path: Option<&Path>) -> BankResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|source| BankError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| BankError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempdir().expect("tempdir");
        let config = BankConfig::from_json_file(Some(&dir.path().join("absent.json")))
            .expect("defaults");
        assert_eq!(config, BankConfig::default());
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("bank.json");
        fs::write(&path, r#"{ "consider_id_offset": true, "random_seed": 7 }"#)
            .expect("write config");
        let config = BankConfig::from_json_file(Some(&path)).expect("parsed");
        assert!(config.consider_id_offset);
        assert_eq!(config.random_seed, Some(7));
        assert!(config.auto_generate_used);
    }
}
