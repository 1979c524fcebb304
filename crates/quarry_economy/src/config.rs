//! # Economy Balance Configuration
//!
//! Machine thresholds that are tuning rather than structure. All fields
//! default to the shipped balance, so an empty TOML document is valid.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EconomyError, EconomyResult};

/// Machine balance numbers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Distinct item kinds a chest may hold.
    pub chest_distinct_limit: usize,
    /// Uranium rods a terminal consumes per quantum drill.
    pub terminal_rods_per_drill: u32,
    /// Mana restored per dust fed into an extractor.
    pub extractor_mana: u32,
    /// Scrap consumed per pressed metal plate.
    pub press_scrap_per_plate: u32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            chest_distinct_limit: 10,
            terminal_rods_per_drill: 5,
            extractor_mana: 50,
            press_scrap_per_plate: 2,
        }
    }
}

impl EconomyConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` on malformed TOML or a zero threshold.
    pub fn from_toml_str(source: &str) -> EconomyResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| EconomyError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, otherwise as
    /// [`EconomyConfig::from_toml_str`].
    pub fn load(path: &Path) -> EconomyResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| EconomyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Rejects thresholds that would make a machine loop forever.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the offending field.
    pub fn validate(&self) -> EconomyResult<()> {
        if self.terminal_rods_per_drill == 0 {
            return Err(EconomyError::InvalidConfig(
                "terminal_rods_per_drill must be positive".to_string(),
            ));
        }
        if self.press_scrap_per_plate == 0 {
            return Err(EconomyError::InvalidConfig(
                "press_scrap_per_plate must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(EconomyConfig::from_toml_str("").unwrap(), EconomyConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = EconomyConfig::from_toml_str("chest_distinct_limit = 3").unwrap();
        assert_eq!(config.chest_distinct_limit, 3);
        assert_eq!(config.terminal_rods_per_drill, 5);
    }

    #[test]
    fn test_zero_threshold_rejected() {
        assert!(EconomyConfig::from_toml_str("press_scrap_per_plate = 0").is_err());
    }
}
