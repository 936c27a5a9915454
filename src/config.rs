//! config.rs
//! Tunables for one diff invocation.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MinerError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Wall-clock bound for the whole diff; `None` means unbounded.
    pub timeout_ms: Option<u64>,
    /// Run the extremely relaxed move/rename matchers after the default chain.
    pub extremely_relaxed_matching: bool,
    /// Normalized name distance under which two operation names count as close.
    pub max_operation_name_distance: f64,
    /// Cap on candidate pairs tried per replacement-search step.
    pub max_replacement_candidates: usize,
    /// Reject inconsistent models instead of skipping the offending edges.
    pub strict_validation: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            extremely_relaxed_matching: false,
            max_operation_name_distance: 0.4,
            max_replacement_candidates: 50,
            strict_validation: true,
        }
    }
}

impl DiffConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.max_operation_name_distance) {
            return Err(MinerError::InvalidConfiguration(format!(
                "max_operation_name_distance must lie in [0, 1], got {}",
                self.max_operation_name_distance
            )));
        }
        if self.max_replacement_candidates == 0 {
            return Err(MinerError::InvalidConfiguration(
                "max_replacement_candidates must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: DiffConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                let content = std::fs::read_to_string(path)?;
                Self::from_json_str(&content)
            }
            _ => Err(MinerError::InvalidConfiguration(format!(
                "Unsupported configuration file format: {}",
                path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = DiffConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.extremely_relaxed_matching);
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() -> Result<()> {
        let config = DiffConfig::from_json_str(r#"{ "timeout_ms": 1500 }"#)?;
        assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.max_operation_name_distance, 0.4);
        assert!(config.strict_validation);
        Ok(())
    }

    #[test]
    fn out_of_range_distance_is_rejected() {
        let result = DiffConfig::from_json_str(r#"{ "max_operation_name_distance": 1.5 }"#);
        assert!(matches!(result, Err(MinerError::InvalidConfiguration(_))));
    }

    #[test]
    fn load_from_file() -> Result<()> {
        use tempfile::TempDir;
        let dir = TempDir::new()?;
        let path = dir.path().join("miner.json");
        std::fs::write(&path, r#"{ "extremely_relaxed_matching": true }"#)?;

        let config = DiffConfig::load(&path)?;
        assert!(config.extremely_relaxed_matching);
        Ok(())
    }

    #[test]
    fn unsupported_extension() -> Result<()> {
        use tempfile::TempDir;
        let dir = TempDir::new()?;
        let path = dir.path().join("miner.toml");
        std::fs::write(&path, "timeout_ms = 3")?;
        assert!(DiffConfig::load(&path).is_err());
        Ok(())
    }
}
