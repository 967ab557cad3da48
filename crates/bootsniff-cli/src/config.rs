//! Loading `bootsniff.yml`.

use anyhow::{Context, Result};
use bootsniff_adapters::TargetConfig;
use bootsniff_core::SniffConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootsniffConfig {
    pub sniff: SniffConfig,
    pub target: TargetConfig,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SniffOverrides {
    pub threshold_attempts: Option<u32>,
    pub good_watermark: Option<u32>,
}

impl BootsniffConfig {
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse configuration")
    }

    /// Loads the file at `path`, falling back to defaults when it is missing.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        debug!(path = %path.display(), "Loading config");
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn apply_overrides(&mut self, overrides: SniffOverrides) {
        if let Some(threshold) = overrides.threshold_attempts {
            self.sniff.threshold_attempts = threshold;
        }
        if let Some(watermark) = overrides.good_watermark {
            self.sniff.good_watermark = watermark;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.sniff.validate().context("Invalid sniff configuration")?;
        self.target
            .validate()
            .context("Invalid target configuration")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootsniff_adapters::BmcType;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = BootsniffConfig::load(&dir.path().join("bootsniff.yml")).unwrap();
        assert_eq!(config, BootsniffConfig::default());
        assert_eq!(config.sniff.threshold_attempts, 3);
        assert_eq!(config.sniff.good_watermark, 15);
        assert_eq!(config.sniff.round_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_load_merges_file_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bootsniff.yml");
        std::fs::write(
            &path,
            r"
sniff:
  good_watermark: 40
target:
  bmc_type: openbmc
  event_log: ''
",
        )
        .unwrap();

        let config = BootsniffConfig::load(&path).unwrap();
        assert_eq!(config.sniff.good_watermark, 40);
        assert_eq!(config.sniff.threshold_attempts, 3);
        assert_eq!(config.target.bmc_type, BmcType::Openbmc);
        assert!(config.target.event_log.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn test_malformed_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bootsniff.yml");
        std::fs::write(&path, "sniff: [not, a, map]").unwrap();

        let err = BootsniffConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("bootsniff.yml"));
    }

    #[test]
    fn test_overrides_win() {
        let mut config = BootsniffConfig::default();
        config.apply_overrides(SniffOverrides {
            threshold_attempts: Some(5),
            good_watermark: None,
        });
        assert_eq!(config.sniff.threshold_attempts, 5);
        assert_eq!(config.sniff.good_watermark, 15);
    }

    #[test]
    fn test_zero_threshold_fails_validation() {
        let mut config = BootsniffConfig::default();
        config.apply_overrides(SniffOverrides {
            threshold_attempts: Some(0),
            good_watermark: None,
        });
        assert!(config.validate().is_err());
    }
}
