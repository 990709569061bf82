//! Configuration settings for the Sokoban SAT planner

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub search: SearchConfig,
    pub encoding: EncodingConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub mode: PlanMode,
    pub strategy: SearchStrategy,
    pub min_horizon: usize,
    pub max_horizon: usize,
    pub timeout_seconds: u64,
}

/// Direction of the formulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
    /// Players push boxes from their starts onto the targets
    Push,
    /// Players pull boxes off the targets they start on
    Pull,
}

/// How the driver walks the horizon axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    Linear,
    Binary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingConfig {
    pub tunnel_macro: bool,
    pub deadlock_pruning: bool,
    /// Largest Cartesian expansion emitted before switching to transfer literals
    pub expansion_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub map_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub results_file: Option<PathBuf>,
    pub render: bool,
    pub format: OutputFormat,
    pub plan_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Text,
    Json,
}

impl fmt::Display for PlanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanMode::Push => write!(f, "push"),
            PlanMode::Pull => write!(f, "pull"),
        }
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchStrategy::Linear => write!(f, "linear"),
            SearchStrategy::Binary => write!(f, "binary"),
        }
    }
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            tunnel_macro: true,
            deadlock_pruning: true,
            expansion_limit: 729,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            search: SearchConfig {
                mode: PlanMode::Push,
                strategy: SearchStrategy::Linear,
                min_horizon: 0,
                max_horizon: 200,
                timeout_seconds: 3600,
            },
            encoding: EncodingConfig::default(),
            input: InputConfig {
                map_file: PathBuf::from("input/maps/straight.txt"),
            },
            output: OutputConfig {
                results_file: None,
                render: false,
                format: OutputFormat::Text,
                plan_file: None,
            },
        }
    }
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self).context("Failed to serialize settings")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.search.max_horizon < self.search.min_horizon {
            anyhow::bail!(
                "Maximum horizon {} is below minimum horizon {}",
                self.search.max_horizon,
                self.search.min_horizon
            );
        }

        if self.search.timeout_seconds == 0 {
            anyhow::bail!("Timeout must be positive");
        }

        if self.encoding.expansion_limit == 0 {
            anyhow::bail!("Expansion limit must be positive");
        }

        if !self.input.map_file.exists() {
            anyhow::bail!("Map file does not exist: {}", self.input.map_file.display());
        }

        Ok(())
    }

    /// Merge settings with command line overrides
    pub fn merge_with_cli(&mut self, cli_overrides: &CliOverrides) {
        if let Some(ref map_file) = cli_overrides.map_file {
            self.input.map_file = map_file.clone();
        }
        if let Some(mode) = cli_overrides.mode {
            self.search.mode = mode;
        }
        if let Some(strategy) = cli_overrides.strategy {
            self.search.strategy = strategy;
        }
        if let Some(max_horizon) = cli_overrides.max_horizon {
            self.search.max_horizon = max_horizon;
        }
        if let Some(timeout) = cli_overrides.timeout_seconds {
            self.search.timeout_seconds = timeout;
        }
        if cli_overrides.no_tunnels {
            self.encoding.tunnel_macro = false;
        }
        if let Some(ref results) = cli_overrides.results_file {
            self.output.results_file = Some(results.clone());
        }
        if cli_overrides.render {
            self.output.render = true;
        }
    }
}

/// Command line overrides for settings
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub map_file: Option<PathBuf>,
    pub mode: Option<PlanMode>,
    pub strategy: Option<SearchStrategy>,
    pub max_horizon: Option<usize>,
    pub timeout_seconds: Option<u64>,
    pub no_tunnels: bool,
    pub results_file: Option<PathBuf>,
    pub render: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip() {
        let temp_dir = tempdir().unwrap();
        let map_path = temp_dir.path().join("map.txt");
        std::fs::write(&map_path, "#####\n#@$.#\n#####\n").unwrap();

        let mut settings = Settings::default();
        settings.input.map_file = map_path;
        settings.search.mode = PlanMode::Pull;
        settings.encoding.expansion_limit = 27;

        let config_path = temp_dir.path().join("nested/config.yaml");
        settings.to_file(&config_path).unwrap();
        let loaded = Settings::from_file(&config_path).unwrap();

        assert_eq!(loaded.search.mode, PlanMode::Pull);
        assert_eq!(loaded.search.max_horizon, 200);
        assert_eq!(loaded.search.timeout_seconds, 3600);
        assert_eq!(loaded.encoding.expansion_limit, 27);
        assert!(loaded.encoding.tunnel_macro);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let temp_dir = tempdir().unwrap();
        let map_path = temp_dir.path().join("map.txt");
        std::fs::write(&map_path, "#####\n#@$.#\n#####\n").unwrap();

        let mut settings = Settings::default();
        settings.input.map_file = map_path;
        assert!(settings.validate().is_ok());

        settings.search.min_horizon = 10;
        settings.search.max_horizon = 5;
        assert!(settings.validate().is_err());
        settings.search.max_horizon = 10;

        settings.encoding.expansion_limit = 0;
        assert!(settings.validate().is_err());
        settings.encoding.expansion_limit = 1;

        settings.input.map_file = temp_dir.path().join("missing.txt");
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_merge_with_cli() {
        let mut settings = Settings::default();
        let overrides = CliOverrides {
            map_file: Some(PathBuf::from("other.txt")),
            strategy: Some(SearchStrategy::Binary),
            max_horizon: Some(40),
            no_tunnels: true,
            ..Default::default()
        };
        settings.merge_with_cli(&overrides);

        assert_eq!(settings.input.map_file, PathBuf::from("other.txt"));
        assert_eq!(settings.search.strategy, SearchStrategy::Binary);
        assert_eq!(settings.search.mode, PlanMode::Push);
        assert_eq!(settings.search.max_horizon, 40);
        assert!(!settings.encoding.tunnel_macro);
    }
}
