//! Configuration types for the task engine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::task::{OrderingPolicy, ProgressWeighting};

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// How item progress is folded into task progress.
    pub progress_weighting: ProgressWeighting,
    /// How out-of-order events are treated.
    pub ordering: OrderingPolicy,
    /// Decimal places kept in the total progress percentage.
    pub progress_precision: u32,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            progress_weighting: ProgressWeighting::Mean,
            ordering: OrderingPolicy::Trust,
            progress_precision: 2,
        }
    }
}

impl TaskConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the progress weighting.
    #[must_use]
    pub const fn with_progress_weighting(mut self, weighting: ProgressWeighting) -> Self {
        self.progress_weighting = weighting;
        self
    }

    /// Sets the ordering policy.
    #[must_use]
    pub const fn with_ordering(mut self, ordering: OrderingPolicy) -> Self {
        self.ordering = ordering;
        self
    }

    /// Sets the number of decimal places in the total progress percentage.
    #[must_use]
    pub const fn with_progress_precision(mut self, digits: u32) -> Self {
        self.progress_precision = digits;
        self
    }
}

/// Where configuration is read from.
#[derive(Debug, Clone)]
pub struct PathConfig {
    /// Directory holding `config.toml`.
    pub config_dir: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            config_dir: config_dir.join("mc-tasks"),
        }
    }
}

impl PathConfig {
    /// Full path of the configuration file.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Engine settings, under `[tasks]`.
    pub tasks: TaskConfig,
}

impl AppConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Loads configuration from `path`, or defaults if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let config = Self::load(path)?;
            log::info!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            log::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_task_config() {
        let config = TaskConfig::default();
        assert_eq!(config.progress_weighting, ProgressWeighting::Mean);
        assert_eq!(config.ordering, OrderingPolicy::Trust);
        assert_eq!(config.progress_precision, 2);
    }

    #[test]
    fn task_config_builder_pattern() {
        let config = TaskConfig::new()
            .with_progress_weighting(ProgressWeighting::SizeWeighted)
            .with_ordering(OrderingPolicy::DropStale)
            .with_progress_precision(1);

        assert_eq!(config.progress_weighting, ProgressWeighting::SizeWeighted);
        assert_eq!(config.ordering, OrderingPolicy::DropStale);
        assert_eq!(config.progress_precision, 1);
    }

    #[test]
    fn task_config_serializes_to_toml() {
        let config = TaskConfig::new().with_ordering(OrderingPolicy::DropStale);
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains(r#"ordering = "drop_stale""#));
        let deserialized: TaskConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [tasks]
            progress_weighting = "size_weighted"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.tasks.progress_weighting,
            ProgressWeighting::SizeWeighted
        );
        assert_eq!(config.tasks.progress_precision, 2);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tasks]\nordering = \"drop_stale\"\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.tasks.ordering, OrderingPolicy::DropStale);
    }

    #[test]
    fn load_or_default_without_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.tasks, TaskConfig::default());
    }

    #[test]
    fn load_rejects_invalid_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tasks]\nordering = \"sometimes\"\n").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(crate::Error::Config(_))));
    }

    #[test]
    fn default_path_config() {
        let paths = PathConfig::default();
        assert!(paths.config_file().to_string_lossy().contains("mc-tasks"));
        assert!(paths.config_file().ends_with("config.toml"));
    }
}
