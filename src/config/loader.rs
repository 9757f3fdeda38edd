//! Configuration Loader
//!
//! Layers built-in defaults, an optional YAML file and `DISTRIBUTOR__*`
//! environment variables into a validated `DistributorConfig`.

use super::error::{ConfigResult, ConfigurationError};
use super::DistributorConfig;
use config::{Config, Environment, File, FileFormat};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Prefix of environment overrides, e.g. `DISTRIBUTOR__HEALTH_CHECK__MAX_ATTEMPTS=5`
pub const ENV_PREFIX: &str = "DISTRIBUTOR";

/// Loaded, validated configuration plus the environment it was loaded for
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: DistributorConfig,
    environment: String,
}

impl ConfigManager {
    /// Load configuration from defaults and the environment only
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from(None)
    }

    /// Load configuration, reading `path` as YAML when given
    pub fn load_from(path: Option<&Path>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();

        let mut builder =
            Config::builder().add_source(Config::try_from(&DistributorConfig::default())?);

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigurationError::config_file_not_found(path));
            }
            debug!(
                "Loading distributor configuration for environment '{}' from {}",
                environment,
                path.display()
            );
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: DistributorConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        info!(
            environment = %environment,
            distributor_batch_size = config.distributor_batch_size,
            worker_bulk_size = config.worker_bulk_size,
            family_queue_size = config.family_queue_size,
            "Distributor configuration loaded"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment,
        }))
    }

    /// Wrap an already built configuration, validating it
    pub fn from_config(config: DistributorConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: Self::detect_environment(),
        }))
    }

    pub fn config(&self) -> &DistributorConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Detect current environment from environment variables
    pub fn detect_environment() -> String {
        std::env::var("DISTRIBUTOR_ENV")
            .or_else(|_| std::env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_defaults_without_file() {
        let manager = ConfigManager::load().unwrap();
        assert_eq!(manager.config().worker_bulk_size, 10);
    }

    #[test]
    fn test_load_yaml_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "distributor_batch_size: 4\nhealth_check:\n  max_attempts: 7\nregistry:\n  worker_db_path: /tmp/workers.json"
        )
        .unwrap();

        let manager = ConfigManager::load_from(Some(file.path())).unwrap();
        let config = manager.config();
        assert_eq!(config.distributor_batch_size, 4);
        assert_eq!(config.health_check.max_attempts, 7);
        // untouched keys keep their defaults
        assert_eq!(config.health_check.initial_backoff_ms, 1000);
        assert_eq!(
            config.registry.worker_db_path,
            std::path::PathBuf::from("/tmp/workers.json")
        );
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = ConfigManager::load_from(Some(Path::new("/definitely/not/here.yaml")))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::ConfigFileNotFound { .. }));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "worker_bulk_size: 0").unwrap();
        let err = ConfigManager::load_from(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
    }
}
