use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_workers")]
    pub generators: usize,
    #[serde(default = "default_workers")]
    pub publishers: usize,
}

fn default_workers() -> usize {
    1
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debug: false,
            generators: 1,
            publishers: 1,
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from the file named by `CONFIGURATION_PATH`,
    /// falling back to defaults when the variable is unset and no file
    /// exists at the default location. `GENERATORS` and `PUBLISHERS`
    /// environment variables override the file values.
    pub fn from_env() -> Result<Self> {
        let config_path = std::env::var("CONFIGURATION_PATH")
            .unwrap_or_else(|_| "config/config.json".to_string());

        let mut config = if std::path::Path::new(&config_path).exists() {
            Self::from_file(&config_path)?
        } else {
            Self::default()
        };

        if let Some(n) = Self::env_count("GENERATORS")? {
            config.generators = n;
        }
        if let Some(n) = Self::env_count("PUBLISHERS")? {
            config.publishers = n;
        }
        config.validate()?;
        Ok(config)
    }

    fn env_count(name: &str) -> Result<Option<usize>> {
        match std::env::var(name) {
            Ok(s) => s
                .parse()
                .map(Some)
                .map_err(|_| AppError::Config(format!("{} must be a positive integer", name))),
            Err(_) => Ok(None),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.generators < 1 {
            return Err(AppError::Config(
                "generators must be at least 1".to_string(),
            ));
        }
        if self.publishers < 1 {
            return Err(AppError::Config(
                "publishers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_single_worker() {
        let config = AppConfig::default();
        assert_eq!(config.generators, 1);
        assert_eq!(config.publishers, 1);
        assert!(!config.debug);
    }

    #[test]
    fn parses_partial_config() {
        let config: AppConfig = serde_json::from_str(r#"{"generators": 4}"#).unwrap();
        assert_eq!(config.generators, 4);
        assert_eq!(config.publishers, 1);
    }

    #[test]
    fn rejects_zero_workers() {
        let config: AppConfig = serde_json::from_str(r#"{"publishers": 0}"#).unwrap();
        assert!(config.validate().is_err());
    }
}
