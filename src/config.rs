//! Engine configuration.
//!
//! Loaded from a TOML file, with environment variable overrides.

use serde::{Deserialize, Serialize};
use std::{borrow::Cow, env, io::ErrorKind, path::Path, str::FromStr, time::Duration};

use crate::domain::{Tier, TierCatalog, TierCatalogError};

/// Environment variable holding the path of the configuration file
pub const CONFIG_PATH_VAR: &str = "LOYALTY_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "loyalty.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    /// Tier catalog seed. The standard catalog is used when this is empty.
    pub tiers: Vec<Tier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Attempts made for a points change before giving up on concurrent updates
    pub max_conflict_retries: u32,
    /// Upper bound on the time spent publishing a single event
    pub publish_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 3,
            publish_timeout_ms: 500,
        }
    }
}

impl EngineConfig {
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(Cow<'static, str>),
    #[error("invalid tier catalog: {0}")]
    Tiers(#[from] TierCatalogError),
}

impl Config {
    /// Loads the file named by `LOYALTY_CONFIG`, or `loyalty.toml`
    ///
    /// A missing file is not an error, defaults are used instead. Environment overrides are
    /// applied in both cases.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config = match Self::from_path(&path) {
            Ok(config) => config,
            Err(ConfigError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path, "no configuration file, using defaults");
                Self::default()
            }
            Err(err) => return Err(err),
        };
        config.apply_env_overrides(|name| env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Overrides values from variables looked up through `lookup`
    ///
    /// Recognises `LOYALTY_MAX_CONFLICT_RETRIES` and `LOYALTY_PUBLISH_TIMEOUT_MS`.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup("LOYALTY_MAX_CONFLICT_RETRIES") {
            self.engine.max_conflict_retries =
                parse_override("LOYALTY_MAX_CONFLICT_RETRIES", &value)?;
        }
        if let Some(value) = lookup("LOYALTY_PUBLISH_TIMEOUT_MS") {
            self.engine.publish_timeout_ms =
                parse_override("LOYALTY_PUBLISH_TIMEOUT_MS", &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.max_conflict_retries == 0 {
            return Err(ConfigError::Invalid(
                "engine.max_conflict_retries must be at least 1".into(),
            ));
        }
        self.tier_catalog()?;
        Ok(())
    }

    pub fn tier_catalog(&self) -> Result<TierCatalog, TierCatalogError> {
        if self.tiers.is_empty() {
            return Ok(TierCatalog::standard());
        }
        TierCatalog::new(self.tiers.clone())
    }
}

fn parse_override<N: FromStr>(name: &str, value: &str) -> Result<N, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{name} is not a number: {value}").into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TierLevel;
    use speculoos::prelude::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml_str("").unwrap();

        assert_that!(config.engine.max_conflict_retries).is_equal_to(3);
        assert_that!(config.engine.publish_timeout()).is_equal_to(Duration::from_millis(500));
        assert_that!(config.tier_catalog()).is_ok().is_equal_to(TierCatalog::standard());
    }

    #[test]
    fn test_parse_tiers() {
        let config = Config::from_toml_str(
            r#"
            [engine]
            max_conflict_retries = 5

            [[tiers]]
            name = "bronze"
            min_points = 0
            cashback_rate = 0.0
            points_multiplier = 1.0
            free_shipping = false

            [[tiers]]
            name = "gold"
            min_points = 2000
            cashback_rate = 0.05
            points_multiplier = 2.0
            free_shipping = true
            priority_support_hours = 12
            "#,
        )
        .unwrap();

        let catalog = config.tier_catalog().unwrap();

        assert_that!(config.engine.max_conflict_retries).is_equal_to(5);
        assert_that!(config.engine.publish_timeout_ms).is_equal_to(500);
        assert_that!(catalog.tier_for_points(2_500).level).is_equal_to(TierLevel::Gold);
        assert_that!(catalog.tier_for_points(2_500).priority_support_hours).is_equal_to(Some(12));
    }

    #[test]
    fn test_invalid_tiers() {
        let res = Config::from_toml_str(
            r#"
            [[tiers]]
            name = "silver"
            min_points = 100
            cashback_rate = 0.0
            points_multiplier = 1.0
            free_shipping = false
            "#,
        );

        assert_that!(res)
            .is_err()
            .matches(|err| matches!(err, ConfigError::Tiers(TierCatalogError::MissingBaseThreshold(100))));
    }

    #[test]
    fn test_zero_retries() {
        let res = Config::from_toml_str("[engine]\nmax_conflict_retries = 0\n");

        assert_that!(res)
            .is_err()
            .matches(|err| matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_env_overrides() {
        let vars = HashMap::from([
            ("LOYALTY_MAX_CONFLICT_RETRIES", "7"),
            ("LOYALTY_PUBLISH_TIMEOUT_MS", "50"),
        ]);
        let mut config = Config::default();

        config
            .apply_env_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_that!(config.engine.max_conflict_retries).is_equal_to(7);
        assert_that!(config.engine.publish_timeout_ms).is_equal_to(50);
    }

    #[test]
    fn test_env_override_not_a_number() {
        let mut config = Config::default();

        let res = config.apply_env_overrides(|name| {
            (name == "LOYALTY_PUBLISH_TIMEOUT_MS").then(|| "soon".to_string())
        });

        assert_that!(res).is_err();
    }

    #[test]
    fn test_missing_file() {
        let res = Config::from_path("/nonexistent/loyalty.toml");

        assert_that!(res)
            .is_err()
            .matches(|err| matches!(err, ConfigError::Io { .. }));
    }
}
