use crate::config::AppConfig;
use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Json, Toml},
    Figment,
};
use std::path::Path;

/// Default location of the TOML configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/Config.toml";

/// Environment variable prefix; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "DEPTHWATCH_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads and validates configuration from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load() -> Result<AppConfig> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Loads application configuration by merging the TOML file at `path`,
    /// environment variables and `config/Config.json`, then validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, cannot be parsed, or fails
    /// validation.
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig> {
        let path = path.as_ref();
        if !path.exists() {
            bail!("configuration file {} not found", path.display());
        }

        let config: AppConfig = Self::figment(path)
            .extract()
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;

        Ok(config)
    }

    /// Provider stack without validation.
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .join(Json::file("config/Config.json"))
    }
}
