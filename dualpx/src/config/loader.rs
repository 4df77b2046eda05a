use crate::config::types::ProxyConfig;
use crate::utils::validation::is_empty_or_whitespace;
use anyhow::Result;
use log::{debug, error, trace, warn};
use std::path::Path;

impl ProxyConfig {
    /// Load the configuration named on the command line, or fall back to built-in defaults
    /// without touching the filesystem when no path is given.
    pub async fn resolve(arg: Option<String>) -> Result<Self> {
        match arg {
            Some(path) if !is_empty_or_whitespace(&path) => Self::try_load(path.trim()).await,
            _ => {
                debug!("No config file given, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a file. A missing file is created with defaults; a corrupted
    /// one is moved aside to `<name>.corrupted.N` and replaced with defaults.
    pub async fn try_load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());
        let config = if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            match serde_json::from_str::<ProxyConfig>(&content) {
                Ok(mut cfg) => {
                    cfg.path = Some(path.to_owned());
                    cfg
                }
                Err(e) => {
                    error!("Failed to parse config file: {}", e);
                    let mut number_of_corruptions = 1;
                    let mut backup_path = path.with_extension(format!("corrupted.{}", number_of_corruptions));
                    while backup_path.exists() {
                        number_of_corruptions += 1;
                        backup_path = path.with_extension(format!("corrupted.{}", number_of_corruptions));
                    }
                    tokio::fs::rename(path, &backup_path).await?;
                    warn!("Config file corrupted (moved to {}), using default config", backup_path.display());
                    Self::save_default(path).await?
                }
            }
        } else {
            warn!("Config file not found, using default config");
            Self::save_default(path).await?
        };
        trace!("Loaded config: {:#?}", config);
        Ok(config)
    }

    /// Save the current configuration to its file
    pub async fn save(&self) -> Result<()> {
        let path = self.path.as_ref().ok_or(anyhow::anyhow!("Configuration has no file path"))?;
        debug!("Saving config to: {}", path.display());
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Save a default configuration at exactly `path` and return it
    pub async fn save_default(path: impl AsRef<Path>) -> Result<Self> {
        debug!("Saving default config to: {}", path.as_ref().display());
        let config = Self { path: Some(path.as_ref().to_owned()), ..Self::default() };
        config.save().await?;
        Ok(config)
    }
}
