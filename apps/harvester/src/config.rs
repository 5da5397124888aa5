use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "../Config/Api_key";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file {} could not be read: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("config file {} is malformed: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("config file {} has an empty `{provider}.key`", .path.display())]
    EmptyKey {
        path: PathBuf,
        provider: &'static str,
    },
}

/// Credentials file, e.g.
///
/// ```yaml
/// AlphaAdvantage:
///   key: ...
/// ```
#[derive(Debug, Deserialize)]
pub struct PipelineConfig {
    #[serde(rename = "AlphaVantage", alias = "AlphaAdvantage")]
    pub alpha_vantage: ProviderCredentials,
}

#[derive(Deserialize)]
pub struct ProviderCredentials {
    pub key: String,
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("key", &"<redacted>")
            .finish()
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(path, &text)
    }

    fn parse(path: &Path, text: &str) -> Result<Self, ConfigError> {
        let mut config: PipelineConfig = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.alpha_vantage.key = config.alpha_vantage.key.trim().to_string();
        if config.alpha_vantage.key.is_empty() {
            return Err(ConfigError::EmptyKey {
                path: path.to_path_buf(),
                provider: "AlphaVantage",
            });
        }

        Ok(config)
    }

    pub fn api_key(&self) -> &str {
        &self.alpha_vantage.key
    }
}
