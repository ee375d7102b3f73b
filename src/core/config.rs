use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

pub const CURRENCYLAYER_KEY_ENV: &str = "CURRENCYLAYER_API_KEY";
pub const EXCHANGERATE_KEY_ENV: &str = "EXCHANGERATE_API_KEY";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct KeyedProviderConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl KeyedProviderConfig {
    /// The configured key, treating an empty value as unset.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

fn default_coingecko() -> ProviderConfig {
    ProviderConfig {
        base_url: "https://api.coingecko.com/api/v3".to_string(),
    }
}

fn default_currencylayer() -> KeyedProviderConfig {
    KeyedProviderConfig {
        base_url: "http://api.currencylayer.com".to_string(),
        api_key: None,
    }
}

fn default_exchangerates_api() -> KeyedProviderConfig {
    KeyedProviderConfig {
        base_url: "https://api.apilayer.com".to_string(),
        api_key: None,
    }
}

fn default_exchangerate_host() -> ProviderConfig {
    ProviderConfig {
        base_url: "https://api.exchangerate.host".to_string(),
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProvidersConfig {
    #[serde(default = "default_coingecko")]
    pub coingecko: ProviderConfig,
    #[serde(default = "default_currencylayer")]
    pub currencylayer: KeyedProviderConfig,
    #[serde(default = "default_exchangerates_api")]
    pub exchangerates_api: KeyedProviderConfig,
    #[serde(default = "default_exchangerate_host")]
    pub exchangerate_host: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            coingecko: default_coingecko(),
            currencylayer: default_currencylayer(),
            exchangerates_api: default_exchangerates_api(),
            exchangerate_host: default_exchangerate_host(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "127.0.0.1:5000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct CryptoCacheConfig {
    pub ttl_seconds: u64,
    pub size: usize,
}

impl CryptoCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Default for CryptoCacheConfig {
    fn default() -> Self {
        CryptoCacheConfig {
            ttl_seconds: 600,
            size: 100,
        }
    }
}

fn default_fiat_metadata() -> PathBuf {
    PathBuf::from("currency_metadata.json")
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_fiat_metadata")]
    pub fiat_metadata: PathBuf,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub crypto_cache: CryptoCacheConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            fiat_metadata: default_fiat_metadata(),
            server: ServerConfig::default(),
            crypto_cache: CryptoCacheConfig::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the default config file, falling back to built-in defaults when
    /// it does not exist, then applies environment overrides.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        let mut config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            debug!(
                "No config at {}, using built-in defaults",
                config_path.display()
            );
            Self::default()
        };
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Loads an explicit config file and applies environment overrides.
    pub fn load_with_env<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let mut config = Self::load_from_path(path)?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "coinfx", "coinfx")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// API keys from the environment replace configured ones. Empty values
    /// are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(CURRENCYLAYER_KEY_ENV) {
            debug!("Using {} from environment", CURRENCYLAYER_KEY_ENV);
            self.providers.currencylayer.api_key = Some(key);
        }
        if let Some(key) = non_empty(EXCHANGERATE_KEY_ENV) {
            debug!("Using {} from environment", EXCHANGERATE_KEY_ENV);
            self.providers.exchangerates_api.api_key = Some(key);
        }
    }
}
