//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the backend URL override, the last used email and the
//! credential storage backend.
//!
//! Configuration is stored at `~/.config/farewatch/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "farewatch";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable that overrides the backend base URL
pub const API_URL_ENV: &str = "FAREWATCH_API_URL";

/// Backend address on desktop and iOS targets
const LOCAL_BASE_URL: &str = "http://localhost:8000";

/// The Android emulator reaches the host loopback through this alias
const ANDROID_EMULATOR_BASE_URL: &str = "http://10.0.2.2:8000";

/// Where session credentials are kept between runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialBackend {
    /// OS keychain. Linux uses the kernel session keyring, which does not
    /// outlive the login session.
    Keyring,
    /// Passphrase-encrypted file in the data directory
    #[default]
    EncryptedFile,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_url: Option<String>,
    pub last_email: Option<String>,
    #[serde(default)]
    pub credential_backend: CredentialBackend,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Backend URL for this run: environment first, then the config file,
    /// then the platform default.
    pub fn base_url(&self) -> String {
        let env_override = std::env::var(API_URL_ENV).ok();
        let override_url = non_empty(env_override.as_deref()).or(non_empty(self.api_url.as_deref()));
        resolve_base_url(override_url, Platform::current())
    }
}

/// Target platform, as far as backend addressing is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Android,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "android") {
            Platform::Android
        } else {
            Platform::Other
        }
    }
}

/// Pick the backend base URL. A non-empty override always wins.
pub fn resolve_base_url(override_url: Option<&str>, platform: Platform) -> String {
    if let Some(url) = non_empty(override_url) {
        return url.trim_end_matches('/').to_string();
    }
    match platform {
        Platform::Android => ANDROID_EMULATOR_BASE_URL.to_string(),
        Platform::Other => LOCAL_BASE_URL.to_string(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins_on_every_platform() {
        for platform in [Platform::Android, Platform::Other] {
            assert_eq!(
                resolve_base_url(Some("https://api.example.com"), platform),
                "https://api.example.com"
            );
        }
    }

    #[test]
    fn test_platform_defaults() {
        assert_eq!(resolve_base_url(None, Platform::Android), "http://10.0.2.2:8000");
        assert_eq!(resolve_base_url(None, Platform::Other), "http://localhost:8000");
    }

    #[test]
    fn test_empty_override_is_ignored() {
        assert_eq!(resolve_base_url(Some(""), Platform::Other), "http://localhost:8000");
        assert_eq!(resolve_base_url(Some("  "), Platform::Android), "http://10.0.2.2:8000");
    }

    #[test]
    fn test_override_trailing_slash_trimmed() {
        assert_eq!(
            resolve_base_url(Some("https://api.example.com/"), Platform::Other),
            "https://api.example.com"
        );
    }

    #[test]
    fn test_config_defaults_when_fields_missing() {
        let config: Config = serde_json::from_str("{}").expect("parse empty config");
        assert_eq!(config.credential_backend, CredentialBackend::EncryptedFile);
        assert!(config.api_url.is_none());

        let config: Config = serde_json::from_str(r#"{"credential_backend":"keyring"}"#).unwrap();
        assert_eq!(config.credential_backend, CredentialBackend::Keyring);
    }
}
