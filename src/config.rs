//! Client configuration: JSON file with defaults for every field, then environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::identity::{Routes, StoreOptions};

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the marketplace REST API
    #[serde(default = "ClientConfig::default_api_base_url")]
    pub api_base_url: String,
    /// Directory holding `storage.json`
    #[serde(default = "ClientConfig::default_storage_dir")]
    pub storage_dir: PathBuf,
    /// Seconds between unread-count refreshes; 0 disables polling
    #[serde(default = "ClientConfig::default_notification_interval_secs")]
    pub notification_interval_secs: u64,
    /// Mark a rehydrated session initialized before the live profile check
    #[serde(default)]
    pub trust_cached_session: bool,
    #[serde(default)]
    pub routes: Routes,
}

impl ClientConfig {
    fn default_api_base_url() -> String { "http://127.0.0.1:8080/api/".to_string() }
    fn default_storage_dir() -> PathBuf { PathBuf::from(".adopta") }
    fn default_notification_interval_secs() -> u64 { 30 }

    /// Defaults plus `ADOPTA_*` environment overrides.
    pub fn from_env() -> AppResult<Self> {
        let mut cfg = Self::default();
        cfg.apply_env(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    /// Read a JSON config file (missing fields defaulted), then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| AppError::config("config_read", format!("{}: {}", path.display(), e).as_str()))?;
        let mut cfg: ClientConfig = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::config("config_parse", format!("{}: {}", path.display(), e).as_str()))?;
        cfg.apply_env(|k| std::env::var(k).ok())?;
        debug!(target: "adopta::config", path = %path.display(), "config loaded");
        Ok(cfg)
    }

    pub(crate) fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, var: F) -> AppResult<()> {
        if let Some(v) = var("ADOPTA_API_URL") { self.api_base_url = v; }
        if let Some(v) = var("ADOPTA_STORAGE_DIR") { self.storage_dir = PathBuf::from(v); }
        if let Some(v) = var("ADOPTA_NOTIFY_INTERVAL_SECS") {
            self.notification_interval_secs = v.trim().parse::<u64>().map_err(|e| {
                AppError::config("config_env", format!("ADOPTA_NOTIFY_INTERVAL_SECS={}: {}", v, e).as_str())
            })?;
        }
        if let Some(v) = var("ADOPTA_TRUST_CACHED_SESSION") {
            self.trust_cached_session = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(v) = var("ADOPTA_SIGN_IN_ROUTE") { self.routes.sign_in = v; }
        if let Some(v) = var("ADOPTA_HOME_ROUTE") { self.routes.home = v; }
        Ok(())
    }

    pub fn notification_interval(&self) -> Option<Duration> {
        if self.notification_interval_secs == 0 { None } else { Some(Duration::from_secs(self.notification_interval_secs)) }
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions { trust_cached_session: self.trust_cached_session }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: Self::default_api_base_url(),
            storage_dir: Self::default_storage_dir(),
            notification_interval_secs: Self::default_notification_interval_secs(),
            trust_cached_session: false,
            routes: Routes::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn partial_file_gets_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("adopta.json");
        std::fs::write(&p, r#"{"api_base_url":"https://adopta.example/api/","routes":{"home":"/inicio"}}"#).unwrap();
        let mut cfg: ClientConfig = serde_json::from_slice(&std::fs::read(&p).unwrap()).unwrap();
        cfg.apply_env(|_| None).unwrap();
        assert_eq!(cfg.api_base_url, "https://adopta.example/api/");
        assert_eq!(cfg.notification_interval_secs, 30);
        assert_eq!(cfg.routes.home, "/inicio");
        assert_eq!(cfg.routes.sign_in, "/login");
        assert!(!cfg.trust_cached_session);
    }

    #[test]
    fn env_overrides() {
        let env: HashMap<&str, &str> = [
            ("ADOPTA_API_URL", "http://localhost:9000/"),
            ("ADOPTA_NOTIFY_INTERVAL_SECS", "0"),
            ("ADOPTA_TRUST_CACHED_SESSION", "true"),
            ("ADOPTA_SIGN_IN_ROUTE", "/ingresar"),
        ].into_iter().collect();
        let mut cfg = ClientConfig::default();
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.api_base_url, "http://localhost:9000/");
        assert!(cfg.notification_interval().is_none());
        assert!(cfg.store_options().trust_cached_session);
        assert_eq!(cfg.routes.sign_in, "/ingresar");
    }

    #[test]
    fn bad_interval_is_config_error() {
        let mut cfg = ClientConfig::default();
        let err = cfg.apply_env(|k| (k == "ADOPTA_NOTIFY_INTERVAL_SECS").then(|| "soon".to_string())).unwrap_err();
        assert!(matches!(err, AppError::Config { .. }));
    }

    #[test]
    fn load_missing_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(ClientConfig::load(tmp.path().join("nope.json")).is_err());
    }
}
