use std::path::Path;

use phonenumber::country;
use serde::Deserialize;

use super::AppCore;

const DEFAULT_REGION: country::Id = country::Id::IN;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(super) struct AppConfig {
    pub(super) backend_url: Option<String>,
    pub(super) backend_anon_key: Option<String>,
    /// ISO region assumed for numbers stored without a country code.
    pub(super) default_region: Option<String>,
    pub(super) disable_network: Option<bool>,
}

pub(super) fn load_app_config(data_dir: &str) -> AppConfig {
    let path = Path::new(data_dir).join("namaste_config.json");
    let Ok(bytes) = std::fs::read(&path) else {
        return AppConfig::default();
    };
    serde_json::from_slice::<AppConfig>(&bytes).unwrap_or_default()
}

impl AppCore {
    pub(super) fn network_enabled(&self) -> bool {
        // Used to keep Rust tests deterministic and offline.
        if let Some(disable) = self.config.disable_network {
            return !disable;
        }
        std::env::var("NAMASTE_DISABLE_NETWORK").ok().as_deref() != Some("1")
    }

    pub(super) fn default_region(&self) -> country::Id {
        self.config
            .default_region
            .as_deref()
            .and_then(|code| code.trim().parse().ok())
            .unwrap_or(DEFAULT_REGION)
    }
}
