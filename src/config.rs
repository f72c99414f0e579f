use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::webhook::WebhookClient;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5678";
pub const DEFAULT_WEBHOOK_PATH: &str = "customer-support";
pub const DEFAULT_USER_ID: &str = "customer1";

/// Which n8n webhook URL family to target
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WebhookMode {
    /// `/webhook/...`, requires the workflow to be active
    #[default]
    Production,
    /// `/webhook-test/...`, listens once after "Execute workflow" in the editor
    Test,
}

impl WebhookMode {
    fn path_prefix(&self) -> &'static str {
        match self {
            WebhookMode::Production => "webhook",
            WebhookMode::Test => "webhook-test",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub webhook_path: String,
    pub mode: WebhookMode,
    /// Full URL; takes precedence over base_url/webhook_path/mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            webhook_path: DEFAULT_WEBHOOK_PATH.to_string(),
            mode: WebhookMode::Production,
            endpoint: None,
            user_id: DEFAULT_USER_ID.to_string(),
            request_timeout_secs: None,
        }
    }

    /// Load from the user config file, falling back to defaults if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config file {:?}: {}", path, e))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Apply `SUPPORT_CHAT_ENDPOINT` and `SUPPORT_CHAT_USER_ID` overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var("SUPPORT_CHAT_ENDPOINT").ok(),
            std::env::var("SUPPORT_CHAT_USER_ID").ok(),
        );
    }

    pub fn apply_overrides(&mut self, endpoint: Option<String>, user_id: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            self.endpoint = Some(endpoint);
        }
        if let Some(user_id) = user_id.filter(|u| !u.trim().is_empty()) {
            self.user_id = user_id;
        }
    }

    /// The URL messages are posted to
    pub fn endpoint_url(&self) -> String {
        if let Some(endpoint) = &self.endpoint {
            return endpoint.clone();
        }
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.mode.path_prefix(),
            self.webhook_path.trim_start_matches('/'),
        )
    }

    pub fn client(&self) -> Result<WebhookClient> {
        let endpoint = self.endpoint_url();
        match self.request_timeout_secs {
            Some(secs) => WebhookClient::with_timeout(&endpoint, &self.user_id, Duration::from_secs(secs))
                .map_err(|e| anyhow!("Failed to build HTTP client: {}", e)),
            None => Ok(WebhookClient::new(&endpoint, &self.user_id)),
        }
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("support-chat").join("config.json"))
    }
}
