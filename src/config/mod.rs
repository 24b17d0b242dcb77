//! Process configuration, loaded from the environment with serde defaults.

use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::domain::{Result, TradeOpsError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Upstream trade-data provider
    #[serde(default = "default_base_url")]
    pub eximpedia_base_url: String,
    #[serde(default)]
    pub eximpedia_client_id: String,
    #[serde(default)]
    pub eximpedia_client_secret: String,

    /// Maximum in-flight upstream requests per process
    #[serde(default = "default_max_concurrent")]
    pub api_max_concurrent_requests: usize,
    /// Minimum gap between consecutive request submissions, seconds
    #[serde(default = "default_min_interval")]
    pub api_min_request_interval: f64,
    #[serde(default = "default_page_size")]
    pub api_page_size: usize,

    /// Refresh the token this many seconds before its expiry
    #[serde(default = "default_refresh_buffer")]
    pub token_refresh_buffer_seconds: u64,

    /// Dispatch surface bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
}

fn default_base_url() -> String {
    "https://web.eximpedia.app/backend/apis/v1".to_string()
}

fn default_max_concurrent() -> usize {
    5
}

fn default_min_interval() -> f64 {
    1.0
}

fn default_page_size() -> usize {
    1000
}

fn default_refresh_buffer() -> u64 {
    300
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            eximpedia_base_url: default_base_url(),
            eximpedia_client_id: String::new(),
            eximpedia_client_secret: String::new(),
            api_max_concurrent_requests: default_max_concurrent(),
            api_min_request_interval: default_min_interval(),
            api_page_size: default_page_size(),
            token_refresh_buffer_seconds: default_refresh_buffer(),
            bind_addr: default_bind_addr(),
            port: default_port(),
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

impl Config {
    /// Load from the environment, with defaults for everything except the
    /// upstream credentials.
    pub fn from_env() -> Result<Self> {
        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::raw())
            .extract()
            .map_err(|e| TradeOpsError::Config(e.to_string()))?;

        url::Url::parse(&config.eximpedia_base_url)
            .map_err(|e| TradeOpsError::Config(format!("invalid EXIMPEDIA_BASE_URL: {e}")))?;

        Ok(config)
    }

    /// Fail fast when the upstream credentials are absent. Called before any
    /// harvest work; the read-only analytics surface runs without them.
    pub fn require_credentials(&self) -> Result<()> {
        if self.eximpedia_client_id.is_empty() || self.eximpedia_client_secret.is_empty() {
            return Err(TradeOpsError::Config(
                "EXIMPEDIA_CLIENT_ID and EXIMPEDIA_CLIENT_SECRET must be set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn page_size(&self) -> usize {
        self.api_page_size.min(1000)
    }
}
