use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub insight: InsightConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Transit data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_arrivals_interval_secs")]
    pub arrivals_interval_secs: u64,
    #[serde(default = "default_vehicles_interval_secs")]
    pub vehicles_interval_secs: u64,
    /// Delay between selecting a line and its first vehicle fetch.
    #[serde(default = "default_vehicles_start_delay_ms")]
    pub vehicles_start_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default = "default_stop_id")]
    pub default_stop_id: String,
    /// Rows shown initially and added by each "show more".
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

/// Default viewpoint of the vehicle map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_center_lat")]
    pub center_lat: f64,
    #[serde(default = "default_center_lon")]
    pub center_lon: f64,
    #[serde(default = "default_zoom")]
    pub zoom: u8,
    /// Fraction of the marker span added on every side when fitting bounds.
    #[serde(default = "default_fit_padding")]
    pub fit_padding: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Empty means: read `GEMINI_API_KEY` (or `API_KEY`) from the environment.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_insight_model")]
    pub model: String,
    #[serde(default = "default_insight_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_insight_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Local JSON API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_enabled")]
    pub enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl InsightConfig {
    pub fn resolved_api_key(&self) -> Option<String> {
        let configured = self.api_key.trim();
        if !configured.is_empty() {
            return Some(configured.to_string());
        }
        ["GEMINI_API_KEY", "API_KEY"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            arrivals_interval_secs: default_arrivals_interval_secs(),
            vehicles_interval_secs: default_vehicles_interval_secs(),
            vehicles_start_delay_ms: default_vehicles_start_delay_ms(),
        }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            default_stop_id: default_stop_id(),
            page_size: default_page_size(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_lat: default_center_lat(),
            center_lon: default_center_lon(),
            zoom: default_zoom(),
            fit_padding: default_fit_padding(),
        }
    }
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            model: default_insight_model(),
            endpoint: default_insight_endpoint(),
            request_timeout_secs: default_insight_timeout_secs(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: default_http_enabled(),
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.carrismetropolitana.pt".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("carris-board/{}", env!("CARGO_PKG_VERSION"))
}

fn default_arrivals_interval_secs() -> u64 {
    30
}

fn default_vehicles_interval_secs() -> u64 {
    10
}

fn default_vehicles_start_delay_ms() -> u64 {
    1000
}

fn default_stop_id() -> String {
    "120385".to_string()
}

fn default_page_size() -> usize {
    10
}

fn default_center_lat() -> f64 {
    38.7223
}

fn default_center_lon() -> f64 {
    -9.1393
}

fn default_zoom() -> u8 {
    12
}

fn default_fit_padding() -> f64 {
    0.1
}

fn default_insight_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_insight_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_insight_timeout_secs() -> u64 {
    15
}

fn default_http_enabled() -> bool {
    true
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8990
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            polling: PollingConfig::default(),
            board: BoardConfig::default(),
            map: MapConfig::default(),
            insight: InsightConfig::default(),
            http: HttpConfig::default(),
        }
    }
}
