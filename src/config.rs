use std::env;
use std::fs;
use std::path::PathBuf;

use config::{Config as ConfigLoader, ConfigError, File};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Network constants loaded from configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConstants {
    /// Network name
    pub network_name: String,
    /// EVM chain id
    pub chain_id: u64,
    /// Base URL of the routing provider API
    pub router_api_url: String,
    /// JSON-RPC endpoint for the chain
    pub rpc_url: String,
    /// Block explorer base URL
    pub explorer_url: String,
    /// Block explorer display name
    pub explorer_name: String,
    /// Native token symbol
    pub native_symbol: String,
    /// Sentinel address the routing provider uses for the native token
    pub native_address: String,
    /// Native token decimals
    pub native_decimals: u8,
    /// Default slippage in basis points
    pub default_slippage_bps: u32,
}

impl Default for NetworkConstants {
    fn default() -> Self {
        Self {
            network_name: "polygon".to_string(),
            chain_id: 137,
            router_api_url: "https://api.enso.finance/api/v1".to_string(),
            rpc_url: "https://polygon-rpc.com".to_string(),
            explorer_url: "https://polygonscan.com".to_string(),
            explorer_name: "Polygonscan".to_string(),
            native_symbol: "POL".to_string(),
            native_address: "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE".to_string(),
            native_decimals: 18,
            default_slippage_bps: 50,
        }
    }
}

impl NetworkConstants {
    /// Load network constants for the named network from the configuration file
    pub fn load(network: &str) -> Result<Self, ConfigError> {
        let config_dir = env::var("CHATSWAP_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let settings = ConfigLoader::builder()
            .add_source(File::with_name(&format!("{}/network", config_dir)))
            .build()?;

        settings.get::<NetworkConstants>(network)
    }

    /// Load the named network, falling back to built-in Polygon defaults
    pub fn load_or_default(network: &str) -> Self {
        Self::load(network).unwrap_or_default()
    }
}

/// User settings, persisted as a flat JSON blob
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Credential for the LLM provider; presence gates chat features
    pub api_key: Option<String>,
    /// When true, prepared swaps execute without an explicit confirmation
    pub send_without_confirm: bool,
}

/// Persistence adapter for [`Settings`]: loaded at startup, saved
/// synchronously on every change.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Result<Settings, Error>;
    fn save(&self, settings: &Settings) -> Result<(), Error>;
}

/// File-backed settings store (flat JSON, no schema versioning)
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the default settings file path
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("chatswap");
        path.push("settings.json");
        path
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Result<Settings, Error> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }
        let content = fs::read_to_string(&self.path)?;
        let settings = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse settings: {}", e)))?;
        Ok(settings)
    }

    fn save(&self, settings: &Settings) -> Result<(), Error> {
        let content = serde_json::to_string_pretty(settings)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.path, content)?;
        Ok(())
    }
}
