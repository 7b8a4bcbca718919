//! JSON Configuration Management
//!
//! Handles reading and writing the bridge configuration file: default batch
//! options, the expected source network and named destinations.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use batch_bridge_core::{BatchOptions, DestinationChain, NetworkId};
use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

// ============================================================================
// Config model
// ============================================================================

/// Persisted bridge configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Options used when a caller does not pass its own
    #[serde(default)]
    pub default_options: BatchOptions,
    /// Chain id the wallet must stay on while a batch runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_network: Option<u64>,
    /// Named destinations, e.g. `"optimism" -> { network: 10, recipient: ... }`
    #[serde(default)]
    pub destinations: HashMap<String, DestinationChain>,
}

/// Partial update of [`BridgeConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfigUpdate {
    pub default_options: Option<BatchOptions>,
    pub source_network: Option<u64>,
    /// Destinations to add or replace
    #[serde(default)]
    pub destinations: HashMap<String, DestinationChain>,
    /// Destination names to drop
    #[serde(default)]
    pub remove_destinations: Vec<String>,
}

impl BridgeConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: BridgeConfigUpdate) {
        if let Some(options) = update.default_options {
            self.default_options = options;
        }
        if let Some(network) = update.source_network {
            self.source_network = Some(network);
        }
        for name in update.remove_destinations {
            self.destinations.remove(&name);
        }
        self.destinations.extend(update.destinations);
    }

    pub fn validate(&self) -> Result<(), String> {
        self.default_options
            .validate()
            .map_err(|e| format!("Invalid default options: {}", e))?;

        for (name, destination) in &self.destinations {
            if name.trim().is_empty() {
                return Err("Destination name must not be empty".to_string());
            }
            if destination.recipient.trim().is_empty() {
                return Err(format!("Destination '{}' has an empty recipient", name));
            }
            if Some(destination.network.0) == self.source_network {
                return Err(format!(
                    "Destination '{}' targets the source network {}",
                    name, destination.network
                ));
            }
        }

        Ok(())
    }

    pub fn source_network(&self) -> Option<NetworkId> {
        self.source_network.map(NetworkId)
    }

    pub fn destination(&self, name: &str) -> AppResult<&DestinationChain> {
        self.destinations
            .get(name)
            .ok_or_else(|| AppError::not_found(format!("destination '{}'", name)))
    }
}

// ============================================================================
// Config service
// ============================================================================

/// Configuration service backed by a JSON file
#[derive(Debug)]
pub struct BridgeConfigService {
    config_path: PathBuf,
    config: BridgeConfig,
}

impl BridgeConfigService {
    /// Load the config at `path`, or create it with defaults if it does not exist
    pub fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let config_path = path.into();
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            let default_config = BridgeConfig::default();
            Self::save_to_file(&config_path, &default_config)?;
            tracing::info!(path = %config_path.display(), "[BridgeConfig] Created default config");
            default_config
        };

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> AppResult<BridgeConfig> {
        let content = fs::read_to_string(path)?;
        let config: BridgeConfig = serde_json::from_str(&content)?;
        config.validate().map_err(AppError::config)?;
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    fn save_to_file(path: &Path, config: &BridgeConfig) -> AppResult<()> {
        config.validate().map_err(AppError::config)?;
        let content = serde_json::to_string_pretty(config)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Update the configuration with a partial update.
    ///
    /// An update that would produce an invalid config is rejected and leaves
    /// both memory and disk untouched.
    pub fn update_config(&mut self, update: BridgeConfigUpdate) -> AppResult<BridgeConfig> {
        let mut candidate = self.config.clone();
        candidate.apply_update(update);
        Self::save_to_file(&self.config_path, &candidate)?;
        self.config = candidate;
        Ok(self.config.clone())
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> AppResult<()> {
        Self::save_to_file(&self.config_path, &self.config)
    }

    /// Reload configuration from disk
    pub fn reload(&mut self) -> AppResult<()> {
        self.config = Self::load_from_file(&self.config_path)?;
        Ok(())
    }

    /// Reset configuration to defaults
    pub fn reset(&mut self) -> AppResult<()> {
        self.config = BridgeConfig::default();
        self.save()
    }

    pub fn is_healthy(&self) -> bool {
        self.config_path.exists() && self.config.validate().is_ok()
    }
}
