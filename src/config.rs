//! Monitor Configuration
//!
//! Settings come from a TOML file, then CLI flags override individual values.
//! Defaults match a local node on port 9333 watching version 3 from 810000.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::monitor::MonitorParams;
use crate::rpc::RpcEndpoint;
use crate::types::{
    rule_name, BlockHeight, BlockVersion, CountMode, ACTIVATION_PERIOD, ENFORCEMENT_PERIOD,
    TARGET_WINDOW,
};

/// Configuration errors, all raised before polling starts
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unknown block version {0}: no soft fork rule is known for it")]
    UnknownVersion(BlockVersion),
}

/// Main configuration for a monitoring run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    // === Node ===

    /// RPC host of the full node
    pub rpc_host: String,

    /// RPC port of the full node
    pub rpc_port: u16,

    /// RPC username
    pub rpc_user: String,

    /// RPC password
    pub rpc_pass: String,

    /// Per-request timeout (seconds)
    pub rpc_timeout_secs: u64,

    // === Target ===

    /// Block version to watch
    pub version: BlockVersion,

    /// First tip height to assess
    pub start_height: BlockHeight,

    /// Refuse versions that have no known rule name
    pub strict_rule: bool,

    // === Window ===

    /// Blocks examined per decision
    pub window: u64,

    /// Matching blocks needed for activation (lock-in)
    pub activation_threshold: u64,

    /// Matching blocks needed for enforcement
    pub enforcement_threshold: u64,

    /// How block versions are compared against the target
    pub count_mode: CountMode,

    /// Evict cached heights that fell out of the window
    pub prune_cache: bool,

    // === Output ===

    /// Per-height progress at info level
    pub verbose: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            // Node
            rpc_host: "127.0.0.1".to_string(),
            rpc_port: 9333,
            rpc_user: "user".to_string(),
            rpc_pass: "pass".to_string(),
            rpc_timeout_secs: 30,

            // Target
            version: 3,
            start_height: 810_000,
            strict_rule: false,

            // Window
            window: TARGET_WINDOW,
            activation_threshold: ACTIVATION_PERIOD,
            enforcement_threshold: ENFORCEMENT_PERIOD,
            count_mode: CountMode::AtLeast,
            prune_cache: false,

            // Output
            verbose: false,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    // Builder-style methods for CLI overrides

    pub fn with_rpc_host(mut self, host: Option<String>) -> Self {
        if let Some(host) = host {
            self.rpc_host = host;
        }
        self
    }

    pub fn with_rpc_port(mut self, port: Option<u16>) -> Self {
        if let Some(port) = port {
            self.rpc_port = port;
        }
        self
    }

    pub fn with_rpc_credentials(mut self, user: Option<String>, pass: Option<String>) -> Self {
        if let Some(user) = user {
            self.rpc_user = user;
        }
        if let Some(pass) = pass {
            self.rpc_pass = pass;
        }
        self
    }

    pub fn with_rpc_timeout(mut self, secs: Option<u64>) -> Self {
        if let Some(secs) = secs {
            self.rpc_timeout_secs = secs;
        }
        self
    }

    pub fn with_version(mut self, version: Option<BlockVersion>) -> Self {
        if let Some(version) = version {
            self.version = version;
        }
        self
    }

    pub fn with_start_height(mut self, height: Option<BlockHeight>) -> Self {
        if let Some(height) = height {
            self.start_height = height;
        }
        self
    }

    pub fn with_window(mut self, window: Option<u64>) -> Self {
        if let Some(window) = window {
            self.window = window;
        }
        self
    }

    pub fn with_thresholds(mut self, activation: Option<u64>, enforcement: Option<u64>) -> Self {
        if let Some(activation) = activation {
            self.activation_threshold = activation;
        }
        if let Some(enforcement) = enforcement {
            self.enforcement_threshold = enforcement;
        }
        self
    }

    /// Flags can only switch a setting on; the file decides otherwise
    pub fn with_flags(mut self, exact: bool, strict_rule: bool, prune_cache: bool, verbose: bool) -> Self {
        if exact {
            self.count_mode = CountMode::Exact;
        }
        self.strict_rule |= strict_rule;
        self.prune_cache |= prune_cache;
        self.verbose |= verbose;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc_host.trim().is_empty() {
            return Err(ConfigError::Invalid("rpc_host must not be empty".to_string()));
        }

        if self.rpc_port == 0 {
            return Err(ConfigError::Invalid("rpc_port must not be 0".to_string()));
        }

        if self.rpc_timeout_secs == 0 {
            return Err(ConfigError::Invalid("rpc_timeout_secs must not be 0".to_string()));
        }

        if self.window == 0 {
            return Err(ConfigError::Invalid("window must not be 0".to_string()));
        }

        if self.activation_threshold == 0 {
            return Err(ConfigError::Invalid(
                "activation_threshold must not be 0".to_string(),
            ));
        }

        if self.enforcement_threshold > self.window {
            return Err(ConfigError::Invalid(format!(
                "enforcement_threshold ({}) must not exceed window ({})",
                self.enforcement_threshold, self.window
            )));
        }

        if self.activation_threshold > self.enforcement_threshold {
            return Err(ConfigError::Invalid(format!(
                "activation_threshold ({}) must not exceed enforcement_threshold ({})",
                self.activation_threshold, self.enforcement_threshold
            )));
        }

        // The first window must not reach below genesis
        if self.start_height.saturating_add(1) < self.window {
            return Err(ConfigError::Invalid(format!(
                "start_height ({}) is too low for a window of {} blocks",
                self.start_height, self.window
            )));
        }

        if self.strict_rule && rule_name(self.version).is_none() {
            return Err(ConfigError::UnknownVersion(self.version));
        }

        Ok(())
    }

    /// Node connection settings
    pub fn endpoint(&self) -> RpcEndpoint {
        RpcEndpoint {
            host: self.rpc_host.clone(),
            port: self.rpc_port,
            user: self.rpc_user.clone(),
            pass: self.rpc_pass.clone(),
            timeout: Duration::from_secs(self.rpc_timeout_secs),
        }
    }

    /// State machine parameters
    pub fn monitor_params(&self) -> MonitorParams {
        MonitorParams {
            target: self.version,
            window: self.window,
            activation_threshold: self.activation_threshold,
            enforcement_threshold: self.enforcement_threshold,
            prune_cache: self.prune_cache,
            verbose: self.verbose,
        }
    }
}
