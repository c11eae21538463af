//! Main application configuration
//!
//! This module defines the primary configuration structures for the arena
//! coordinator, including environment variable loading, TOML files and
//! validation.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub server: ServerSettings,
    pub matchmaking: MatchmakingSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for health check and metrics endpoints
    pub health_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Real-time channel listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Interface to bind the WebSocket endpoint to
    pub host: String,
    /// Port for the WebSocket endpoint
    pub port: u16,
    /// Capacity of the coordinator command channel
    pub command_buffer: usize,
}

/// Matchmaking and settlement settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakingSettings {
    /// Delay between match-found and game-start in milliseconds
    pub game_start_delay_ms: u64,
    /// Elo k-factor used at settlement
    pub k_factor: f64,
    /// Rating assumed for players with no durable record
    pub default_rating: i32,
    /// Longest accepted chat message, in characters
    pub max_chat_message_length: usize,
    /// Deadline for a single durable store call in milliseconds
    pub store_timeout_ms: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "arena-room".to_string(),
            log_level: "info".to_string(),
            health_port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            command_buffer: 1024,
        }
    }
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        Self {
            game_start_delay_ms: 3000,
            k_factor: 32.0,
            default_rating: 1200,
            max_chat_message_length: 500,
            store_timeout_ms: 5000,
        }
    }
}

/// Parse an environment variable into `target` if it is set
fn override_from_env<T: std::str::FromStr>(key: &str, target: &mut T) -> Result<()> {
    if let Ok(raw) = env::var(key) {
        *target = raw
            .parse()
            .map_err(|_| anyhow!("Invalid {} value: {}", key, raw))?;
    }
    Ok(())
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        override_from_env("SERVICE_NAME", &mut self.service.name)?;
        override_from_env("LOG_LEVEL", &mut self.service.log_level)?;
        override_from_env("HEALTH_PORT", &mut self.service.health_port)?;
        override_from_env(
            "SHUTDOWN_TIMEOUT_SECONDS",
            &mut self.service.shutdown_timeout_seconds,
        )?;

        // Server settings
        override_from_env("SERVER_HOST", &mut self.server.host)?;
        override_from_env("SERVER_PORT", &mut self.server.port)?;
        override_from_env("COMMAND_BUFFER", &mut self.server.command_buffer)?;

        // Matchmaking settings
        override_from_env(
            "GAME_START_DELAY_MS",
            &mut self.matchmaking.game_start_delay_ms,
        )?;
        override_from_env("K_FACTOR", &mut self.matchmaking.k_factor)?;
        override_from_env("DEFAULT_RATING", &mut self.matchmaking.default_rating)?;
        override_from_env(
            "MAX_CHAT_MESSAGE_LENGTH",
            &mut self.matchmaking.max_chat_message_length,
        )?;
        override_from_env("STORE_TIMEOUT_MS", &mut self.matchmaking.store_timeout_ms)?;

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get the match-found to game-start delay as Duration
    pub fn game_start_delay(&self) -> Duration {
        self.matchmaking.game_start_delay()
    }
}

impl MatchmakingSettings {
    pub fn game_start_delay(&self) -> Duration {
        Duration::from_millis(self.game_start_delay_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate ports
    if config.service.health_port == 0 {
        return Err(anyhow!("Health port cannot be 0"));
    }
    if config.server.port == 0 {
        return Err(anyhow!("Server port cannot be 0"));
    }

    // Validate timeouts and buffers
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }
    if config.server.command_buffer == 0 {
        return Err(anyhow!("Command buffer must be greater than 0"));
    }
    if config.server.host.is_empty() {
        return Err(anyhow!("Server host cannot be empty"));
    }

    // Validate matchmaking settings
    if config.matchmaking.k_factor.is_nan() || config.matchmaking.k_factor <= 0.0 {
        return Err(anyhow!("K-factor must be positive"));
    }
    if config.matchmaking.max_chat_message_length == 0 {
        return Err(anyhow!("Max chat message length must be greater than 0"));
    }
    if config.matchmaking.store_timeout_ms == 0 {
        return Err(anyhow!("Store timeout must be greater than 0"));
    }

    Ok(())
}
