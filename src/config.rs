//! Session configuration.
//!
//! Read once when a pipeline is built and never mutated afterwards. Every
//! field is optional on the wire and falls back to the defaults below.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

pub const DEFAULT_MAX_EVENTS: usize = 10_000;
pub const DEFAULT_MAX_DURATION_MS: u64 = 30 * 60 * 1000;
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_BATCH_FLUSH_DELAY_MS: u64 = 1000;
pub const DEFAULT_THROTTLE_DELAY_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Event-count ceiling for one session.
    pub max_events: usize,
    /// Elapsed-time ceiling for one session, in ms.
    #[serde(rename = "maxDuration")]
    pub max_duration_ms: u64,
    pub batch_size: usize,
    #[serde(rename = "batchFlushDelay")]
    pub batch_flush_delay_ms: u64,
    /// When false every admitted event is exported on its own.
    pub batching: bool,
    pub throttle_enabled: bool,
    #[serde(rename = "throttleDelay")]
    pub throttle_delay_ms: u64,
    #[serde(flatten)]
    pub masking: MaskingConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_events: DEFAULT_MAX_EVENTS,
            max_duration_ms: DEFAULT_MAX_DURATION_MS,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_flush_delay_ms: DEFAULT_BATCH_FLUSH_DELAY_MS,
            batching: true,
            throttle_enabled: false,
            throttle_delay_ms: DEFAULT_THROTTLE_DELAY_MS,
            masking: MaskingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaskingConfig {
    pub mask_text_inputs: bool,
    pub mask_all_inputs: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask_text_selector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask_input_selector: Option<String>,
}

impl MaskingConfig {
    /// True when the masking stage has to produce a copy of each event.
    pub fn is_active(&self) -> bool {
        self.mask_text_inputs || self.mask_all_inputs
    }

    pub fn has_selectors(&self) -> bool {
        self.mask_text_selector.is_some() || self.mask_input_selector.is_some()
    }
}

impl SessionConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Apply `REPLAY_*` environment overrides on top of `self`.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|var| std::env::var(var).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        if let Some(v) = lookup("REPLAY_MAX_EVENTS") {
            self.max_events = parse_num("REPLAY_MAX_EVENTS", v)?;
        }
        if let Some(v) = lookup("REPLAY_MAX_DURATION_MS") {
            self.max_duration_ms = parse_num("REPLAY_MAX_DURATION_MS", v)?;
        }
        if let Some(v) = lookup("REPLAY_BATCH_SIZE") {
            self.batch_size = parse_num("REPLAY_BATCH_SIZE", v)?;
        }
        if let Some(v) = lookup("REPLAY_BATCH_FLUSH_DELAY_MS") {
            self.batch_flush_delay_ms = parse_num("REPLAY_BATCH_FLUSH_DELAY_MS", v)?;
        }
        if let Some(v) = lookup("REPLAY_BATCHING") {
            self.batching = parse_flag(v);
        }
        if let Some(v) = lookup("REPLAY_THROTTLE") {
            self.throttle_enabled = parse_flag(v);
        }
        if let Some(v) = lookup("REPLAY_THROTTLE_DELAY_MS") {
            self.throttle_delay_ms = parse_num("REPLAY_THROTTLE_DELAY_MS", v)?;
        }
        if let Some(v) = lookup("REPLAY_MASK_ALL_INPUTS") {
            self.masking.mask_all_inputs = parse_flag(v);
        }
        if let Some(v) = lookup("REPLAY_MASK_TEXT_INPUTS") {
            self.masking.mask_text_inputs = parse_flag(v);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_events == 0 {
            return Err(ConfigError::Zero { field: "maxEvents" });
        }
        if self.max_duration_ms == 0 {
            return Err(ConfigError::Zero { field: "maxDuration" });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Zero { field: "batchSize" });
        }
        Ok(())
    }
}

fn parse_num<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { var, value })
}

// Anything but "false" or "0" is on.
fn parse_flag(value: String) -> bool {
    let v = value.trim().to_lowercase();
    v != "false" && v != "0"
}
