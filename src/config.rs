// tracer configuration, read from a .toon document
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Safety ceiling on fiber hops for one trace.
pub const MAX_HOPS: usize = 20;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// What to do when several splices/ports claim the same `(fiber, thread)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Take the first candidate in record order and log a warning.
    #[default]
    FirstMatch,
    /// Stop the walk with an `AmbiguousMatch` end step.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    pub max_hops: usize,
    pub ambiguity: AmbiguityPolicy,
    /// Per-read timeout applied by the snapshot loader; `None` leaves it to the store.
    pub read_timeout_ms: Option<u64>,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self { max_hops: MAX_HOPS, ambiguity: AmbiguityPolicy::FirstMatch, read_timeout_ms: None }
    }
}

impl TracerConfig {
    pub fn from_toon_str(input: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value =
            toon_format::decode_default(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let config: TracerConfig =
            serde_json::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path)?;
        Self::from_toon_str(&input)
    }

    pub fn to_toon_string(&self) -> Result<String, ConfigError> {
        let value = serde_json::to_value(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        toon_format::encode_default(&value).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_hops == 0 {
            return Err(ConfigError::Invalid("max_hops must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cap_at_twenty_hops() {
        let c = TracerConfig::default();
        assert_eq!(c.max_hops, 20);
        assert_eq!(c.ambiguity, AmbiguityPolicy::FirstMatch);
        assert!(c.read_timeout().is_none());
    }

    #[test]
    fn toon_round_trip_keeps_fields() {
        let c = TracerConfig {
            max_hops: 8,
            ambiguity: AmbiguityPolicy::Reject,
            read_timeout_ms: Some(1500),
        };
        let text = c.to_toon_string().unwrap();
        let back = TracerConfig::from_toon_str(&text).unwrap();
        assert_eq!(back, c);
        assert_eq!(back.read_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn zero_hops_is_rejected() {
        let c = TracerConfig { max_hops: 0, ..TracerConfig::default() };
        assert!(matches!(c.validate(), Err(ConfigError::Invalid(_))));
    }
}
