//! Handler configuration

use crate::error::{BroadcastError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings shared by every session of a broadcast handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerConfig {
    /// Envelopes each session may buffer before answering
    /// `ServiceUnavailable` (default: 1000)
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
}

fn default_queue_size() -> usize {
    1000
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            queue_size: default_queue_size(),
        }
    }
}

impl HandlerConfig {
    pub fn new(queue_size: usize) -> Self {
        Self { queue_size }
    }

    /// Parse configuration from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load configuration from a JSON file.
    /// Returns default config if the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            BroadcastError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        assert_eq!(HandlerConfig::default().queue_size, 1000);
        assert_eq!(HandlerConfig::new(5).queue_size, 5);
    }

    #[test]
    fn test_from_json() {
        let config = HandlerConfig::from_json(r#"{"queueSize": 16}"#).unwrap();
        assert_eq!(config.queue_size, 16);

        let config = HandlerConfig::from_json("{}").unwrap();
        assert_eq!(config, HandlerConfig::default());
    }

    #[test]
    fn test_from_json_invalid() {
        let err = HandlerConfig::from_json(r#"{"queueSize": -1}"#).unwrap_err();
        assert!(matches!(err, BroadcastError::Serialization(_)));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("orderer-broadcast-missing-config.json");
        let _ = std::fs::remove_file(&path);
        assert_eq!(HandlerConfig::load(&path).unwrap(), HandlerConfig::default());
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join(format!(
            "orderer-broadcast-config-{}.json",
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&path, r#"{"queueSize": 3}"#).unwrap();

        let config = HandlerConfig::load(&path).unwrap();
        assert_eq!(config.queue_size, 3);

        std::fs::remove_file(&path).unwrap();
    }
}
