//! Registry configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Channel buffer size for registry requests
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer: usize,

    /// Broker declaration retry attempts at startup
    #[serde(default = "default_connect_attempts", rename = "connect-attempts")]
    pub connect_attempts: u32,

    /// Backoff between connect attempts in milliseconds
    #[serde(default = "default_connect_backoff_ms", rename = "connect-backoff-ms")]
    pub connect_backoff_ms: u64,

    /// Tokens pushed to the change sink when a task reaches a terminal
    /// status, one per coarse-grained resource observers should refresh.
    #[serde(default = "default_change_tokens", rename = "change-tokens")]
    pub change_tokens: Vec<String>,
}

fn default_channel_buffer() -> usize {
    256
}

fn default_connect_attempts() -> u32 {
    5
}

fn default_connect_backoff_ms() -> u64 {
    500
}

fn default_change_tokens() -> Vec<String> {
    vec!["scan".to_string(), "file".to_string()]
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            channel_buffer: default_channel_buffer(),
            connect_attempts: default_connect_attempts(),
            connect_backoff_ms: default_connect_backoff_ms(),
            change_tokens: default_change_tokens(),
        }
    }
}

impl RegistryConfig {
    /// Backoff between connect attempts as a Duration
    pub fn connect_backoff(&self) -> Duration {
        Duration::from_millis(self.connect_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.channel_buffer, 256);
        assert_eq!(config.connect_attempts, 5);
        assert_eq!(config.connect_backoff(), Duration::from_millis(500));
        assert_eq!(config.change_tokens, vec!["scan", "file"]);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: RegistryConfig = serde_yaml::from_str("connect-attempts: 2").unwrap();
        assert_eq!(config.connect_attempts, 2);
        assert_eq!(config.channel_buffer, 256);
    }
}
