//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::INDI_DEFAULT_PORT;

/// Connection settings for [`crate::IndiClient`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Connection timeout for the initial TCP connection (default: 30 seconds)
    pub connection_timeout_secs: u64,
    /// Size of the socket read buffer (default: 64 KiB)
    pub read_buffer_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: INDI_DEFAULT_PORT,
            connection_timeout_secs: 30,
            read_buffer_size: 64 * 1024,
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            host: host.into(),
            port: port.unwrap_or(INDI_DEFAULT_PORT),
            ..Default::default()
        }
    }

    /// Get the connection timeout as a Duration
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 7624);
        assert_eq!(config.connection_timeout(), Duration::from_secs(30));
        assert_eq!(config.read_buffer_size, 65536);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"host": "observatory.local"}"#).unwrap();
        assert_eq!(config.host, "observatory.local");
        assert_eq!(config.port, 7624);
        assert_eq!(config.connection_timeout_secs, 30);
    }

    #[test]
    fn test_new_with_port() {
        let config = ClientConfig::new("10.0.0.2", Some(7625));
        assert_eq!(config.port, 7625);
        assert_eq!(ClientConfig::new("10.0.0.2", None).port, 7624);
    }
}
