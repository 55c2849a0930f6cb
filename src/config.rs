//! Runtime configuration
//!
//! Resolved once at startup from command line arguments and environment.

use std::time::Duration;

use tracing::warn;

use crate::handler::DEFAULT_OUTBOUND_BUFFER;

/// Address used when neither an argument nor `PORT` is given
pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";

/// Default interval between status log lines
pub const DEFAULT_STATUS_INTERVAL_SECS: u64 = 300;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address the TCP listener binds to
    pub bind_addr: String,
    /// Period of the status log; None disables it
    pub status_interval: Option<Duration>,
    /// Channel buffer size for server commands
    pub command_buffer: usize,
    /// Per-connection outbound queue size
    pub outbound_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_ADDR.to_string(),
            status_interval: Some(Duration::from_secs(DEFAULT_STATUS_INTERVAL_SECS)),
            command_buffer: 256,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}

impl Config {
    /// Build the configuration from the process arguments and environment
    pub fn from_env() -> Self {
        Self::resolve(
            std::env::args().nth(1),
            std::env::var("PORT").ok(),
            std::env::var("ROOMCHAT_STATUS_INTERVAL_SECS").ok(),
        )
    }

    /// Resolve configuration from raw values
    ///
    /// An explicit address wins over `PORT`.
    pub fn resolve(
        addr_arg: Option<String>,
        port: Option<String>,
        status_interval: Option<String>,
    ) -> Self {
        let mut config = Config::default();

        if let Some(addr) = addr_arg {
            config.bind_addr = addr;
        } else if let Some(port) = port {
            match port.trim().parse::<u16>() {
                Ok(port) => config.bind_addr = format!("0.0.0.0:{}", port),
                Err(_) => warn!("Ignoring invalid PORT '{}'", port),
            }
        }

        if let Some(secs) = status_interval {
            match secs.trim().parse::<u64>() {
                Ok(0) => config.status_interval = None,
                Ok(secs) => config.status_interval = Some(Duration::from_secs(secs)),
                Err(_) => warn!("Ignoring invalid ROOMCHAT_STATUS_INTERVAL_SECS '{}'", secs),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::resolve(None, None, None);
        assert_eq!(config, Config::default());
        assert_eq!(config.bind_addr, DEFAULT_ADDR);
    }

    #[test]
    fn test_port_and_argument_precedence() {
        let config = Config::resolve(None, Some("8080".to_string()), None);
        assert_eq!(config.bind_addr, "0.0.0.0:8080");

        let config = Config::resolve(
            Some("127.0.0.1:9000".to_string()),
            Some("8080".to_string()),
            None,
        );
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = Config::resolve(None, Some("http".to_string()), Some("soon".to_string()));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_status_interval() {
        let config = Config::resolve(None, None, Some("0".to_string()));
        assert!(config.status_interval.is_none());

        let config = Config::resolve(None, None, Some("10".to_string()));
        assert_eq!(config.status_interval, Some(Duration::from_secs(10)));
    }
}
