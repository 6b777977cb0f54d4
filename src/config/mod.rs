//! Runtime Configuration
//!
//! All tunables of the election system are environment variables with defaults,
//! collected once at startup into a [`Config`] value that is passed down to the
//! services. Tests construct `Config` literally with millisecond-scale values.

use std::net::SocketAddr;
use std::time::Duration;

/// Runtime configuration shared by the registrar and node binaries.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host the registrar (the process-wide name registry) is reachable at.
    pub registry_host: String,
    /// Well-known registrar port.
    pub registry_port: u16,
    /// Local bind address for a node's own HTTP endpoint. Port 0 picks an
    /// ephemeral port; the actual bound address is what gets registered.
    pub node_bind: SocketAddr,
    /// How long a node waits for an election round to complete before
    /// resetting and retrying.
    pub election_timeout: Duration,
    /// Period of the failure detector's probe against the current leader.
    pub heartbeat_interval: Duration,
    /// Maximum number of local election attempts before the node reports
    /// a terminal election failure.
    pub max_rounds: u32,
    /// Simulated link latency applied before every forwarded ring message.
    pub network_delay: Duration,
    /// Bounded retry budget per outbound ring message.
    pub forward_retries: u32,
    /// Spacing between forwarding retries.
    pub retry_delay: Duration,
}

impl Config {
    /// Builds the configuration from the process environment, falling back to
    /// the documented defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self {
            registry_host: std::env::var("REGISTRY_HOST")
                .unwrap_or_else(|_| "127.0.0.1".to_string()),
            registry_port: env_parse("REGISTRY_PORT", 1099),
            node_bind: env_parse("NODE_BIND", "127.0.0.1:0".parse().unwrap()),
            election_timeout: Duration::from_millis(env_parse("ELECTION_TIMEOUT_MS", 60_000)),
            heartbeat_interval: Duration::from_millis(env_parse("HEARTBEAT_INTERVAL_MS", 5_000)),
            max_rounds: env_parse("MAX_ROUNDS", 5),
            network_delay: Duration::from_millis(env_parse("NETWORK_DELAY_MS", 500)),
            forward_retries: env_parse("FORWARD_RETRIES", 15),
            retry_delay: Duration::from_millis(env_parse("RETRY_DELAY_MS", 1_500)),
        }
    }

    /// Base URL of the registrar endpoint.
    pub fn registry_url(&self) -> String {
        format!("http://{}:{}", self.registry_host, self.registry_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry_host: "127.0.0.1".to_string(),
            registry_port: 1099,
            node_bind: "127.0.0.1:0".parse().unwrap(),
            election_timeout: Duration::from_millis(60_000),
            heartbeat_interval: Duration::from_millis(5_000),
            max_rounds: 5,
            network_delay: Duration::from_millis(500),
            forward_retries: 15,
            retry_delay: Duration::from_millis(1_500),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();

        assert_eq!(config.registry_port, 1099);
        assert_eq!(config.election_timeout, Duration::from_secs(60));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(config.max_rounds, 5);
        assert_eq!(config.network_delay, Duration::from_millis(500));
        assert_eq!(config.forward_retries, 15);
        assert_eq!(config.retry_delay, Duration::from_millis(1500));
    }

    #[test]
    fn registry_url_is_http_host_port() {
        let config = Config::default();
        assert_eq!(config.registry_url(), "http://127.0.0.1:1099");
    }
}
