//! Cart service configuration loaded from environment variables.

use std::time::Duration;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `8081`)
/// - `CCA_URL` — credit card authorizer base URL (default: `"http://localhost:8082"`)
/// - `AUTHORIZER_TIMEOUT_MS` — authorizer request timeout (default: `5000`)
/// - `BROKER_URL` — NATS server URL (default: `"nats://localhost:4222"`)
/// - `ORDERS_QUEUE` — queue orders are published to (default: `"orders"`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub authorizer_url: String,
    pub authorizer_timeout: Duration,
    pub broker_url: String,
    pub orders_queue: String,
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            authorizer_url: lookup("CCA_URL").unwrap_or(defaults.authorizer_url),
            authorizer_timeout: lookup("AUTHORIZER_TIMEOUT_MS")
                .and_then(|ms| ms.parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.authorizer_timeout),
            broker_url: lookup("BROKER_URL").unwrap_or(defaults.broker_url),
            orders_queue: lookup("ORDERS_QUEUE").unwrap_or(defaults.orders_queue),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            authorizer_url: "http://localhost:8082".to_string(),
            authorizer_timeout: Duration::from_secs(5),
            broker_url: "nats://localhost:4222".to_string(),
            orders_queue: broker::ORDERS_QUEUE.to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8081);
        assert_eq!(config.authorizer_url, "http://localhost:8082");
        assert_eq!(config.authorizer_timeout, Duration::from_secs(5));
        assert_eq!(config.orders_queue, "orders");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_addr_default() {
        assert_eq!(Config::default().addr(), "0.0.0.0:8081");
    }

    #[test]
    fn test_reads_overrides() {
        let config = Config::from_lookup(|key| match key {
            "PORT" => Some("9000".to_string()),
            "CCA_URL" => Some("http://authorizer:8082".to_string()),
            "AUTHORIZER_TIMEOUT_MS" => Some("250".to_string()),
            _ => None,
        });
        assert_eq!(config.addr(), "0.0.0.0:9000");
        assert_eq!(config.authorizer_url, "http://authorizer:8082");
        assert_eq!(config.authorizer_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_unparsable_values_keep_defaults() {
        let config = Config::from_lookup(|key| match key {
            "PORT" => Some("not-a-port".to_string()),
            "AUTHORIZER_TIMEOUT_MS" => Some("0".to_string()),
            _ => None,
        });
        assert_eq!(config.port, 8081);
        assert_eq!(config.authorizer_timeout, Duration::from_secs(5));
    }
}
