//! Configuration loading for the tickerhub server
//!
//! Configuration comes from an optional JSON file (every field has a
//! default) followed by environment overrides:
//!
//! - `HOST`, `PORT`: listen address
//! - `FINNHUB_API_KEY`: enables the external feed when non-empty
//! - `FINNHUB_WS_URL`: external feed endpoint
//! - `FEED_SYMBOLS`: comma-separated symbols for the external feed
//! - `SIMULATION_INTERVAL_MS`: simulated feed tick interval

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tickerhub_core::{Price, Symbol};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Which feed drives price updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Simulated,
    External,
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub hub: HubConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub external_feed: ExternalFeedConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            hub: HubConfig::default(),
            simulation: SimulationConfig::default(),
            external_feed: ExternalFeedConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.port = parse_value("PORT", &port)?;
        }
        if let Some(key) = lookup("FINNHUB_API_KEY") {
            self.external_feed.api_key = Some(key);
        }
        if let Some(url) = lookup("FINNHUB_WS_URL") {
            self.external_feed.url = url;
        }
        if let Some(symbols) = lookup("FEED_SYMBOLS") {
            self.external_feed.symbols = symbols
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(interval) = lookup("SIMULATION_INTERVAL_MS") {
            self.simulation.interval_ms = parse_value("SIMULATION_INTERVAL_MS", &interval)?;
        }
        Ok(self)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// A configured, non-blank credential selects the external feed
    pub fn feed_kind(&self) -> FeedKind {
        if self.external_feed.has_credential() {
            FeedKind::External
        } else {
            FeedKind::Simulated
        }
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Broadcast hub tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Snapshots buffered between feeds and the hub loop
    #[serde(default = "default_publish_capacity")]
    pub publish_capacity: usize,

    /// Payloads buffered per subscriber before it is considered stalled
    #[serde(default = "default_subscriber_queue")]
    pub subscriber_queue: usize,

    /// Upper bound on a single WebSocket write
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

fn default_publish_capacity() -> usize {
    1024
}

fn default_subscriber_queue() -> usize {
    64
}

fn default_write_timeout_ms() -> u64 {
    5000
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            publish_capacity: default_publish_capacity(),
            subscriber_queue: default_subscriber_queue(),
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

impl HubConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

/// Initial price for a simulated instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedPrice {
    pub symbol: Symbol,
    pub price: Price,
}

impl SeedPrice {
    pub fn new(symbol: impl Into<Symbol>, price: Price) -> Self {
        Self {
            symbol: symbol.into(),
            price,
        }
    }
}

/// Simulated feed settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Largest absolute move per tick, in percent
    #[serde(default = "default_max_move_pct")]
    pub max_move_pct: f64,

    /// Prices never drop below this
    #[serde(default = "default_price_floor")]
    pub price_floor: Price,

    /// Instruments seeded when the store starts empty
    #[serde(default = "default_seed_prices")]
    pub seed_prices: Vec<SeedPrice>,

    /// RNG seed for reproducible runs
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

fn default_interval_ms() -> u64 {
    2000
}

fn default_max_move_pct() -> f64 {
    2.0
}

fn default_price_floor() -> Price {
    0.01
}

fn default_seed_prices() -> Vec<SeedPrice> {
    vec![
        SeedPrice::new("AAPL", 150.0),
        SeedPrice::new("GOOGL", 2800.0),
        SeedPrice::new("AMZN", 3400.0),
        SeedPrice::new("TSLA", 700.0),
        SeedPrice::new("MSFT", 300.0),
    ]
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_move_pct: default_max_move_pct(),
            price_floor: default_price_floor(),
            seed_prices: default_seed_prices(),
            rng_seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn seeds(&self) -> Vec<(Symbol, Price)> {
        self.seed_prices
            .iter()
            .map(|s| (s.symbol.clone(), s.price))
            .collect()
    }
}

/// External (Finnhub-compatible) feed settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalFeedConfig {
    /// API credential; the feed stays inert without one
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_feed_url")]
    pub url: String,

    #[serde(default = "default_feed_symbols")]
    pub symbols: Vec<Symbol>,

    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

fn default_feed_url() -> String {
    "wss://ws.finnhub.io".to_string()
}

fn default_feed_symbols() -> Vec<Symbol> {
    ["AAPL", "AMZN", "TSLA", "MSFT", "GOOGL", "BINANCE:BTCUSDT"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for ExternalFeedConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            url: default_feed_url(),
            symbols: default_feed_symbols(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl ExternalFeedConfig {
    pub fn has_credential(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    /// Endpoint with the credential attached as the `token` query parameter
    pub fn endpoint(&self) -> Option<String> {
        let key = self.api_key.as_deref().filter(|k| !k.trim().is_empty())?;
        let separator = if self.url.contains('?') { '&' } else { '?' };
        Some(format!("{}{}token={}", self.url, separator, key))
    }
}

/// Reconnect policy for the external feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Give up after this many consecutive failures. Unbounded when absent.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

fn default_initial_delay_ms() -> u64 {
    5000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: None,
        }
    }
}

impl ReconnectConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.simulation.interval(), Duration::from_secs(2));
        assert_eq!(config.simulation.seed_prices.len(), 5);
        assert_eq!(config.external_feed.symbols.len(), 6);
        assert_eq!(config.external_feed.reconnect.initial_delay(), Duration::from_secs(5));
        assert_eq!(config.feed_kind(), FeedKind::Simulated);
    }

    #[test]
    fn test_parse_partial_json() {
        let json = r#"{
            "port": 9000,
            "simulation": {
                "interval_ms": 500,
                "seed_prices": [{"symbol": "BTC", "price": 50000.0}]
            },
            "external_feed": {"symbols": ["AAPL"], "reconnect": {"max_attempts": 3}}
        }"#;

        let config = ServerConfig::from_json(json).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.simulation.interval_ms, 500);
        assert_eq!(config.simulation.max_move_pct, 2.0);
        assert_eq!(config.simulation.seeds(), vec![("BTC".to_string(), 50000.0)]);
        assert_eq!(config.external_feed.symbols, vec!["AAPL"]);
        assert_eq!(config.external_feed.reconnect.max_attempts, Some(3));
        assert_eq!(config.external_feed.reconnect.max_delay_ms, 60_000);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            ServerConfig::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            ServerConfig::from_file("/definitely/not/here.json"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let config = ServerConfig::default()
            .with_overrides(lookup(&[
                ("HOST", "127.0.0.1"),
                ("PORT", "3000"),
                ("FINNHUB_API_KEY", "secret"),
                ("FEED_SYMBOLS", "AAPL, TSLA,,"),
                ("SIMULATION_INTERVAL_MS", "250"),
            ]))
            .unwrap();

        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert_eq!(config.external_feed.symbols, vec!["AAPL", "TSLA"]);
        assert_eq!(config.simulation.interval_ms, 250);
        assert_eq!(config.feed_kind(), FeedKind::External);
    }

    #[test]
    fn test_invalid_port_override() {
        let result = ServerConfig::default().with_overrides(lookup(&[("PORT", "http")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { key, .. }) if key == "PORT"));
    }

    #[test]
    fn test_blank_credential_selects_simulation() {
        let config = ServerConfig::default()
            .with_overrides(lookup(&[("FINNHUB_API_KEY", "  ")]))
            .unwrap();
        assert_eq!(config.feed_kind(), FeedKind::Simulated);
        assert_eq!(config.external_feed.endpoint(), None);
    }

    #[test]
    fn test_endpoint_carries_token() {
        let mut feed = ExternalFeedConfig {
            api_key: Some("abc".to_string()),
            ..Default::default()
        };
        assert_eq!(feed.endpoint().unwrap(), "wss://ws.finnhub.io?token=abc");

        feed.url = "ws://localhost:9000/feed?v=2".to_string();
        assert_eq!(feed.endpoint().unwrap(), "ws://localhost:9000/feed?v=2&token=abc");
    }
}
