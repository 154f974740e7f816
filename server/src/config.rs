//! Server configuration.

use std::net::SocketAddr;

use zkbank_ledger::LedgerConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable lines.
    Pretty,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(format!("Unknown log format: {}", other)),
        }
    }
}

/// Main server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Node ID reported by the health endpoint.
    pub node_id: Option<String>,
    /// Listen address.
    pub listen_addr: String,
    /// Listen port.
    pub listen_port: u16,
    /// Network label reported by the health endpoint.
    pub network: String,
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
    /// Expose `/metrics`.
    pub metrics_enabled: bool,
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
    /// Ledger configuration.
    pub ledger: LedgerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            node_id: None,
            listen_addr: "0.0.0.0".to_string(),
            listen_port: 3001,
            network: "testnet".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            metrics_enabled: true,
            max_body_bytes: 10 * 1024 * 1024,
            ledger: LedgerConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            ledger: LedgerConfig::from_env(),
            ..Self::default()
        };

        if let Ok(node_id) = std::env::var("NODE_ID") {
            config.node_id = Some(node_id);
        }

        if let Ok(addr) = std::env::var("LISTEN_ADDR") {
            config.listen_addr = addr;
        }

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse() {
                config.listen_port = port;
            }
        }

        if let Ok(network) = std::env::var("NETWORK") {
            config.network = network;
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }

        if let Ok(format) = std::env::var("LOG_FORMAT") {
            if let Ok(format) = format.parse() {
                config.log_format = format;
            }
        }

        if let Ok(enabled) = std::env::var("METRICS_ENABLED") {
            if let Ok(enabled) = enabled.parse() {
                config.metrics_enabled = enabled;
            }
        }

        if let Ok(limit) = std::env::var("MAX_BODY_BYTES") {
            if let Ok(limit) = limit.parse() {
                config.max_body_bytes = limit;
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_port == 0 {
            return Err("Listen port cannot be 0".to_string());
        }

        if self.network.is_empty() {
            return Err("Network label cannot be empty".to_string());
        }

        if self.max_body_bytes == 0 {
            return Err("Max body size cannot be 0".to_string());
        }

        self.socket_addr()?;
        self.ledger.validate()
    }

    /// Address to bind.
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.listen_addr, self.listen_port)
            .parse()
            .map_err(|e| format!("Invalid listen address: {}", e))
    }
}
