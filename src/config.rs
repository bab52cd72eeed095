//! Tandem Configuration
//!
//! Optional TOML configuration for ambient tunables. The role and the
//! port numbers always come from the command line; the file only carries
//! what the CLI does not: bind host, node-to-node timeouts and logging.

use serde::{Deserialize, Serialize};

use crate::replication::ReplicationConfig;

/// Main tandem configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TandemConfig {
    /// Node-specific configuration
    #[serde(default)]
    pub node: NodeConfig,

    /// Cluster communication configuration
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Node-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Host to bind the listening socket on
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
}

/// Cluster communication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Connection timeout in milliseconds for node-to-node calls
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Whole-call timeout in milliseconds for node-to-node calls
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_bind_host() -> String {
    "127.0.0.1".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    1000
}

fn default_request_timeout_ms() -> u64 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
        }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TandemConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: TandemConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.node.bind_host.is_empty() {
            return Err(crate::Error::Config("node.bind_host cannot be empty".into()));
        }

        if self.cluster.connect_timeout_ms == 0 || self.cluster.request_timeout_ms == 0 {
            return Err(crate::Error::Config(
                "cluster timeouts must be non-zero".into(),
            ));
        }

        Ok(())
    }

    /// Bind address for the given listening port
    pub fn bind_address(&self, port: u16) -> String {
        format!("{}:{}", self.node.bind_host, port)
    }

    /// Replication settings derived from this configuration
    pub fn replication(&self) -> ReplicationConfig {
        ReplicationConfig {
            connect_timeout_ms: self.cluster.connect_timeout_ms,
            request_timeout_ms: self.cluster.request_timeout_ms,
        }
    }
}
