//! Client configuration.

use std::time::Duration;

use crate::errors::{NetworkError, NetworkResult};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for [`NetworkClient`](crate::client::NetworkClient).
///
/// Base URLs and bearer tokens are supplied per request by the caller; the
/// configuration only carries transport-level defaults.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Default timeout applied to every request unless overridden.
    pub timeout: Duration,
    /// Connection establishment timeout.
    pub connect_timeout: Duration,
    /// User agent string sent with every request.
    pub user_agent: String,
}

impl NetworkConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> NetworkConfigBuilder {
        NetworkConfigBuilder::new()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> NetworkResult<()> {
        if self.timeout.is_zero() {
            return Err(NetworkError::configuration("timeout must be non-zero"));
        }
        if self.connect_timeout.is_zero() {
            return Err(NetworkError::configuration(
                "connect timeout must be non-zero",
            ));
        }
        Ok(())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("classclap-network/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Builder for [`NetworkConfig`].
#[derive(Debug)]
pub struct NetworkConfigBuilder {
    timeout: Duration,
    connect_timeout: Duration,
    user_agent: Option<String>,
}

impl NetworkConfigBuilder {
    /// Creates a new builder with defaults.
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: Duration::from_secs(10),
            user_agent: None,
        }
    }

    /// Sets the default request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the default request timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the user agent string.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> NetworkResult<NetworkConfig> {
        let config = NetworkConfig {
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            user_agent: self
                .user_agent
                .unwrap_or_else(|| format!("classclap-network/{}", env!("CARGO_PKG_VERSION"))),
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for NetworkConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
