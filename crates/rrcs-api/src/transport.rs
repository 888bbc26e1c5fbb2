// Shared transport configuration for building reqwest::Client instances.
//
// Primary and secondary links share timeout and user-agent settings
// through this module, avoiding duplicated builder logic.

use std::time::Duration;

use crate::error::Error;

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Total time allowed for one XML-RPC round trip.
    pub timeout: Duration,
    /// Time allowed to establish the TCP connection.
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(3),
        }
    }
}

impl TransportConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.connect_timeout = self.connect_timeout.min(timeout);
        self
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(concat!("rrcs/", env!("CARGO_PKG_VERSION")))
            // RRCS servers close idle connections without notice.
            .pool_max_idle_per_host(0)
            .build()
            .map_err(Error::Transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_timeout_caps_connect_timeout() {
        let cfg = TransportConfig::default().with_timeout(Duration::from_secs(1));
        assert_eq!(cfg.timeout, Duration::from_secs(1));
        assert_eq!(cfg.connect_timeout, Duration::from_secs(1));

        let cfg = TransportConfig::default().with_timeout(Duration::from_secs(20));
        assert_eq!(cfg.connect_timeout, Duration::from_secs(3));
    }
}
