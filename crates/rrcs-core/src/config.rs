// ── Runtime connection configuration ──
//
// These types describe *how* to reach one logical RRCS server over one or
// two links. They never touch disk: the CLI (via rrcs-config) constructs
// a `ControllerConfig` and hands it in.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Default XML-RPC port of an RRCS server.
pub const DEFAULT_RRCS_PORT: u16 = 8193;
/// Default local port the notification listener binds for the primary link.
pub const DEFAULT_LOCAL_PORT: u16 = 8194;

/// One link: where the server lives and where it should push notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// RRCS server host name or IP.
    pub host: String,
    /// RRCS server XML-RPC port.
    pub port: u16,
    /// Address the server can reach us on (announced at registration).
    pub local_host: String,
    /// Local port for the notification listener. 0 = ephemeral.
    pub local_port: u16,
}

impl LinkConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            local_host: String::new(),
            local_port: DEFAULT_LOCAL_PORT,
        }
    }

    pub fn with_local(mut self, local_host: impl Into<String>, local_port: u16) -> Self {
        self.local_host = local_host.into();
        self.local_port = local_port;
        self
    }
}

/// Configuration for one controller instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ControllerConfig {
    pub primary: LinkConfig,
    /// Only consulted when `redundant` is set.
    pub secondary: Option<LinkConfig>,
    pub redundant: bool,
    /// Dump decoded responses and rejected inputs at debug level.
    pub verbose: bool,
    /// Per-call transport timeout.
    pub timeout: Duration,
    /// Keepalive probe period. Zero disables the background monitor.
    pub keepalive_interval: Duration,
    /// Minimum spacing between the starts of consecutive RPC calls.
    pub min_call_interval: Duration,
    /// Coalescing window for action/feedback definition rebuilds.
    pub definitions_debounce: Duration,
    /// How often dirty feedback groups are flushed to the host.
    pub feedback_interval: Duration,
    /// Bind listeners and register for pushed notifications.
    pub notifications: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            primary: LinkConfig::new("", DEFAULT_RRCS_PORT),
            secondary: None,
            redundant: false,
            verbose: false,
            timeout: Duration::from_secs(5),
            keepalive_interval: Duration::from_secs(5),
            min_call_interval: Duration::from_millis(5),
            definitions_debounce: Duration::from_secs(1),
            feedback_interval: Duration::from_millis(100),
            notifications: true,
        }
    }
}

impl ControllerConfig {
    /// The secondary link, if redundancy is enabled.
    pub fn secondary_link(&self) -> Option<&LinkConfig> {
        if self.redundant {
            self.secondary.as_ref()
        } else {
            None
        }
    }

    /// Reject configurations that cannot reach a server.
    ///
    /// A failure here maps to the `BadConfig` status: no RPC is attempted.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_link(&self.primary, "primary", self.notifications)?;
        if self.redundant {
            let Some(secondary) = self.secondary.as_ref() else {
                return Err(CoreError::config(
                    "redundancy is enabled but no secondary server is configured",
                ));
            };
            validate_link(secondary, "secondary", self.notifications)?;
        }
        Ok(())
    }
}

fn validate_link(link: &LinkConfig, name: &str, notifications: bool) -> Result<(), CoreError> {
    if link.host.trim().is_empty() {
        return Err(CoreError::config(format!("{name} server host is empty")));
    }
    if link.port == 0 {
        return Err(CoreError::config(format!("{name} server port is 0")));
    }
    if notifications && link.local_host.trim().is_empty() {
        return Err(CoreError::config(format!(
            "{name} local host is required to receive notifications"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ControllerConfig {
        ControllerConfig {
            primary: LinkConfig::new("10.0.0.1", 8193).with_local("10.0.0.100", 8194),
            ..ControllerConfig::default()
        }
    }

    #[test]
    fn default_config_is_bad() {
        assert!(ControllerConfig::default().validate().is_err());
    }

    #[test]
    fn primary_only_is_valid() {
        valid().validate().unwrap_or_else(|e| panic!("{e}"));
    }

    #[test]
    fn local_host_only_required_with_notifications() {
        let mut cfg = valid();
        cfg.primary.local_host.clear();
        assert!(cfg.validate().is_err());

        cfg.notifications = false;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn redundant_requires_secondary() {
        let mut cfg = valid();
        cfg.redundant = true;
        assert!(cfg.validate().is_err());

        cfg.secondary = Some(LinkConfig::new("", 8193).with_local("10.0.0.100", 8195));
        assert!(cfg.validate().is_err());

        cfg.secondary = Some(LinkConfig::new("10.0.0.2", 8193).with_local("10.0.0.100", 8195));
        assert!(cfg.validate().is_ok());
        assert!(cfg.secondary_link().is_some());
    }

    #[test]
    fn secondary_ignored_without_redundancy() {
        let mut cfg = valid();
        cfg.secondary = Some(LinkConfig::new("10.0.0.2", 8193));
        assert!(cfg.secondary_link().is_none());
        assert!(cfg.validate().is_ok());
    }
}
