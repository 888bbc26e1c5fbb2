// ── Core error types ──
//
// Lifecycle errors from rrcs-core. Domain operations never return these:
// they degrade to "no state change + log line" and hand back `None`.
// Only connect/reconfigure surface a `CoreError` to the caller.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach RRCS server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Not connected to an RRCS server")]
    NotConnected,

    #[error("Notification listener on {addr} failed: {reason}")]
    Listener { addr: String, reason: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// XML-RPC fault code, when the server sent one.
        code: Option<i64>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns `true` for errors that persist until the configuration changes.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<rrcs_api::Error> for CoreError {
    fn from(err: rrcs_api::Error) -> Self {
        match err {
            rrcs_api::Error::Transport(ref e) if e.is_connect() || e.is_timeout() => {
                Self::ConnectionFailed {
                    url: e.url().map(ToString::to_string).unwrap_or_default(),
                    reason: e.to_string(),
                }
            }
            rrcs_api::Error::InvalidUrl(e) => Self::config(format!("invalid server address: {e}")),
            rrcs_api::Error::Fault { code, message } => Self::Api {
                message,
                code: Some(code),
            },
            rrcs_api::Error::Listener(e) => Self::Listener {
                addr: String::new(),
                reason: e.to_string(),
            },
            other => Self::Api {
                message: other.to_string(),
                code: None,
            },
        }
    }
}
