//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use rrcs_config::ConfigError;
use rrcs_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const REJECTED: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach RRCS server at {url}")]
    #[diagnostic(
        code(rrcs::connection_failed),
        help(
            "Check that the server is running and reachable.\n\
             Try: rrcs status"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Notification listener on {addr} failed: {reason}")]
    #[diagnostic(
        code(rrcs::listener),
        help("Another process may hold the port. Pick one with --local-port.")
    )]
    Listener { addr: String, reason: String },

    // ── Device ───────────────────────────────────────────────────────
    #[error("{operation} was not accepted")]
    #[diagnostic(
        code(rrcs::rejected),
        help(
            "The server refused the request or did not answer.\n\
             Re-run with -v for the device's reason, or check reachability with: rrcs status"
        )
    )]
    Rejected { operation: String },

    #[error("API error: {message}")]
    #[diagnostic(code(rrcs::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(rrcs::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(rrcs::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No server configured")]
    #[diagnostic(
        code(rrcs::no_config),
        help(
            "Pass --host, set RRCS_HOST, or add a profile to\n\
             {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(rrcs::config))]
    Config(ConfigError),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Listener { .. } => exit_code::CONNECTION,
            Self::Rejected { .. } | Self::ApiError { .. } => exit_code::REJECTED,
            Self::Validation { .. } => exit_code::USAGE,
            Self::ProfileNotFound { .. } | Self::NoConfig { .. } | Self::Config(_) => {
                exit_code::CONFIG
            }
            Self::Io(_) => exit_code::GENERAL,
        }
    }

    pub fn rejected(operation: impl Into<String>) -> Self {
        Self::Rejected {
            operation: operation.into(),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::NotConnected => CliError::ConnectionFailed {
                url: "(disconnected)".into(),
                source: "not connected to an RRCS server".into(),
            },

            CoreError::Listener { addr, reason } => CliError::Listener { addr, reason },

            CoreError::Config { message } => CliError::Validation {
                field: "configuration".into(),
                reason: message,
            },

            CoreError::Api { message, code } => CliError::ApiError {
                message: match code {
                    Some(code) => format!("{message} (fault {code})"),
                    None => message,
                },
            },

            CoreError::Internal(message) => CliError::ApiError { message },
        }
    }
}
