use thiserror::Error;

/// Top-level error type for the `rrcs-api` crate.
///
/// Covers the outbound XML-RPC transport, the wire codec, and the
/// inbound notification listener. `rrcs-core` collapses these into
/// "no response" at the link boundary.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The server answered with a non-success HTTP status.
    #[error("HTTP {status} from RRCS server")]
    HttpStatus { status: u16, body: String },

    // ── Protocol ────────────────────────────────────────────────────
    /// An XML-RPC `<fault>` response.
    #[error("XML-RPC fault {code}: {message}")]
    Fault { code: i64, message: String },

    /// The body was not well-formed XML-RPC.
    #[error("Malformed XML-RPC document: {message}")]
    MalformedXml { message: String },

    /// Well-formed XML-RPC, but not the shape the caller asked for.
    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },

    // ── Listener ────────────────────────────────────────────────────
    /// Binding or serving the inbound notification endpoint failed.
    #[error("Notification listener error: {0}")]
    Listener(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedXml {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the request never got an answer in time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }
}
