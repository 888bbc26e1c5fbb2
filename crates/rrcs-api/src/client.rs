// XML-RPC HTTP client
//
// Wraps `reqwest::Client` with RRCS transaction-key handling and
// methodCall/methodResponse (de)serialization. The client does not
// interpret the server's error-code convention; callers do.

use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::header::CONTENT_TYPE;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::xmlrpc::{Value, decode_response, encode_call};

/// Raw XML-RPC client for one RRCS server endpoint.
///
/// Every [`call`](Self::call) prepends a fresh transaction key, which the
/// server echoes back as element 0 of positional responses.
pub struct RpcClient {
    http: reqwest::Client,
    endpoint: Url,
    next_key: AtomicU64,
}

impl RpcClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(endpoint: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, endpoint))
    }

    /// Create a client for `http://{host}:{port}/`.
    pub fn for_host(host: &str, port: u16, transport: &TransportConfig) -> Result<Self, Error> {
        let endpoint = Url::parse(&format!("http://{host}:{port}/"))?;
        Self::new(endpoint, transport)
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, endpoint: Url) -> Self {
        Self {
            http,
            endpoint,
            next_key: AtomicU64::new(1),
        }
    }

    /// The server endpoint this client posts to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Allocate the next transaction key (`C0000000001`, `C0000000002`, ...).
    pub fn next_transaction_key(&self) -> String {
        let n = self.next_key.fetch_add(1, Ordering::Relaxed);
        format!("C{n:010}")
    }

    /// Invoke `method` with a transaction key followed by `params`.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, Error> {
        let mut args = Vec::with_capacity(params.len() + 1);
        args.push(Value::String(self.next_transaction_key()));
        args.extend(params);
        self.call_raw(method, &args).await
    }

    /// Invoke `method` with exactly `params`, no transaction key.
    pub async fn call_raw(&self, method: &str, params: &[Value]) -> Result<Value, Error> {
        let body = encode_call(method, params);
        debug!(method, url = %self.endpoint, "POST methodCall");

        let resp = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        let text = resp.text().await.map_err(Error::Transport)?;
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        trace!(method, body = %text, "methodResponse");
        decode_response(&text)
    }
}
