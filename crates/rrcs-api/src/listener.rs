// ── Inbound notification endpoint ──
//
// After `RegisterForAllEvents`, the RRCS server pushes state changes to
// us as XML-RPC methodCalls. Each decoded call is forwarded, in arrival
// order, over an unbounded channel with exactly one consumer.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::post;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::xmlrpc::{PARSE_ERROR, Value, decode_call, encode_fault, encode_response};

/// One server-initiated methodCall.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Label of the listener that received it (e.g. `"pri"`).
    pub origin: String,
    pub method: String,
    pub params: Vec<Value>,
}

struct ListenerState {
    origin: String,
    sender: mpsc::UnboundedSender<Notification>,
}

/// A running notification server. Stops on [`shutdown`](Self::shutdown) or drop.
pub struct NotificationListener {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl NotificationListener {
    /// Bind `addr` and start serving. Port 0 picks an ephemeral port;
    /// see [`local_addr`](Self::local_addr).
    pub async fn bind(
        addr: SocketAddr,
        origin: impl Into<String>,
        sender: mpsc::UnboundedSender<Notification>,
    ) -> Result<Self, Error> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        let state = Arc::new(ListenerState {
            origin: origin.into(),
            sender,
        });
        let origin = state.origin.clone();

        let router = Router::new()
            .route("/", post(handle_call))
            .route("/RPC2", post(handle_call))
            .with_state(state);

        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();
        let handle = tokio::spawn(async move {
            let server = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await });
            if let Err(e) = server.await {
                warn!(error = %e, "notification listener stopped");
            }
        });

        info!(%origin, %local_addr, "notification listener bound");
        Ok(Self {
            local_addr,
            cancel,
            handle: Some(handle),
        })
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting and wait for the server task to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        debug!(local_addr = %self.local_addr, "notification listener shut down");
    }
}

impl Drop for NotificationListener {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn handle_call(State(state): State<Arc<ListenerState>>, body: String) -> impl IntoResponse {
    let reply = match decode_call(&body) {
        Ok((method, params)) => {
            let ack = acknowledgement(&params);
            debug!(origin = %state.origin, method = %method, "notification received");
            let notification = Notification {
                origin: state.origin.clone(),
                method,
                params,
            };
            if state.sender.send(notification).is_err() {
                debug!(origin = %state.origin, "notification consumer gone, dropping event");
            }
            encode_response(&ack)
        }
        Err(e) => {
            warn!(origin = %state.origin, error = %e, "undecodable notification");
            encode_fault(PARSE_ERROR, "malformed methodCall")
        }
    };

    ([(header::CONTENT_TYPE, "text/xml")], reply)
}

/// `[key, 0]` when the call carried a transaction key, otherwise `true`.
fn acknowledgement(params: &[Value]) -> Value {
    match params.first() {
        Some(Value::String(key)) => Value::Array(vec![Value::String(key.clone()), Value::Int(0)]),
        _ => Value::Bool(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acknowledgement_echoes_transaction_key() {
        assert_eq!(
            acknowledgement(&[Value::from("C42"), Value::Bool(true)]),
            Value::Array(vec![Value::from("C42"), Value::Int(0)])
        );
        assert_eq!(acknowledgement(&[Value::Int(1)]), Value::Bool(true));
        assert_eq!(acknowledgement(&[]), Value::Bool(true));
    }
}
