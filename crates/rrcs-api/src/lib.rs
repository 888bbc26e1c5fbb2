// rrcs-api: Async XML-RPC client and notification listener for RRCS servers

pub mod client;
pub mod error;
pub mod listener;
pub mod transport;
pub mod xmlrpc;

pub use client::RpcClient;
pub use error::Error;
pub use listener::{Notification, NotificationListener};
pub use transport::TransportConfig;
pub use xmlrpc::Value;
