//! XML-RPC wire codec.
//!
//! RRCS speaks plain XML-RPC over HTTP: `<methodCall>` out, a single
//! `<methodResponse>` value back, and the same `<methodCall>` shape for
//! notifications the server pushes to us.

mod decode;
mod encode;
mod value;

pub use decode::{MAX_DEPTH, decode_call, decode_response};
pub use encode::{encode_call, encode_fault, encode_response};
pub use value::Value;

/// Fault code for an undecodable request body.
pub const PARSE_ERROR: i64 = -32700;
