// ── Domain operations ──
//
// Each submodule adds an `impl Controller` block. All of them share one
// contract: enqueue on the active link, check the reply, update the
// store only on success, return `None` for anything else.

mod crosspoints;
mod gpio;
mod keys;
mod logic;
mod ports;

use tracing::warn;

use rrcs_api::Value;

use crate::controller::Controller;
use crate::protocol::{self, ReplyError};

impl Controller {
    /// Send `method` and check the positional reply.
    pub(crate) async fn call_checked(
        &self,
        method: &'static str,
        params: Vec<Value>,
        len: Option<usize>,
    ) -> Option<Vec<Value>> {
        let session = self.session()?;
        let resp = session.call(method, params).await?;
        match protocol::positional(&resp, len) {
            Ok(items) => Some(items.to_vec()),
            Err(e) => {
                report(method, &e);
                None
            }
        }
    }
}

pub(crate) fn report(method: &str, error: &ReplyError) {
    warn!(method, "request rejected: {}", error.describe());
}
