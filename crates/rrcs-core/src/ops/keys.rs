// Panel keys have no mirrored state: these are fire-and-report.

use tracing::{debug, warn};

use rrcs_api::Value;

use crate::controller::Controller;
use crate::model::{KeyLabelMethod, KeyLabelOp, KeyRef, clamp_pool};
use crate::protocol::method;

impl Controller {
    /// `PressKeyEx`. Returns the device's payload (slot 2), or `Nil` if
    /// it sent none.
    pub async fn press_key(
        &self,
        key: KeyRef,
        press: bool,
        trigger: u32,
        pool: i32,
    ) -> Option<Value> {
        if !self.key_in_range(&key) {
            return None;
        }
        let mut params = key.rpc_args();
        params.push(Value::from(press));
        params.push(Value::from(trigger));
        params.push(Value::from(clamp_pool(Some(i64::from(pool)))));

        let items = self.call_checked(method::PRESS_KEY, params, None).await?;
        Some(items.get(2).cloned().unwrap_or(Value::Nil))
    }

    pub async fn lock_key(&self, key: KeyRef, lock: bool, pool: i32) -> Option<Value> {
        if !self.key_in_range(&key) {
            return None;
        }
        let mut params = key.rpc_args();
        params.push(Value::from(lock));
        params.push(Value::from(clamp_pool(Some(i64::from(pool)))));

        let items = self.call_checked(method::LOCK_KEY, params, None).await?;
        Some(items.get(2).cloned().unwrap_or(Value::Nil))
    }

    /// Apply a validated label/marker operation.
    pub async fn label_and_marker(&self, key: KeyRef, op: KeyLabelOp) -> Option<()> {
        if !self.key_in_range(&key) {
            return None;
        }
        let mut params = key.rpc_args();
        params.extend(op.trailing_args());
        self.call_checked(op.method().rpc_method(), params, None)
            .await?;
        Some(())
    }

    /// Validate loosely typed label/marker input, then apply it. Invalid
    /// input (an empty label, a marker outside 1..=128) is never sent.
    pub async fn set_key_label(
        &self,
        key: KeyRef,
        method: KeyLabelMethod,
        label: Option<&str>,
        marker: Option<i64>,
    ) -> Option<()> {
        match KeyLabelOp::build(method, label, marker) {
            Ok(op) => self.label_and_marker(key, op).await,
            Err(e) => {
                warn!(%method, error = %e, "key label not sent");
                None
            }
        }
    }

    fn key_in_range(&self, key: &KeyRef) -> bool {
        let valid = key.panel.is_valid();
        if !valid && self.config().verbose {
            debug!(panel = %key.panel, "panel address out of range");
        }
        valid
    }
}
