use tracing::debug;

use rrcs_api::Value;

use super::report;
use crate::controller::Controller;
use crate::model::Crosspoint;
use crate::protocol::{self, XpMethod, method};
use crate::recorder::{DEFAULT_PRIORITY, Origin, set_crosspoint_entry};

impl Controller {
    /// Set or kill a crosspoint.
    ///
    /// `priority` only goes on the wire for `SetPrio`/`SetDestruct`
    /// (default 1). On success a set is merged as active; a kill is
    /// followed by a status read. Returns the state now in the store.
    pub async fn set_crosspoint(
        &self,
        method: XpMethod,
        xp: Crosspoint,
        priority: Option<u32>,
    ) -> Option<bool> {
        self.set_crosspoint_from(method, xp, priority, Origin::Direct)
            .await
    }

    pub(crate) async fn set_crosspoint_from(
        &self,
        method: XpMethod,
        xp: Crosspoint,
        priority: Option<u32>,
        origin: Origin,
    ) -> Option<bool> {
        if !xp.src.is_valid() || !xp.dst.is_valid() {
            if self.config().verbose {
                debug!(%xp, "crosspoint address out of range");
            }
            return None;
        }

        let mut params = xp.rpc_args();
        if method.takes_priority() {
            params.push(Value::from(priority.unwrap_or(DEFAULT_PRIORITY)));
        }
        self.call_checked(method.rpc_method(), params, Some(2))
            .await?;

        self.record(origin, || {
            set_crosspoint_entry(method, xp, priority, &self.store().ports())
        });

        if method.is_kill() {
            // the device decides what remains after a kill
            self.get_crosspoint(xp).await
        } else {
            self.store().merge_crosspoint(xp, true);
            Some(true)
        }
    }

    /// Read one crosspoint's state from the device into the store.
    pub async fn get_crosspoint(&self, xp: Crosspoint) -> Option<bool> {
        if !xp.src.is_valid() || !xp.dst.is_valid() {
            return None;
        }
        let items = self
            .call_checked(method::GET_XP_STATUS, xp.rpc_args(), Some(3))
            .await?;
        let state = items.get(2).and_then(Value::as_bool)?;
        self.store().merge_crosspoint(xp, state);
        Some(state)
    }

    /// Replace the crosspoint table with the device's active set.
    /// Returns the number of active crosspoints.
    pub async fn get_all_active_crosspoints(&self) -> Option<usize> {
        let session = self.session()?;
        let resp = session.call(method::GET_ALL_ACTIVE_XPS, Vec::new()).await?;
        let members = match protocol::enumeration(&resp) {
            Ok(members) => members,
            Err(e) => {
                report(method::GET_ALL_ACTIVE_XPS, &e);
                return None;
            }
        };

        let active: Vec<Crosspoint> = protocol::indexed(members, "XP Count", "XP")
            .filter_map(Value::as_array)
            .filter_map(Crosspoint::from_rpc)
            .collect();
        let count = active.len();
        if self.config().verbose {
            debug!(count, "active crosspoints");
        }

        self.store().replace_crosspoints(active);
        self.push_variables();
        Some(count)
    }
}
