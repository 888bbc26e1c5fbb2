use tracing::debug;

use rrcs_api::Value;

use crate::controller::Controller;
use crate::model::GpioAddress;
use crate::protocol::method;
use crate::recorder::{Origin, set_gp_output_entry};

impl Controller {
    pub async fn set_gp_output(&self, addr: GpioAddress, state: bool) -> Option<bool> {
        self.set_gp_output_from(addr, state, Origin::Direct).await
    }

    pub(crate) async fn set_gp_output_from(
        &self,
        addr: GpioAddress,
        state: bool,
        origin: Origin,
    ) -> Option<bool> {
        if !addr.is_valid() {
            if self.config().verbose {
                debug!(%addr, "gpio address out of range");
            }
            return None;
        }

        let mut params = addr.rpc_args().to_vec();
        params.push(Value::from(state));
        self.call_checked(method::SET_GP_OUTPUT, params, Some(2))
            .await?;

        self.store().merge_gp_output(addr, state);
        self.record(origin, || set_gp_output_entry(addr, state));
        Some(state)
    }

    /// Read a GP output from the device into the store.
    pub async fn get_gp_output(&self, addr: GpioAddress) -> Option<bool> {
        if !addr.is_valid() {
            return None;
        }
        let items = self
            .call_checked(method::GET_GP_OUTPUT, addr.rpc_args().to_vec(), Some(3))
            .await?;
        let state = items.get(2).and_then(Value::as_bool)?;
        self.store().merge_gp_output(addr, state);
        Some(state)
    }
}
