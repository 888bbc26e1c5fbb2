use tracing::debug;

use super::report;
use crate::controller::Controller;
use crate::model::Port;
use crate::protocol::{self, method};

impl Controller {
    /// Rebuild the port lists. Returns the number of ports.
    ///
    /// The crosspoint dropdowns depend on these lists, so a definitions
    /// rebuild is scheduled when they change.
    pub async fn get_all_ports(&self) -> Option<usize> {
        let session = self.session()?;
        let resp = session.call(method::GET_ALL_PORTS, Vec::new()).await?;
        let members = match protocol::enumeration(&resp) {
            Ok(members) => members,
            Err(e) => {
                report(method::GET_ALL_PORTS, &e);
                return None;
            }
        };

        let ports: Vec<Port> = protocol::indexed(members, "PortCount", "Port")
            .filter_map(Port::from_rpc)
            .collect();
        let count = ports.len();
        if self.config().verbose {
            debug!(count, "ports");
        }

        if self.store().replace_ports(ports) {
            self.schedule_definitions_rebuild();
        }
        Some(count)
    }
}
