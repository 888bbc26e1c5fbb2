use tracing::debug;

use rrcs_api::Value;

use super::report;
use crate::controller::Controller;
use crate::model::LogicSource;
use crate::protocol::{self, method};
use crate::recorder::{Origin, set_logic_source_entry};

impl Controller {
    /// Rebuild the logic-source table. Returns the number of sources.
    ///
    /// The action dropdown depends on this table, so a definitions
    /// rebuild is scheduled.
    pub async fn get_all_logic_sources(&self) -> Option<usize> {
        let session = self.session()?;
        let resp = session
            .call(method::GET_ALL_LOGIC_SOURCES, Vec::new())
            .await?;
        let members = match protocol::enumeration(&resp) {
            Ok(members) => members,
            Err(e) => {
                report(method::GET_ALL_LOGIC_SOURCES, &e);
                return None;
            }
        };

        let sources: Vec<LogicSource> =
            protocol::indexed(members, "LogicSourceCount", "LogicSource")
                .filter_map(Value::as_array)
                .filter_map(LogicSource::from_rpc)
                .collect();
        let count = sources.len();
        if self.config().verbose {
            debug!(count, "logic sources");
        }

        self.store().replace_logic_sources(sources);
        self.schedule_definitions_rebuild();
        self.push_variables();
        Some(count)
    }

    pub async fn set_logic_source(&self, object_id: u32, state: bool) -> Option<bool> {
        self.set_logic_source_from(object_id, state, Origin::Direct)
            .await
    }

    pub(crate) async fn set_logic_source_from(
        &self,
        object_id: u32,
        state: bool,
        origin: Origin,
    ) -> Option<bool> {
        self.call_checked(
            method::SET_LOGIC_SOURCE,
            vec![Value::from(object_id), Value::from(state)],
            None,
        )
        .await?;

        if self.store().set_logic_state(object_id, state).is_none() {
            debug!(object_id, "set succeeded for a logic source not in the table");
        }
        self.record(origin, || set_logic_source_entry(object_id, state));
        Some(state)
    }
}
