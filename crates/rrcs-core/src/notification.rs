// ── Pushed device events ──
//
// The listener hands over raw methodCalls; this module turns them into
// typed events and merges them into the store. Every params list starts
// with the server's transaction key, which is skipped.

use thiserror::Error;

use rrcs_api::{Notification, Value};

use crate::model::{Crosspoint, GpioAddress};
use crate::protocol::XpMethod;
use crate::recorder::{
    TranscriptEntry, set_crosspoint_entry, set_gp_output_entry, set_logic_source_entry,
};
use crate::store::DataStore;

pub mod method {
    pub const CROSSPOINT_CHANGE: &str = "CrosspointChange";
    pub const LOGIC_SOURCE_CHANGE: &str = "LogicSourceChange";
    pub const GP_INPUT_CHANGE: &str = "GpInputChange";
    pub const GP_OUTPUT_CHANGE: &str = "GpOutputChange";
    pub const CONFIGURATION_CHANGE: &str = "ConfigurationChange";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Crosspoints {
        active: bool,
        crosspoints: Vec<Crosspoint>,
    },
    LogicSource {
        object_id: u32,
        state: bool,
    },
    GpInput {
        addr: GpioAddress,
        state: bool,
    },
    GpOutput {
        addr: GpioAddress,
        state: bool,
    },
    /// The server's configuration changed; the mirror must be rebuilt.
    ConfigurationChanged,
}

/// What applying an event leaves for the caller.
#[derive(Debug, Default)]
pub(crate) struct Applied {
    /// The mirror must be rebuilt instead.
    pub(crate) resync: bool,
    /// Actions reproducing the changes that landed. Only built on request.
    pub(crate) recorded: Vec<TranscriptEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unhandled notification {0}")]
    Unhandled(String),
    #[error("malformed {method} notification: {reason}")]
    Malformed { method: String, reason: &'static str },
}

impl DeviceEvent {
    pub fn decode(notification: &Notification) -> Result<Self, DecodeError> {
        let name = notification.method.as_str();
        let args = notification.params.get(1..).unwrap_or_default();
        let malformed = |reason| DecodeError::Malformed {
            method: name.to_owned(),
            reason,
        };

        match name {
            method::CROSSPOINT_CHANGE => {
                let [active, list, ..] = args else {
                    return Err(malformed("expected state and crosspoint list"));
                };
                let active = active.as_bool().ok_or_else(|| malformed("state is not boolean"))?;
                let list = list
                    .as_array()
                    .ok_or_else(|| malformed("crosspoints is not an array"))?;
                // bad entries are dropped, the rest still applies
                let crosspoints = list
                    .iter()
                    .filter_map(Value::as_array)
                    .filter_map(Crosspoint::from_rpc)
                    .collect();
                Ok(Self::Crosspoints {
                    active,
                    crosspoints,
                })
            }
            method::LOGIC_SOURCE_CHANGE => {
                let [object_id, state, ..] = args else {
                    return Err(malformed("expected object id and state"));
                };
                Ok(Self::LogicSource {
                    object_id: object_id
                        .as_u32()
                        .ok_or_else(|| malformed("object id is not an integer"))?,
                    state: state.as_bool().ok_or_else(|| malformed("state is not boolean"))?,
                })
            }
            method::GP_INPUT_CHANGE | method::GP_OUTPUT_CHANGE => {
                let [node, port, state, ..] = args else {
                    return Err(malformed("expected node, port and state"));
                };
                let addr = GpioAddress::new(
                    node.as_u32().ok_or_else(|| malformed("node is not an integer"))?,
                    port.as_u32().ok_or_else(|| malformed("port is not an integer"))?,
                );
                if !addr.is_valid() {
                    return Err(malformed("address out of range"));
                }
                let state = state.as_bool().ok_or_else(|| malformed("state is not boolean"))?;
                Ok(if name == method::GP_INPUT_CHANGE {
                    Self::GpInput { addr, state }
                } else {
                    Self::GpOutput { addr, state }
                })
            }
            method::CONFIGURATION_CHANGE => Ok(Self::ConfigurationChanged),
            other => Err(DecodeError::Unhandled(other.to_owned())),
        }
    }

    /// Merge into the store. With `record`, every value that actually
    /// changed is also returned as a set action. GP inputs have no action
    /// and are never recorded.
    pub(crate) fn apply(self, store: &DataStore, record: bool) -> Applied {
        let mut applied = Applied::default();
        match self {
            Self::Crosspoints {
                active,
                crosspoints,
            } => {
                let method = if active {
                    XpMethod::SetPrio
                } else {
                    XpMethod::Kill
                };
                let ports = store.ports();
                for xp in crosspoints {
                    if store.merge_crosspoint(xp, active) && record {
                        applied
                            .recorded
                            .push(set_crosspoint_entry(method, xp, None, &ports));
                    }
                }
            }
            Self::LogicSource { object_id, state } => match store.set_logic_state(object_id, state) {
                Some(true) if record => {
                    applied.recorded.push(set_logic_source_entry(object_id, state));
                }
                Some(_) => {}
                None => tracing::debug!(object_id, "change for unknown logic source ignored"),
            },
            Self::GpInput { addr, state } => {
                store.merge_gp_input(addr, state);
            }
            Self::GpOutput { addr, state } => {
                if store.merge_gp_output(addr, state) && record {
                    applied.recorded.push(set_gp_output_entry(addr, state));
                }
            }
            Self::ConfigurationChanged => applied.resync = true,
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{Address, LogicSource};
    use crate::store::FeedbackGroup;

    fn notification(method: &str, args: Vec<Value>) -> Notification {
        let mut params = vec![Value::from("C0000000001")];
        params.extend(args);
        Notification {
            origin: "pri".into(),
            method: method.into(),
            params,
        }
    }

    fn coords(v: [i64; 6]) -> Value {
        Value::Array(v.into_iter().map(Value::Int).collect())
    }

    #[test]
    fn crosspoint_change_skips_bad_entries() {
        let n = notification(
            "CrosspointChange",
            vec![
                Value::Bool(true),
                Value::Array(vec![
                    coords([2, 4, 8, 1, 1, 0]),
                    Value::Array(vec![Value::Int(1)]),
                    Value::from("junk"),
                ]),
            ],
        );
        assert_eq!(
            DeviceEvent::decode(&n),
            Ok(DeviceEvent::Crosspoints {
                active: true,
                crosspoints: vec![Crosspoint::new(Address::new(2, 4, 8), Address::new(1, 1, 0))],
            })
        );
    }

    #[test]
    fn crosspoint_change_merges_without_clobbering() {
        let store = DataStore::new();
        let other = Crosspoint::new(Address::new(1, 1, 0), Address::new(1, 1, 1));
        store.merge_crosspoint(other, true);

        let n = notification(
            "CrosspointChange",
            vec![Value::Int(0), Value::Array(vec![coords([2, 4, 8, 1, 1, 0])])],
        );
        let event = DeviceEvent::decode(&n).unwrap_or_else(|e| panic!("{e}"));
        let applied = event.apply(&store, false);
        assert!(!applied.resync);
        assert!(applied.recorded.is_empty());

        let changed = Crosspoint::new(Address::new(2, 4, 8), Address::new(1, 1, 0));
        assert_eq!(store.crosspoint(&changed), Some(false));
        assert_eq!(store.crosspoint(&other), Some(true));
    }

    #[test]
    fn logic_source_change_updates_in_place() {
        let store = DataStore::new();
        store.replace_logic_sources([LogicSource {
            object_id: 9,
            name: "B".into(),
            alias: "b".into(),
            state: false,
        }]);
        store.take_dirty();

        let n = notification("LogicSourceChange", vec![Value::Int(9), Value::Bool(true)]);
        let event = DeviceEvent::decode(&n).unwrap_or_else(|e| panic!("{e}"));
        let applied = event.apply(&store, true);
        assert_eq!(applied.recorded.len(), 1);
        assert_eq!(applied.recorded[0].action_id, "setLogicSource");
        assert_eq!(store.logic_source(9).map(|s| s.state), Some(true));
        assert_eq!(store.take_dirty(), vec![FeedbackGroup::LogicSource]);
    }

    #[test]
    fn gpio_changes_route_by_method() {
        let store = DataStore::new();
        for (method, expect_input) in [("GpInputChange", true), ("GpOutputChange", false)] {
            let n = notification(method, vec![Value::Int(3), Value::Int(0), Value::Bool(true)]);
            DeviceEvent::decode(&n)
                .unwrap_or_else(|e| panic!("{e}"))
                .apply(&store, false);
            let line = GpioAddress::new(3, 0);
            if expect_input {
                assert_eq!(store.gp_input(&line), Some(true));
            } else {
                assert_eq!(store.gp_output(&line), Some(true));
            }
        }
    }

    #[test]
    fn configuration_change_requests_resync() {
        let n = notification("ConfigurationChange", Vec::new());
        let event = DeviceEvent::decode(&n).unwrap_or_else(|e| panic!("{e}"));
        assert!(event.apply(&DataStore::new(), true).resync);
    }

    #[test]
    fn recorded_crosspoint_changes_only_cover_real_changes() {
        let store = DataStore::new();
        let known = Crosspoint::new(Address::new(1, 1, 0), Address::new(1, 2, 0));
        store.merge_crosspoint(known, true);

        let n = notification(
            "CrosspointChange",
            vec![
                Value::Bool(true),
                Value::Array(vec![coords([1, 1, 0, 1, 2, 0]), coords([2, 4, 8, 1, 1, 0])]),
            ],
        );
        let applied = DeviceEvent::decode(&n)
            .unwrap_or_else(|e| panic!("{e}"))
            .apply(&store, true);
        assert_eq!(applied.recorded.len(), 1);
        assert_eq!(applied.recorded[0].description, "setCrosspoint 2.4.9 1.1.1");
        assert_eq!(applied.recorded[0].options["xpMethod"], "setPrio");

        let kill = notification(
            "CrosspointChange",
            vec![Value::Bool(false), Value::Array(vec![coords([1, 1, 0, 1, 2, 0])])],
        );
        let applied = DeviceEvent::decode(&kill)
            .unwrap_or_else(|e| panic!("{e}"))
            .apply(&store, true);
        assert_eq!(applied.recorded[0].options["xpMethod"], "kill");
    }

    #[test]
    fn gp_input_changes_are_never_recorded() {
        let store = DataStore::new();
        let n = notification("GpInputChange", vec![Value::Int(3), Value::Int(0), Value::Bool(true)]);
        let applied = DeviceEvent::decode(&n)
            .unwrap_or_else(|e| panic!("{e}"))
            .apply(&store, true);
        assert!(applied.recorded.is_empty());
        assert_eq!(store.gp_input(&GpioAddress::new(3, 0)), Some(true));
    }

    #[test]
    fn unknown_and_malformed() {
        assert_eq!(
            DeviceEvent::decode(&notification("UserChange", Vec::new())),
            Err(DecodeError::Unhandled("UserChange".into()))
        );
        assert!(matches!(
            DeviceEvent::decode(&notification("LogicSourceChange", vec![Value::Int(1)])),
            Err(DecodeError::Malformed { .. })
        ));
        assert!(matches!(
            DeviceEvent::decode(&notification("CrosspointChange", vec![Value::from("x"), Value::Nil])),
            Err(DecodeError::Malformed { .. })
        ));
    }
}
