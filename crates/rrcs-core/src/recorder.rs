// ── Action recorder ──
//
// While recording is on, every successful direct mutation and every
// state change pushed by the server is turned into a replayable action
// invocation and handed to the host. Replays are never recorded.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};

use crate::action::id;
use crate::model::{Crosspoint, GpioAddress};
use crate::protocol::XpMethod;
use crate::store::PortLists;

/// Priority recorded when the caller did not pass one.
pub const DEFAULT_PRIORITY: u32 = 1;

/// An action id plus its options, as a host would invoke it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionInvocation {
    pub action_id: String,
    #[serde(default)]
    pub options: Map<String, JsonValue>,
}

impl ActionInvocation {
    pub fn new(action_id: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            options: Map::new(),
        }
    }

    pub fn with_option(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.options.insert(key.to_owned(), value.into());
        self
    }
}

/// One recorded step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    pub action_id: String,
    pub options: Map<String, JsonValue>,
    pub description: String,
}

impl From<TranscriptEntry> for ActionInvocation {
    fn from(entry: TranscriptEntry) -> Self {
        Self {
            action_id: entry.action_id,
            options: entry.options,
        }
    }
}

/// Where a state change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// A user or host call.
    Direct,
    /// A notification pushed by the server.
    Device,
    Replay,
}

#[derive(Debug, Default)]
pub(crate) struct Recorder {
    enabled: AtomicBool,
}

impl Recorder {
    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub(crate) fn should_record(&self, origin: Origin) -> bool {
        origin != Origin::Replay && self.is_enabled()
    }
}

// ── Entry builders ──────────────────────────────────────────────────

fn options(value: JsonValue) -> Map<String, JsonValue> {
    match value {
        JsonValue::Object(map) => map,
        _ => Map::new(),
    }
}

/// The list selectors are pre-filled with the first source and first
/// destination port so the replayed action is valid in either input mode.
pub(crate) fn set_crosspoint_entry(
    method: XpMethod,
    xp: Crosspoint,
    priority: Option<u32>,
    ports: &PortLists,
) -> TranscriptEntry {
    TranscriptEntry {
        action_id: id::SET_CROSSPOINT.to_owned(),
        options: options(json!({
            "xpMethod": method,
            "srcAddr": xp.src.to_string(),
            "dstAddr": xp.dst.to_string(),
            "priority": priority.unwrap_or(DEFAULT_PRIORITY),
            "fromList": false,
            "srcAddrList": ports.first_input(),
            "dstAddrList": ports.first_output(),
        })),
        description: format!("{} {} {}", id::SET_CROSSPOINT, xp.src, xp.dst),
    }
}

pub(crate) fn set_logic_source_entry(object_id: u32, state: bool) -> TranscriptEntry {
    TranscriptEntry {
        action_id: id::SET_LOGIC_SOURCE.to_owned(),
        options: options(json!({ "logicSrc": object_id, "logicState": state })),
        description: format!("{} {object_id}", id::SET_LOGIC_SOURCE),
    }
}

pub(crate) fn set_gp_output_entry(addr: GpioAddress, state: bool) -> TranscriptEntry {
    TranscriptEntry {
        action_id: id::SET_GP_OUTPUT.to_owned(),
        options: options(json!({ "gpo": addr.to_string(), "gpoState": state })),
        description: format!("{} {addr}", id::SET_GP_OUTPUT),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{Address, Port};

    #[test]
    fn crosspoint_entry_uses_one_based_addresses() {
        let xp = Crosspoint::new(Address::new(2, 4, 8), Address::new(1, 1, 0));
        let entry = set_crosspoint_entry(XpMethod::SetPrio, xp, None, &PortLists::default());
        assert_eq!(entry.description, "setCrosspoint 2.4.9 1.1.1");
        assert_eq!(
            JsonValue::Object(entry.options),
            json!({
                "xpMethod": "setPrio",
                "srcAddr": "2.4.9",
                "dstAddr": "1.1.1",
                "priority": 1,
                "fromList": false,
                "srcAddrList": "",
                "dstAddrList": "",
            })
        );
    }

    #[test]
    fn crosspoint_entry_prefills_first_input_and_first_output() {
        let port = |node, label: &str, input, output| Port {
            address: Address::new(1, node, 0),
            label: label.to_owned(),
            name: String::new(),
            input,
            output,
        };
        let ports = PortLists::from_ports(vec![
            port(5, "Speaker", false, true),
            port(3, "Mic", true, false),
        ]);
        let xp = Crosspoint::new(Address::new(1, 3, 0), Address::new(1, 5, 0));
        let entry = set_crosspoint_entry(XpMethod::Kill, xp, None, &ports);
        assert_eq!(entry.options["srcAddrList"], "1-3-0");
        assert_eq!(entry.options["dstAddrList"], "1-5-0");
    }

    #[test]
    fn entry_serializes_camel_case_and_converts() {
        let entry = set_logic_source_entry(5, true);
        let json = serde_json::to_value(&entry).unwrap_or_default();
        assert_eq!(json["actionId"], "setLogicSource");
        assert_eq!(json["options"]["logicState"], true);

        let invocation = ActionInvocation::from(entry);
        assert_eq!(invocation.action_id, "setLogicSource");
        assert_eq!(invocation.options["logicSrc"], 5);
    }

    #[test]
    fn replays_are_not_recorded() {
        let recorder = Recorder::default();
        assert!(!recorder.should_record(Origin::Direct));
        recorder.set_enabled(true);
        assert!(recorder.should_record(Origin::Direct));
        assert!(recorder.should_record(Origin::Device));
        assert!(!recorder.should_record(Origin::Replay));
    }
}
