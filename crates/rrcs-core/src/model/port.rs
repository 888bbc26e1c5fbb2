// ── Matrix ports ──
//
// One `Port#N` entry of a `GetAllPorts` enumeration. A port may be a
// source, a destination, or both.

use serde::{Deserialize, Serialize};

use rrcs_api::Value;

use super::{Address, Choice};

/// Net assumed when a port entry carries none.
pub const DEFAULT_NET: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub address: Address,
    pub label: String,
    pub name: String,
    pub input: bool,
    pub output: bool,
}

impl Port {
    /// Parse a `Port#N` struct.
    ///
    /// `Node` and the zero-based `Port` are required. Direction flags are
    /// read from `Input`/`IsInput` and `Output`/`IsOutput`; a missing flag
    /// counts as `false`.
    pub(crate) fn from_rpc(value: &Value) -> Option<Self> {
        let text = |name: &str| -> String {
            value
                .field(name)
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or_default()
                .to_owned()
        };
        let flag = |names: [&str; 2]| -> bool {
            names
                .iter()
                .find_map(|name| value.field(name))
                .and_then(Value::as_bool)
                .unwrap_or(false)
        };

        let net = match value.field("Net") {
            Some(net) => net.as_u32()?,
            None => DEFAULT_NET,
        };
        let address = Address::new(
            net,
            value.field("Node")?.as_u32()?,
            value.field("Port")?.as_u32()?,
        );
        if !address.is_valid() {
            return None;
        }

        Some(Self {
            address,
            label: text("Label"),
            name: text("Name"),
            input: flag(["Input", "IsInput"]),
            output: flag(["Output", "IsOutput"]),
        })
    }

    /// Label, else name, else the dotted address.
    pub fn title(&self) -> String {
        [&self.label, &self.name]
            .into_iter()
            .find(|s| !s.is_empty())
            .cloned()
            .unwrap_or_else(|| self.address.to_string())
    }

    /// Dropdown entry keyed by the list selector.
    pub fn choice(&self) -> Choice {
        Choice::new(
            self.address.selector(),
            format!("{} ({})", self.title(), self.address),
        )
    }
}
