use serde::{Deserialize, Serialize};

use rrcs_api::Value;

/// A named boolean signal on the server, keyed by `object_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicSource {
    pub object_id: u32,
    pub name: String,
    pub alias: String,
    pub state: bool,
}

impl LogicSource {
    /// Parse `[name, alias, objectId, state]`.
    pub(crate) fn from_rpc(items: &[Value]) -> Option<Self> {
        let [name, alias, object_id, state] = items else {
            return None;
        };
        Some(Self {
            object_id: object_id.as_u32()?,
            name: name.as_str()?.to_owned(),
            alias: alias.as_str().unwrap_or_default().to_owned(),
            state: state.as_bool()?,
        })
    }
}

/// One entry of a UI dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice<I = String> {
    pub id: I,
    pub label: String,
}

impl<I> Choice<I> {
    pub fn new(id: I, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }
}
