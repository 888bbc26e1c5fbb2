// ── Action invocations ──
//
// Parse `{actionId, options}` into a typed `Action` and run it through
// the same domain operations a direct caller would use.

use std::str::FromStr;

use serde_json::{Map, Value as JsonValue};
use strum::IntoEnumIterator;
use thiserror::Error;
use tracing::{debug, warn};

use crate::controller::Controller;
use crate::model::{
    Crosspoint, GpioAddress, KeyLabelError, KeyLabelMethod, KeyLabelOp, KeyRef, clamp_pool,
    parse_pool,
};
use crate::protocol::XpMethod;
use crate::recorder::{ActionInvocation, Origin};
use crate::resolve::{resolve, resolve_address, resolve_gpio_address};
use crate::store::DataStore;

/// Action ids understood by [`Controller::run_action`].
pub mod id {
    pub const SET_CROSSPOINT: &str = "setCrosspoint";
    pub const GET_ALL_CROSSPOINTS: &str = "getAllCrosspoints";
    pub const GET_ALL_LOGIC_SOURCES: &str = "getAllLogicSources";
    pub const SET_LOGIC_SOURCE: &str = "setLogicSource";
    pub const SET_GP_OUTPUT: &str = "setGPOutput";
    pub const PRESS_KEY: &str = "pressKey";
    pub const LOCK_KEY: &str = "lockKey";
    pub const KEY_LABEL: &str = "keyLabel";
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    #[error("option '{0}' is missing")]
    MissingOption(&'static str),
    #[error("option '{option}' has invalid value '{value}'")]
    InvalidOption { option: &'static str, value: String },
    #[error(transparent)]
    KeyLabel(#[from] KeyLabelError),
}

/// A parsed, fully resolved action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetCrosspoint {
        method: XpMethod,
        xp: Crosspoint,
        priority: Option<u32>,
    },
    GetAllCrosspoints,
    GetAllLogicSources,
    SetLogicSource {
        object_id: u32,
        state: bool,
    },
    SetGpOutput {
        addr: GpioAddress,
        state: bool,
    },
    PressKey {
        key: KeyRef,
        press: bool,
        trigger: u32,
        pool: i32,
    },
    LockKey {
        key: KeyRef,
        lock: bool,
        pool: i32,
    },
    KeyLabel {
        key: KeyRef,
        op: KeyLabelOp,
    },
}

// ── Option access ───────────────────────────────────────────────────

/// Lenient reader over host-supplied options. Hosts substitute
/// variables as text, so numbers and booleans may arrive as strings.
pub(crate) struct Options<'a> {
    map: &'a Map<String, JsonValue>,
}

impl<'a> Options<'a> {
    pub(crate) fn new(map: &'a Map<String, JsonValue>) -> Self {
        Self { map }
    }

    pub(crate) fn str(&self, key: &str) -> Option<String> {
        match self.map.get(key)? {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            JsonValue::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub(crate) fn bool(&self, key: &str) -> Option<bool> {
        match self.map.get(key)? {
            JsonValue::Bool(b) => Some(*b),
            JsonValue::Number(n) => n.as_i64().map(|n| n != 0),
            JsonValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "on" | "1" => Some(true),
                "false" | "off" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub(crate) fn i64(&self, key: &str) -> Option<i64> {
        match self.map.get(key)? {
            JsonValue::Number(n) => n.as_i64(),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn require_str(&self, key: &'static str) -> Result<String, ActionError> {
        self.str(key).ok_or(ActionError::MissingOption(key))
    }

    fn require_bool(&self, key: &'static str) -> Result<bool, ActionError> {
        self.bool(key).ok_or(ActionError::MissingOption(key))
    }

    fn u32_or(&self, key: &'static str, default: u32) -> Result<u32, ActionError> {
        match self.i64(key) {
            None => Ok(default),
            Some(n) => u32::try_from(n).map_err(|_| ActionError::InvalidOption {
                option: key,
                value: n.to_string(),
            }),
        }
    }
}

fn invalid(option: &'static str, value: impl Into<String>) -> ActionError {
    ActionError::InvalidOption {
        option,
        value: value.into(),
    }
}

/// Accepts the camelCase name (`setPrio`) or the wire name (`SetXpPrio`).
fn parse_xp_method(raw: &str) -> Option<XpMethod> {
    XpMethod::from_str(raw)
        .ok()
        .or_else(|| XpMethod::iter().find(|m| m.rpc_method() == raw))
}

fn parse_label_method(raw: &str) -> Option<KeyLabelMethod> {
    KeyLabelMethod::from_str(raw)
        .ok()
        .or_else(|| KeyLabelMethod::iter().find(|m| m.rpc_method() == raw))
}

fn parse_key(options: &Options<'_>) -> Result<KeyRef, ActionError> {
    let raw = options.require_str("panel")?;
    let panel = resolve_address(&raw).ok_or_else(|| invalid("panel", raw))?;
    Ok(KeyRef {
        panel,
        is_input: options.bool("isInput").unwrap_or(false),
        page: options.u32_or("page", 0)?,
        expansion_panel: options.u32_or("expPanel", 0)?,
        key: options.u32_or("key", 0)?,
        is_virtual: options.bool("isVirtual").unwrap_or(false),
    })
}

fn parse_pool_option(options: &Options<'_>) -> i32 {
    match options.map.get("pool") {
        Some(JsonValue::Number(n)) => clamp_pool(n.as_i64()),
        Some(JsonValue::String(s)) => parse_pool(s),
        _ => clamp_pool(None),
    }
}

impl Action {
    /// Resolve an invocation against the current store (list selectors
    /// are checked against its port choices).
    pub fn parse(invocation: &ActionInvocation, store: &DataStore) -> Result<Self, ActionError> {
        let options = Options::new(&invocation.options);
        match invocation.action_id.as_str() {
            id::SET_CROSSPOINT => {
                let raw = options.str("xpMethod").unwrap_or_default();
                let method = if raw.is_empty() {
                    XpMethod::default()
                } else {
                    parse_xp_method(&raw).ok_or_else(|| invalid("xpMethod", raw))?
                };
                let from_list = options.bool("fromList").unwrap_or(false);
                let (src_key, dst_key) = if from_list {
                    ("srcAddrList", "dstAddrList")
                } else {
                    ("srcAddr", "dstAddr")
                };
                let ports = store.ports();
                let src_raw = options.require_str(src_key)?;
                let dst_raw = options.require_str(dst_key)?;
                let src = resolve(&src_raw, from_list, &ports.inputs)
                    .ok_or_else(|| invalid(src_key, src_raw))?;
                let dst = resolve(&dst_raw, from_list, &ports.outputs)
                    .ok_or_else(|| invalid(dst_key, dst_raw))?;
                let priority = options
                    .i64("priority")
                    .map(|p| u32::try_from(p).map_err(|_| invalid("priority", p.to_string())))
                    .transpose()?;
                Ok(Self::SetCrosspoint {
                    method,
                    xp: Crosspoint::new(src, dst),
                    priority,
                })
            }
            id::GET_ALL_CROSSPOINTS => Ok(Self::GetAllCrosspoints),
            id::GET_ALL_LOGIC_SOURCES => Ok(Self::GetAllLogicSources),
            id::SET_LOGIC_SOURCE => {
                let object_id = options
                    .i64("logicSrc")
                    .ok_or(ActionError::MissingOption("logicSrc"))?;
                let object_id =
                    u32::try_from(object_id).map_err(|_| invalid("logicSrc", object_id.to_string()))?;
                Ok(Self::SetLogicSource {
                    object_id,
                    state: options.require_bool("logicState")?,
                })
            }
            id::SET_GP_OUTPUT => {
                let raw = options.require_str("gpo")?;
                let addr = resolve_gpio_address(&raw).ok_or_else(|| invalid("gpo", raw))?;
                Ok(Self::SetGpOutput {
                    addr,
                    state: options.require_bool("gpoState")?,
                })
            }
            id::PRESS_KEY => Ok(Self::PressKey {
                key: parse_key(&options)?,
                press: options.bool("press").unwrap_or(true),
                trigger: options.u32_or("trigger", 0)?,
                pool: parse_pool_option(&options),
            }),
            id::LOCK_KEY => Ok(Self::LockKey {
                key: parse_key(&options)?,
                lock: options.bool("lock").unwrap_or(true),
                pool: parse_pool_option(&options),
            }),
            id::KEY_LABEL => {
                let raw = options.require_str("method")?;
                let method = parse_label_method(&raw).ok_or_else(|| invalid("method", raw))?;
                let label = options.str("label");
                let op = KeyLabelOp::build(method, label.as_deref(), options.i64("marker"))?;
                Ok(Self::KeyLabel {
                    key: parse_key(&options)?,
                    op,
                })
            }
            other => Err(ActionError::UnknownAction(other.to_owned())),
        }
    }
}

// ── Dispatch ────────────────────────────────────────────────────────

impl Controller {
    /// Run a host action. Returns `true` if the device accepted it.
    /// Accepted sets are recorded while recording is on.
    pub async fn run_action(&self, invocation: &ActionInvocation) -> bool {
        self.dispatch(invocation, Origin::Direct).await
    }

    /// Run a previously recorded action. Never recorded again.
    pub async fn replay(&self, invocation: &ActionInvocation) -> bool {
        self.dispatch(invocation, Origin::Replay).await
    }

    async fn dispatch(&self, invocation: &ActionInvocation, origin: Origin) -> bool {
        let action = match Action::parse(invocation, self.store()) {
            Ok(action) => action,
            Err(e) => {
                self.reject(&invocation.action_id, &e);
                return false;
            }
        };

        match action {
            Action::SetCrosspoint {
                method,
                xp,
                priority,
            } => self
                .set_crosspoint_from(method, xp, priority, origin)
                .await
                .is_some(),
            Action::GetAllCrosspoints => self.get_all_active_crosspoints().await.is_some(),
            Action::GetAllLogicSources => self.get_all_logic_sources().await.is_some(),
            Action::SetLogicSource { object_id, state } => self
                .set_logic_source_from(object_id, state, origin)
                .await
                .is_some(),
            Action::SetGpOutput { addr, state } => self
                .set_gp_output_from(addr, state, origin)
                .await
                .is_some(),
            Action::PressKey {
                key,
                press,
                trigger,
                pool,
            } => self.press_key(key, press, trigger, pool).await.is_some(),
            Action::LockKey { key, lock, pool } => self.lock_key(key, lock, pool).await.is_some(),
            Action::KeyLabel { key, op } => self.label_and_marker(key, op).await.is_some(),
        }
    }

    /// A host started showing `invocation`: read back the state it
    /// would change. Actions without a read side do nothing.
    pub async fn subscribe_action(&self, invocation: &ActionInvocation) {
        match Action::parse(invocation, self.store()) {
            Ok(Action::SetCrosspoint { xp, .. }) => {
                self.get_crosspoint(xp).await;
            }
            Ok(Action::SetGpOutput { addr, .. }) => {
                self.get_gp_output(addr).await;
            }
            Ok(_) => {}
            Err(e) => self.reject(&invocation.action_id, &e),
        }
    }

    fn reject(&self, action_id: &str, error: &ActionError) {
        match error {
            ActionError::UnknownAction(_) => warn!(action = action_id, "{error}"),
            _ if self.config().verbose => {
                debug!(action = action_id, error = %error, "invalid options supplied");
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::model::{Address, Label, Port};

    fn invocation(action_id: &str, options: JsonValue) -> ActionInvocation {
        let JsonValue::Object(options) = options else {
            panic!("options must be an object");
        };
        ActionInvocation {
            action_id: action_id.to_owned(),
            options,
        }
    }

    #[test]
    fn set_crosspoint_from_dotted_options() {
        let store = DataStore::new();
        let parsed = Action::parse(
            &invocation(
                "setCrosspoint",
                json!({ "xpMethod": "SetXpPrio", "srcAddr": "2.4.9", "dstAddr": "1.1.1", "priority": "3" }),
            ),
            &store,
        );
        assert_eq!(
            parsed,
            Ok(Action::SetCrosspoint {
                method: XpMethod::SetPrio,
                xp: Crosspoint::new(Address::new(2, 4, 8), Address::new(1, 1, 0)),
                priority: Some(3),
            })
        );
    }

    #[test]
    fn set_crosspoint_from_list_checks_direction_lists() {
        let store = DataStore::new();
        let port = |node, label: &str, input, output| Port {
            address: Address::new(1, node, 0),
            label: label.to_owned(),
            name: String::new(),
            input,
            output,
        };
        store.replace_ports(vec![port(1, "Mic", true, false), port(2, "Speaker", false, true)]);
        let ok = invocation(
            "setCrosspoint",
            json!({ "xpMethod": "kill", "fromList": true, "srcAddrList": "1-1-0", "dstAddrList": "1-2-0" }),
        );
        assert!(matches!(
            Action::parse(&ok, &store),
            Ok(Action::SetCrosspoint { method: XpMethod::Kill, .. })
        ));

        let reversed = invocation(
            "setCrosspoint",
            json!({ "fromList": true, "srcAddrList": "1-2-0", "dstAddrList": "1-1-0" }),
        );
        assert_eq!(
            Action::parse(&reversed, &store),
            Err(ActionError::InvalidOption {
                option: "srcAddrList",
                value: "1-2-0".into()
            })
        );

        let unknown = invocation(
            "setCrosspoint",
            json!({ "fromList": true, "srcAddrList": "1-1-0", "dstAddrList": "9-9-9" }),
        );
        assert_eq!(
            Action::parse(&unknown, &store),
            Err(ActionError::InvalidOption {
                option: "dstAddrList",
                value: "9-9-9".into()
            })
        );
    }

    #[test]
    fn invalid_address_is_rejected() {
        let store = DataStore::new();
        let bad = invocation("setCrosspoint", json!({ "srcAddr": "2.4.0", "dstAddr": "1.1.1" }));
        assert!(matches!(
            Action::parse(&bad, &store),
            Err(ActionError::InvalidOption { option: "srcAddr", .. })
        ));
    }

    #[test]
    fn empty_label_never_parses() {
        let store = DataStore::new();
        let bad = invocation(
            "keyLabel",
            json!({ "method": "setKeyLabel", "panel": "1.2.3", "label": "" }),
        );
        assert_eq!(
            Action::parse(&bad, &store),
            Err(ActionError::KeyLabel(KeyLabelError::EmptyLabel))
        );

        let good = invocation(
            "keyLabel",
            json!({ "method": "SetKeyLabel", "panel": "1.2.3", "key": 4, "label": "Producer1" }),
        );
        let Ok(Action::KeyLabel { key, op }) = Action::parse(&good, &store) else {
            panic!("expected key label action");
        };
        assert_eq!(key.panel, Address::new(1, 2, 2));
        assert_eq!(key.key, 4);
        assert_eq!(
            op,
            KeyLabelOp::SetLabel(Label::new("Producer").unwrap_or_else(|e| panic!("{e}")))
        );
    }

    #[test]
    fn press_key_clamps_pool() {
        let store = DataStore::new();
        let parsed = Action::parse(
            &invocation("pressKey", json!({ "panel": "1.2.3", "pool": "77" })),
            &store,
        );
        assert!(matches!(parsed, Ok(Action::PressKey { pool: 32, press: true, .. })));
    }

    #[test]
    fn logic_and_gpio_options() {
        let store = DataStore::new();
        assert_eq!(
            Action::parse(
                &invocation("setLogicSource", json!({ "logicSrc": 5, "logicState": "on" })),
                &store
            ),
            Ok(Action::SetLogicSource {
                object_id: 5,
                state: true
            })
        );
        assert_eq!(
            Action::parse(
                &invocation("setGPOutput", json!({ "gpo": "3.1", "gpoState": false })),
                &store
            ),
            Ok(Action::SetGpOutput {
                addr: GpioAddress::new(3, 0),
                state: false
            })
        );
        assert_eq!(
            Action::parse(&invocation("setLogicSource", json!({ "logicState": true })), &store),
            Err(ActionError::MissingOption("logicSrc"))
        );
    }

    #[test]
    fn unknown_action() {
        let store = DataStore::new();
        assert_eq!(
            Action::parse(&invocation("frobnicate", json!({})), &store),
            Err(ActionError::UnknownAction("frobnicate".into()))
        );
    }
}
