// ── Action, feedback and variable definitions ──
//
// Built from the current store contents and pushed to the host. The
// logic-source dropdowns depend on the logic table, which is why a
// logic refresh schedules a (debounced) rebuild.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue, json};
use strum::IntoEnumIterator;

use crate::action::{Options, id};
use crate::link::LinkId;
use crate::model::{Choice, Crosspoint, KeyLabelMethod};
use crate::protocol::XpMethod;
use crate::resolve::{resolve, resolve_gpio_address};
use crate::store::{DataStore, FeedbackGroup, PortLists};

/// Feedback ids, one per group.
pub mod feedback_id {
    pub const CROSSPOINT: &str = "crosspoint";
    pub const LOGIC_SOURCE: &str = "logicSource";
    pub const GP_OUTPUT: &str = "gpOutput";
    pub const GP_INPUT: &str = "gpInput";
}

/// Variable ids.
pub mod variable_id {
    pub const ACTIVE_SERVER: &str = "active_server";
    pub const CROSSPOINT_COUNT: &str = "crosspoint_count";
    pub const LOGIC_SOURCE_COUNT: &str = "logic_source_count";
}

// ── Option fields ───────────────────────────────────────────────────

/// One input control of an action or feedback form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OptionField {
    #[serde(rename_all = "camelCase")]
    TextInput {
        id: String,
        label: String,
        default: String,
    },
    #[serde(rename_all = "camelCase")]
    Number {
        id: String,
        label: String,
        min: i64,
        max: i64,
        default: i64,
    },
    #[serde(rename_all = "camelCase")]
    Checkbox {
        id: String,
        label: String,
        default: bool,
    },
    #[serde(rename_all = "camelCase")]
    Dropdown {
        id: String,
        label: String,
        choices: Vec<Choice<JsonValue>>,
        default: JsonValue,
    },
}

impl OptionField {
    fn text(id: &str, label: &str, default: &str) -> Self {
        Self::TextInput {
            id: id.to_owned(),
            label: label.to_owned(),
            default: default.to_owned(),
        }
    }

    fn number(id: &str, label: &str, min: i64, max: i64, default: i64) -> Self {
        Self::Number {
            id: id.to_owned(),
            label: label.to_owned(),
            min,
            max,
            default,
        }
    }

    fn checkbox(id: &str, label: &str, default: bool) -> Self {
        Self::Checkbox {
            id: id.to_owned(),
            label: label.to_owned(),
            default,
        }
    }

    fn dropdown(id: &str, label: &str, choices: Vec<Choice<JsonValue>>) -> Self {
        let default = choices
            .first()
            .map_or(JsonValue::Null, |c| c.id.clone());
        Self::Dropdown {
            id: id.to_owned(),
            label: label.to_owned(),
            choices,
            default,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::TextInput { id, .. }
            | Self::Number { id, .. }
            | Self::Checkbox { id, .. }
            | Self::Dropdown { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionDefinition {
    pub id: String,
    pub name: String,
    pub options: Vec<OptionField>,
    /// The action re-reads device state when a host subscribes to it.
    pub subscribable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackDefinition {
    pub id: String,
    pub name: String,
    pub group: FeedbackGroup,
    pub options: Vec<OptionField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableDefinition {
    pub id: String,
    pub name: String,
}

fn action(id: &str, name: &str, options: Vec<OptionField>) -> ActionDefinition {
    ActionDefinition {
        id: id.to_owned(),
        name: name.to_owned(),
        options,
        subscribable: false,
    }
}

fn string_choices(choices: &[Choice]) -> Vec<Choice<JsonValue>> {
    choices
        .iter()
        .map(|c| Choice::new(JsonValue::from(c.id.as_str()), c.label.clone()))
        .collect()
}

fn port_fields(ports: &PortLists) -> Vec<OptionField> {
    vec![
        OptionField::checkbox("fromList", "Select from list", false),
        OptionField::text("srcAddr", "Source (net.node.port)", "1.1.1"),
        OptionField::text("dstAddr", "Destination (net.node.port)", "1.1.1"),
        OptionField::dropdown("srcAddrList", "Source", string_choices(&ports.inputs)),
        OptionField::dropdown("dstAddrList", "Destination", string_choices(&ports.outputs)),
    ]
}

fn key_fields() -> Vec<OptionField> {
    vec![
        OptionField::text("panel", "Panel (net.node.port)", "1.1.1"),
        OptionField::checkbox("isInput", "Input side", false),
        OptionField::number("page", "Page", 0, 255, 0),
        OptionField::number("expPanel", "Expansion panel", 0, 255, 0),
        OptionField::number("key", "Key", 0, 255, 0),
        OptionField::checkbox("isVirtual", "Virtual key", false),
    ]
}

// ── Builders ────────────────────────────────────────────────────────

pub fn build_action_definitions(store: &DataStore) -> Vec<ActionDefinition> {
    let ports = store.ports();
    let logic_choices = store.logic_choices();

    let xp_methods = XpMethod::iter()
        .map(|m| Choice::new(json!(m), m.rpc_method()))
        .collect();
    let mut set_xp_options = vec![OptionField::dropdown("xpMethod", "Method", xp_methods)];
    set_xp_options.extend(port_fields(&ports));
    set_xp_options.push(OptionField::number("priority", "Priority", 0, 255, 1));

    let mut actions = vec![
        ActionDefinition {
            subscribable: true,
            ..action(id::SET_CROSSPOINT, "Set Crosspoint", set_xp_options)
        },
        action(id::GET_ALL_CROSSPOINTS, "Get Active Crosspoints", Vec::new()),
        action(id::GET_ALL_LOGIC_SOURCES, "Get All Logic Sources", Vec::new()),
    ];

    if !logic_choices.is_empty() {
        let choices = logic_choices
            .iter()
            .map(|c| Choice::new(JsonValue::from(c.id), c.label.clone()))
            .collect();
        actions.push(action(
            id::SET_LOGIC_SOURCE,
            "Set Logic Source",
            vec![
                OptionField::dropdown("logicSrc", "Logic source", choices),
                OptionField::checkbox("logicState", "State", true),
            ],
        ));
    }

    actions.push(ActionDefinition {
        subscribable: true,
        ..action(
            id::SET_GP_OUTPUT,
            "Set GP Output",
            vec![
                OptionField::text("gpo", "GP output (node.port)", "1.1"),
                OptionField::checkbox("gpoState", "State", true),
            ],
        )
    });

    let mut press = key_fields();
    press.extend([
        OptionField::checkbox("press", "Press", true),
        OptionField::number("trigger", "Trigger", 0, 255, 0),
        OptionField::text("pool", "Pool port (-1 = none)", "-1"),
    ]);
    actions.push(action(id::PRESS_KEY, "Press Key", press));

    let mut lock = key_fields();
    lock.extend([
        OptionField::checkbox("lock", "Lock", true),
        OptionField::text("pool", "Pool port (-1 = none)", "-1"),
    ]);
    actions.push(action(id::LOCK_KEY, "Lock Key", lock));

    let label_methods = KeyLabelMethod::iter()
        .map(|m| Choice::new(json!(m), m.rpc_method()))
        .collect();
    let mut label = vec![OptionField::dropdown("method", "Method", label_methods)];
    label.extend(key_fields());
    label.extend([
        OptionField::text("label", "Label (max 8 chars)", ""),
        OptionField::number("marker", "Marker", 1, 128, 1),
    ]);
    actions.push(action(id::KEY_LABEL, "Key Label / Marker", label));

    actions
}

pub fn build_feedback_definitions(store: &DataStore) -> Vec<FeedbackDefinition> {
    let ports = store.ports();
    let logic_choices = store
        .logic_choices()
        .into_iter()
        .map(|c| Choice::new(JsonValue::from(c.id), c.label))
        .collect();

    vec![
        FeedbackDefinition {
            id: feedback_id::CROSSPOINT.to_owned(),
            name: "Crosspoint active".to_owned(),
            group: FeedbackGroup::Crosspoint,
            options: port_fields(&ports),
        },
        FeedbackDefinition {
            id: feedback_id::LOGIC_SOURCE.to_owned(),
            name: "Logic source state".to_owned(),
            group: FeedbackGroup::LogicSource,
            options: vec![OptionField::dropdown("logicSrc", "Logic source", logic_choices)],
        },
        FeedbackDefinition {
            id: feedback_id::GP_OUTPUT.to_owned(),
            name: "GP output state".to_owned(),
            group: FeedbackGroup::GpOutput,
            options: vec![OptionField::text("gpo", "GP output (node.port)", "1.1")],
        },
        FeedbackDefinition {
            id: feedback_id::GP_INPUT.to_owned(),
            name: "GP input state".to_owned(),
            group: FeedbackGroup::GpInput,
            options: vec![OptionField::text("gpi", "GP input (node.port)", "1.1")],
        },
    ]
}

pub fn build_variable_definitions() -> Vec<VariableDefinition> {
    [
        (variable_id::ACTIVE_SERVER, "Active RRCS server (pri/sec)"),
        (variable_id::CROSSPOINT_COUNT, "Active crosspoints"),
        (variable_id::LOGIC_SOURCE_COUNT, "Known logic sources"),
    ]
    .into_iter()
    .map(|(id, name)| VariableDefinition {
        id: id.to_owned(),
        name: name.to_owned(),
    })
    .collect()
}

pub fn variable_values(store: &DataStore, active: LinkId) -> Vec<(String, JsonValue)> {
    vec![
        (
            variable_id::ACTIVE_SERVER.to_owned(),
            JsonValue::from(active.to_string()),
        ),
        (
            variable_id::CROSSPOINT_COUNT.to_owned(),
            JsonValue::from(store.active_crosspoint_count()),
        ),
        (
            variable_id::LOGIC_SOURCE_COUNT.to_owned(),
            JsonValue::from(store.logic_snapshot().len()),
        ),
    ]
}

/// Answer a boolean feedback from the store.
///
/// `None` when the feedback id is unknown or its options do not resolve.
/// Unknown state reads as `false`.
pub fn evaluate_feedback(
    store: &DataStore,
    feedback_id: &str,
    options: &Map<String, JsonValue>,
) -> Option<bool> {
    let options = Options::new(options);
    match feedback_id {
        feedback_id::CROSSPOINT => {
            let from_list = options.bool("fromList").unwrap_or(false);
            let ports = store.ports();
            let (src, dst) = if from_list {
                (options.str("srcAddrList")?, options.str("dstAddrList")?)
            } else {
                (options.str("srcAddr")?, options.str("dstAddr")?)
            };
            let xp = Crosspoint::new(
                resolve(&src, from_list, &ports.inputs)?,
                resolve(&dst, from_list, &ports.outputs)?,
            );
            Some(store.crosspoint(&xp).unwrap_or(false))
        }
        feedback_id::LOGIC_SOURCE => {
            let object_id = u32::try_from(options.i64("logicSrc")?).ok()?;
            Some(store.logic_source(object_id).is_some_and(|s| s.state))
        }
        feedback_id::GP_OUTPUT => {
            let addr = resolve_gpio_address(&options.str("gpo")?)?;
            Some(store.gp_output(&addr).unwrap_or(false))
        }
        feedback_id::GP_INPUT => {
            let addr = resolve_gpio_address(&options.str("gpi")?)?;
            Some(store.gp_input(&addr).unwrap_or(false))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{Address, GpioAddress, LogicSource, Port};

    fn ids(actions: &[ActionDefinition]) -> Vec<&str> {
        actions.iter().map(|a| a.id.as_str()).collect()
    }

    fn opts(value: JsonValue) -> Map<String, JsonValue> {
        match value {
            JsonValue::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn set_logic_source_only_offered_with_known_sources() {
        let store = DataStore::new();
        assert!(!ids(&build_action_definitions(&store)).contains(&id::SET_LOGIC_SOURCE));

        store.replace_logic_sources([LogicSource {
            object_id: 5,
            name: "A".into(),
            alias: "a".into(),
            state: false,
        }]);
        let actions = build_action_definitions(&store);
        let set_logic = actions
            .iter()
            .find(|a| a.id == id::SET_LOGIC_SOURCE)
            .unwrap_or_else(|| panic!("setLogicSource missing"));
        assert_eq!(
            set_logic.options[0],
            OptionField::Dropdown {
                id: "logicSrc".into(),
                label: "Logic source".into(),
                choices: vec![Choice::new(json!(5), "A")],
                default: json!(5),
            }
        );
    }

    #[test]
    fn set_crosspoint_carries_every_option() {
        let store = DataStore::new();
        let actions = build_action_definitions(&store);
        let set_xp = &actions[0];
        let fields: Vec<&str> = set_xp.options.iter().map(OptionField::id).collect();
        for field in [
            "xpMethod",
            "srcAddr",
            "dstAddr",
            "priority",
            "fromList",
            "srcAddrList",
            "dstAddrList",
        ] {
            assert!(fields.contains(&field), "missing {field}");
        }
        assert!(set_xp.subscribable);
    }

    #[test]
    fn list_dropdowns_split_sources_from_destinations() {
        let store = DataStore::new();
        let port = |node, label: &str, input, output| Port {
            address: Address::new(1, node, 0),
            label: label.to_owned(),
            name: String::new(),
            input,
            output,
        };
        store.replace_ports(vec![port(1, "Mic", true, false), port(2, "Speaker", false, true)]);

        let actions = build_action_definitions(&store);
        let dropdown = |field: &str| -> Vec<JsonValue> {
            actions[0]
                .options
                .iter()
                .find_map(|option| match option {
                    OptionField::Dropdown { id, choices, .. } if id == field => {
                        Some(choices.iter().map(|c| c.id.clone()).collect())
                    }
                    _ => None,
                })
                .unwrap_or_default()
        };
        assert_eq!(dropdown("srcAddrList"), vec![json!("1-1-0")]);
        assert_eq!(dropdown("dstAddrList"), vec![json!("1-2-0")]);

        let xp = Crosspoint::new(Address::new(1, 1, 0), Address::new(1, 2, 0));
        store.merge_crosspoint(xp, true);
        let listed = opts(json!({ "fromList": true, "srcAddrList": "1-1-0", "dstAddrList": "1-2-0" }));
        let reversed = opts(json!({ "fromList": true, "srcAddrList": "1-2-0", "dstAddrList": "1-1-0" }));
        assert_eq!(evaluate_feedback(&store, "crosspoint", &listed), Some(true));
        assert_eq!(evaluate_feedback(&store, "crosspoint", &reversed), None);
    }

    #[test]
    fn crosspoint_feedback_reads_store() {
        let store = DataStore::new();
        let xp = Crosspoint::new(Address::new(2, 4, 8), Address::new(1, 1, 0));
        store.merge_crosspoint(xp, true);

        let hit = opts(json!({ "srcAddr": "2.4.9", "dstAddr": "1.1.1" }));
        let miss = opts(json!({ "srcAddr": "2.4.9", "dstAddr": "1.1.2" }));
        let listed = opts(json!({ "fromList": true, "srcAddrList": "2-4-8", "dstAddrList": "1-1-0" }));
        let broken = opts(json!({ "srcAddr": "2.4", "dstAddr": "1.1.1" }));

        assert_eq!(evaluate_feedback(&store, "crosspoint", &hit), Some(true));
        assert_eq!(evaluate_feedback(&store, "crosspoint", &miss), Some(false));
        assert_eq!(evaluate_feedback(&store, "crosspoint", &listed), Some(true));
        assert_eq!(evaluate_feedback(&store, "crosspoint", &broken), None);
        assert_eq!(evaluate_feedback(&store, "nope", &hit), None);
    }

    #[test]
    fn gpio_feedbacks_read_their_own_tables() {
        let store = DataStore::new();
        store.merge_gp_output(GpioAddress::new(3, 0), true);
        let gpo = opts(json!({ "gpo": "3.1" }));
        let gpi = opts(json!({ "gpi": "3.1" }));
        assert_eq!(evaluate_feedback(&store, "gpOutput", &gpo), Some(true));
        assert_eq!(evaluate_feedback(&store, "gpInput", &gpi), Some(false));
    }

    #[test]
    fn variable_values_follow_store() {
        let store = DataStore::new();
        store.merge_crosspoint(
            Crosspoint::new(Address::new(1, 1, 0), Address::new(1, 2, 0)),
            true,
        );
        let values = variable_values(&store, LinkId::Secondary);
        assert_eq!(values[0], ("active_server".to_owned(), json!("sec")));
        assert_eq!(values[1], ("crosspoint_count".to_owned(), json!(1)));
        assert_eq!(values[2], ("logic_source_count".to_owned(), json!(0)));
        assert_eq!(build_variable_definitions().len(), 3);
    }
}
