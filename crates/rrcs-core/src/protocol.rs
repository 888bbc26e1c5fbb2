// ── RRCS method vocabulary and reply conventions ──
//
// Positional replies are `[transactionKey, errorCode, payload...]`.
// Enumeration replies are structs with an `ErrorCode` member plus a
// count and `Prefix#N` entries. The transport leaves all of this to us.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use rrcs_api::Value;

use crate::error_codes::{self, SUCCESS};

pub(crate) mod method {
    pub const GET_ALIVE: &str = "GetAlive";
    pub const REGISTER_FOR_ALL_EVENTS: &str = "RegisterForAllEvents";
    pub const UNREGISTER_FOR_ALL_EVENTS: &str = "UnregisterForAllEvents";
    pub const GET_XP_STATUS: &str = "GetXpStatus";
    pub const GET_ALL_ACTIVE_XPS: &str = "GetAllActiveXps";
    pub const GET_ALL_PORTS: &str = "GetAllPorts";
    pub const GET_ALL_LOGIC_SOURCES: &str = "GetAllLogicSourcesV2";
    pub const SET_LOGIC_SOURCE: &str = "SetLogicSource";
    pub const SET_GP_OUTPUT: &str = "SetGPOutput";
    pub const GET_GP_OUTPUT: &str = "GetGPOutput";
    pub const PRESS_KEY: &str = "PressKeyEx";
    pub const LOCK_KEY: &str = "LockKey";
}

// ── XpMethod ────────────────────────────────────────────────────────

/// How a crosspoint is set (or removed).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum XpMethod {
    Set,
    #[default]
    SetPrio,
    SetDestruct,
    Kill,
}

impl XpMethod {
    pub fn rpc_method(self) -> &'static str {
        match self {
            Self::Set => "SetXp",
            Self::SetPrio => "SetXpPrio",
            Self::SetDestruct => "SetXpDestruct",
            Self::Kill => "KillXp",
        }
    }

    /// Priority-carrying variants append it after the six coordinates.
    pub fn takes_priority(self) -> bool {
        matches!(self, Self::SetPrio | Self::SetDestruct)
    }

    pub fn is_kill(self) -> bool {
        matches!(self, Self::Kill)
    }
}

// ── Reply checks ────────────────────────────────────────────────────

/// Why a reply was not a success.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ReplyError {
    /// The device answered with a non-zero code.
    Device(i64),
    /// The reply did not have the expected shape.
    Shape(String),
}

impl ReplyError {
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Device(code) => format!("{} (code {code})", error_codes::describe(*code)),
            Self::Shape(detail) => format!("unexpected reply shape: {detail}"),
        }
    }
}

/// Check a positional reply: array, slot 1 is code 0, and (if given)
/// exactly `len` elements. A non-zero code wins over a length mismatch.
pub(crate) fn positional(resp: &Value, len: Option<usize>) -> Result<&[Value], ReplyError> {
    let items = resp
        .as_array()
        .ok_or_else(|| ReplyError::Shape(format!("expected array, got {}", resp.kind())))?;
    let code = items
        .get(1)
        .and_then(Value::as_i64)
        .ok_or_else(|| ReplyError::Shape("missing error code".into()))?;
    if code != SUCCESS {
        return Err(ReplyError::Device(code));
    }
    if let Some(len) = len {
        if items.len() != len {
            return Err(ReplyError::Shape(format!(
                "expected {len} elements, got {}",
                items.len()
            )));
        }
    }
    Ok(items)
}

/// Check an enumeration reply: struct with `ErrorCode == 0`.
pub(crate) fn enumeration(resp: &Value) -> Result<&BTreeMap<String, Value>, ReplyError> {
    let members = resp
        .as_struct()
        .ok_or_else(|| ReplyError::Shape(format!("expected struct, got {}", resp.kind())))?;
    let code = members
        .get("ErrorCode")
        .and_then(Value::as_i64)
        .ok_or_else(|| ReplyError::Shape("missing ErrorCode".into()))?;
    if code != SUCCESS {
        return Err(ReplyError::Device(code));
    }
    Ok(members)
}

/// Entries `Prefix#1 ..= Prefix#count` in index order, skipping absent
/// ones. Walks the members, never the reported count.
pub(crate) fn indexed<'a>(
    members: &'a BTreeMap<String, Value>,
    count_field: &str,
    prefix: &str,
) -> impl Iterator<Item = &'a Value> + 'a {
    let count = members
        .get(count_field)
        .and_then(Value::as_i64)
        .unwrap_or(0)
        .max(0);
    let tag = format!("{prefix}#");
    let mut entries: Vec<(i64, &'a Value)> = members
        .iter()
        .filter_map(|(name, value)| {
            let index = name.strip_prefix(&tag)?.parse::<i64>().ok()?;
            (1..=count).contains(&index).then_some((index, value))
        })
        .collect();
    entries.sort_unstable_by_key(|(index, _)| *index);
    entries.into_iter().map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(items: Vec<Value>) -> Value {
        Value::Array(items)
    }

    #[test]
    fn positional_checks_code_then_length() {
        let ok = reply(vec![Value::from("C1"), Value::Int(0)]);
        assert_eq!(positional(&ok, Some(2)).map(<[_]>::len), Ok(2));
        assert!(matches!(positional(&ok, Some(3)), Err(ReplyError::Shape(_))));

        let failed = reply(vec![Value::from("C1"), Value::Int(4)]);
        assert_eq!(positional(&failed, Some(3)), Err(ReplyError::Device(4)));

        assert!(matches!(
            positional(&Value::Bool(true), None),
            Err(ReplyError::Shape(_))
        ));
    }

    #[test]
    fn enumeration_requires_error_code() {
        let mut members = BTreeMap::new();
        members.insert("ErrorCode".to_owned(), Value::Int(0));
        assert!(enumeration(&Value::Struct(members.clone())).is_ok());

        members.insert("ErrorCode".to_owned(), Value::Int(13));
        assert_eq!(
            enumeration(&Value::Struct(members)),
            Err(ReplyError::Device(13))
        );
        assert!(enumeration(&Value::Struct(BTreeMap::new())).is_err());
    }

    #[test]
    fn indexed_skips_missing_entries() {
        let mut members = BTreeMap::new();
        members.insert("XP Count".to_owned(), Value::Int(3));
        members.insert("XP#1".to_owned(), Value::Int(10));
        members.insert("XP#3".to_owned(), Value::Int(30));
        let found: Vec<_> = indexed(&members, "XP Count", "XP").collect();
        assert_eq!(found, vec![&Value::Int(10), &Value::Int(30)]);
    }

    #[test]
    fn indexed_orders_numerically_and_ignores_out_of_range() {
        let mut members = BTreeMap::new();
        members.insert("XP Count".to_owned(), Value::Int(10));
        members.insert("XP#10".to_owned(), Value::Int(100));
        members.insert("XP#2".to_owned(), Value::Int(20));
        members.insert("XP#11".to_owned(), Value::Int(110));
        members.insert("XP#0".to_owned(), Value::Int(0));
        members.insert("XP#x".to_owned(), Value::Int(-1));
        let found: Vec<_> = indexed(&members, "XP Count", "XP").collect();
        assert_eq!(found, vec![&Value::Int(20), &Value::Int(100)]);
    }

    #[test]
    fn indexed_does_not_walk_a_huge_reported_count() {
        let mut members = BTreeMap::new();
        members.insert("XP Count".to_owned(), Value::Int(i64::MAX));
        members.insert("XP#1".to_owned(), Value::Int(10));
        let found: Vec<_> = indexed(&members, "XP Count", "XP").collect();
        assert_eq!(found, vec![&Value::Int(10)]);
    }

    #[test]
    fn xp_method_wire_names() {
        assert_eq!(XpMethod::SetPrio.rpc_method(), "SetXpPrio");
        assert_eq!("kill".parse::<XpMethod>(), Ok(XpMethod::Kill));
        assert!(XpMethod::SetDestruct.takes_priority());
        assert!(!XpMethod::Kill.takes_priority());
    }
}
