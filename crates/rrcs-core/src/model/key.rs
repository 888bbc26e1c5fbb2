// ── Panel key manipulation ──
//
// Label/marker changes come in six wire variants. Each is a distinct
// `KeyLabelOp` carrying already-validated arguments, so an invalid label
// or marker can never reach the queue.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use thiserror::Error;

use rrcs_api::Value;

use super::Address;

/// Lowest pool port accepted by `PressKeyEx` / `LockKey` (-1 = none).
pub const POOL_MIN: i32 = -1;
/// Highest pool port.
pub const POOL_MAX: i32 = 32;
/// Labels longer than this are truncated before validation.
pub const LABEL_MAX_CHARS: usize = 8;
/// Highest marker number.
pub const MARKER_MAX: u8 = 128;

/// Clamp a pool port into `[-1, 32]`; absent means -1.
pub fn clamp_pool(pool: Option<i64>) -> i32 {
    match pool {
        None => POOL_MIN,
        Some(p) => i32::try_from(p.clamp(i64::from(POOL_MIN), i64::from(POOL_MAX)))
            .unwrap_or(POOL_MIN),
    }
}

/// Parse free-form pool input. Anything non-numeric is -1.
pub fn parse_pool(raw: &str) -> i32 {
    clamp_pool(raw.trim().parse::<i64>().ok())
}

// ── KeyRef ──────────────────────────────────────────────────────────

/// Addresses a single key on a control panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct KeyRef {
    /// Panel port; only `node` and `port` go on the wire.
    pub panel: Address,
    pub is_input: bool,
    pub page: u32,
    pub expansion_panel: u32,
    pub key: u32,
    pub is_virtual: bool,
}

impl KeyRef {
    /// `[node, port, isInput, page, expPanel, key, isVirtual]`
    pub(crate) fn rpc_args(&self) -> Vec<Value> {
        vec![
            Value::from(self.panel.node),
            Value::from(self.panel.port),
            Value::from(self.is_input),
            Value::from(self.page),
            Value::from(self.expansion_panel),
            Value::from(self.key),
            Value::from(self.is_virtual),
        ]
    }
}

// ── Label / marker ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyLabelError {
    #[error("label is empty")]
    EmptyLabel,
    #[error("label is required for {0}")]
    MissingLabel(KeyLabelMethod),
    #[error("marker {0} is outside 1..=128")]
    MarkerOutOfRange(i64),
    #[error("marker is required for {0}")]
    MissingMarker(KeyLabelMethod),
}

/// Key label text, truncated to eight characters and never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label(String);

impl Label {
    pub fn new(raw: &str) -> Result<Self, KeyLabelError> {
        let truncated: String = raw.chars().take(LABEL_MAX_CHARS).collect();
        if truncated.is_empty() {
            return Err(KeyLabelError::EmptyLabel);
        }
        Ok(Self(truncated))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Marker number in `1..=128`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker(u8);

impl Marker {
    pub fn new(raw: i64) -> Result<Self, KeyLabelError> {
        u8::try_from(raw)
            .ok()
            .filter(|m| (1..=MARKER_MAX).contains(m))
            .map(Self)
            .ok_or(KeyLabelError::MarkerOutOfRange(raw))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// Wire-level discriminant, as it appears in action options.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum KeyLabelMethod {
    ClearKeyLabel,
    ClearKeyLabelAndMarker,
    ClearKeyMarker,
    SetKeyLabel,
    SetKeyLabelAndMarker,
    SetKeyMarker,
}

impl KeyLabelMethod {
    pub fn rpc_method(self) -> &'static str {
        match self {
            Self::ClearKeyLabel => "ClearKeyLabel",
            Self::ClearKeyLabelAndMarker => "ClearKeyLabelAndMarker",
            Self::ClearKeyMarker => "ClearKeyMarker",
            Self::SetKeyLabel => "SetKeyLabel",
            Self::SetKeyLabelAndMarker => "SetKeyLabelAndMarker",
            Self::SetKeyMarker => "SetKeyMarker",
        }
    }
}

/// A validated label/marker operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyLabelOp {
    ClearLabel,
    ClearLabelAndMarker,
    ClearMarker,
    SetLabel(Label),
    SetLabelAndMarker(Label, Marker),
    SetMarker(Marker),
}

impl KeyLabelOp {
    /// Build from loosely typed input. Arguments the method does not
    /// take are ignored.
    pub fn build(
        method: KeyLabelMethod,
        label: Option<&str>,
        marker: Option<i64>,
    ) -> Result<Self, KeyLabelError> {
        let label = || {
            label
                .ok_or(KeyLabelError::MissingLabel(method))
                .and_then(Label::new)
        };
        let marker = || {
            marker
                .ok_or(KeyLabelError::MissingMarker(method))
                .and_then(Marker::new)
        };

        Ok(match method {
            KeyLabelMethod::ClearKeyLabel => Self::ClearLabel,
            KeyLabelMethod::ClearKeyLabelAndMarker => Self::ClearLabelAndMarker,
            KeyLabelMethod::ClearKeyMarker => Self::ClearMarker,
            KeyLabelMethod::SetKeyLabel => Self::SetLabel(label()?),
            KeyLabelMethod::SetKeyLabelAndMarker => Self::SetLabelAndMarker(label()?, marker()?),
            KeyLabelMethod::SetKeyMarker => Self::SetMarker(marker()?),
        })
    }

    pub fn method(&self) -> KeyLabelMethod {
        match self {
            Self::ClearLabel => KeyLabelMethod::ClearKeyLabel,
            Self::ClearLabelAndMarker => KeyLabelMethod::ClearKeyLabelAndMarker,
            Self::ClearMarker => KeyLabelMethod::ClearKeyMarker,
            Self::SetLabel(_) => KeyLabelMethod::SetKeyLabel,
            Self::SetLabelAndMarker(..) => KeyLabelMethod::SetKeyLabelAndMarker,
            Self::SetMarker(_) => KeyLabelMethod::SetKeyMarker,
        }
    }

    /// Arguments appended after the key coordinates.
    pub(crate) fn trailing_args(&self) -> Vec<Value> {
        match self {
            Self::ClearLabel | Self::ClearLabelAndMarker | Self::ClearMarker => Vec::new(),
            Self::SetLabel(label) => vec![Value::from(label.as_str())],
            Self::SetLabelAndMarker(label, marker) => vec![
                Value::from(label.as_str()),
                Value::from(u32::from(marker.get())),
            ],
            Self::SetMarker(marker) => vec![Value::from(u32::from(marker.get()))],
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn pool_is_clamped() {
        assert_eq!(clamp_pool(None), -1);
        assert_eq!(clamp_pool(Some(-7)), -1);
        assert_eq!(clamp_pool(Some(5)), 5);
        assert_eq!(clamp_pool(Some(99)), 32);
        assert_eq!(parse_pool("abc"), -1);
        assert_eq!(parse_pool(" 12 "), 12);
        assert_eq!(parse_pool("40"), 32);
    }

    #[test]
    fn label_is_truncated_to_eight_chars() {
        assert_eq!(Label::new("Commentary").map(|l| l.0), Ok("Commenta".to_owned()));
        assert_eq!(Label::new("ÄÖÜäöüßéx").map(|l| l.0), Ok("ÄÖÜäöüßé".to_owned()));
        assert_eq!(Label::new(""), Err(KeyLabelError::EmptyLabel));
    }

    #[test]
    fn marker_range() {
        assert!(Marker::new(1).is_ok());
        assert!(Marker::new(128).is_ok());
        assert_eq!(Marker::new(0), Err(KeyLabelError::MarkerOutOfRange(0)));
        assert_eq!(Marker::new(129), Err(KeyLabelError::MarkerOutOfRange(129)));
        assert_eq!(Marker::new(-3), Err(KeyLabelError::MarkerOutOfRange(-3)));
    }

    #[test]
    fn build_validates_per_method() {
        assert_eq!(
            KeyLabelOp::build(KeyLabelMethod::SetKeyLabel, Some(""), None),
            Err(KeyLabelError::EmptyLabel)
        );
        assert_eq!(
            KeyLabelOp::build(KeyLabelMethod::SetKeyLabel, None, None),
            Err(KeyLabelError::MissingLabel(KeyLabelMethod::SetKeyLabel))
        );
        assert_eq!(
            KeyLabelOp::build(KeyLabelMethod::SetKeyLabelAndMarker, Some("MIC"), Some(200)),
            Err(KeyLabelError::MarkerOutOfRange(200))
        );
        // clear methods ignore whatever else was passed
        assert_eq!(
            KeyLabelOp::build(KeyLabelMethod::ClearKeyMarker, Some(""), Some(0)),
            Ok(KeyLabelOp::ClearMarker)
        );
    }

    #[test]
    fn trailing_args_follow_method_arity() {
        let op = KeyLabelOp::build(KeyLabelMethod::SetKeyLabelAndMarker, Some("MIC 1"), Some(7))
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(op.trailing_args(), vec![Value::from("MIC 1"), Value::Int(7)]);
        assert!(KeyLabelOp::ClearLabel.trailing_args().is_empty());
    }

    #[test]
    fn every_method_round_trips_through_build() {
        for method in KeyLabelMethod::iter() {
            let op = KeyLabelOp::build(method, Some("X"), Some(1))
                .unwrap_or_else(|e| panic!("{method}: {e}"));
            assert_eq!(op.method(), method);
            assert_eq!(method.to_string().parse::<KeyLabelMethod>(), Ok(method));
        }
    }
}
