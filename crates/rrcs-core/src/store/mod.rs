// ── Device-state mirror ──
//
// Copy-on-write tables behind `watch` channels: readers take a cheap
// `Arc` snapshot, writers swap in a modified copy atomically.

mod data_store;
mod refresh;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

pub use data_store::{DataStore, LogicTable, PortLists};

/// A set of host feedbacks that must be re-evaluated together.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum FeedbackGroup {
    Crosspoint,
    LogicSource,
    GpOutput,
    GpInput,
}
