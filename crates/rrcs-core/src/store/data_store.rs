// ── Central device-state store ──
//
// Every table lives behind a `watch::Sender<Arc<_>>`. Mutations go
// through `send_if_modified`/`send_modify`, so each update is atomic
// with respect to readers and subscribers only wake on real changes.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashSet;
use tokio::sync::watch;

use super::FeedbackGroup;
use crate::model::{Choice, Crosspoint, GpioAddress, LogicSource, Port};

/// Logic sources by object id, plus the dropdown derived from them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogicTable {
    pub sources: BTreeMap<u32, LogicSource>,
    /// Sorted by label, ascending.
    pub choices: Vec<Choice<u32>>,
}

impl LogicTable {
    pub fn get(&self, object_id: u32) -> Option<&LogicSource> {
        self.sources.get(&object_id)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Enumerated ports, plus one dropdown per direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortLists {
    pub ports: Vec<Port>,
    /// Source ports, sorted by label.
    pub inputs: Vec<Choice>,
    /// Destination ports, sorted by label.
    pub outputs: Vec<Choice>,
}

impl PortLists {
    pub fn from_ports(ports: Vec<Port>) -> Self {
        let sorted = |direction: fn(&Port) -> bool| {
            let mut choices: Vec<Choice> = ports
                .iter()
                .filter(|&port| direction(port))
                .map(Port::choice)
                .collect();
            choices.sort_by(|a, b| a.label.cmp(&b.label));
            choices
        };
        let inputs = sorted(|port| port.input);
        let outputs = sorted(|port| port.output);
        Self {
            ports,
            inputs,
            outputs,
        }
    }

    /// Selector of the first source port, or empty.
    pub fn first_input(&self) -> &str {
        self.inputs.first().map_or("", |c| c.id.as_str())
    }

    /// Selector of the first destination port, or empty.
    pub fn first_output(&self) -> &str {
        self.outputs.first().map_or("", |c| c.id.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

type CrosspointMap = HashMap<Crosspoint, bool>;
type GpioMap = HashMap<GpioAddress, bool>;

/// In-memory mirror of one RRCS server.
///
/// Absence of a crosspoint means "unknown", not "inactive".
pub struct DataStore {
    pub(crate) crosspoints: watch::Sender<Arc<CrosspointMap>>,
    pub(crate) logic: watch::Sender<Arc<LogicTable>>,
    pub(crate) gp_outputs: watch::Sender<Arc<GpioMap>>,
    pub(crate) gp_inputs: watch::Sender<Arc<GpioMap>>,
    pub(crate) ports: watch::Sender<Arc<PortLists>>,
    pub(crate) dirty: DashSet<FeedbackGroup>,
    pub(crate) last_full_refresh: watch::Sender<Option<DateTime<Utc>>>,
}

impl DataStore {
    pub fn new() -> Self {
        Self {
            crosspoints: watch::channel(Arc::default()).0,
            logic: watch::channel(Arc::default()).0,
            gp_outputs: watch::channel(Arc::default()).0,
            gp_inputs: watch::channel(Arc::default()).0,
            ports: watch::channel(Arc::default()).0,
            dirty: DashSet::new(),
            last_full_refresh: watch::channel(None).0,
        }
    }

    // ── Crosspoints ──────────────────────────────────────────────────

    pub fn crosspoint(&self, xp: &Crosspoint) -> Option<bool> {
        self.crosspoints.borrow().get(xp).copied()
    }

    pub fn crosspoints_snapshot(&self) -> Arc<CrosspointMap> {
        Arc::clone(&self.crosspoints.borrow())
    }

    /// Number of crosspoints known to be active.
    pub fn active_crosspoint_count(&self) -> usize {
        self.crosspoints.borrow().values().filter(|s| **s).count()
    }

    pub fn subscribe_crosspoints(&self) -> watch::Receiver<Arc<CrosspointMap>> {
        self.crosspoints.subscribe()
    }

    /// Insert or overwrite one pair. Unrelated pairs are untouched.
    /// Returns `true` if the stored value changed.
    pub(crate) fn merge_crosspoint(&self, xp: Crosspoint, active: bool) -> bool {
        let changed = self.crosspoints.send_if_modified(|map| {
            if map.get(&xp) == Some(&active) {
                return false;
            }
            Arc::make_mut(map).insert(xp, active);
            true
        });
        if changed {
            self.mark_dirty(FeedbackGroup::Crosspoint);
        }
        changed
    }

    // ── Logic sources ────────────────────────────────────────────────

    pub fn logic_source(&self, object_id: u32) -> Option<LogicSource> {
        self.logic.borrow().get(object_id).cloned()
    }

    pub fn logic_snapshot(&self) -> Arc<LogicTable> {
        Arc::clone(&self.logic.borrow())
    }

    pub fn logic_choices(&self) -> Vec<Choice<u32>> {
        self.logic.borrow().choices.clone()
    }

    pub fn subscribe_logic(&self) -> watch::Receiver<Arc<LogicTable>> {
        self.logic.subscribe()
    }

    /// Update the state of a known source in place.
    ///
    /// Returns `None` if the source is unknown (the table is not grown
    /// here), otherwise whether the value changed.
    pub(crate) fn set_logic_state(&self, object_id: u32, state: bool) -> Option<bool> {
        let mut known = false;
        let changed = self.logic.send_if_modified(|table| {
            let Some(current) = table.get(object_id) else {
                return false;
            };
            known = true;
            if current.state == state {
                return false;
            }
            if let Some(source) = Arc::make_mut(table).sources.get_mut(&object_id) {
                source.state = state;
            }
            true
        });
        if !known {
            return None;
        }
        if changed {
            self.mark_dirty(FeedbackGroup::LogicSource);
        }
        Some(changed)
    }

    // ── GPIO ─────────────────────────────────────────────────────────

    pub fn gp_output(&self, addr: &GpioAddress) -> Option<bool> {
        self.gp_outputs.borrow().get(addr).copied()
    }

    pub fn gp_input(&self, addr: &GpioAddress) -> Option<bool> {
        self.gp_inputs.borrow().get(addr).copied()
    }

    pub fn gp_outputs_snapshot(&self) -> Arc<GpioMap> {
        Arc::clone(&self.gp_outputs.borrow())
    }

    pub fn gp_inputs_snapshot(&self) -> Arc<GpioMap> {
        Arc::clone(&self.gp_inputs.borrow())
    }

    pub(crate) fn merge_gp_output(&self, addr: GpioAddress, state: bool) -> bool {
        let changed = merge_gpio(&self.gp_outputs, addr, state);
        if changed {
            self.mark_dirty(FeedbackGroup::GpOutput);
        }
        changed
    }

    pub(crate) fn merge_gp_input(&self, addr: GpioAddress, state: bool) -> bool {
        let changed = merge_gpio(&self.gp_inputs, addr, state);
        if changed {
            self.mark_dirty(FeedbackGroup::GpInput);
        }
        changed
    }

    // ── Ports ────────────────────────────────────────────────────────

    /// Port dropdowns. The list resolver checks source selectors against
    /// `inputs` and destination selectors against `outputs`.
    pub fn ports(&self) -> Arc<PortLists> {
        Arc::clone(&self.ports.borrow())
    }

    pub fn subscribe_ports(&self) -> watch::Receiver<Arc<PortLists>> {
        self.ports.subscribe()
    }

    // ── Feedback bookkeeping ─────────────────────────────────────────

    pub(crate) fn mark_dirty(&self, group: FeedbackGroup) {
        self.dirty.insert(group);
    }

    /// Drain the dirty set, in a stable order.
    pub fn take_dirty(&self) -> Vec<FeedbackGroup> {
        let mut groups: Vec<_> = self.dirty.iter().map(|g| *g).collect();
        for group in &groups {
            self.dirty.remove(group);
        }
        groups.sort_unstable();
        groups
    }

    // ── Metadata ─────────────────────────────────────────────────────

    pub fn last_full_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_full_refresh.borrow()
    }

    /// How long ago the last full refresh occurred, or `None` if never refreshed.
    pub fn data_age(&self) -> Option<chrono::Duration> {
        self.last_full_refresh().map(|t| Utc::now() - t)
    }

    /// Forget everything (used on reconfiguration).
    pub(crate) fn reset(&self) {
        self.crosspoints.send_replace(Arc::default());
        self.logic.send_replace(Arc::default());
        self.gp_outputs.send_replace(Arc::default());
        self.gp_inputs.send_replace(Arc::default());
        self.ports.send_replace(Arc::default());
        self.dirty.clear();
        self.last_full_refresh.send_replace(None);
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_gpio(table: &watch::Sender<Arc<GpioMap>>, addr: GpioAddress, state: bool) -> bool {
    table.send_if_modified(|map| {
        if map.get(&addr) == Some(&state) {
            return false;
        }
        Arc::make_mut(map).insert(addr, state);
        true
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::Address;

    fn xp(src_port: u32, dst_port: u32) -> Crosspoint {
        Crosspoint::new(Address::new(1, 1, src_port), Address::new(1, 2, dst_port))
    }

    #[test]
    fn partial_merge_does_not_clobber_unrelated_pairs() {
        let store = DataStore::new();
        let (a_b, a_c) = (xp(0, 1), xp(0, 2));

        assert!(store.merge_crosspoint(a_b, true));
        assert!(store.merge_crosspoint(a_c, false));

        assert_eq!(store.crosspoint(&a_b), Some(true));
        assert_eq!(store.crosspoint(&a_c), Some(false));
        assert_eq!(store.crosspoint(&xp(5, 5)), None);
        assert_eq!(store.active_crosspoint_count(), 1);
    }

    #[test]
    fn unchanged_merge_leaves_dirty_set_alone() {
        let store = DataStore::new();
        store.merge_crosspoint(xp(0, 0), true);
        assert_eq!(store.take_dirty(), vec![FeedbackGroup::Crosspoint]);

        assert!(!store.merge_crosspoint(xp(0, 0), true));
        assert!(store.take_dirty().is_empty());
    }

    #[test]
    fn snapshot_is_isolated_from_later_writes() {
        let store = DataStore::new();
        store.merge_crosspoint(xp(0, 0), true);
        let before = store.crosspoints_snapshot();
        store.merge_crosspoint(xp(0, 0), false);
        assert_eq!(before.get(&xp(0, 0)), Some(&true));
        assert_eq!(store.crosspoint(&xp(0, 0)), Some(false));
    }

    #[test]
    fn unknown_logic_source_is_not_created() {
        let store = DataStore::new();
        assert_eq!(store.set_logic_state(42, true), None);
        assert!(store.logic_snapshot().is_empty());
        assert!(store.take_dirty().is_empty());
    }

    #[test]
    fn gpio_tables_are_independent() {
        let store = DataStore::new();
        let line = GpioAddress::new(3, 0);
        store.merge_gp_output(line, true);
        store.merge_gp_input(line, false);
        assert_eq!(store.gp_output(&line), Some(true));
        assert_eq!(store.gp_input(&line), Some(false));
        assert_eq!(
            store.take_dirty(),
            vec![FeedbackGroup::GpOutput, FeedbackGroup::GpInput]
        );
    }

    #[test]
    fn reset_forgets_ports_and_crosspoints() {
        let store = DataStore::new();
        store.replace_ports(vec![Port {
            address: Address::new(1, 1, 0),
            label: "Mic".to_owned(),
            name: String::new(),
            input: true,
            output: false,
        }]);
        store.merge_crosspoint(xp(0, 0), true);
        store.reset();
        assert!(store.crosspoints_snapshot().is_empty());
        assert!(store.ports().is_empty());
        assert!(store.take_dirty().is_empty());
    }

    #[tokio::test]
    async fn subscribers_wake_only_on_change() {
        let store = DataStore::new();
        let mut rx = store.subscribe_crosspoints();
        let _ = rx.borrow_and_update();

        store.merge_crosspoint(xp(0, 0), true);
        assert!(rx.has_changed().unwrap_or(false));
        let _ = rx.borrow_and_update();

        store.merge_crosspoint(xp(0, 0), true);
        assert!(!rx.has_changed().unwrap_or(true));
    }
}
