// ── Full refresh application ──
//
// A full enumeration is authoritative: the table is cleared and rebuilt,
// never merged. The feedback group is marked dirty even when the result
// is empty, so consumers re-render to the empty state.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;

use super::{DataStore, FeedbackGroup, LogicTable, PortLists};
use crate::model::{Choice, Crosspoint, LogicSource, Port};

impl DataStore {
    /// Replace the port table and rebuild both direction dropdowns.
    /// Returns `true` if the lists changed.
    pub(crate) fn replace_ports(&self, ports: Vec<Port>) -> bool {
        let lists = PortLists::from_ports(ports);
        self.ports.send_if_modified(|current| {
            if **current == lists {
                return false;
            }
            *current = Arc::new(lists);
            true
        })
    }

    /// Replace the crosspoint table with the reported active set.
    pub(crate) fn replace_crosspoints(&self, active: impl IntoIterator<Item = Crosspoint>) {
        let map: HashMap<Crosspoint, bool> = active.into_iter().map(|xp| (xp, true)).collect();
        self.crosspoints.send_replace(Arc::new(map));
        self.mark_dirty(FeedbackGroup::Crosspoint);
        self.last_full_refresh.send_replace(Some(Utc::now()));
    }

    /// Replace the logic-source table and rebuild its dropdown.
    pub(crate) fn replace_logic_sources(&self, sources: impl IntoIterator<Item = LogicSource>) {
        let sources: BTreeMap<u32, LogicSource> = sources
            .into_iter()
            .map(|source| (source.object_id, source))
            .collect();

        let mut choices: Vec<Choice<u32>> = sources
            .values()
            .map(|source| Choice::new(source.object_id, source.name.clone()))
            .collect();
        choices.sort_by(|a, b| a.label.cmp(&b.label));

        self.logic
            .send_replace(Arc::new(LogicTable { sources, choices }));
        self.mark_dirty(FeedbackGroup::LogicSource);
        self.last_full_refresh.send_replace(Some(Utc::now()));
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::Address;

    fn source(object_id: u32, name: &str, state: bool) -> LogicSource {
        LogicSource {
            object_id,
            name: name.to_owned(),
            alias: name.to_lowercase(),
            state,
        }
    }

    fn port(node: u32, port: u32, label: &str, input: bool, output: bool) -> Port {
        Port {
            address: Address::new(1, node, port),
            label: label.to_owned(),
            name: String::new(),
            input,
            output,
        }
    }

    #[test]
    fn port_refresh_splits_directions_sorted_by_label() {
        let store = DataStore::new();
        assert!(store.replace_ports(vec![
            port(1, 0, "Mic B", true, false),
            port(1, 1, "Mic A", true, false),
            port(2, 0, "Speaker", false, true),
            port(3, 4, "Panel", true, true),
        ]));

        let lists = store.ports();
        let ids = |choices: &[Choice]| choices.iter().map(|c| c.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&lists.inputs), vec!["1-1-1", "1-1-0", "1-3-4"]);
        assert_eq!(ids(&lists.outputs), vec!["1-3-4", "1-2-0"]);
        assert_eq!(lists.first_input(), "1-1-1");
        assert_eq!(lists.first_output(), "1-3-4");
        assert_eq!(lists.inputs[0].label, "Mic A (1.1.2)");
        assert!(store.take_dirty().is_empty());
    }

    #[test]
    fn identical_port_refresh_reports_no_change() {
        let store = DataStore::new();
        assert!(store.replace_ports(vec![port(1, 0, "Mic", true, false)]));
        assert!(!store.replace_ports(vec![port(1, 0, "Mic", true, false)]));
        assert!(store.replace_ports(Vec::new()));
        assert_eq!(store.ports().first_input(), "");
    }

    #[test]
    fn empty_refresh_clears_table_and_marks_dirty() {
        let store = DataStore::new();
        let xp = Crosspoint::new(Address::new(2, 4, 8), Address::new(1, 1, 0));
        store.merge_crosspoint(xp, true);
        store.take_dirty();

        store.replace_crosspoints(Vec::new());

        assert!(store.crosspoints_snapshot().is_empty());
        assert_eq!(store.take_dirty(), vec![FeedbackGroup::Crosspoint]);
        assert!(store.last_full_refresh().is_some());
    }

    #[test]
    fn refresh_drops_pairs_not_reported() {
        let store = DataStore::new();
        let kept = Crosspoint::new(Address::new(1, 1, 0), Address::new(1, 2, 0));
        let dropped = Crosspoint::new(Address::new(1, 1, 1), Address::new(1, 2, 1));
        store.merge_crosspoint(dropped, true);

        store.replace_crosspoints([kept]);

        assert_eq!(store.crosspoint(&kept), Some(true));
        assert_eq!(store.crosspoint(&dropped), None);
    }

    #[test]
    fn logic_refresh_builds_sorted_choices() {
        let store = DataStore::new();
        store.replace_logic_sources([source(9, "B", false), source(5, "A", true)]);

        let table = store.logic_snapshot();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(5).map(|s| s.state), Some(true));
        assert_eq!(table.get(9).map(|s| s.state), Some(false));
        assert_eq!(
            table.choices,
            vec![Choice::new(5, "A"), Choice::new(9, "B")]
        );
        assert_eq!(store.take_dirty(), vec![FeedbackGroup::LogicSource]);
    }

    #[test]
    fn logic_refresh_replaces_wholesale() {
        let store = DataStore::new();
        store.replace_logic_sources([source(1, "Old", true)]);
        store.replace_logic_sources([source(2, "New", false)]);
        assert!(store.logic_source(1).is_none());
        assert_eq!(store.logic_choices(), vec![Choice::new(2, "New")]);
    }

    #[test]
    fn in_place_update_keeps_table() {
        let store = DataStore::new();
        store.replace_logic_sources([source(5, "A", true), source(9, "B", false)]);
        store.take_dirty();

        assert_eq!(store.set_logic_state(9, true), Some(true));
        assert_eq!(store.logic_source(9).map(|s| s.state), Some(true));
        assert_eq!(store.logic_snapshot().len(), 2);
        assert_eq!(store.take_dirty(), vec![FeedbackGroup::LogicSource]);
    }
}
