// ── Failover decision ──
//
// Pure function of the link health observed in one keepalive cycle.
// The controller probes, calls `decide`, then carries out the result.

use crate::controller::ConnectionState;
use crate::link::LinkId;

/// Health of one link across a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkHealth {
    pub id: LinkId,
    /// Health before this probe.
    pub was_healthy: bool,
    /// Health according to this probe.
    pub healthy: bool,
    pub registered: bool,
}

/// Everything `decide` looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub active: LinkId,
    pub redundant: bool,
    /// Configured links only.
    pub links: Vec<LinkHealth>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub active: LinkId,
    pub switched: bool,
    /// Run a full resync (crosspoints + logic sources) after applying.
    pub resync: bool,
    /// Links to send the notification registration to.
    pub register: Vec<LinkId>,
    /// One of `Ok`, `Degraded`, `ConnectionFailure`.
    pub state: ConnectionState,
}

pub fn decide(snapshot: &Snapshot) -> Decision {
    let link = |id: LinkId| snapshot.links.iter().find(|l| l.id == id);
    let healthy = |id: LinkId| link(id).is_some_and(|l| l.healthy);

    let register = snapshot
        .links
        .iter()
        .filter(|l| l.healthy && !l.registered)
        .map(|l| l.id)
        .collect();

    let mut active = snapshot.active;
    if !healthy(active) && snapshot.redundant && healthy(active.other()) {
        active = active.other();
    }
    let switched = active != snapshot.active;
    let recovered = link(active).is_some_and(|l| l.healthy && !l.was_healthy);

    let state = if !healthy(active) {
        ConnectionState::ConnectionFailure
    } else if snapshot.links.iter().any(|l| !l.healthy) {
        ConnectionState::Degraded
    } else {
        ConnectionState::Ok
    };

    Decision {
        active,
        switched,
        resync: switched || recovered,
        register,
        state,
    }
}
