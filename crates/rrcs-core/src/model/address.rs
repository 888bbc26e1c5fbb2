// ── Matrix coordinates ──
//
// Ports are zero-based everywhere inside the crate; the dotted
// user-facing form (`Display`) is one-based.

use std::fmt;

use rrcs_api::Value;
use serde::{Deserialize, Serialize};

/// Highest addressable net.
pub const MAX_NET: u32 = 255;
/// Highest addressable node within a net.
pub const MAX_NODE: u32 = 255;
/// Highest zero-based port on a node.
pub const MAX_PORT: u32 = 1023;

// ── Address ─────────────────────────────────────────────────────────

/// An input or output endpoint on the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address {
    pub net: u32,
    pub node: u32,
    /// Zero-based.
    pub port: u32,
}

impl Address {
    pub const fn new(net: u32, node: u32, port: u32) -> Self {
        Self { net, node, port }
    }

    /// All three coordinates are within the device's range.
    pub fn is_valid(&self) -> bool {
        self.net <= MAX_NET && self.node <= MAX_NODE && self.port <= MAX_PORT
    }

    /// List-selector form, `net-node-port` with the zero-based port.
    pub fn selector(&self) -> String {
        format!("{}-{}-{}", self.net, self.node, self.port)
    }

    pub(crate) fn rpc_args(&self) -> [Value; 3] {
        [
            Value::from(self.net),
            Value::from(self.node),
            Value::from(self.port),
        ]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.net, self.node, u64::from(self.port) + 1)
    }
}

// ── GpioAddress ─────────────────────────────────────────────────────

/// A GPIO line, addressed separately from the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GpioAddress {
    pub node: u32,
    /// Zero-based.
    pub port: u32,
}

impl GpioAddress {
    pub const fn new(node: u32, port: u32) -> Self {
        Self { node, port }
    }

    pub fn is_valid(&self) -> bool {
        self.node <= MAX_NODE && self.port <= MAX_PORT
    }

    pub(crate) fn rpc_args(&self) -> [Value; 2] {
        [Value::from(self.node), Value::from(self.port)]
    }
}

impl fmt::Display for GpioAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, u64::from(self.port) + 1)
    }
}

// ── Crosspoint ──────────────────────────────────────────────────────

/// Directed source → destination pair. The store keys its sparse map on
/// this, i.e. on the full six-tuple of coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Crosspoint {
    pub src: Address,
    pub dst: Address,
}

impl Crosspoint {
    pub const fn new(src: Address, dst: Address) -> Self {
        Self { src, dst }
    }

    /// Parse the device's six-element coordinate list. Wrong arity or
    /// non-integer members yield `None`.
    pub(crate) fn from_rpc(items: &[Value]) -> Option<Self> {
        let [sn, sd, sp, dn, dd, dp] = items else {
            return None;
        };
        Some(Self {
            src: Address::new(sn.as_u32()?, sd.as_u32()?, sp.as_u32()?),
            dst: Address::new(dn.as_u32()?, dd.as_u32()?, dp.as_u32()?),
        })
    }

    pub(crate) fn rpc_args(&self) -> Vec<Value> {
        let mut args = Vec::with_capacity(7);
        args.extend(self.src.rpc_args());
        args.extend(self.dst.rpc_args());
        args
    }
}

impl fmt::Display for Crosspoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.src, self.dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_one_based() {
        assert_eq!(Address::new(2, 4, 8).to_string(), "2.4.9");
        assert_eq!(GpioAddress::new(3, 0).to_string(), "3.1");
        let xp = Crosspoint::new(Address::new(2, 4, 8), Address::new(1, 1, 0));
        assert_eq!(xp.to_string(), "2.4.9 -> 1.1.1");
    }

    #[test]
    fn selector_is_zero_based() {
        assert_eq!(Address::new(1, 2, 0).selector(), "1-2-0");
    }

    #[test]
    fn from_rpc_requires_six_integers() {
        let ints = |v: &[i64]| v.iter().copied().map(Value::Int).collect::<Vec<_>>();
        assert_eq!(
            Crosspoint::from_rpc(&ints(&[2, 4, 8, 1, 1, 0])),
            Some(Crosspoint::new(Address::new(2, 4, 8), Address::new(1, 1, 0)))
        );
        assert_eq!(Crosspoint::from_rpc(&ints(&[2, 4, 8, 1, 1])), None);
        assert_eq!(Crosspoint::from_rpc(&ints(&[2, 4, 8, 1, 1, 0, 0])), None);
        assert_eq!(Crosspoint::from_rpc(&ints(&[2, 4, -8, 1, 1, 0])), None);
    }

    #[test]
    fn rpc_args_order_is_src_then_dst() {
        let xp = Crosspoint::new(Address::new(2, 4, 8), Address::new(1, 1, 0));
        assert_eq!(
            xp.rpc_args(),
            [2, 4, 8, 1, 1, 0].map(Value::Int).to_vec()
        );
    }
}
