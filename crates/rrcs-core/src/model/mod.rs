// ── Domain model ──
//
// Plain data: matrix coordinates, ports, logic sources, panel keys, and
// the dropdown choices derived from them.

pub mod address;
pub mod key;
pub mod logic;
pub mod port;

pub use address::{Address, Crosspoint, GpioAddress, MAX_NET, MAX_NODE, MAX_PORT};
pub use key::{
    KeyLabelError, KeyLabelMethod, KeyLabelOp, KeyRef, Label, Marker, clamp_pool, parse_pool,
};
pub use logic::{Choice, LogicSource};
pub use port::{DEFAULT_NET, Port};
