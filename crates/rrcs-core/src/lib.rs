//! Device-state mirror and control logic between `rrcs-api` and its
//! consumers (the CLI, or an embedding control-surface host).
//!
//! - **[`Controller`]**: owns the lifecycle of one logical RRCS server.
//!   [`connect()`](Controller::connect) builds the links, binds the
//!   notification listeners and spawns keepalive/failover, notification,
//!   feedback and definition tasks. [`Controller::oneshot()`] runs a
//!   single closure against a bare connection for CLI use.
//!
//! - **[`DataStore`]**: copy-on-write tables of ports, crosspoints,
//!   logic sources and GPIO lines, observable through `watch` channels. Full
//!   refreshes replace; notifications and successful sets merge.
//!
//! - **[`CommandQueue`]**: every RPC goes through one FIFO worker with a
//!   minimum spacing between calls.
//!
//! - **[`HostSink`]**: the only outbound seam. Action/feedback/variable
//!   definitions, dirty feedback groups, connection status and recorded
//!   actions are pushed to it.
//!
//! - **[`Action`]**: parses loosely typed host invocations (and recorded
//!   ones) into validated operations.

pub mod action;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod definitions;
pub mod error;
pub mod error_codes;
pub mod failover;
pub mod host;
pub mod link;
pub mod model;
pub mod notification;
mod ops;
pub mod protocol;
pub mod queue;
pub mod recorder;
pub mod resolve;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use action::{Action, ActionError};
pub use config::{ControllerConfig, DEFAULT_LOCAL_PORT, DEFAULT_RRCS_PORT, LinkConfig};
pub use controller::{ConnectionState, Controller};
pub use debounce::Debouncer;
pub use definitions::{
    ActionDefinition, FeedbackDefinition, OptionField, VariableDefinition, evaluate_feedback,
};
pub use error::CoreError;
pub use host::{HostSink, NullHost};
pub use link::{LinkId, LinkStatus};
pub use notification::DeviceEvent;
pub use protocol::XpMethod;
pub use queue::CommandQueue;
pub use recorder::{ActionInvocation, TranscriptEntry};
pub use resolve::{resolve, resolve_address, resolve_gpio_address, resolve_listed_address};
pub use store::{DataStore, FeedbackGroup, LogicTable, PortLists};

pub use model::{
    Address, Choice, Crosspoint, GpioAddress, KeyLabelError, KeyLabelMethod, KeyLabelOp, KeyRef,
    Label, LogicSource, Marker, Port, clamp_pool, parse_pool,
};
