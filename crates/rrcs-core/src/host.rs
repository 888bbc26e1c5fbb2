// ── Host collaborator ──
//
// Whatever embeds the controller (a control-surface runtime, the CLI's
// watch mode) receives plain data through this trait. The core never
// reads anything back from it.

use crate::controller::ConnectionState;
use crate::definitions::{ActionDefinition, FeedbackDefinition, VariableDefinition};
use crate::recorder::TranscriptEntry;
use crate::store::FeedbackGroup;

/// Sink for definitions, feedback invalidations, status and recordings.
///
/// Every method defaults to a no-op. Implementations must not block:
/// they are called from the controller's background tasks.
pub trait HostSink: Send + Sync + 'static {
    fn set_action_definitions(&self, _actions: Vec<ActionDefinition>) {}

    fn set_feedback_definitions(&self, _feedbacks: Vec<FeedbackDefinition>) {}

    fn set_variable_definitions(&self, _variables: Vec<VariableDefinition>) {}

    fn set_variable_values(&self, _values: Vec<(String, serde_json::Value)>) {}

    /// These feedback groups changed and should be re-evaluated.
    fn check_feedbacks(&self, _groups: &[FeedbackGroup]) {}

    fn set_connection_status(&self, _state: ConnectionState, _message: Option<&str>) {}

    /// A mutating call succeeded while recording was on.
    fn record_action(&self, _entry: &TranscriptEntry) {}
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl HostSink for NullHost {}
