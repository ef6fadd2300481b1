//! Event payload types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bridge::BridgeStatus;
use crate::types::NodeId;

/// One status event emitted during a run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum Event {
    Step(StepEvent),
    Bridge(BridgeEvent),
    Diagnostic(DiagnosticEvent),
}

impl Event {
    pub fn step(step: usize, node: NodeId, message: impl Into<String>) -> Self {
        Event::Step(StepEvent {
            step,
            node,
            message: message.into(),
        })
    }

    pub fn bridge(step: usize, status: BridgeStatus) -> Self {
        Event::Bridge(BridgeEvent { step, status })
    }

    pub fn diagnostic(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Diagnostic(DiagnosticEvent {
            scope: scope.into(),
            message: message.into(),
        })
    }

    /// The bridge status snapshot, when this is a bridge event.
    #[must_use]
    pub fn as_bridge(&self) -> Option<&BridgeEvent> {
        match self {
            Event::Bridge(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Step(e) => write!(f, "[step {}:{}] {}", e.step, e.node, e.message),
            Event::Bridge(e) => write!(f, "[bridge step {}] {:?}", e.step, e.status.phase),
            Event::Diagnostic(e) => write!(f, "[{}] {}", e.scope, e.message),
        }
    }
}

/// Progress note attached to one plan step.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepEvent {
    pub step: usize,
    pub node: NodeId,
    pub message: String,
}

/// Snapshot of a bridge step's live status. Emitted on every state-machine
/// transition; consumers keep only the latest per step.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BridgeEvent {
    pub step: usize,
    pub status: BridgeStatus,
}

/// Free-form engine diagnostics (run started / finished / aborted).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosticEvent {
    pub scope: String,
    pub message: String,
}
