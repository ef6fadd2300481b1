//! Live status events: fan-out bus and pluggable sinks.
//!
//! The engine publishes run progress, per-step notes, and every
//! [`BridgeStatus`](crate::bridge::BridgeStatus) transition here. The UI
//! subscribes through a [`ChannelSink`] (or [`EventBus::subscribe`]); tests
//! capture with a [`MemorySink`].

mod bus;
mod event;
mod sink;

pub use bus::EventBus;
pub use event::{BridgeEvent, DiagnosticEvent, Event, StepEvent};
pub use sink::{ChannelSink, EventSink, MemorySink, TracingSink};
