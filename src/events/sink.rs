//! Output targets for status events.

use std::io::{self, Result as IoResult};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use super::event::Event;

/// Abstraction over an output target that consumes full [`Event`] objects.
pub trait EventSink: Send + Sync {
    /// Handle a structured event. The sink decides how to format or route it.
    fn handle(&mut self, event: &Event) -> IoResult<()>;
}

/// Sink that forwards events into the `tracing` log stream.
#[derive(Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn handle(&mut self, event: &Event) -> IoResult<()> {
        tracing::info!(target: "ledgerflow::events", "{event}");
        Ok(())
    }
}

/// In-memory sink for tests and snapshots.
#[derive(Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<Event>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured events so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Event> {
        self.entries.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl EventSink for MemorySink {
    fn handle(&mut self, event: &Event) -> IoResult<()> {
        self.entries.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Channel-based sink for streaming to async consumers (the editor UI's
/// live bridge-status panel, an SSE endpoint, ...).
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelSink {
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn handle(&mut self, event: &Event) -> IoResult<()> {
        self.tx
            .send(event.clone())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "channel receiver dropped"))
    }
}
