//! Fan-out bus: receives events from the engine and broadcasts to sinks.

use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio::task;

use super::event::Event;
use super::sink::{ChannelSink, EventSink, TracingSink};

/// Receives events on a channel and broadcasts each to every sink.
///
/// Producers hold a [`flume::Sender<Event>`] obtained from
/// [`get_sender`](Self::get_sender); the background listener started by
/// [`listen_for_events`](Self::listen_for_events) drains the channel.
pub struct EventBus {
    sinks: Arc<Mutex<Vec<Box<dyn EventSink>>>>,
    event_channel: (flume::Sender<Event>, flume::Receiver<Event>),
    listener: Arc<Mutex<Option<ListenerState>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_sink(TracingSink)
    }
}

impl EventBus {
    /// Create an event bus with a single sink.
    pub fn with_sink<T>(sink: T) -> Self
    where
        T: EventSink + 'static,
    {
        Self::with_sinks(vec![Box::new(sink)])
    }

    /// Create an event bus with multiple sinks.
    pub fn with_sinks(sinks: Vec<Box<dyn EventSink>>) -> Self {
        Self {
            sinks: Arc::new(Mutex::new(sinks)),
            event_channel: flume::unbounded(),
            listener: Arc::new(Mutex::new(None)),
        }
    }

    /// Dynamically add a sink (useful for per-run streaming).
    pub fn add_sink<T: EventSink + 'static>(&self, sink: T) {
        self.sinks.lock().unwrap().push(Box::new(sink));
    }

    /// Subscribe with a fresh channel; events arriving after this call are
    /// forwarded to the returned receiver.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.add_sink(ChannelSink::new(tx));
        rx
    }

    /// Clone of the sender side so producers can emit events.
    #[must_use]
    pub fn get_sender(&self) -> flume::Sender<Event> {
        self.event_channel.0.clone()
    }

    /// Number of attached sinks. Sinks whose consumer disconnected are
    /// pruned by the listener as events flow, so this can shrink.
    #[must_use]
    pub fn sink_count(&self) -> usize {
        self.sinks.lock().unwrap().len()
    }

    /// Spawn the background task that broadcasts events to all sinks.
    /// Idempotent: calling it again has no effect.
    pub fn listen_for_events(&self) {
        let mut guard = self.listener.lock().expect("listener poisoned");
        if guard.is_some() {
            return;
        }

        let receiver = self.event_channel.1.clone();
        let sinks = self.sinks.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let handle = task::spawn(async move {
            let broadcast = |event: Event| {
                let mut sinks = sinks.lock().unwrap();
                sinks.retain_mut(|sink| match sink.handle(&event) {
                    Ok(()) => true,
                    // A disconnected subscriber never reconnects; drop its
                    // sink instead of failing on every later event.
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                        tracing::debug!("event sink disconnected, removing it");
                        false
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "event sink failed");
                        true
                    }
                });
            };
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        // Drain what producers already sent before stopping.
                        while let Ok(event) = receiver.try_recv() {
                            broadcast(event);
                        }
                        break;
                    }
                    recv = receiver.recv_async() => match recv {
                        Err(_) => break,
                        Ok(event) => broadcast(event),
                    }
                }
            }
        });

        *guard = Some(ListenerState {
            shutdown_tx,
            handle,
        });
    }

    /// Stop the background listener after draining in-flight events.
    pub async fn stop_listener(&self) {
        let state = {
            let mut guard = self.listener.lock().expect("listener poisoned");
            guard.take()
        };
        if let Some(state) = state {
            let _ = state.shutdown_tx.send(());
            let _ = state.handle.await;
        }
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.listener.lock() {
            if let Some(state) = guard.take() {
                let _ = state.shutdown_tx.send(());
                state.handle.abort();
            }
        }
    }
}

struct ListenerState {
    shutdown_tx: oneshot::Sender<()>,
    handle: task::JoinHandle<()>,
}
