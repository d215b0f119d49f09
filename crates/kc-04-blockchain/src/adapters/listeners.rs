//! Chain listener adapters.

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::domain::ChainEvent;
use crate::ports::outbound::ChainListener;

/// Forwards events into an unbounded tokio channel.
///
/// A closed receiver drops events silently.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    sender: mpsc::UnboundedSender<ChainEvent>,
}

impl ChannelListener {
    /// Listener plus the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ChainEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ChainListener for ChannelListener {
    fn on_event(&self, event: &ChainEvent) {
        let _ = self.sender.send(event.clone());
    }
}

/// Keeps every event it receives.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: RwLock<Vec<ChainEvent>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ChainEvent> {
        self.events.read().clone()
    }

    pub fn event_count(&self) -> usize {
        self.events.read().len()
    }

    /// Number of `HeadChanged` events seen.
    pub fn head_changes(&self) -> usize {
        self.events
            .read()
            .iter()
            .filter(|event| event.is_head_changed())
            .count()
    }

    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl ChainListener for RecordingListener {
    fn on_event(&self, event: &ChainEvent) {
        self.events.write().push(event.clone());
    }
}
