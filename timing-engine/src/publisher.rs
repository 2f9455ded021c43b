//! Event publisher adapter
//!
//! The engine hands each derived event to a [`Publisher`] together with its
//! channel. The broker behind it is out of scope; [`ChannelPublisher`] is the
//! in-process implementation that queues events for another thread.

use crate::events::{DerivedEvent, EventKind};
use crate::types::{EngineError, Result};
use std::sync::mpsc::{self, Receiver, Sender};

/// Destination for derived events
///
/// Implementations must not block: the engine calls `publish` between
/// state updates. Failures are logged and dropped by the engine.
pub trait Publisher {
    fn publish(&mut self, channel: EventKind, event: &DerivedEvent) -> Result<()>;
}

/// Publishes onto an unbounded channel drained elsewhere
pub struct ChannelPublisher {
    sender: Sender<DerivedEvent>,
}

impl ChannelPublisher {
    /// Create a publisher and the receiving end of its channel
    pub fn new() -> (Self, Receiver<DerivedEvent>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }
}

impl Publisher for ChannelPublisher {
    fn publish(&mut self, channel: EventKind, event: &DerivedEvent) -> Result<()> {
        self.sender
            .send(event.clone())
            .map_err(|_| EngineError::PublishFailed(format!("{} channel closed", channel)))
    }
}

/// Collects events in memory
impl Publisher for Vec<DerivedEvent> {
    fn publish(&mut self, _channel: EventKind, event: &DerivedEvent) -> Result<()> {
        self.push(event.clone());
        Ok(())
    }
}
