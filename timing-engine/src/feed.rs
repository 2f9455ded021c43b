//! Feed queue
//!
//! Serializes several independent update streams into the single ordered
//! sequence the engine consumes. Each producer holds a [`FeedHandle`]; records
//! from one handle keep their order, records from different handles may
//! interleave. The queue ends when every handle has been dropped.

use crate::engine::Engine;
use crate::normalizer::RawUpdate;
use crate::publisher::Publisher;
use std::sync::mpsc::{self, Receiver, Sender};

/// Something a stream delivered
#[derive(Debug, Clone, PartialEq)]
pub enum FeedItem {
    Update(RawUpdate),
    /// The upstream connection behind the stream was lost
    Disconnected,
}

/// An item tagged with the stream it came from
#[derive(Debug, Clone, PartialEq)]
pub struct FeedMessage {
    pub stream: String,
    pub item: FeedItem,
}

/// Producer side of the queue for one stream
#[derive(Clone)]
pub struct FeedHandle {
    stream: String,
    sender: Sender<FeedMessage>,
}

impl FeedHandle {
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Enqueue a record; false if the queue has shut down
    pub fn send(&self, update: RawUpdate) -> bool {
        self.push(FeedItem::Update(update))
    }

    /// Signal that the stream lost its upstream connection
    pub fn disconnected(&self) -> bool {
        self.push(FeedItem::Disconnected)
    }

    fn push(&self, item: FeedItem) -> bool {
        self.sender
            .send(FeedMessage {
                stream: self.stream.clone(),
                item,
            })
            .is_ok()
    }
}

/// Totals from draining a queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub records: u64,
    pub rejected: u64,
    pub events: u64,
    pub disconnects: u64,
}

/// Consumer side of the queue
pub struct FeedQueue {
    sender: Sender<FeedMessage>,
    receiver: Receiver<FeedMessage>,
}

impl Default for FeedQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { sender, receiver }
    }

    /// Create a producer handle for a named stream
    pub fn handle(&self, stream: impl Into<String>) -> FeedHandle {
        FeedHandle {
            stream: stream.into(),
            sender: self.sender.clone(),
        }
    }

    /// Feed every queued item to the engine until all handles are dropped
    ///
    /// Invalid records are logged and skipped. A disconnect on any stream
    /// resets the engine.
    pub fn drain_into<P: Publisher>(self, engine: &mut Engine<P>) -> DrainSummary {
        let FeedQueue { sender, receiver } = self;
        drop(sender);

        let mut summary = DrainSummary::default();
        for message in receiver {
            match message.item {
                FeedItem::Update(update) => {
                    summary.records += 1;
                    match engine.process(update) {
                        Ok(events) => summary.events += events.len() as u64,
                        Err(e) => {
                            summary.rejected += 1;
                            log::warn!("Rejected record from {}: {}", message.stream, e);
                        }
                    }
                }
                FeedItem::Disconnected => {
                    log::info!("Stream {} disconnected", message.stream);
                    summary.disconnects += 1;
                    engine.on_disconnect();
                }
            }
        }

        log::debug!("Feed queue closed: {:?}", summary);
        summary
    }
}
