//! In-process change broadcast hub.
//!
//! `publish` stamps a change and posts it onto an unbounded queue without
//! awaiting. A single dispatcher task drains the queue in order and fans each
//! event out through the [`SessionRegistry`].

use std::sync::{Arc, Mutex};
use std::time::Instant;

use metrics::histogram;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::util::lock::mutex_lock;

use super::events::{Change, ChangeEvent};
use super::registry::SessionRegistry;

const SOURCE: &str = "realtime::notifier";
const METRIC_DISPATCH_MS: &str = "agora_realtime_dispatch_ms";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("change dispatcher has stopped")]
    DispatcherStopped,
}

/// Accepts committed changes for delivery to live viewers.
pub trait ChangePublisher: Send + Sync {
    /// Returns the sequence number assigned to the change.
    fn publish(&self, change: Change) -> Result<u64, PublishError>;
}

struct Sequencer {
    next: u64,
    queue: mpsc::UnboundedSender<ChangeEvent>,
}

pub struct ChangeNotifier {
    sequencer: Mutex<Sequencer>,
}

impl ChangeNotifier {
    pub fn new(registry: Arc<SessionRegistry>) -> (Self, Dispatcher) {
        let (queue, receiver) = mpsc::unbounded_channel();
        let notifier = Self {
            sequencer: Mutex::new(Sequencer { next: 1, queue }),
        };
        (notifier, Dispatcher { receiver, registry })
    }

    /// Build the notifier and run its dispatcher on the current runtime.
    pub fn spawn(registry: Arc<SessionRegistry>) -> (Arc<Self>, JoinHandle<()>) {
        let (notifier, dispatcher) = Self::new(registry);
        (Arc::new(notifier), tokio::spawn(dispatcher.run()))
    }
}

impl ChangePublisher for ChangeNotifier {
    fn publish(&self, change: Change) -> Result<u64, PublishError> {
        // Sequence assignment and enqueue happen under one lock so queue order
        // matches sequence order.
        let mut sequencer = mutex_lock(&self.sequencer, SOURCE, "publish");
        let sequence = sequencer.next;
        let event = ChangeEvent::stamp(change, sequence);
        sequencer
            .queue
            .send(event)
            .map_err(|_| PublishError::DispatcherStopped)?;
        sequencer.next += 1;
        Ok(sequence)
    }
}

pub struct Dispatcher {
    receiver: mpsc::UnboundedReceiver<ChangeEvent>,
    registry: Arc<SessionRegistry>,
}

impl Dispatcher {
    /// Drain the queue until every notifier handle has been dropped.
    pub async fn run(mut self) {
        info!("Change dispatcher started");
        while let Some(event) = self.receiver.recv().await {
            let started_at = Instant::now();
            let report = self.registry.fan_out(&event);
            histogram!(METRIC_DISPATCH_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
            debug!(
                sequence = event.sequence,
                kind = event.kind.as_str(),
                collection = event.collection.as_str(),
                delivered = report.delivered,
                lagged = report.lagged,
                closed = report.closed,
                "Dispatched change event"
            );
        }
        info!("Change dispatcher stopped");
    }
}
