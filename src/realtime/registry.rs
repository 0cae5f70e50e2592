//! Connected viewer sessions.
//!
//! Each session owns a bounded outbound channel. Fan-out never waits on a
//! session: a full channel drops the event for that session and raises its
//! lag signal, a closed channel removes the session.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use metrics::{counter, gauge};
use tokio::sync::{Notify, mpsc};
use tracing::{debug, info};
use uuid::Uuid;

use super::events::ChangeEvent;

const METRIC_SESSIONS: &str = "agora_realtime_sessions";
const METRIC_LAGGED: &str = "agora_realtime_lagged_total";

#[derive(Default)]
struct LagSignal {
    lagged: AtomicBool,
    notify: Notify,
}

struct SessionHandle {
    sender: mpsc::Sender<ChangeEvent>,
    lag: Arc<LagSignal>,
}

/// Outcome of delivering one event to every registered session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanOutReport {
    pub delivered: usize,
    pub lagged: usize,
    pub closed: usize,
}

pub struct SessionRegistry {
    sessions: DashMap<Uuid, SessionHandle>,
    buffer: NonZeroUsize,
}

impl SessionRegistry {
    pub fn new(buffer: NonZeroUsize) -> Arc<Self> {
        Arc::new(Self {
            sessions: DashMap::new(),
            buffer,
        })
    }

    /// Add a session. It stays registered until the returned handle is dropped
    /// or its receiver is found closed during fan-out.
    pub fn register(self: &Arc<Self>) -> ViewerSession {
        let id = Uuid::new_v4();
        let (sender, receiver) = mpsc::channel(self.buffer.get());
        let lag = Arc::new(LagSignal::default());
        self.sessions.insert(
            id,
            SessionHandle {
                sender,
                lag: Arc::clone(&lag),
            },
        );
        self.record_size();
        info!(session_id = %id, sessions = self.sessions.len(), "Viewer session connected");

        ViewerSession {
            id,
            receiver,
            lag,
            registry: Arc::clone(self),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn fan_out(&self, event: &ChangeEvent) -> FanOutReport {
        let mut report = FanOutReport::default();
        let mut closed = Vec::new();

        for entry in self.sessions.iter() {
            match entry.sender.try_send(event.clone()) {
                Ok(()) => report.delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    report.lagged += 1;
                    entry.lag.lagged.store(true, Ordering::Release);
                    entry.lag.notify.notify_one();
                    debug!(
                        session_id = %entry.key(),
                        sequence = event.sequence,
                        "Viewer session lagging; event dropped"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*entry.key()),
            }
        }

        // Removal must wait until the iterator has released its shard locks.
        for id in &closed {
            self.sessions.remove(id);
        }
        report.closed = closed.len();

        if report.lagged > 0 {
            counter!(METRIC_LAGGED).increment(report.lagged as u64);
        }
        if report.closed > 0 {
            self.record_size();
            info!(
                closed = report.closed,
                sessions = self.sessions.len(),
                "Removed disconnected viewer sessions"
            );
        }

        report
    }

    fn deregister(&self, id: Uuid) {
        if self.sessions.remove(&id).is_some() {
            self.record_size();
            info!(session_id = %id, sessions = self.sessions.len(), "Viewer session disconnected");
        }
    }

    fn record_size(&self) {
        gauge!(METRIC_SESSIONS).set(self.sessions.len() as f64);
    }
}

/// What a session receives next.
#[derive(Debug)]
pub enum SessionMessage {
    Change(ChangeEvent),
    /// At least one event was dropped since the last message; resync.
    Lagged,
}

/// One connected viewer. Dropping it deregisters the session.
pub struct ViewerSession {
    id: Uuid,
    receiver: mpsc::Receiver<ChangeEvent>,
    lag: Arc<LagSignal>,
    registry: Arc<SessionRegistry>,
}

impl ViewerSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the next change or lag notice. `None` once the hub is gone.
    pub async fn next_message(&mut self) -> Option<SessionMessage> {
        loop {
            if self.take_lagged() {
                return Some(SessionMessage::Lagged);
            }
            tokio::select! {
                event = self.receiver.recv() => return event.map(SessionMessage::Change),
                () = self.lag.notify.notified() => {}
            }
        }
    }

    /// Stop accepting events. The registry drops the session at the next
    /// fan-out, or when this handle is dropped.
    pub fn close(&mut self) {
        self.receiver.close();
    }

    fn take_lagged(&self) -> bool {
        self.lag.lagged.swap(false, Ordering::AcqRel)
    }
}

impl Drop for ViewerSession {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::domain::entities::LocationRecord;
    use crate::realtime::events::Change;

    fn event(sequence: u64) -> ChangeEvent {
        ChangeEvent::stamp(
            Change::location_added(LocationRecord {
                id: Uuid::new_v4(),
                name: "Plaza".to_string(),
                address: None,
                created_at: datetime!(2025-01-20 10:00 UTC),
                updated_at: datetime!(2025-01-20 10:00 UTC),
            }),
            sequence,
        )
    }

    fn registry(buffer: usize) -> Arc<SessionRegistry> {
        SessionRegistry::new(NonZeroUsize::new(buffer).expect("non-zero"))
    }

    #[tokio::test]
    async fn dropping_a_session_deregisters_it() {
        let registry = registry(4);
        let first = registry.register();
        let _second = registry.register();
        assert_eq!(registry.len(), 2);

        drop(first);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn closed_session_is_removed_during_fan_out() {
        let registry = registry(4);
        let mut gone = registry.register();
        let mut live = registry.register();
        gone.close();

        let report = registry.fan_out(&event(1));

        assert_eq!(report.delivered, 1);
        assert_eq!(report.closed, 1);
        assert_eq!(registry.len(), 1);
        assert!(matches!(live.next_message().await, Some(SessionMessage::Change(_))));
    }

    #[tokio::test]
    async fn full_session_lags_without_blocking_others() {
        let registry = registry(1);
        let mut slow = registry.register();
        let mut fast = registry.register();

        assert_eq!(registry.fan_out(&event(1)).delivered, 2);
        match fast.next_message().await {
            Some(SessionMessage::Change(change)) => assert_eq!(change.sequence, 1),
            other => panic!("unexpected message: {other:?}"),
        }

        let report = registry.fan_out(&event(2));
        assert_eq!(
            report,
            FanOutReport {
                delivered: 1,
                lagged: 1,
                closed: 0
            }
        );

        assert!(matches!(slow.next_message().await, Some(SessionMessage::Lagged)));
        match slow.next_message().await {
            Some(SessionMessage::Change(change)) => assert_eq!(change.sequence, 1),
            other => panic!("unexpected message: {other:?}"),
        }
        match fast.next_message().await {
            Some(SessionMessage::Change(change)) => assert_eq!(change.sequence, 2),
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
