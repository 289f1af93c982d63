//! Hub Connection
//!
//! One live duplex channel to one authenticated identity. The connection
//! owns the sending half of its outbound queue; the socket writer owns the
//! receiving half.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::Identity;
use crate::shared::delivery::{Delivery, OutboundEvent, OutboundQueue};

#[derive(Debug)]
pub struct Connection {
    id: Uuid,
    identity: Identity,
    queue: OutboundQueue<OutboundEvent>,
    connected_at: DateTime<Utc>,
    /// Unix millis of the last inbound frame
    last_activity: AtomicI64,
}

impl Connection {
    pub fn new(identity: Identity, capacity: usize) -> (Arc<Self>, mpsc::Receiver<OutboundEvent>) {
        let (queue, outbound) = OutboundQueue::bounded(capacity);
        let now = Utc::now();
        let connection = Arc::new(Self {
            id: Uuid::new_v4(),
            identity,
            queue,
            connected_at: now,
            last_activity: AtomicI64::new(now.timestamp_millis()),
        });
        (connection, outbound)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Non-blocking delivery; a full queue drops the event.
    pub fn send(&self, event: OutboundEvent) -> Delivery {
        self.queue.try_send(event)
    }

    /// Close the outbound queue. The writer sends a close frame once drained.
    pub fn close(&self) -> bool {
        self.queue.close()
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    /// Events discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.queue.dropped()
    }

    pub fn touch(&self) {
        self.last_activity
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn last_activity_millis(&self) -> i64 {
        self.last_activity.load(Ordering::Relaxed)
    }
}
