//! Bounded Delivery Queues
//!
//! Every consumer of hub traffic (a WebSocket connection, a collaboration
//! participant) is fed through an [`OutboundQueue`]: a bounded channel with a
//! non-blocking `try_send` that drops the newest item when the consumer is
//! behind, and counts the drop.
//!
//! Once closed, a queue rejects every further send with [`Delivery::Closed`];
//! the receiver drains what was already buffered and then observes the end of
//! the stream.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};

/// An event handed to a consumer verbatim; shared between fan-out targets.
pub type OutboundEvent = Arc<serde_json::Value>;

/// Outcome of a single non-blocking delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The event was buffered for the consumer
    Delivered,
    /// The queue was full and the event was discarded
    Dropped,
    /// The queue has been closed; nothing was written
    Closed,
}

impl Delivery {
    pub fn is_delivered(self) -> bool {
        matches!(self, Delivery::Delivered)
    }
}

/// Tally of a fan-out over several queues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOut {
    pub delivered: usize,
    pub dropped: usize,
    pub closed: usize,
}

impl FanOut {
    pub fn record(&mut self, outcome: Delivery) {
        match outcome {
            Delivery::Delivered => self.delivered += 1,
            Delivery::Dropped => self.dropped += 1,
            Delivery::Closed => self.closed += 1,
        }
    }
}

/// Bounded, closable, drop-on-full queue.
#[derive(Debug)]
pub struct OutboundQueue<T> {
    sender: RwLock<Option<mpsc::Sender<T>>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl<T> OutboundQueue<T> {
    /// Create a queue holding at most `capacity` undelivered items.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<T>) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let queue = Self {
            sender: RwLock::new(Some(tx)),
            capacity,
            dropped: AtomicU64::new(0),
        };
        (queue, rx)
    }

    /// Attempt delivery without waiting.
    pub fn try_send(&self, item: T) -> Delivery {
        let guard = self.sender.read();
        let Some(tx) = guard.as_ref() else {
            return Delivery::Closed;
        };

        match tx.try_send(item) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Close the queue. Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        self.sender.write().take().is_some()
    }

    /// True once closed or once the receiving side has gone away.
    pub fn is_closed(&self) -> bool {
        self.sender
            .read()
            .as_ref()
            .map_or(true, |tx| tx.is_closed())
    }

    /// Number of items discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_full_queue_drops_newest() {
        let (queue, mut rx) = OutboundQueue::bounded(3);

        let outcomes: Vec<Delivery> = (0..5).map(|i| queue.try_send(i)).collect();

        assert_eq!(
            outcomes,
            vec![
                Delivery::Delivered,
                Delivery::Delivered,
                Delivery::Delivered,
                Delivery::Dropped,
                Delivery::Dropped,
            ]
        );
        assert_eq!(queue.dropped(), 2);

        let received: Vec<i32> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(received, vec![0, 1, 2]);
    }

    #[test]
    fn test_closed_queue_rejects_sends() {
        let (queue, mut rx) = OutboundQueue::bounded(4);
        assert_eq!(queue.try_send("before"), Delivery::Delivered);

        assert!(queue.close());
        assert!(!queue.close());
        assert!(queue.is_closed());
        assert_eq!(queue.try_send("after"), Delivery::Closed);
        assert_eq!(queue.dropped(), 0);

        assert_eq!(rx.try_recv().ok(), Some("before"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_receiver_sees_end_of_stream_after_close() {
        let (queue, mut rx) = OutboundQueue::bounded(2);
        queue.try_send(1u8);
        queue.close();

        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_dropped_receiver_reports_closed() {
        let (queue, rx) = OutboundQueue::bounded(2);
        drop(rx);
        assert_eq!(queue.try_send(()), Delivery::Closed);
        assert!(queue.is_closed());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let (queue, _rx) = OutboundQueue::<u8>::bounded(0);
        assert_eq!(queue.capacity(), 1);
    }
}
