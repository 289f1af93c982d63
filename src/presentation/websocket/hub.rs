//! Connection Registry
//!
//! Every live hub connection is owned by a single coordinating task. Register,
//! unregister and fan-out requests reach it through a bounded command channel,
//! so the live set is never touched from anywhere else and events from one
//! sender are delivered in the order they were submitted.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::connection::Connection;
use crate::domain::Identity;
use crate::infrastructure::metrics;
use crate::shared::delivery::{Delivery, FanOut, OutboundEvent};

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("hub coordinator has stopped")]
    Closed,
}

/// Point-in-time registry statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub connections: usize,
    pub identities: usize,
    pub dropped_deliveries: u64,
}

enum HubCommand {
    Register {
        connection: Arc<Connection>,
        reply: oneshot::Sender<Option<Uuid>>,
    },
    Unregister {
        connection_id: Uuid,
        identity: Identity,
        reply: oneshot::Sender<bool>,
    },
    Broadcast {
        event: OutboundEvent,
    },
    SendTo {
        identity: Identity,
        event: OutboundEvent,
    },
    Stats {
        reply: oneshot::Sender<HubStats>,
    },
}

/// Cloneable handle to the coordinating task.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    /// Start the coordinator. It stops once every handle has been dropped.
    pub fn spawn(command_buffer: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(command_buffer.max(1));
        let task = tokio::spawn(Hub::default().run(rx));
        (Self { tx }, task)
    }

    async fn submit(&self, command: HubCommand) -> Result<(), HubError> {
        self.tx.send(command).await.map_err(|_| HubError::Closed)
    }

    /// Add a connection. Returns the id of the connection it evicted, if the
    /// identity already had one.
    pub async fn register(&self, connection: Arc<Connection>) -> Result<Option<Uuid>, HubError> {
        let (reply, rx) = oneshot::channel();
        self.submit(HubCommand::Register { connection, reply }).await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Remove a connection and close its queue. Returns `true` when it was
    /// still its identity's current connection.
    pub async fn unregister(&self, connection: &Connection) -> Result<bool, HubError> {
        let (reply, rx) = oneshot::channel();
        self.submit(HubCommand::Unregister {
            connection_id: connection.id(),
            identity: connection.identity().clone(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Deliver to every live connection.
    pub async fn broadcast(&self, event: OutboundEvent) -> Result<(), HubError> {
        self.submit(HubCommand::Broadcast { event }).await
    }

    /// Deliver to the identity's current connection, if any.
    pub async fn send_to_identity(
        &self,
        identity: Identity,
        event: OutboundEvent,
    ) -> Result<(), HubError> {
        self.submit(HubCommand::SendTo { identity, event }).await
    }

    /// Registry statistics. Answered after every previously submitted command.
    pub async fn stats(&self) -> Result<HubStats, HubError> {
        let (reply, rx) = oneshot::channel();
        self.submit(HubCommand::Stats { reply }).await?;
        rx.await.map_err(|_| HubError::Closed)
    }
}

#[derive(Default)]
struct Hub {
    connections: HashMap<Uuid, Arc<Connection>>,
    by_identity: HashMap<Identity, Uuid>,
    dropped: u64,
}

impl Hub {
    async fn run(mut self, mut rx: mpsc::Receiver<HubCommand>) {
        while let Some(command) = rx.recv().await {
            match command {
                HubCommand::Register { connection, reply } => {
                    let _ = reply.send(self.register(connection));
                }
                HubCommand::Unregister {
                    connection_id,
                    identity,
                    reply,
                } => {
                    let _ = reply.send(self.unregister(connection_id, &identity));
                }
                HubCommand::Broadcast { event } => self.broadcast(event),
                HubCommand::SendTo { identity, event } => self.send_to(&identity, event),
                HubCommand::Stats { reply } => {
                    let _ = reply.send(self.stats());
                }
            }
        }

        for connection in self.connections.values() {
            connection.close();
        }
        tracing::debug!("Hub coordinator stopped");
    }

    fn register(&mut self, connection: Arc<Connection>) -> Option<Uuid> {
        let id = connection.id();
        let identity = connection.identity().clone();

        let evicted = self
            .by_identity
            .insert(identity.clone(), id)
            .filter(|previous| *previous != id);
        if let Some(previous) = evicted {
            if let Some(old) = self.connections.remove(&previous) {
                old.close();
            }
            tracing::info!(
                user_id = %identity,
                connection_id = %previous,
                "Evicted older connection for identity"
            );
        }

        self.connections.insert(id, connection);
        metrics::set_hub_connections(self.connections.len());
        tracing::debug!(
            user_id = %identity,
            connection_id = %id,
            total = self.connections.len(),
            "Connection registered"
        );

        evicted
    }

    fn unregister(&mut self, connection_id: Uuid, identity: &Identity) -> bool {
        if let Some(connection) = self.connections.remove(&connection_id) {
            connection.close();
        }

        let current = self.by_identity.get(identity) == Some(&connection_id);
        if current {
            self.by_identity.remove(identity);
        }

        metrics::set_hub_connections(self.connections.len());
        tracing::debug!(
            user_id = %identity,
            connection_id = %connection_id,
            current,
            total = self.connections.len(),
            "Connection unregistered"
        );

        current
    }

    fn broadcast(&mut self, event: OutboundEvent) {
        let mut tally = FanOut::default();
        for connection in self.connections.values() {
            tally.record(connection.send(event.clone()));
        }

        if tally.dropped > 0 {
            self.dropped += tally.dropped as u64;
            metrics::record_dropped("broadcast", tally.dropped);
            tracing::debug!(dropped = tally.dropped, "Broadcast dropped on full queues");
        }
    }

    fn send_to(&mut self, identity: &Identity, event: OutboundEvent) {
        let outcome = self
            .by_identity
            .get(identity)
            .and_then(|id| self.connections.get(id))
            .map(|connection| connection.send(event));
        let Some(outcome) = outcome else {
            tracing::debug!(user_id = %identity, "Direct delivery to unknown identity discarded");
            return;
        };

        match outcome {
            Delivery::Delivered => {}
            Delivery::Dropped => {
                self.dropped += 1;
                metrics::record_dropped("direct", 1);
                tracing::warn!(user_id = %identity, "Direct delivery dropped on full queue");
            }
            Delivery::Closed => {
                tracing::warn!(user_id = %identity, "Direct delivery to closed connection");
            }
        }
    }

    fn stats(&self) -> HubStats {
        HubStats {
            connections: self.connections.len(),
            identities: self.by_identity.len(),
            dropped_deliveries: self.dropped,
        }
    }
}
