//! Domain events and the bus that carries them.
//!
//! Every component owns an [`EventBus`]. Parents register a relay on their
//! children's buses at construction time, so a single subscriber on the
//! [`ControlPlane`](crate::ControlPlane) bus observes the whole system.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::peer::{Peer, SyncState};
use crate::project::Invite;
use crate::{InviteId, ProjectId};

/// Identifier of a registered sink.
pub type SubscriptionId = Uuid;

/// An event emitted by one of the control plane components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "discovery:start")]
    DiscoveryStart,

    #[serde(rename = "discovery:stop")]
    DiscoveryStop,

    #[serde(rename = "sync:start")]
    SyncStart,

    #[serde(rename = "sync:stop")]
    SyncStop,

    /// Raised by a project directory when a new invite is pending.
    ///
    /// Never leaves the directory's own bus: relays publish it as
    /// [`Event::InviteReceived`].
    #[serde(skip)]
    InviteCreated {
        project_id: ProjectId,
        invite: Invite,
    },

    #[serde(rename = "invite:received", rename_all = "camelCase")]
    InviteReceived {
        project_id: ProjectId,
        invite: Invite,
    },

    #[serde(rename = "invite:accepted", rename_all = "camelCase")]
    InviteAccepted {
        project_id: ProjectId,
        invite_id: InviteId,
        params: serde_json::Value,
    },

    #[serde(rename = "invite:declined", rename_all = "camelCase")]
    InviteDeclined {
        project_id: ProjectId,
        invite_id: InviteId,
        params: serde_json::Value,
    },

    #[serde(rename = "peer-connect")]
    PeerConnect(Peer),

    #[serde(rename = "peer-disconnect")]
    PeerDisconnect(Peer),

    #[serde(rename = "peer-info")]
    PeerInfo(Peer),

    #[serde(rename = "peer-sync")]
    PeerSync(SyncState),
}

impl Event {
    /// The public event name, as seen by remote listeners.
    pub fn name(&self) -> &'static str {
        match self {
            Event::DiscoveryStart => "discovery:start",
            Event::DiscoveryStop => "discovery:stop",
            Event::SyncStart => "sync:start",
            Event::SyncStop => "sync:stop",
            Event::InviteCreated { .. } => "invite:created",
            Event::InviteReceived { .. } => "invite:received",
            Event::InviteAccepted { .. } => "invite:accepted",
            Event::InviteDeclined { .. } => "invite:declined",
            Event::PeerConnect(_) => "peer-connect",
            Event::PeerDisconnect(_) => "peer-disconnect",
            Event::PeerInfo(_) => "peer-info",
            Event::PeerSync(_) => "peer-sync",
        }
    }

    /// Translate internal signals into their public form.
    pub fn published(self) -> Self {
        match self {
            Event::InviteCreated { project_id, invite } => {
                Event::InviteReceived { project_id, invite }
            }
            other => other,
        }
    }
}

#[derive(Debug, Clone)]
enum Sink {
    Channel(mpsc::UnboundedSender<Event>),
    Relay(EventBus),
}

/// A cloneable fan-out point for [`Event`]s.
///
/// Delivery is synchronous: when `emit` returns, every channel sink has the
/// event queued and every relayed bus has emitted it in turn.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    sinks: Arc<DashMap<SubscriptionId, Sink>>,
}

impl EventBus {
    /// Create a bus with no sinks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel subscriber.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.sinks.insert(id, Sink::Channel(tx));

        tracing::debug!(subscription = %id, "Event subscriber registered");

        Subscription { id, receiver: rx }
    }

    /// Re-emit every event of this bus on `parent`, published form.
    pub fn relay_to(&self, parent: &EventBus) -> SubscriptionId {
        let id = Uuid::new_v4();
        self.sinks.insert(id, Sink::Relay(parent.clone()));
        id
    }

    /// Remove a sink. Returns whether it was registered.
    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        self.sinks.remove(id).is_some()
    }

    /// Deliver an event to every sink.
    ///
    /// Returns the number of sinks that accepted it. Channel sinks whose
    /// receiver has been dropped are pruned.
    pub fn emit(&self, event: Event) -> usize {
        // Snapshot first so no shard lock is held while relaying.
        let sinks: Vec<(SubscriptionId, Sink)> = self
            .sinks
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut delivered = 0;
        let mut closed = Vec::new();

        for (id, sink) in sinks {
            match sink {
                Sink::Channel(tx) => {
                    if tx.send(event.clone()).is_ok() {
                        delivered += 1;
                    } else {
                        closed.push(id);
                    }
                }
                Sink::Relay(parent) => {
                    parent.emit(event.clone().published());
                    delivered += 1;
                }
            }
        }

        for id in closed {
            self.sinks.remove(&id);
        }

        tracing::trace!(event = event.name(), delivered, "Event emitted");

        delivered
    }

    /// Number of registered sinks.
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

/// Receiving end of a channel subscription.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    receiver: mpsc::UnboundedReceiver<Event>,
}

impl Subscription {
    /// Identifier to pass to [`EventBus::unsubscribe`].
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Wait for the next event. `None` once the bus has dropped this sink.
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Take the next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }

    /// Drain every queued event.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}
