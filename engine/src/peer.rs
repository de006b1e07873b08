//! Peer presence and sync progress.
//!
//! The engine does no discovery or replication of its own. An external
//! transport reports what it sees through the producer methods of
//! [`PeerDirectory`], which keeps the latest peer snapshots and turns each
//! report into a `peer-*` event.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::events::{Event, EventBus};
use crate::PeerId;

/// A device seen on the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Peer {
    pub id: PeerId,
    pub name: Option<String>,
    pub last_synced: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl Peer {
    /// A peer seen just now.
    pub fn seen_now(id: impl Into<PeerId>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
            last_synced: None,
            last_seen: Some(Utc::now()),
        }
    }
}

/// Fields of a [`Peer`] to overwrite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub last_synced: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

/// Counts of items one side holds and wants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncExchange {
    pub has: u64,
    pub wants: u64,
}

/// Exchange counts captured when a sync session started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCheckpoint {
    pub timestamp: DateTime<Utc>,
    pub db: SyncExchange,
    pub media: SyncExchange,
}

/// A timestamped failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub timestamp: DateTime<Utc>,
    pub error: String,
}

/// Progress of replication with one peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    /// Peer being synced with
    pub id: PeerId,
    pub db: SyncExchange,
    pub media: SyncExchange,
    pub at_sync_start: SyncCheckpoint,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub sync_error: Option<SyncFailure>,
    pub connection_error: Option<SyncFailure>,
}

/// Latest known peers, keyed by id.
#[derive(Debug, Default)]
pub struct PeerDirectory {
    peers: DashMap<PeerId, Peer>,
    events: EventBus,
}

impl PeerDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// The directory's event bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub async fn get(&self, id: &str) -> Option<Peer> {
        self.peers.get(id).map(|p| p.value().clone())
    }

    pub async fn get_many(&self) -> Vec<Peer> {
        self.peers.iter().map(|p| p.value().clone()).collect()
    }

    /// Record a peer connection, replacing any previous snapshot.
    pub async fn connected(&self, peer: Peer) {
        self.peers.insert(peer.id.clone(), peer.clone());
        tracing::info!(peer = %peer.id, "Peer connected");
        self.events.emit(Event::PeerConnect(peer));
    }

    /// Forget a peer. Unknown ids are ignored.
    pub async fn disconnected(&self, id: &str) {
        let Some((_, peer)) = self.peers.remove(id) else {
            tracing::debug!(peer = %id, "Disconnect for unknown peer ignored");
            return;
        };

        tracing::info!(peer = %id, "Peer disconnected");
        self.events.emit(Event::PeerDisconnect(peer));
    }

    /// Merge new details into a known peer. Unknown ids are ignored.
    pub async fn update_info(&self, id: &str, patch: PeerPatch) {
        let updated = {
            let Some(mut peer) = self.peers.get_mut(id) else {
                tracing::debug!(peer = %id, "Info for unknown peer ignored");
                return;
            };

            if let Some(name) = patch.name {
                peer.name = Some(name);
            }
            if let Some(last_synced) = patch.last_synced {
                peer.last_synced = Some(last_synced);
            }
            if let Some(last_seen) = patch.last_seen {
                peer.last_seen = Some(last_seen);
            }
            peer.value().clone()
        };

        self.events.emit(Event::PeerInfo(updated));
    }

    /// Publish replication progress for a known peer.
    pub async fn sync_progress(&self, state: SyncState) {
        if !self.peers.contains_key(&state.id) {
            tracing::debug!(peer = %state.id, "Sync progress for unknown peer ignored");
            return;
        }

        if let Some(completed) = state.last_completed_at {
            if let Some(mut peer) = self.peers.get_mut(&state.id) {
                peer.last_synced = Some(completed);
            }
        }

        self.events.emit(Event::PeerSync(state));
    }
}
