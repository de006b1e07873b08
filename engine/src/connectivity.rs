//! Discovery and sync connectivity state.
//!
//! Each channel (discovery, sync) holds the set of connection types it is
//! active on. Only the idle/active edge matters for events: going from empty
//! to non-empty schedules a `*:start`, the reverse schedules a `*:stop`, and
//! swapping one non-empty set for another is silent.
//!
//! Events are debounced by a fixed delay to model transport startup latency.
//! Scheduled events are never cancelled, so a listener may see a stale
//! start or stop after a later change has already reverted it.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::events::{Event, EventBus};

/// A medium over which discovery or sync can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Lan,
    Internet,
}

/// Snapshot of both channels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityInfo {
    pub discovery: Vec<ConnectionType>,
    pub sync: Vec<ConnectionType>,
}

/// The two independently toggled channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Discovery,
    Sync,
}

impl Channel {
    fn start_event(self) -> Event {
        match self {
            Channel::Discovery => Event::DiscoveryStart,
            Channel::Sync => Event::SyncStart,
        }
    }

    fn stop_event(self) -> Event {
        match self {
            Channel::Discovery => Event::DiscoveryStop,
            Channel::Sync => Event::SyncStop,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Channel::Discovery => "discovery",
            Channel::Sync => "sync",
        }
    }
}

/// Edge crossed by a channel when its set is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start,
    Stop,
}

/// Which edge, if any, replacing a set crosses.
pub fn transition(was_empty: bool, is_empty: bool) -> Option<Transition> {
    match (was_empty, is_empty) {
        (true, false) => Some(Transition::Start),
        (false, true) => Some(Transition::Stop),
        _ => None,
    }
}

/// Debounced discovery/sync state machine.
#[derive(Debug)]
pub struct Connectivity {
    discovery: Mutex<BTreeSet<ConnectionType>>,
    sync: Mutex<BTreeSet<ConnectionType>>,
    debounce: Duration,
    events: EventBus,
}

impl Connectivity {
    /// Create a machine with both channels idle.
    pub fn new(debounce: Duration) -> Self {
        Self {
            discovery: Mutex::new(BTreeSet::new()),
            sync: Mutex::new(BTreeSet::new()),
            debounce,
            events: EventBus::new(),
        }
    }

    /// The machine's event bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Current state of both channels, ignoring pending events.
    pub async fn info(&self) -> ConnectivityInfo {
        ConnectivityInfo {
            discovery: self.discovery.lock().await.iter().copied().collect(),
            sync: self.sync.lock().await.iter().copied().collect(),
        }
    }

    /// Replace the discovery set. `None` is the same as an empty set.
    pub async fn set_discovery(&self, types: Option<Vec<ConnectionType>>) {
        self.set(Channel::Discovery, types).await;
    }

    /// Replace the sync set. `None` is the same as an empty set.
    pub async fn set_sync(&self, types: Option<Vec<ConnectionType>>) {
        self.set(Channel::Sync, types).await;
    }

    async fn set(&self, channel: Channel, types: Option<Vec<ConnectionType>>) {
        let types = types.unwrap_or_default();

        let mut set = match channel {
            Channel::Discovery => self.discovery.lock().await,
            Channel::Sync => self.sync.lock().await,
        };

        let was_empty = set.is_empty();
        set.clear();
        set.extend(types);

        match transition(was_empty, set.is_empty()) {
            Some(Transition::Start) => {
                tracing::info!(channel = channel.as_str(), types = ?*set, "Channel starting");
                self.schedule(channel.start_event());
            }
            Some(Transition::Stop) => {
                tracing::info!(channel = channel.as_str(), "Channel stopping");
                self.schedule(channel.stop_event());
            }
            None => {
                tracing::debug!(channel = channel.as_str(), types = ?*set, "Channel set replaced");
            }
        }
    }

    fn schedule(&self, event: Event) {
        let events = self.events.clone();
        let delay = self.debounce;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            events.emit(event);
        });
    }
}
