//! # Outpost Engine
//!
//! The local control plane of an offline-first, multi-device collaborative
//! data application.
//!
//! This crate tracks versioned records, project membership, invitations and
//! discovery/sync connectivity, and exposes all of it through a single
//! event-emitting handle meant to sit behind a remote procedure boundary.
//!
//! ## Design Principles
//!
//! - **No IO**: no network, no disk; the transport is someone else's job
//! - **Append-only**: records are superseded, never rewritten
//! - **Snapshots out**: every read returns owned data, never a reference into state
//! - **One stream**: every component's events reach one subscriber
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`RecordStore`] keeps an append-only log of [`Record`] rows. Each row has
//! a [`VersionId`] of the form `"{id}@{seq}"`; updates and deletes append a
//! row with the next sequence number and link back to the version they
//! supersede. Deletes append a tombstone.
//!
//! ### Projects
//!
//! A [`ProjectDirectory`] holds one project's members and pending invites.
//! The [`ProjectRegistry`] owns many directories and is where invites get
//! accepted or declined.
//!
//! ### Connectivity
//!
//! [`Connectivity`] tracks which [`ConnectionType`]s discovery and sync run
//! on, and emits debounced start/stop events when a channel goes between
//! idle and active.
//!
//! ### Events
//!
//! Components emit [`Event`]s on their own [`EventBus`]; the [`ControlPlane`]
//! relays them all into its bus.
//!
//! ## Quick Start
//!
//! ```rust
//! use outpost_engine::{ControlPlane, Config, DocValue};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> outpost_engine::Result<()> {
//! let control = ControlPlane::new(Config::default());
//! let mut events = control.subscribe();
//!
//! // 1. Create and update a record
//! let value: DocValue = serde_json::from_value(json!({"lat": 0, "lon": 0})).unwrap();
//! let created = control.observation().create(value).await?;
//!
//! let patch: DocValue = serde_json::from_value(json!({"lat": 12})).unwrap();
//! let updated = control.observation().update(&created.version, patch).await?;
//! assert_eq!(updated.version.seq(), 2);
//! assert_eq!(updated.links, vec![created.version.clone()]);
//!
//! // 2. Invite someone into a new project
//! let project = control.projects().create("Survey").await;
//! let directory = control.projects().directory(&project.id).unwrap();
//! directory.invites().create("inv-1", outpost_engine::Role::Member).await;
//! assert_eq!(events.try_recv().unwrap().name(), "invite:received");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connectivity;
pub mod control;
pub mod error;
pub mod events;
pub mod peer;
pub mod project;
pub mod record;
pub mod registry;
pub mod store;

// Re-export main types at crate root
pub use config::{Config, ConfigError};
pub use connectivity::{ConnectionType, Connectivity, ConnectivityInfo};
pub use control::ControlPlane;
pub use error::{Error, ErrorKind, Result};
pub use events::{Event, EventBus, Subscription, SubscriptionId};
pub use peer::{Peer, PeerDirectory, PeerPatch, SyncCheckpoint, SyncExchange, SyncFailure, SyncState};
pub use project::{
    Invite, Invites, MemberInfo, MemberPatch, Members, Project, ProjectDirectory, ProjectMember,
    Role,
};
pub use record::{DocValue, Record, VersionId, VersionSelector};
pub use registry::{ProjectRegistry, RegistryInvites};
pub use store::RecordStore;

/// Type aliases for clarity
pub type DocId = String;
pub type ProjectId = String;
pub type MemberId = String;
pub type InviteId = String;
pub type PeerId = String;
