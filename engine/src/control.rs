//! The control plane facade.
//!
//! [`ControlPlane`] is the single handle a remote-call layer drives. It owns
//! one of each component and relays all of their buses into its own, so a
//! single [`Subscription`] observes every event in the system.

use crate::config::Config;
use crate::connectivity::Connectivity;
use crate::events::{EventBus, Subscription};
use crate::peer::PeerDirectory;
use crate::project::ProjectDirectory;
use crate::registry::ProjectRegistry;
use crate::store::RecordStore;

/// Composition of every control plane component behind one event stream.
#[derive(Debug)]
pub struct ControlPlane {
    config: Config,
    observation: RecordStore,
    connectivity: Connectivity,
    peers: PeerDirectory,
    project: ProjectDirectory,
    projects: ProjectRegistry,
    events: EventBus,
}

impl Default for ControlPlane {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl ControlPlane {
    /// Build the control plane.
    ///
    /// Components are created leaves first: the record store and the
    /// connectivity machine, then peers, the local project and finally the
    /// registry.
    pub fn new(config: Config) -> Self {
        let events = EventBus::new();

        let observation = RecordStore::new(config.observation_type.clone());

        let connectivity = Connectivity::new(config.debounce);
        connectivity.events().relay_to(&events);

        let peers = PeerDirectory::new();
        peers.events().relay_to(&events);

        let project = ProjectDirectory::new(config.local_project_name.clone());
        project.events().relay_to(&events);

        let projects = ProjectRegistry::new();
        projects.events().relay_to(&events);

        tracing::info!(
            project = %project.id(),
            debounce_ms = config.debounce.as_millis() as u64,
            "Control plane ready"
        );

        Self {
            config,
            observation,
            connectivity,
            peers,
            project,
            projects,
            events,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Versioned observation records.
    pub fn observation(&self) -> &RecordStore {
        &self.observation
    }

    /// Discovery and sync toggles.
    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// Peers reported by the transport.
    pub fn peers(&self) -> &PeerDirectory {
        &self.peers
    }

    /// The local project.
    pub fn project(&self) -> &ProjectDirectory {
        &self.project
    }

    /// Project administration.
    pub fn projects(&self) -> &ProjectRegistry {
        &self.projects
    }

    /// The unified event bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to every event of every component.
    pub fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }
}
