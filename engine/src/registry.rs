//! Registry of projects.
//!
//! The registry owns every [`ProjectDirectory`] it creates and relays their
//! events onto its own bus, publishing each directory's internal
//! invite-created signal as `invite:received`. Invites are resolved through
//! the registry because it is the surface the invited party acts on.

use std::sync::Arc;

use dashmap::DashMap;

use crate::events::{Event, EventBus, SubscriptionId};
use crate::project::{Invite, Project, ProjectDirectory};
use crate::{error::Result, Error, ProjectId};

#[derive(Debug)]
struct Registered {
    directory: Arc<ProjectDirectory>,
    /// Relay from the directory bus into the registry bus
    relay: SubscriptionId,
}

type ProjectMap = Arc<DashMap<ProjectId, Registered>>;

fn lookup(projects: &ProjectMap, id: &str) -> Option<Arc<ProjectDirectory>> {
    projects.get(id).map(|entry| entry.directory.clone())
}

/// Invite resolution on behalf of the invited party.
#[derive(Debug)]
pub struct RegistryInvites {
    projects: ProjectMap,
}

impl RegistryInvites {
    /// Accept a pending invite of a project.
    ///
    /// A no-op if the project has been deleted or the invite is not pending.
    pub async fn accept(&self, project_id: &str, invite_id: &str, params: serde_json::Value) {
        match lookup(&self.projects, project_id) {
            Some(directory) => directory.invites().accept(invite_id, params),
            None => tracing::debug!(project = %project_id, "Accept for unknown project ignored"),
        }
    }

    /// Decline a pending invite of a project.
    ///
    /// A no-op if the project has been deleted or the invite is not pending.
    pub async fn decline(&self, project_id: &str, invite_id: &str, params: serde_json::Value) {
        match lookup(&self.projects, project_id) {
            Some(directory) => directory.invites().decline(invite_id, params),
            None => tracing::debug!(project = %project_id, "Decline for unknown project ignored"),
        }
    }
}

/// Owner of all project directories.
#[derive(Debug)]
pub struct ProjectRegistry {
    projects: ProjectMap,
    invites: RegistryInvites,
    events: EventBus,
}

impl Default for ProjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectRegistry {
    pub fn new() -> Self {
        let projects: ProjectMap = Arc::new(DashMap::new());

        Self {
            invites: RegistryInvites {
                projects: projects.clone(),
            },
            projects,
            events: EventBus::new(),
        }
    }

    /// The registry bus, aggregating every owned project's events.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn invites(&self) -> &RegistryInvites {
        &self.invites
    }

    /// Create and register a new project.
    pub async fn create(&self, name: impl Into<String>) -> Project {
        let directory = Arc::new(ProjectDirectory::new(name));
        let relay = directory.events().relay_to(&self.events);
        let info = directory.info().await;

        self.projects
            .insert(info.id.clone(), Registered { directory, relay });

        tracing::info!(project = %info.id, name = %info.name, "Project created");

        info
    }

    pub async fn get(&self, id: &str) -> Option<Project> {
        let directory = lookup(&self.projects, id)?;
        Some(directory.info().await)
    }

    /// Snapshots of every project, ordered by id.
    pub async fn get_many(&self) -> Vec<Project> {
        let directories: Vec<_> = self
            .projects
            .iter()
            .map(|entry| entry.directory.clone())
            .collect();

        let mut projects = Vec::with_capacity(directories.len());
        for directory in directories {
            projects.push(directory.info().await);
        }
        projects.sort_by(|a, b| a.id.cmp(&b.id));
        projects
    }

    /// The directory of a registered project, for member and invite access.
    pub fn directory(&self, id: &str) -> Option<Arc<ProjectDirectory>> {
        lookup(&self.projects, id)
    }

    /// Report an invite sent to this device by a remote inviter.
    ///
    /// Producer hook for the transport. The project need not be registered
    /// here: the invite is for a project this device has not joined yet.
    pub async fn invite_received(&self, project_id: impl Into<ProjectId>, invite: Invite) {
        let project_id = project_id.into();
        tracing::info!(project = %project_id, invite = %invite.id, "Invite received");
        self.events
            .emit(Event::InviteReceived { project_id, invite });
    }

    /// Rename a project.
    pub async fn update(&self, id: &str, name: impl Into<String>) -> Result<Project> {
        let directory =
            lookup(&self.projects, id).ok_or_else(|| Error::ProjectNotFound(id.to_string()))?;

        let info = directory.rename(name).await;
        tracing::info!(project = %id, name = %info.name, "Project renamed");

        Ok(info)
    }

    /// Remove a project along with its members and invites.
    ///
    /// Returns the last snapshot. The directory stops relaying, so handles
    /// obtained earlier through [`directory`](Self::directory) no longer
    /// reach the registry bus.
    pub async fn delete(&self, id: &str) -> Result<Project> {
        let (_, registered) = self
            .projects
            .remove(id)
            .ok_or_else(|| Error::ProjectNotFound(id.to_string()))?;

        registered.directory.events().unsubscribe(&registered.relay);
        let info = registered.directory.info().await;

        tracing::info!(project = %id, "Project deleted");

        Ok(info)
    }
}
