//! A single project: its membership and pending invites.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::events::{Event, EventBus};
use crate::{error::Result, Error, InviteId, MemberId, ProjectId};

/// Role of a member within a project. Stored, never enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Creator,
    Coordinator,
    Member,
}

/// Externally visible snapshot of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMember {
    pub id: MemberId,
    pub name: Option<String>,
    pub role: Role,
}

/// Caller-supplied details of a new member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    #[serde(default)]
    pub name: Option<String>,
    pub role: Role,
}

/// Fields of a member to overwrite; `None` leaves a field as is.
///
/// `name` is doubly optional so a remote caller can clear it: an absent key
/// is `None`, an explicit `null` is `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberPatch {
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Maps a present key, `null` included, to `Some`.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// A pending invitation into a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    pub id: InviteId,
    pub role: Role,
}

/// Membership of one project.
#[derive(Debug, Default)]
pub struct Members {
    entries: DashMap<MemberId, ProjectMember>,
}

impl Members {
    pub async fn get(&self, id: &str) -> Option<ProjectMember> {
        self.entries.get(id).map(|m| m.value().clone())
    }

    /// All members, ordered by id.
    pub async fn get_many(&self) -> Vec<ProjectMember> {
        let mut members: Vec<_> = self.entries.iter().map(|m| m.value().clone()).collect();
        members.sort_by(|a, b| a.id.cmp(&b.id));
        members
    }

    /// Add a member. Fails if the id is already a member.
    pub async fn add(&self, id: impl Into<MemberId>, info: MemberInfo) -> Result<ProjectMember> {
        let id = id.into();
        let member = ProjectMember {
            id: id.clone(),
            name: info.name,
            role: info.role,
        };

        match self.entries.entry(id) {
            Entry::Occupied(entry) => Err(Error::MemberAlreadyExists(entry.key().clone())),
            Entry::Vacant(slot) => {
                slot.insert(member.clone());
                tracing::debug!(member = %member.id, role = ?member.role, "Member added");
                Ok(member)
            }
        }
    }

    /// Remove a member. Fails if the id is not a member.
    pub async fn remove(&self, id: &str) -> Result<()> {
        if self.entries.remove(id).is_none() {
            return Err(Error::MemberNotFound(id.to_string()));
        }

        tracing::debug!(member = %id, "Member removed");
        Ok(())
    }

    /// Merge `patch` into an existing member.
    pub async fn update(&self, id: &str, patch: MemberPatch) -> Result<ProjectMember> {
        let mut member = self
            .entries
            .get_mut(id)
            .ok_or_else(|| Error::MemberNotFound(id.to_string()))?;

        if let Some(name) = patch.name {
            member.name = name;
        }
        if let Some(role) = patch.role {
            member.role = role;
        }

        Ok(member.value().clone())
    }
}

/// Pending invites of one project.
#[derive(Debug)]
pub struct Invites {
    project_id: ProjectId,
    pending: DashMap<InviteId, Invite>,
    events: EventBus,
}

impl Invites {
    fn new(project_id: ProjectId, events: EventBus) -> Self {
        Self {
            project_id,
            pending: DashMap::new(),
            events,
        }
    }

    /// Queue an invite.
    ///
    /// Returns `false` without emitting anything if the id is already
    /// pending. A new invite raises [`Event::InviteCreated`] on the project
    /// bus, which relays publish as `invite:received`.
    pub async fn create(&self, id: impl Into<InviteId>, role: Role) -> bool {
        let invite = Invite { id: id.into(), role };

        match self.pending.entry(invite.id.clone()) {
            Entry::Occupied(_) => {
                tracing::debug!(project = %self.project_id, invite = %invite.id, "Invite already pending");
                return false;
            }
            Entry::Vacant(slot) => {
                slot.insert(invite.clone());
            }
        }

        tracing::info!(project = %self.project_id, invite = %invite.id, "Invite created");

        self.events.emit(Event::InviteCreated {
            project_id: self.project_id.clone(),
            invite,
        });
        true
    }

    /// Pending invites, ordered by id.
    pub async fn get_many(&self) -> Vec<Invite> {
        let mut invites: Vec<_> = self.pending.iter().map(|i| i.value().clone()).collect();
        invites.sort_by(|a, b| a.id.cmp(&b.id));
        invites
    }

    pub(crate) fn accept(&self, id: &str, params: serde_json::Value) {
        if self.pending.remove(id).is_none() {
            tracing::debug!(project = %self.project_id, invite = %id, "Accept for unknown invite ignored");
            return;
        }

        tracing::info!(project = %self.project_id, invite = %id, "Invite accepted");

        self.events.emit(Event::InviteAccepted {
            project_id: self.project_id.clone(),
            invite_id: id.to_string(),
            params,
        });
    }

    pub(crate) fn decline(&self, id: &str, params: serde_json::Value) {
        if self.pending.remove(id).is_none() {
            tracing::debug!(project = %self.project_id, invite = %id, "Decline for unknown invite ignored");
            return;
        }

        tracing::info!(project = %self.project_id, invite = %id, "Invite declined");

        self.events.emit(Event::InviteDeclined {
            project_id: self.project_id.clone(),
            invite_id: id.to_string(),
            params,
        });
    }
}

/// Owning state machine of one project's members and invites.
#[derive(Debug)]
pub struct ProjectDirectory {
    id: ProjectId,
    name: RwLock<String>,
    members: Members,
    invites: Invites,
    events: EventBus,
}

impl ProjectDirectory {
    /// Create a project with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        let id = Uuid::new_v4().to_string();
        let events = EventBus::new();

        Self {
            invites: Invites::new(id.clone(), events.clone()),
            id,
            name: RwLock::new(name.into()),
            members: Members::default(),
            events,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn info(&self) -> Project {
        Project {
            id: self.id.clone(),
            name: self.name.read().await.clone(),
        }
    }

    pub fn members(&self) -> &Members {
        &self.members
    }

    pub fn invites(&self) -> &Invites {
        &self.invites
    }

    /// The project's own bus. Carries the internal invite-created signal.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub(crate) async fn rename(&self, name: impl Into<String>) -> Project {
        *self.name.write().await = name.into();
        self.info().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use serde_json::json;

    fn member(role: Role) -> MemberInfo {
        MemberInfo { name: None, role }
    }

    #[tokio::test]
    async fn info_snapshot() {
        let project = ProjectDirectory::new("Rivers");
        let info = project.info().await;
        assert_eq!(info.name, "Rivers");
        assert_eq!(info.id, project.id());

        let renamed = project.rename("Lakes").await;
        assert_eq!(renamed.id, info.id);
        assert_eq!(project.info().await.name, "Lakes");
    }

    #[tokio::test]
    async fn add_member_twice_fails() {
        let project = ProjectDirectory::new("p");
        let members = project.members();

        let added = members.add("alice", member(Role::Creator)).await.unwrap();
        assert_eq!(added.id, "alice");

        let err = members
            .add("alice", member(Role::Member))
            .await
            .unwrap_err();
        assert_eq!(err, Error::MemberAlreadyExists("alice".into()));
        assert_eq!(members.get("alice").await.unwrap().role, Role::Creator);
    }

    #[tokio::test]
    async fn remove_and_update_missing_member() {
        let project = ProjectDirectory::new("p");
        let members = project.members();

        let err = members.remove("bob").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = members
            .update("bob", MemberPatch::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        assert!(members.get("bob").await.is_none());
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let project = ProjectDirectory::new("p");
        let members = project.members();
        members
            .add(
                "carol",
                MemberInfo {
                    name: Some("Carol".into()),
                    role: Role::Member,
                },
            )
            .await
            .unwrap();

        let patch = MemberPatch {
            role: Some(Role::Coordinator),
            ..Default::default()
        };
        let updated = members.update("carol", patch).await.unwrap();

        assert_eq!(updated.name.as_deref(), Some("Carol"));
        assert_eq!(updated.role, Role::Coordinator);
        assert_eq!(members.get_many().await, vec![updated]);
    }

    #[tokio::test]
    async fn explicit_null_clears_name() {
        let project = ProjectDirectory::new("p");
        let members = project.members();
        members
            .add(
                "dave",
                MemberInfo {
                    name: Some("Dave".into()),
                    role: Role::Member,
                },
            )
            .await
            .unwrap();

        let absent: MemberPatch = serde_json::from_value(json!({"role": "coordinator"})).unwrap();
        assert_eq!(absent.name, None);
        let kept = members.update("dave", absent).await.unwrap();
        assert_eq!(kept.name.as_deref(), Some("Dave"));

        let cleared: MemberPatch = serde_json::from_value(json!({"name": null})).unwrap();
        assert_eq!(cleared.name, Some(None));
        let updated = members.update("dave", cleared).await.unwrap();
        assert_eq!(updated.name, None);
        assert_eq!(updated.role, Role::Coordinator);

        let renamed = MemberPatch {
            name: Some(Some("David".into())),
            ..Default::default()
        };
        let updated = members.update("dave", renamed).await.unwrap();
        assert_eq!(updated.name.as_deref(), Some("David"));

        let json = serde_json::to_value(MemberPatch {
            name: Some(None),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(json, json!({"name": null}));
    }

    #[tokio::test]
    async fn remove_member() {
        let project = ProjectDirectory::new("p");
        let members = project.members();
        members.add("dan", member(Role::Member)).await.unwrap();

        members.remove("dan").await.unwrap();
        assert!(members.get_many().await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_invite_is_silent() {
        let project = ProjectDirectory::new("p");
        let mut sub = project.events().subscribe();

        assert!(project.invites().create("inv1", Role::Member).await);
        assert!(!project.invites().create("inv1", Role::Coordinator).await);

        let events = sub.drain();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Event::InviteCreated { invite, .. } if invite.id == "inv1"));

        let pending = project.invites().get_many().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].role, Role::Member);
    }

    #[tokio::test]
    async fn resolve_invites() {
        let project = ProjectDirectory::new("p");
        project.invites().create("inv1", Role::Member).await;
        project.invites().create("inv2", Role::Member).await;
        let mut sub = project.events().subscribe();

        project.invites().accept("inv1", json!({"device": "tablet"}));
        project.invites().decline("inv2", json!({}));
        project.invites().accept("inv1", json!({}));

        let events = sub.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            Event::InviteAccepted {
                project_id: project.id().to_string(),
                invite_id: "inv1".into(),
                params: json!({"device": "tablet"}),
            }
        );
        assert_eq!(events[1].name(), "invite:declined");
        assert!(project.invites().get_many().await.is_empty());
    }
}
