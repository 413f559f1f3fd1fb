use std::collections::BTreeSet;
use std::str::FromStr;

use confidant_core::{AppError, AppResult, NonEmptyString, WorkspaceId};
use serde::{Deserialize, Serialize};

/// Authorities enforced by application policy checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authority {
    /// Allows creating projects in a workspace.
    CreateProject,
    /// Allows reading a project and its settings.
    ReadProject,
    /// Allows updating project settings.
    UpdateProject,
    /// Allows deleting a project.
    DeleteProject,
    /// Allows creating environments in a project.
    CreateEnvironment,
    /// Allows reading environments.
    ReadEnvironment,
    /// Allows updating environments.
    UpdateEnvironment,
    /// Allows deleting environments.
    DeleteEnvironment,
    /// Allows managing workspace roles and their assignments.
    ManageRoles,
    /// Allows reading workspace audit events.
    ReadEvent,
}

impl Authority {
    /// Returns a stable storage value for this authority.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateProject => "project.create",
            Self::ReadProject => "project.read",
            Self::UpdateProject => "project.update",
            Self::DeleteProject => "project.delete",
            Self::CreateEnvironment => "environment.create",
            Self::ReadEnvironment => "environment.read",
            Self::UpdateEnvironment => "environment.update",
            Self::DeleteEnvironment => "environment.delete",
            Self::ManageRoles => "workspace.role.manage",
            Self::ReadEvent => "workspace.event.read",
        }
    }

    /// Returns the full authority universe.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Authority] = &[
            Authority::CreateProject,
            Authority::ReadProject,
            Authority::UpdateProject,
            Authority::DeleteProject,
            Authority::CreateEnvironment,
            Authority::ReadEnvironment,
            Authority::UpdateEnvironment,
            Authority::DeleteEnvironment,
            Authority::ManageRoles,
            Authority::ReadEvent,
        ];

        ALL
    }
}

impl FromStr for Authority {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "project.create" => Ok(Self::CreateProject),
            "project.read" => Ok(Self::ReadProject),
            "project.update" => Ok(Self::UpdateProject),
            "project.delete" => Ok(Self::DeleteProject),
            "environment.create" => Ok(Self::CreateEnvironment),
            "environment.read" => Ok(Self::ReadEnvironment),
            "environment.update" => Ok(Self::UpdateEnvironment),
            "environment.delete" => Ok(Self::DeleteEnvironment),
            "workspace.role.manage" => Ok(Self::ManageRoles),
            "workspace.event.read" => Ok(Self::ReadEvent),
            _ => Err(AppError::Validation(format!(
                "unknown authority value '{value}'"
            ))),
        }
    }
}

/// Named authority bundle assignable to workspace members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceRole {
    workspace_id: WorkspaceId,
    name: NonEmptyString,
    has_admin_authority: bool,
    authorities: BTreeSet<Authority>,
}

impl WorkspaceRole {
    /// Creates a validated workspace role.
    pub fn new(
        workspace_id: WorkspaceId,
        name: impl Into<String>,
        has_admin_authority: bool,
        authorities: BTreeSet<Authority>,
    ) -> AppResult<Self> {
        Ok(Self {
            workspace_id,
            name: NonEmptyString::new(name)?,
            has_admin_authority,
            authorities,
        })
    }

    /// Returns the owning workspace.
    #[must_use]
    pub fn workspace_id(&self) -> WorkspaceId {
        self.workspace_id
    }

    /// Returns the role name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns whether this role grants the full authority universe.
    #[must_use]
    pub fn has_admin_authority(&self) -> bool {
        self.has_admin_authority
    }

    /// Returns the explicitly granted authorities.
    #[must_use]
    pub fn authorities(&self) -> &BTreeSet<Authority> {
        &self.authorities
    }
}

/// Computes the effective authority set for one membership.
///
/// The result is the union of every role bundle; a role flagged with admin
/// authority grants the full universe regardless of its explicit list.
#[must_use]
pub fn effective_authorities(roles: &[WorkspaceRole]) -> BTreeSet<Authority> {
    if roles.iter().any(WorkspaceRole::has_admin_authority) {
        return Authority::all().iter().copied().collect();
    }

    roles
        .iter()
        .flat_map(|role| role.authorities().iter().copied())
        .collect()
}
