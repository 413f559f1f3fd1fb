use confidant_core::{AppResult, NonEmptyString, ProjectId, WorkspaceId};
use serde::{Deserialize, Serialize};

/// Unit of configuration management within a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    project_id: ProjectId,
    workspace_id: WorkspaceId,
    name: NonEmptyString,
}

impl Project {
    /// Creates a validated project entity.
    pub fn new(
        project_id: ProjectId,
        workspace_id: WorkspaceId,
        name: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            project_id,
            workspace_id,
            name: NonEmptyString::new(name)?,
        })
    }

    /// Returns the project identifier.
    #[must_use]
    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the owning workspace identifier.
    #[must_use]
    pub fn workspace_id(&self) -> WorkspaceId {
        self.workspace_id
    }

    /// Returns the project name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }
}
