use async_trait::async_trait;
use confidant_core::{AppResult, EnvironmentId, ProjectId, UserId, WorkspaceId};
use confidant_domain::{Environment, Project, WorkspaceRole};

/// Environment loaded together with its ownership chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentScope {
    /// The resolved environment.
    pub environment: Environment,
    /// Owning project.
    pub project_id: ProjectId,
    /// Workspace at the root of the ownership chain.
    pub workspace_id: WorkspaceId,
}

/// Port for resource ownership and role-membership lookups.
#[async_trait]
pub trait AuthorityRepository: Send + Sync {
    /// Finds a project by identifier.
    async fn find_project(&self, project_id: ProjectId) -> AppResult<Option<Project>>;

    /// Finds an environment together with its project and workspace scope.
    async fn find_environment(
        &self,
        environment_id: EnvironmentId,
    ) -> AppResult<Option<EnvironmentScope>>;

    /// Lists the workspace roles assigned to a member.
    ///
    /// Returns an empty list when the user is not a member of the workspace.
    async fn list_roles_for_member(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
    ) -> AppResult<Vec<WorkspaceRole>>;
}
