use std::collections::BTreeSet;
use std::sync::Arc;

use confidant_core::{
    AppError, AppResult, EnvironmentId, Principal, ProjectId, UserId, WorkspaceId,
};
use confidant_domain::{Authority, Project, effective_authorities};

use crate::environment_ports::{AuthorityRepository, EnvironmentScope};

/// Application service for workspace-scoped authority checks.
///
/// Resolution loads the addressed resource together with its ownership
/// chain, computes the caller's effective authority set from the roles
/// assigned to their membership, and asserts the required authority is
/// present. All operations are read-only.
#[derive(Clone)]
pub struct AuthorityService {
    repository: Arc<dyn AuthorityRepository>,
}

impl AuthorityService {
    /// Creates a new authority service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AuthorityRepository>) -> Self {
        Self { repository }
    }

    /// Returns the caller's effective authority set in a workspace.
    ///
    /// The set is the union of every assigned role bundle; a role flagged
    /// with admin authority grants the full universe.
    pub async fn effective_authorities(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
    ) -> AppResult<BTreeSet<Authority>> {
        let roles = self
            .repository
            .list_roles_for_member(workspace_id, user_id)
            .await?;

        Ok(effective_authorities(&roles))
    }

    /// Resolves a project and asserts the caller holds the required authority.
    pub async fn resolve_project(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        required: Authority,
    ) -> AppResult<Project> {
        let project = self
            .repository
            .find_project(project_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("project '{project_id}' does not exist")))?;

        self.require_authority(project.workspace_id(), principal, required)
            .await?;

        Ok(project)
    }

    /// Resolves an environment with its ownership chain and asserts the
    /// caller holds the required authority.
    pub async fn resolve_environment(
        &self,
        principal: &Principal,
        environment_id: EnvironmentId,
        required: Authority,
    ) -> AppResult<EnvironmentScope> {
        let scope = self
            .repository
            .find_environment(environment_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("environment '{environment_id}' does not exist"))
            })?;

        self.require_authority(scope.workspace_id, principal, required)
            .await?;

        Ok(scope)
    }

    async fn require_authority(
        &self,
        workspace_id: WorkspaceId,
        principal: &Principal,
        required: Authority,
    ) -> AppResult<()> {
        let granted = self
            .effective_authorities(workspace_id, principal.user_id())
            .await?;

        if !granted.contains(&required) {
            return Err(AppError::Forbidden(format!(
                "user '{}' is missing authority '{}' in workspace '{workspace_id}'",
                principal.user_id(),
                required.as_str()
            )));
        }

        Ok(())
    }
}
