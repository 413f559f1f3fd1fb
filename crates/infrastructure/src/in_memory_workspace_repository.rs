use std::collections::HashMap;

use async_trait::async_trait;
use confidant_application::{
    AuthorityRepository, DefaultTransition, EnvironmentListItem, EnvironmentListQuery,
    EnvironmentRepository, EnvironmentScope, EnvironmentSortField, EnvironmentUpdateRecord,
    SortOrder, UserSummary,
};
use confidant_core::{AppError, AppResult, EnvironmentId, ProjectId, UserId, WorkspaceId};
use confidant_domain::{Environment, Project, WorkspaceRole};
use tokio::sync::RwLock;

/// In-memory workspace store implementing the authority and environment
/// ports.
///
/// Default-flag transitions are applied under a single write lock on the
/// environments table, matching the atomicity the PostgreSQL adapter gets
/// from its transactions.
#[derive(Debug, Default)]
pub struct InMemoryWorkspaceRepository {
    projects: RwLock<HashMap<ProjectId, Project>>,
    environments: RwLock<HashMap<EnvironmentId, Environment>>,
    roles: RwLock<HashMap<(WorkspaceId, UserId), Vec<WorkspaceRole>>>,
    users: RwLock<HashMap<UserId, String>>,
}

impl InMemoryWorkspaceRepository {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a project to the store.
    pub async fn insert_project(&self, project: Project) {
        self.projects
            .write()
            .await
            .insert(project.project_id(), project);
    }

    /// Adds an environment to the store, bypassing the default-transition
    /// semantics of `create_environment`.
    pub async fn insert_environment(&self, environment: Environment) {
        self.environments
            .write()
            .await
            .insert(environment.environment_id(), environment);
    }

    /// Assigns a role to a workspace member.
    pub async fn assign_role(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
        role: WorkspaceRole,
    ) {
        self.roles
            .write()
            .await
            .entry((workspace_id, user_id))
            .or_default()
            .push(role);
    }

    /// Registers a user display name for listing enrichment.
    pub async fn insert_user(&self, user_id: UserId, display_name: &str) {
        self.users
            .write()
            .await
            .insert(user_id, display_name.to_owned());
    }

    fn clear_project_defaults(
        environments: &mut HashMap<EnvironmentId, Environment>,
        project_id: ProjectId,
    ) {
        let cleared: Vec<Environment> = environments
            .values()
            .filter(|environment| {
                environment.project_id() == project_id && environment.is_default()
            })
            .map(|environment| environment.clone().with_default_flag(false))
            .collect();

        for environment in cleared {
            environments.insert(environment.environment_id(), environment);
        }
    }
}

#[async_trait]
impl AuthorityRepository for InMemoryWorkspaceRepository {
    async fn find_project(&self, project_id: ProjectId) -> AppResult<Option<Project>> {
        Ok(self.projects.read().await.get(&project_id).cloned())
    }

    async fn find_environment(
        &self,
        environment_id: EnvironmentId,
    ) -> AppResult<Option<EnvironmentScope>> {
        let Some(environment) = self
            .environments
            .read()
            .await
            .get(&environment_id)
            .cloned()
        else {
            return Ok(None);
        };

        let Some(project) = self
            .projects
            .read()
            .await
            .get(&environment.project_id())
            .cloned()
        else {
            return Ok(None);
        };

        Ok(Some(EnvironmentScope {
            project_id: project.project_id(),
            workspace_id: project.workspace_id(),
            environment,
        }))
    }

    async fn list_roles_for_member(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
    ) -> AppResult<Vec<WorkspaceRole>> {
        Ok(self
            .roles
            .read()
            .await
            .get(&(workspace_id, user_id))
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl EnvironmentRepository for InMemoryWorkspaceRepository {
    async fn create_environment(&self, environment: Environment) -> AppResult<()> {
        let mut environments = self.environments.write().await;

        if environment.is_default() {
            Self::clear_project_defaults(&mut environments, environment.project_id());
        }

        environments.insert(environment.environment_id(), environment);
        Ok(())
    }

    async fn update_environment(&self, record: EnvironmentUpdateRecord) -> AppResult<()> {
        let mut environments = self.environments.write().await;
        let project_id = record.environment.project_id();

        match record.default_transition {
            DefaultTransition::Promote => {
                Self::clear_project_defaults(&mut environments, project_id);
            }
            DefaultTransition::Demote => {
                let count = environments
                    .values()
                    .filter(|environment| environment.project_id() == project_id)
                    .count();
                if count <= 1 {
                    return Err(AppError::InvalidOperation(format!(
                        "cannot make the last environment of project '{project_id}' non-default"
                    )));
                }
            }
            DefaultTransition::Keep => {}
        }

        if !environments.contains_key(&record.environment.environment_id()) {
            return Err(AppError::NotFound(format!(
                "environment '{}' does not exist",
                record.environment.environment_id()
            )));
        }

        environments.insert(record.environment.environment_id(), record.environment);
        Ok(())
    }

    async fn delete_environment(&self, environment_id: EnvironmentId) -> AppResult<()> {
        let mut environments = self.environments.write().await;
        let Some(environment) = environments.get(&environment_id) else {
            return Err(AppError::NotFound(format!(
                "environment '{environment_id}' does not exist"
            )));
        };

        if environment.is_default() {
            return Err(AppError::InvalidOperation(format!(
                "environment '{environment_id}' is its project's default and cannot be deleted"
            )));
        }

        environments.remove(&environment_id);
        Ok(())
    }

    async fn environment_name_exists(
        &self,
        project_id: ProjectId,
        name: &str,
    ) -> AppResult<bool> {
        Ok(self.environments.read().await.values().any(|environment| {
            environment.project_id() == project_id && environment.name().as_str() == name
        }))
    }

    async fn list_environments(
        &self,
        project_id: ProjectId,
        query: EnvironmentListQuery,
    ) -> AppResult<Vec<EnvironmentListItem>> {
        let environments = self.environments.read().await;
        let users = self.users.read().await;

        let mut rows: Vec<Environment> = environments
            .values()
            .filter(|environment| {
                environment.project_id() == project_id
                    && environment.name().as_str().contains(query.search.as_str())
            })
            .cloned()
            .collect();

        match query.sort_field {
            EnvironmentSortField::Name => {
                rows.sort_by(|left, right| left.name().as_str().cmp(right.name().as_str()));
            }
            EnvironmentSortField::CreatedAt => rows.sort_by_key(Environment::created_at),
            EnvironmentSortField::UpdatedAt => rows.sort_by_key(Environment::updated_at),
        }
        if query.sort_order == SortOrder::Desc {
            rows.reverse();
        }

        let skip = query.page as usize * query.limit as usize;
        Ok(rows
            .into_iter()
            .skip(skip)
            .take(query.limit as usize)
            .map(|environment| EnvironmentListItem {
                last_updated_by: environment.last_updated_by().and_then(|user_id| {
                    users.get(&user_id).map(|display_name| UserSummary {
                        user_id,
                        display_name: display_name.clone(),
                    })
                }),
                environment,
            })
            .collect())
    }
}
