use std::sync::Arc;

use chrono::Utc;
use confidant_core::{AppError, AppResult, EnvironmentId, Principal, ProjectId};
use confidant_domain::{
    Authority, Environment, EnvironmentUpdate, EventKind, EventSeverity, EventSource,
    EventTriggerer,
};
use serde_json::json;

use crate::AuthorityService;
use crate::environment_ports::{
    CreateEnvironmentInput, DefaultTransition, EnvironmentListItem, EnvironmentListQuery,
    EnvironmentRepository, EnvironmentUpdateRecord, EventRecord, UpdateEnvironmentInput,
};
use crate::event_dispatcher::EventDispatcher;

/// Application service for environment CRUD operations.
///
/// Every mutation runs the same pipeline: authority gate, business checks,
/// transactional persistence, then a fire-and-forget audit event.
#[derive(Clone)]
pub struct EnvironmentService {
    repository: Arc<dyn EnvironmentRepository>,
    authority_service: AuthorityService,
    event_dispatcher: EventDispatcher,
}

impl EnvironmentService {
    /// Creates a new environment service from its collaborators.
    #[must_use]
    pub fn new(
        repository: Arc<dyn EnvironmentRepository>,
        authority_service: AuthorityService,
        event_dispatcher: EventDispatcher,
    ) -> Self {
        Self {
            repository,
            authority_service,
            event_dispatcher,
        }
    }

    /// Creates an environment in a project.
    pub async fn create_environment(
        &self,
        actor: &Principal,
        project_id: ProjectId,
        input: CreateEnvironmentInput,
    ) -> AppResult<Environment> {
        let project = self
            .authority_service
            .resolve_project(actor, project_id, Authority::CreateEnvironment)
            .await?;

        if self
            .repository
            .environment_name_exists(project_id, input.name.as_str())
            .await?
        {
            return Err(AppError::Conflict(format!(
                "environment '{}' already exists in project '{project_id}'",
                input.name
            )));
        }

        let now = Utc::now();
        let environment = Environment::new(
            EnvironmentId::new(),
            project_id,
            input.name,
            input.description,
            input.is_default,
            Some(actor.user_id()),
            now,
            now,
        )?;

        self.repository
            .create_environment(environment.clone())
            .await?;

        self.event_dispatcher.dispatch(EventRecord {
            workspace_id: project.workspace_id(),
            project_id: Some(project_id),
            environment_id: Some(environment.environment_id()),
            triggered_by: EventTriggerer::User(actor.user_id()),
            source: EventSource::Environment,
            severity: EventSeverity::Info,
            kind: EventKind::EnvironmentAdded,
            title: "Environment created".to_owned(),
            description: Some(format!(
                "environment '{}' created in project '{}'",
                environment.name(),
                project.name()
            )),
            metadata: json!({
                "environment_id": environment.environment_id(),
                "project_id": project_id,
                "name": environment.name().as_str(),
                "is_default": environment.is_default(),
            }),
            occurred_at: now,
        });

        Ok(environment)
    }

    /// Applies a partial update to an environment.
    pub async fn update_environment(
        &self,
        actor: &Principal,
        environment_id: EnvironmentId,
        input: UpdateEnvironmentInput,
    ) -> AppResult<Environment> {
        let scope = self
            .authority_service
            .resolve_environment(actor, environment_id, Authority::UpdateEnvironment)
            .await?;
        let existing = scope.environment;

        if let Some(name) = input.name.as_deref() {
            // Deliberately also rejects a rename to the current name; this
            // parity quirk is pinned by a regression test.
            if self
                .repository
                .environment_name_exists(scope.project_id, name)
                .await?
            {
                return Err(AppError::Conflict(format!(
                    "environment '{name}' already exists in project '{}'",
                    scope.project_id
                )));
            }
        }

        let default_transition = match input.is_default {
            Some(true) => DefaultTransition::Promote,
            Some(false) if existing.is_default() => DefaultTransition::Demote,
            _ => DefaultTransition::Keep,
        };

        let updated = existing.with_updates(
            EnvironmentUpdate {
                name: input.name,
                description: input.description,
                is_default: input.is_default,
            },
            actor.user_id(),
            Utc::now(),
        )?;

        self.repository
            .update_environment(EnvironmentUpdateRecord {
                environment: updated.clone(),
                default_transition,
            })
            .await?;

        self.event_dispatcher.dispatch(EventRecord {
            workspace_id: scope.workspace_id,
            project_id: Some(scope.project_id),
            environment_id: Some(environment_id),
            triggered_by: EventTriggerer::User(actor.user_id()),
            source: EventSource::Environment,
            severity: EventSeverity::Info,
            kind: EventKind::EnvironmentUpdated,
            title: "Environment updated".to_owned(),
            description: Some(format!("environment '{}' updated", updated.name())),
            metadata: json!({
                "environment_id": environment_id,
                "project_id": scope.project_id,
                "name": updated.name().as_str(),
                "is_default": updated.is_default(),
            }),
            occurred_at: updated.updated_at(),
        });

        Ok(updated)
    }

    /// Returns an environment by identifier.
    pub async fn get_environment(
        &self,
        actor: &Principal,
        environment_id: EnvironmentId,
    ) -> AppResult<Environment> {
        let scope = self
            .authority_service
            .resolve_environment(actor, environment_id, Authority::ReadEnvironment)
            .await?;

        Ok(scope.environment)
    }

    /// Lists environments of a project, enriched with the last-updating user.
    pub async fn list_environments(
        &self,
        actor: &Principal,
        project_id: ProjectId,
        query: EnvironmentListQuery,
    ) -> AppResult<Vec<EnvironmentListItem>> {
        self.authority_service
            .resolve_project(actor, project_id, Authority::ReadEnvironment)
            .await?;

        if query.limit == 0 {
            return Err(AppError::Validation(
                "environment list limit must be greater than zero".to_owned(),
            ));
        }

        self.repository.list_environments(project_id, query).await
    }

    /// Deletes an environment.
    ///
    /// A default environment can never be deleted; the caller must first
    /// promote another environment to default.
    pub async fn delete_environment(
        &self,
        actor: &Principal,
        environment_id: EnvironmentId,
    ) -> AppResult<()> {
        let scope = self
            .authority_service
            .resolve_environment(actor, environment_id, Authority::DeleteEnvironment)
            .await?;

        if scope.environment.is_default() {
            return Err(AppError::InvalidOperation(format!(
                "environment '{}' is the default of project '{}' and cannot be deleted",
                scope.environment.name(),
                scope.project_id
            )));
        }

        self.repository.delete_environment(environment_id).await?;

        // The row is gone, so the event carries no entity reference; ids
        // survive only in the metadata payload.
        self.event_dispatcher.dispatch(EventRecord {
            workspace_id: scope.workspace_id,
            project_id: Some(scope.project_id),
            environment_id: None,
            triggered_by: EventTriggerer::User(actor.user_id()),
            source: EventSource::Environment,
            severity: EventSeverity::Info,
            kind: EventKind::EnvironmentDeleted,
            title: "Environment deleted".to_owned(),
            description: Some(format!(
                "environment '{}' deleted from project '{}'",
                scope.environment.name(),
                scope.project_id
            )),
            metadata: json!({
                "environment_id": environment_id,
                "project_id": scope.project_id,
                "name": scope.environment.name().as_str(),
            }),
            occurred_at: Utc::now(),
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests;
