use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use confidant_application::{AuthorityRepository, EnvironmentScope};
use confidant_core::{AppError, AppResult, EnvironmentId, ProjectId, UserId, WorkspaceId};
use confidant_domain::{Authority, Environment, Project, WorkspaceRole};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// PostgreSQL-backed ownership and role-membership lookups.
#[derive(Clone)]
pub struct PostgresAuthorityRepository {
    pool: PgPool,
}

impl PostgresAuthorityRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ProjectRow {
    id: Uuid,
    workspace_id: Uuid,
    name: String,
}

#[derive(Debug, FromRow)]
struct EnvironmentScopeRow {
    id: Uuid,
    project_id: Uuid,
    workspace_id: Uuid,
    name: String,
    description: Option<String>,
    is_default: bool,
    last_updated_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct MemberRoleRow {
    role_id: Uuid,
    name: String,
    has_admin_authority: bool,
    authority: Option<String>,
}

#[async_trait]
impl AuthorityRepository for PostgresAuthorityRepository {
    async fn find_project(&self, project_id: ProjectId) -> AppResult<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, workspace_id, name
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(project_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find project '{project_id}': {error}"))
        })?;

        row.map(|row| {
            Project::new(
                ProjectId::from_uuid(row.id),
                WorkspaceId::from_uuid(row.workspace_id),
                row.name,
            )
            .map_err(|error| {
                AppError::Internal(format!("persisted project '{project_id}' is invalid: {error}"))
            })
        })
        .transpose()
    }

    async fn find_environment(
        &self,
        environment_id: EnvironmentId,
    ) -> AppResult<Option<EnvironmentScope>> {
        let row = sqlx::query_as::<_, EnvironmentScopeRow>(
            r#"
            SELECT e.id,
                   e.project_id,
                   p.workspace_id,
                   e.name,
                   e.description,
                   e.is_default,
                   e.last_updated_by,
                   e.created_at,
                   e.updated_at
            FROM environments e
            JOIN projects p ON p.id = e.project_id
            WHERE e.id = $1
            "#,
        )
        .bind(environment_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to find environment '{environment_id}': {error}"
            ))
        })?;

        row.map(|row| {
            let environment = Environment::new(
                EnvironmentId::from_uuid(row.id),
                ProjectId::from_uuid(row.project_id),
                row.name,
                row.description,
                row.is_default,
                row.last_updated_by.map(UserId::from_uuid),
                row.created_at,
                row.updated_at,
            )
            .map_err(|error| {
                AppError::Internal(format!(
                    "persisted environment '{environment_id}' is invalid: {error}"
                ))
            })?;

            Ok(EnvironmentScope {
                project_id: environment.project_id(),
                workspace_id: WorkspaceId::from_uuid(row.workspace_id),
                environment,
            })
        })
        .transpose()
    }

    async fn list_roles_for_member(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
    ) -> AppResult<Vec<WorkspaceRole>> {
        let rows = sqlx::query_as::<_, MemberRoleRow>(
            r#"
            SELECT r.id AS role_id,
                   r.name,
                   r.has_admin_authority,
                   a.authority
            FROM workspace_roles r
            JOIN workspace_member_roles m ON m.role_id = r.id
            LEFT JOIN workspace_role_authorities a ON a.role_id = r.id
            WHERE r.workspace_id = $1 AND m.user_id = $2
            ORDER BY r.id
            "#,
        )
        .bind(workspace_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list member roles: {error}"))
        })?;

        let mut grouped: BTreeMap<Uuid, (String, bool, Vec<String>)> = BTreeMap::new();
        for row in rows {
            let entry = grouped
                .entry(row.role_id)
                .or_insert_with(|| (row.name, row.has_admin_authority, Vec::new()));
            if let Some(authority) = row.authority {
                entry.2.push(authority);
            }
        }

        grouped
            .into_values()
            .map(|(name, has_admin_authority, authorities)| {
                let authorities = authorities
                    .iter()
                    .map(|value| Authority::from_str(value))
                    .collect::<AppResult<_>>()?;
                WorkspaceRole::new(workspace_id, name, has_admin_authority, authorities)
            })
            .collect()
    }
}
