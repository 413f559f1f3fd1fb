use async_trait::async_trait;
use chrono::{DateTime, Utc};
use confidant_application::{
    DefaultTransition, EnvironmentListItem, EnvironmentListQuery, EnvironmentRepository,
    EnvironmentSortField, EnvironmentUpdateRecord, SortOrder, UserSummary,
};
use confidant_core::{AppError, AppResult, EnvironmentId, ProjectId, UserId};
use confidant_domain::Environment;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

/// PostgreSQL-backed environment repository.
///
/// Default-flag transitions run in the same transaction as the row write, so
/// concurrent readers never observe a project with two defaults.
#[derive(Clone)]
pub struct PostgresEnvironmentRepository {
    pool: PgPool,
}

impl PostgresEnvironmentRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct EnvironmentListRow {
    id: Uuid,
    project_id: Uuid,
    name: String,
    description: Option<String>,
    is_default: bool,
    last_updated_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_updated_by_name: Option<String>,
}

async fn clear_project_defaults(
    transaction: &mut Transaction<'_, Postgres>,
    project_id: ProjectId,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE environments
        SET is_default = FALSE
        WHERE project_id = $1 AND is_default
        "#,
    )
    .bind(project_id.as_uuid())
    .execute(&mut **transaction)
    .await
    .map_err(|error| {
        AppError::Internal(format!("failed to clear project defaults: {error}"))
    })?;

    Ok(())
}

fn map_insert_error(error: sqlx::Error, name: &str, project_id: ProjectId) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(format!(
            "environment '{name}' already exists in project '{project_id}'"
        ));
    }

    AppError::Internal(format!("failed to write environment: {error}"))
}

#[async_trait]
impl EnvironmentRepository for PostgresEnvironmentRepository {
    async fn create_environment(&self, environment: Environment) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        if environment.is_default() {
            clear_project_defaults(&mut transaction, environment.project_id()).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO environments (
                id,
                project_id,
                name,
                description,
                is_default,
                last_updated_by,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(environment.environment_id().as_uuid())
        .bind(environment.project_id().as_uuid())
        .bind(environment.name().as_str())
        .bind(environment.description())
        .bind(environment.is_default())
        .bind(environment.last_updated_by().map(|user_id| user_id.as_uuid()))
        .bind(environment.created_at())
        .bind(environment.updated_at())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            map_insert_error(error, environment.name().as_str(), environment.project_id())
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(())
    }

    async fn update_environment(&self, record: EnvironmentUpdateRecord) -> AppResult<()> {
        let environment = record.environment;
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        match record.default_transition {
            DefaultTransition::Promote => {
                clear_project_defaults(&mut transaction, environment.project_id()).await?;
            }
            DefaultTransition::Demote => {
                let count = sqlx::query_scalar::<_, i64>(
                    r#"
                    SELECT COUNT(*)
                    FROM environments
                    WHERE project_id = $1
                    "#,
                )
                .bind(environment.project_id().as_uuid())
                .fetch_one(&mut *transaction)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to count environments: {error}"))
                })?;

                if count <= 1 {
                    return Err(AppError::InvalidOperation(format!(
                        "cannot make the last environment of project '{}' non-default",
                        environment.project_id()
                    )));
                }
            }
            DefaultTransition::Keep => {}
        }

        let rows_affected = sqlx::query(
            r#"
            UPDATE environments
            SET name = $2,
                description = $3,
                is_default = $4,
                last_updated_by = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(environment.environment_id().as_uuid())
        .bind(environment.name().as_str())
        .bind(environment.description())
        .bind(environment.is_default())
        .bind(environment.last_updated_by().map(|user_id| user_id.as_uuid()))
        .bind(environment.updated_at())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            map_insert_error(error, environment.name().as_str(), environment.project_id())
        })?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "environment '{}' does not exist",
                environment.environment_id()
            )));
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(())
    }

    async fn delete_environment(&self, environment_id: EnvironmentId) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        let rows_affected = sqlx::query(
            r#"
            DELETE FROM environments
            WHERE id = $1 AND NOT is_default
            "#,
        )
        .bind(environment_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to delete environment '{environment_id}': {error}"
            ))
        })?
        .rows_affected();

        if rows_affected == 0 {
            // Either the row is missing or it is the project default; the
            // distinction is read inside the same transaction.
            let is_default = sqlx::query_scalar::<_, bool>(
                r#"
                SELECT is_default
                FROM environments
                WHERE id = $1
                "#,
            )
            .bind(environment_id.as_uuid())
            .fetch_optional(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to inspect environment '{environment_id}': {error}"
                ))
            })?;

            return match is_default {
                Some(_) => Err(AppError::InvalidOperation(format!(
                    "environment '{environment_id}' is its project's default and cannot be deleted"
                ))),
                None => Err(AppError::NotFound(format!(
                    "environment '{environment_id}' does not exist"
                ))),
            };
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(())
    }

    async fn environment_name_exists(
        &self,
        project_id: ProjectId,
        name: &str,
    ) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM environments
                WHERE project_id = $1 AND name = $2
            )
            "#,
        )
        .bind(project_id.as_uuid())
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to check environment name: {error}"))
        })
    }

    async fn list_environments(
        &self,
        project_id: ProjectId,
        query: EnvironmentListQuery,
    ) -> AppResult<Vec<EnvironmentListItem>> {
        let order_column = match query.sort_field {
            EnvironmentSortField::Name => "e.name",
            EnvironmentSortField::CreatedAt => "e.created_at",
            EnvironmentSortField::UpdatedAt => "e.updated_at",
        };
        let direction = match query.sort_order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };

        // Sort inputs map onto a fixed column set; only validated tokens ever
        // reach the statement text.
        let statement = format!(
            r#"
            SELECT e.id,
                   e.project_id,
                   e.name,
                   e.description,
                   e.is_default,
                   e.last_updated_by,
                   e.created_at,
                   e.updated_at,
                   u.display_name AS last_updated_by_name
            FROM environments e
            LEFT JOIN users u ON u.id = e.last_updated_by
            WHERE e.project_id = $1 AND position($2 in e.name) > 0
            ORDER BY {order_column} {direction}
            OFFSET $3
            LIMIT $4
            "#
        );

        let offset = i64::from(query.page) * i64::from(query.limit);
        let rows = sqlx::query_as::<_, EnvironmentListRow>(statement.as_str())
            .bind(project_id.as_uuid())
            .bind(query.search.as_str())
            .bind(offset)
            .bind(i64::from(query.limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to list environments: {error}"))
            })?;

        rows.into_iter()
            .map(|row| {
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
                        "persisted environment is invalid for project '{project_id}': {error}"
                    ))
                })?;

                Ok(EnvironmentListItem {
                    last_updated_by: environment.last_updated_by().and_then(|user_id| {
                        row.last_updated_by_name.clone().map(|display_name| {
                            UserSummary {
                                user_id,
                                display_name,
                            }
                        })
                    }),
                    environment,
                })
            })
            .collect()
    }
}
