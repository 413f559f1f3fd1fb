use async_trait::async_trait;
use confidant_application::{EventRecord, EventRepository};
use confidant_core::{AppError, AppResult};
use sqlx::PgPool;

/// PostgreSQL-backed append-only event sink.
///
/// Entity references are stored as plain UUID columns without foreign keys,
/// so event rows survive the deletion of the resources they describe.
#[derive(Clone)]
pub struct PostgresEventRepository {
    pool: PgPool,
}

impl PostgresEventRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PostgresEventRepository {
    async fn append_event(&self, event: EventRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO events (
                workspace_id,
                project_id,
                environment_id,
                triggerer_kind,
                triggerer_user_id,
                source,
                severity,
                kind,
                title,
                description,
                metadata,
                occurred_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(event.workspace_id.as_uuid())
        .bind(event.project_id.map(|project_id| project_id.as_uuid()))
        .bind(
            event
                .environment_id
                .map(|environment_id| environment_id.as_uuid()),
        )
        .bind(event.triggered_by.kind_str())
        .bind(event.triggered_by.user_id().map(|user_id| user_id.as_uuid()))
        .bind(event.source.as_str())
        .bind(event.severity.as_str())
        .bind(event.kind.as_str())
        .bind(event.title)
        .bind(event.description)
        .bind(event.metadata)
        .bind(event.occurred_at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to append event: {error}")))?;

        Ok(())
    }
}
