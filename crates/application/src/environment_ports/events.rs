use async_trait::async_trait;
use chrono::{DateTime, Utc};
use confidant_core::{AppResult, EnvironmentId, ProjectId, WorkspaceId};
use confidant_domain::{EventKind, EventSeverity, EventSource, EventTriggerer};
use serde_json::Value;

/// Immutable audit event payload emitted after successful mutations.
///
/// Entity references are weak: the event row outlives the referenced
/// resources, so project and environment ids are optional and never enforce
/// referential integrity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// Workspace scope for the event.
    pub workspace_id: WorkspaceId,
    /// Implicated project, when one still exists.
    pub project_id: Option<ProjectId>,
    /// Implicated environment, when one still exists.
    pub environment_id: Option<EnvironmentId>,
    /// Actor that caused the event.
    pub triggered_by: EventTriggerer,
    /// Kind of resource the event originates from.
    pub source: EventSource,
    /// Event severity.
    pub severity: EventSeverity,
    /// Stable event kind identifier.
    pub kind: EventKind,
    /// Short human-readable title.
    pub title: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// Free-form metadata payload.
    pub metadata: Value,
    /// Timestamp the triggering mutation completed.
    pub occurred_at: DateTime<Utc>,
}

/// Port for persisting append-only audit events.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Persists one audit event.
    async fn append_event(&self, event: EventRecord) -> AppResult<()>;
}
