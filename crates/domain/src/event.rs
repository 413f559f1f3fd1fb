use confidant_core::UserId;
use serde::{Deserialize, Serialize};

/// Stable audit event kinds emitted by application services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Emitted when an environment is created.
    EnvironmentAdded,
    /// Emitted when an environment is updated.
    EnvironmentUpdated,
    /// Emitted when an environment is deleted.
    EnvironmentDeleted,
}

impl EventKind {
    /// Returns a stable storage value for this event kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnvironmentAdded => "environment.added",
            Self::EnvironmentUpdated => "environment.updated",
            Self::EnvironmentDeleted => "environment.deleted",
        }
    }
}

/// Kind of resource an audit event originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// Workspace-level event.
    Workspace,
    /// Project-level event.
    Project,
    /// Environment-level event.
    Environment,
    /// Secret-level event.
    Secret,
    /// Variable-level event.
    Variable,
}

impl EventSource {
    /// Returns a stable storage value for this source kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Workspace => "workspace",
            Self::Project => "project",
            Self::Environment => "environment",
            Self::Secret => "secret",
            Self::Variable => "variable",
        }
    }
}

/// Severity attached to an audit event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    /// Routine domain mutation.
    #[default]
    Info,
    /// Unusual but recoverable condition.
    Warn,
    /// Failed or rejected operation worth flagging.
    Error,
}

impl EventSeverity {
    /// Returns a stable storage value for this severity.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Actor that caused an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTriggerer {
    /// A user-initiated mutation.
    User(UserId),
    /// A system-initiated mutation.
    System,
}

impl EventTriggerer {
    /// Returns a stable storage value for the triggerer kind.
    #[must_use]
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::System => "system",
        }
    }

    /// Returns the triggering user, when one exists.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(user_id) => Some(*user_id),
            Self::System => None,
        }
    }
}
