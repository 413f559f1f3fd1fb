use chrono::{DateTime, Utc};
use confidant_core::{AppResult, EnvironmentId, NonEmptyString, ProjectId, UserId};
use serde::{Deserialize, Serialize};

/// Named deployment context within a project.
///
/// Within a project at most one environment carries the default flag, and a
/// project with at least one environment keeps exactly one default. The
/// service layer enforces this; the entity only stores the flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    environment_id: EnvironmentId,
    project_id: ProjectId,
    name: NonEmptyString,
    description: Option<String>,
    is_default: bool,
    last_updated_by: Option<UserId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Partial update applied to an existing environment.
///
/// Absent fields keep their previous value; an absent `is_default` means
/// "unchanged", not "false".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentUpdate {
    /// Replacement name, when renaming.
    pub name: Option<String>,
    /// Replacement description.
    pub description: Option<String>,
    /// Replacement default flag.
    pub is_default: Option<bool>,
}

impl Environment {
    /// Creates a validated environment entity.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        environment_id: EnvironmentId,
        project_id: ProjectId,
        name: impl Into<String>,
        description: Option<String>,
        is_default: bool,
        last_updated_by: Option<UserId>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            environment_id,
            project_id,
            name: NonEmptyString::new(name)?,
            description,
            is_default,
            last_updated_by,
            created_at,
            updated_at,
        })
    }

    /// Applies a partial update, returning the updated entity.
    pub fn with_updates(
        &self,
        update: EnvironmentUpdate,
        updated_by: UserId,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        let name = match update.name {
            Some(name) => NonEmptyString::new(name)?,
            None => self.name.clone(),
        };

        Ok(Self {
            environment_id: self.environment_id,
            project_id: self.project_id,
            name,
            description: update.description.or_else(|| self.description.clone()),
            is_default: update.is_default.unwrap_or(self.is_default),
            last_updated_by: Some(updated_by),
            created_at: self.created_at,
            updated_at,
        })
    }

    /// Returns a copy with the default flag replaced, leaving authorship and
    /// timestamps untouched.
    #[must_use]
    pub fn with_default_flag(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }

    /// Returns the environment identifier.
    #[must_use]
    pub fn environment_id(&self) -> EnvironmentId {
        self.environment_id
    }

    /// Returns the owning project identifier.
    #[must_use]
    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the environment name, unique within its project.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns whether this is the project's default environment.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Returns the user who last mutated this environment, when known.
    #[must_use]
    pub fn last_updated_by(&self) -> Option<UserId> {
        self.last_updated_by
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last-update timestamp.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
