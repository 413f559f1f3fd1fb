use std::str::FromStr;

use async_trait::async_trait;
use confidant_core::{AppError, AppResult, EnvironmentId, ProjectId, UserId};
use confidant_domain::Environment;

/// Sort fields accepted by environment listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnvironmentSortField {
    /// Sort by environment name.
    #[default]
    Name,
    /// Sort by creation timestamp.
    CreatedAt,
    /// Sort by last-update timestamp.
    UpdatedAt,
}

impl EnvironmentSortField {
    /// Returns the transport value for this sort field.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

impl FromStr for EnvironmentSortField {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "name" => Ok(Self::Name),
            "created_at" => Ok(Self::CreatedAt),
            "updated_at" => Ok(Self::UpdatedAt),
            _ => Err(AppError::Validation(format!(
                "unknown environment sort field '{value}'"
            ))),
        }
    }
}

/// Sort direction accepted by environment listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl SortOrder {
    /// Returns the transport value for this sort order.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(AppError::Validation(format!(
                "unknown sort order '{value}'"
            ))),
        }
    }
}

/// Page query for environment listings.
///
/// The offset is computed as `page * limit`, so pages are zero-origin; a
/// caller presenting one-origin page numbers skips the first page. This
/// mirrors the caller-facing surface this core was extracted from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentListQuery {
    /// Zero-origin page index in the offset arithmetic.
    pub page: u32,
    /// Maximum entries per page; must be greater than zero.
    pub limit: u32,
    /// Field to sort by.
    pub sort_field: EnvironmentSortField,
    /// Sort direction.
    pub sort_order: SortOrder,
    /// Case-sensitive substring filter on the environment name.
    pub search: String,
}

impl Default for EnvironmentListQuery {
    fn default() -> Self {
        Self {
            page: 0,
            limit: 10,
            sort_field: EnvironmentSortField::default(),
            sort_order: SortOrder::default(),
            search: String::new(),
        }
    }
}

/// Minimal projection of the user who last touched an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    /// User identifier.
    pub user_id: UserId,
    /// Display name at read time.
    pub display_name: String,
}

/// Listing row: the environment enriched with its last-updating user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentListItem {
    /// The environment.
    pub environment: Environment,
    /// The user who last mutated it, when known and not deleted.
    pub last_updated_by: Option<UserSummary>,
}

/// Default-flag instruction executed atomically with a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultTransition {
    /// Leave default flags untouched.
    Keep,
    /// Clear every default in the project, then set the target default,
    /// within the same transaction.
    Promote,
    /// Unset the target's default flag; fails with `InvalidOperation` when
    /// the target is the project's only environment. The count is read
    /// inside the same transaction as the write.
    Demote,
}

/// Write record for updating an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentUpdateRecord {
    /// Full post-update entity state to persist.
    pub environment: Environment,
    /// Default-flag instruction applied in the same transaction.
    pub default_transition: DefaultTransition,
}

/// Port for environment persistence.
///
/// Mutating operations are transactional: implementations must apply the
/// default-flag semantics and the row write as one atomic unit so concurrent
/// readers never observe zero or two defaults in a project.
#[async_trait]
pub trait EnvironmentRepository: Send + Sync {
    /// Inserts a new environment.
    ///
    /// When the entity carries the default flag, every existing default in
    /// the project is cleared within the same transaction.
    async fn create_environment(&self, environment: Environment) -> AppResult<()>;

    /// Persists an update together with its default-flag transition.
    async fn update_environment(&self, record: EnvironmentUpdateRecord) -> AppResult<()>;

    /// Deletes an environment row.
    ///
    /// The default flag is re-checked inside the delete itself, so a
    /// concurrent promotion of the target cannot slip past the caller's
    /// earlier read; deleting a default fails with `InvalidOperation`.
    async fn delete_environment(&self, environment_id: EnvironmentId) -> AppResult<()>;

    /// Returns whether any environment with this exact name exists in the
    /// project.
    async fn environment_name_exists(&self, project_id: ProjectId, name: &str)
    -> AppResult<bool>;

    /// Lists environments of a project with filtering, sorting and paging.
    async fn list_environments(
        &self,
        project_id: ProjectId,
        query: EnvironmentListQuery,
    ) -> AppResult<Vec<EnvironmentListItem>>;
}
