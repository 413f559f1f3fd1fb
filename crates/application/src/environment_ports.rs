//! Ports consumed by the environment management services.

mod authority;
mod events;
mod inputs;
mod repository;

pub use authority::{AuthorityRepository, EnvironmentScope};
pub use events::{EventRecord, EventRepository};
pub use inputs::{CreateEnvironmentInput, UpdateEnvironmentInput};
pub use repository::{
    DefaultTransition, EnvironmentListItem, EnvironmentListQuery, EnvironmentRepository,
    EnvironmentSortField, EnvironmentUpdateRecord, SortOrder, UserSummary,
};
