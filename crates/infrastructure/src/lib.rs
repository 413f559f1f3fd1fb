//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_event_repository;
mod in_memory_workspace_repository;
mod postgres_authority_repository;
mod postgres_environment_repository;
mod postgres_event_repository;

pub use in_memory_event_repository::InMemoryEventRepository;
pub use in_memory_workspace_repository::InMemoryWorkspaceRepository;
pub use postgres_authority_repository::PostgresAuthorityRepository;
pub use postgres_environment_repository::PostgresEnvironmentRepository;
pub use postgres_event_repository::PostgresEventRepository;
