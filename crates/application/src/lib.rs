//! Application services and ports for environment management.

#![forbid(unsafe_code)]

mod authority_service;
mod environment_ports;
mod environment_service;
mod event_dispatcher;

pub use authority_service::AuthorityService;
pub use environment_ports::{
    AuthorityRepository, CreateEnvironmentInput, DefaultTransition, EnvironmentListItem,
    EnvironmentListQuery, EnvironmentRepository, EnvironmentScope, EnvironmentSortField,
    EnvironmentUpdateRecord, EventRecord, EventRepository, SortOrder, UpdateEnvironmentInput,
    UserSummary,
};
pub use environment_service::EnvironmentService;
pub use event_dispatcher::{DEFAULT_EVENT_QUEUE_CAPACITY, EventDispatcher, EventWriterHandle};
