//! Domain model for permission-scoped environment management.

#![forbid(unsafe_code)]

mod authority;
mod environment;
mod event;
mod project;

pub use authority::{Authority, WorkspaceRole, effective_authorities};
pub use environment::{Environment, EnvironmentUpdate};
pub use event::{EventKind, EventSeverity, EventSource, EventTriggerer};
pub use project::Project;
