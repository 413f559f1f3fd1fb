use serde::{Deserialize, Serialize};

use crate::UserId;

/// Authenticated caller passed into every service operation.
///
/// Workspace scope is not carried here: it is derived from the resource a
/// caller addresses, so one principal can act across several workspaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    user_id: UserId,
    display_name: String,
}

impl Principal {
    /// Creates a principal from authentication data.
    #[must_use]
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
        }
    }

    /// Returns the stable user identifier.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the display name for the current user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }
}
