/// Input for creating an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateEnvironmentInput {
    /// Environment name, unique within the project (case-sensitive).
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Whether the new environment becomes the project default.
    pub is_default: bool,
}

/// Input for partially updating an environment.
///
/// Absent fields are left unchanged; in particular an absent `is_default`
/// means "unchanged", not "false".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateEnvironmentInput {
    /// Replacement name.
    pub name: Option<String>,
    /// Replacement description.
    pub description: Option<String>,
    /// Replacement default flag.
    pub is_default: Option<bool>,
}
