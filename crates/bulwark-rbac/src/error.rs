//! Error types for role configuration and authorization queries
//!
//! Build-time errors abort the configuration pass. Query-time errors are
//! only raised when the engine is configured to be strict.

use thiserror::Error;

use crate::actions::ActionError;

/// Role engine error types.
#[derive(Debug, Error)]
pub enum RbacError {
    /// Action catalog failure (unknown or duplicate action/group)
    #[error(transparent)]
    Action(#[from] ActionError),

    /// A role with this name is already registered
    #[error("Role {0} already exists in the role registry")]
    DuplicateRole(String),

    /// A rule statement was issued with no role definition open
    #[error("Role permissions can only be defined inside a role definition")]
    OutsideRoleDefinition,

    /// `begin_role` was called before the previous role was finished
    #[error("Role {0} is still being defined")]
    RoleDefinitionInProgress(String),

    /// The actor's role could not be resolved
    #[error("Role {0} could not be found in the registry")]
    MissingRole(String),

    /// A declared parent role is not registered
    #[error("Parent role {parent} of {role} could not be found in the registry")]
    MissingParentRole {
        /// Role declaring the parent.
        role: String,
        /// Unresolvable parent name.
        parent: String,
    },

    /// The actor may not perform the action on the resource
    #[error("Role {role} doesn't have permission to {action} {resource}")]
    PermissionDenied {
        /// Role the actor plays, or `none`.
        role: String,
        /// Attempted action.
        action: String,
        /// Resource identifier, or `unnamed`.
        resource: String,
    },

    /// A resource declared no canonical name
    #[error("Resource of type {0} declares no name")]
    MissingResourceName(String),
}

/// Result type for role engine operations.
pub type RbacResult<T> = Result<T, RbacError>;

impl RbacError {
    /// Check if this error comes from building the configuration rather than
    /// from answering a query.
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            RbacError::Action(_)
                | RbacError::DuplicateRole(_)
                | RbacError::OutsideRoleDefinition
                | RbacError::RoleDefinitionInProgress(_)
                | RbacError::MissingResourceName(_)
        )
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            RbacError::Action(e) => e.error_code(),
            RbacError::DuplicateRole(_) => "DUPLICATE_ROLE",
            RbacError::OutsideRoleDefinition => "OUTSIDE_ROLE_DEFINITION",
            RbacError::RoleDefinitionInProgress(_) => "ROLE_DEFINITION_IN_PROGRESS",
            RbacError::MissingRole(_) => "MISSING_ROLE",
            RbacError::MissingParentRole { .. } => "MISSING_PARENT_ROLE",
            RbacError::PermissionDenied { .. } => "PERMISSION_DENIED",
            RbacError::MissingResourceName(_) => "MISSING_RESOURCE_NAME",
        }
    }
}
