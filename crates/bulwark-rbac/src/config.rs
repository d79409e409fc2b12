//! Engine configuration.
//!
//! Configuration is fixed when a registry is built and never changes while
//! queries are being answered. Values can be loaded from environment
//! variables with defaults suitable for a closed-by-default deployment.

use serde::{Deserialize, Serialize};

/// What to do when a role names a parent that is not registered.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissingParentPolicy {
    /// Skip the parent and keep traversing.
    #[default]
    Skip,
    /// Fail the query with [`RbacError::MissingParentRole`](crate::RbacError).
    Error,
}

impl MissingParentPolicy {
    /// Parse a policy from its string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "skip" | "ignore" => Some(Self::Skip),
            "error" | "strict" => Some(Self::Error),
            _ => None,
        }
    }

    /// Get the string representation of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Error => "error",
        }
    }
}

/// Process-wide query settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Decision returned when nothing in the role graph applies.
    pub default_query_response: bool,

    /// Whether an actor without a registered role is an error rather than
    /// a fallback to `default_query_response`.
    pub actor_must_play_role: bool,

    /// Whether resources without a declared name are identified by their
    /// type name.
    pub all_types_are_resources: bool,

    /// Handling of unregistered parent roles during traversal.
    pub missing_parent: MissingParentPolicy,
}

impl Default for EngineConfig {
    /// Deny by default, tolerate actors without roles, no type-derived
    /// resource names, skip unknown parents.
    fn default() -> Self {
        Self {
            default_query_response: false,
            actor_must_play_role: false,
            all_types_are_resources: false,
            missing_parent: MissingParentPolicy::Skip,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `BULWARK_DEFAULT_QUERY_RESPONSE`: fallback decision (default: false)
    /// - `BULWARK_ACTOR_MUST_PLAY_ROLE`: fail on unknown roles (default: false)
    /// - `BULWARK_ALL_TYPES_ARE_RESOURCES`: type-derived resource names (default: false)
    /// - `BULWARK_MISSING_PARENT`: `skip` or `error` (default: skip)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            default_query_response: env_flag("BULWARK_DEFAULT_QUERY_RESPONSE")
                .unwrap_or(default.default_query_response),
            actor_must_play_role: env_flag("BULWARK_ACTOR_MUST_PLAY_ROLE")
                .unwrap_or(default.actor_must_play_role),
            all_types_are_resources: env_flag("BULWARK_ALL_TYPES_ARE_RESOURCES")
                .unwrap_or(default.all_types_are_resources),
            missing_parent: std::env::var("BULWARK_MISSING_PARENT")
                .ok()
                .and_then(|s| MissingParentPolicy::parse(&s))
                .unwrap_or(default.missing_parent),
        }
    }

    /// Set the fallback decision.
    pub fn with_default_query_response(mut self, response: bool) -> Self {
        self.default_query_response = response;
        self
    }

    /// Require every actor to play a registered role.
    pub fn with_actor_must_play_role(mut self, required: bool) -> Self {
        self.actor_must_play_role = required;
        self
    }

    /// Allow type-derived resource names.
    pub fn with_all_types_are_resources(mut self, enabled: bool) -> Self {
        self.all_types_are_resources = enabled;
        self
    }

    /// Set the policy for unregistered parent roles.
    pub fn with_missing_parent(mut self, policy: MissingParentPolicy) -> Self {
        self.missing_parent = policy;
        self
    }
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key).ok().and_then(|s| parse_flag(&s))
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
