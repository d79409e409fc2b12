//! # Bulwark RBAC (Role Graph Authorization)
//!
//! This crate decides whether an actor may perform an action on a resource,
//! using a graph of named roles that inherit from each other.
//!
//! ## Overview
//!
//! The bulwark-rbac crate handles:
//! - **Actions**: Atomic operations and named groups expanding to them
//! - **Roles**: Allow/deny rules per action and resource, plus parents
//! - **Registry**: Breadth-first resolution through the role graph
//! - **Authorizer**: One-pass configuration, queries and enforcement
//!
//! ## Architecture
//!
//! ```text
//! query(actor, resource, action)
//!   actor    -> role name        (Actor::resolved_role)
//!   resource -> identifier       (declared name, or type name when enabled)
//!   role     -> rules[action][identifier | _other] | action rule | default
//!            -> parents, breadth-first, nearest first
//!            -> EngineConfig::default_query_response
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use bulwark_rbac::{Authorizer, EngineConfig, RbacError, ResourceKey};
//!
//! let auth: Authorizer = Authorizer::configure(EngineConfig::default(), |c| {
//!     c.crud()?;
//!     c.action_group("manage", ["crud"])?;
//!     c.role("employee", &[], |r| r.declare("view", ["this", "that"], None))?;
//!     c.role("manager", &["employee"], |r| {
//!         r.declare("destroy", ["this"], None)?;
//!         r.deny(|r| r.declare("destroy", ["that"], None))
//!     })?;
//!     c.role("administrator", &[], |r| r.declare("manage", [ResourceKey::Other], None))
//! })
//! .unwrap();
//!
//! // Inherited from employee
//! assert!(auth.query(&"manager", &"that", "view").unwrap());
//! assert!(auth.query(&"manager", &"this", "destroy").unwrap());
//! assert!(!auth.query(&"manager", &"that", "destroy").unwrap());
//! assert!(auth.query(&"administrator", &"anything", "destroy").unwrap());
//!
//! // Enforcement
//! let err = auth.enforce(&"employee", &"this", "update").unwrap_err();
//! assert!(matches!(err, RbacError::PermissionDenied { .. }));
//! ```
//!
//! ## Threading
//!
//! Configuration runs once, single-threaded. Afterwards every type is
//! read-only, and queries may run concurrently from any number of threads.
//! Predicates run synchronously on the querying thread.

pub mod actions;
pub mod actor;
pub mod authorizer;
pub mod builder;
pub mod config;
pub mod error;
pub mod registry;
pub mod resources;
pub mod response;
pub mod rules;
pub mod trace;

// Re-export main types for convenience
pub use actions::{Action, ActionCatalog, ActionError, ActionResult};
pub use actor::Actor;
pub use authorizer::{Authorizer, Configurator};
pub use builder::RoleBuilder;
pub use config::{EngineConfig, MissingParentPolicy};
pub use error::{RbacError, RbacResult};
pub use registry::RoleRegistry;
pub use resources::{require_resource_name, resource_identifier, Resource, ResourceKey};
pub use response::{Condition, Polarity, Predicate, Response};
pub use rules::{ActionRule, MatchSource, ResourceRules, RuleSet};
pub use trace::{DecisionSource, QueryTrace, TraceStep};
