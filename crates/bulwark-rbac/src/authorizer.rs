//! # Authorizer
//!
//! Facade pairing an [`ActionCatalog`] with a [`RoleRegistry`].
//!
//! Both are populated in one configuration pass through a [`Configurator`].
//! If any statement of the pass fails, the error is returned and nothing
//! that was built so far survives; a successfully configured authorizer is
//! read-only and can be shared between threads.
//!
//! ## Example
//!
//! ```
//! use bulwark_rbac::{Authorizer, EngineConfig};
//!
//! let auth: Authorizer = Authorizer::configure(EngineConfig::default(), |c| {
//!     c.crud()?;
//!     c.action_group("edit", ["view", "update"])?;
//!     c.role("employee", &[], |r| r.declare("view", ["report"], None))?;
//!     c.role("manager", &["employee"], |r| {
//!         r.declare("edit", ["report"], None)?;
//!         r.deny(|r| r.declare("destroy", ["report"], None))
//!     })
//! })
//! .unwrap();
//!
//! assert!(auth.query(&"manager", &"report", "view").unwrap());
//! assert!(auth.query(&"manager", &"report", "update").unwrap());
//! assert!(!auth.query(&"employee", &"report", "update").unwrap());
//! assert!(auth.enforce(&"manager", &"report", "destroy").is_err());
//! ```

use std::borrow::Cow;

use crate::actions::{ActionCatalog, ActionError};
use crate::actor::Actor;
use crate::builder::RoleBuilder;
use crate::config::EngineConfig;
use crate::error::{RbacError, RbacResult};
use crate::registry::RoleRegistry;
use crate::resources::{resource_identifier, Resource};
use crate::trace::QueryTrace;

/// Handle used during a configuration pass.
pub struct Configurator<A: ?Sized + 'static = dyn Actor> {
    catalog: ActionCatalog,
    registry: RoleRegistry<A>,
}

impl<A: ?Sized + 'static> Configurator<A> {
    /// Register an atomic action.
    pub fn action(&mut self, name: &str) -> RbacResult<()> {
        Ok(self.catalog.register_action(name)?)
    }

    /// Register an atomic action with its able alias.
    pub fn ability(&mut self, name: &str, able: &str) -> RbacResult<()> {
        Ok(self.catalog.register_ability(name, able)?)
    }

    /// Register the CRUD actions and the `crud` group.
    pub fn crud(&mut self) -> RbacResult<()> {
        Ok(self.catalog.add_crud()?)
    }

    /// Register an action group.
    pub fn action_group<I, S>(&mut self, name: &str, members: I) -> RbacResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(self.catalog.register_group(name, members)?)
    }

    /// Define a role and add it to the registry.
    ///
    /// # Arguments
    ///
    /// * `name` - Unique role name
    /// * `parents` - Roles consulted, in order, when this one has no opinion
    /// * `body` - Rule statements of the role
    pub fn role<F>(&mut self, name: &str, parents: &[&str], body: F) -> RbacResult<()>
    where
        F: FnOnce(&mut RoleBuilder<'_, A>) -> RbacResult<()>,
    {
        let role = RoleBuilder::new(&self.catalog).role(name, parents, body)?;
        self.registry.add(role)
    }

    /// The catalog built so far.
    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }
}

/// Configured authorization engine.
pub struct Authorizer<A: ?Sized + 'static = dyn Actor> {
    catalog: ActionCatalog,
    registry: RoleRegistry<A>,
}

impl<A: ?Sized + 'static> std::fmt::Debug for Authorizer<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer")
            .field("catalog", &self.catalog)
            .field("registry", &self.registry)
            .finish()
    }
}

impl<A: ?Sized + 'static> Authorizer<A> {
    /// Run a configuration pass.
    ///
    /// # Errors
    ///
    /// Whatever the first failing statement of `body` returned.
    pub fn configure<F>(config: EngineConfig, body: F) -> RbacResult<Self>
    where
        F: FnOnce(&mut Configurator<A>) -> RbacResult<()>,
    {
        let mut configurator = Configurator {
            catalog: ActionCatalog::new(),
            registry: RoleRegistry::with_config(config),
        };
        body(&mut configurator)?;

        tracing::info!(
            actions = configurator.catalog.actions().len(),
            roles = configurator.registry.len(),
            "Authorization configured"
        );
        Ok(Self::from_parts(configurator.catalog, configurator.registry))
    }

    /// Assemble an authorizer from a catalog and registry built separately.
    pub fn from_parts(catalog: ActionCatalog, registry: RoleRegistry<A>) -> Self {
        Self { catalog, registry }
    }

    /// The action catalog.
    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    /// The role registry.
    pub fn registry(&self) -> &RoleRegistry<A> {
        &self.registry
    }
}

impl<A: ?Sized + Actor + 'static> Authorizer<A> {
    /// Decide whether `actor` may perform `action` on `resource`.
    pub fn query(&self, actor: &A, resource: &dyn Resource, action: &str) -> RbacResult<bool> {
        self.registry.query(actor, resource, action)
    }

    /// Decide and record how the decision was made.
    pub fn query_traced(&self, actor: &A, resource: &dyn Resource, action: &str) -> RbacResult<QueryTrace> {
        self.registry.query_traced(actor, resource, action)
    }

    /// Decide using the able alias of an action (`viewable` for `view`).
    ///
    /// # Errors
    ///
    /// [`ActionError::UnknownActionOrGroup`] if no action has that alias.
    pub fn query_able(&self, actor: &A, resource: &dyn Resource, able: &str) -> RbacResult<bool> {
        let action = self
            .catalog
            .action_for_able(able)
            .ok_or_else(|| ActionError::UnknownActionOrGroup(able.to_string()))?;
        self.query(actor, resource, action.as_str())
    }

    /// Require permission for an action.
    ///
    /// # Errors
    ///
    /// - [`ActionError::UnknownActionOrGroup`] if `action` is not a
    ///   registered atomic action
    /// - [`RbacError::PermissionDenied`] if the decision is negative
    /// - any error of [`RoleRegistry::query`]
    pub fn enforce(&self, actor: &A, resource: &dyn Resource, action: &str) -> RbacResult<()> {
        if !self.catalog.is_action(action) {
            return Err(ActionError::UnknownActionOrGroup(action.to_string()).into());
        }
        if self.query(actor, resource, action)? {
            return Ok(());
        }

        let role = actor.resolved_role().map_or_else(|| "none".to_string(), Cow::into_owned);
        let resource = resource_identifier(resource, self.registry.config().all_types_are_resources)
            .map_or_else(|| "unnamed".to_string(), Cow::into_owned);
        tracing::debug!(role = %role, action = %action, resource = %resource, "Permission denied");
        Err(RbacError::PermissionDenied {
            role,
            action: action.to_string(),
            resource,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Condition;

    struct Member {
        role: &'static str,
        active: bool,
    }

    impl Actor for Member {
        fn role_name(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.role))
        }
    }

    fn authorizer() -> Authorizer<Member> {
        Authorizer::configure(EngineConfig::default(), |c| {
            c.crud()?;
            c.ability("publish", "publishable")?;
            c.role("member", &[], |r| {
                r.declare("view", ["post"], None)?;
                r.declare("publish", ["post"], Some(Condition::when(|m: &Member, _: &dyn Resource, _: &str| m.active)))
            })?;
            c.role("moderator", &["member"], |r| r.declare("crud", ["post"], None))
        })
        .unwrap()
    }

    #[test]
    fn test_configure_builds_catalog_and_registry() {
        let auth = authorizer();
        assert!(auth.catalog().is_action("publish"));
        assert!(auth.catalog().contains("crud"));
        assert_eq!(auth.registry().role_names().collect::<Vec<_>>(), vec!["member", "moderator"]);
    }

    #[test]
    fn test_configure_aborts_on_first_error() {
        let result: RbacResult<Authorizer> = Authorizer::configure(EngineConfig::default(), |c| {
            c.action("view")?;
            c.role("a", &[], |_| Ok(()))?;
            c.role("a", &[], |_| Ok(()))
        });
        assert!(matches!(result, Err(RbacError::DuplicateRole(ref n)) if n == "a"));

        let result: RbacResult<Authorizer> = Authorizer::configure(EngineConfig::default(), |c| {
            c.role("a", &[], |r| r.declare("view", ["x"], None))
        });
        let err = result.unwrap_err();
        assert!(err.is_build_error());
        assert_eq!(err.error_code(), "UNKNOWN_ACTION_OR_GROUP");
    }

    #[test]
    fn test_query_through_parents() {
        let auth = authorizer();
        let moderator = Member { role: "moderator", active: false };
        let member = Member { role: "member", active: true };

        assert!(auth.query(&moderator, &"post", "destroy").unwrap());
        assert!(!auth.query(&member, &"post", "destroy").unwrap());
        assert!(auth.query(&member, &"post", "publish").unwrap());
        assert!(!auth.query(&moderator, &"post", "publish").unwrap());
    }

    #[test]
    fn test_query_able() {
        let auth = authorizer();
        let member = Member { role: "member", active: true };
        assert!(auth.query_able(&member, &"post", "viewable").unwrap());
        assert!(!auth.query_able(&member, &"post", "updatable").unwrap());
        assert!(matches!(
            auth.query_able(&member, &"post", "flyable"),
            Err(RbacError::Action(ActionError::UnknownActionOrGroup(ref n))) if n == "flyable"
        ));
    }

    #[test]
    fn test_enforce() {
        let auth = authorizer();
        let member = Member { role: "member", active: false };

        assert!(auth.enforce(&member, &"post", "view").is_ok());

        let err = auth.enforce(&member, &"post", "update").unwrap_err();
        assert_eq!(err.error_code(), "PERMISSION_DENIED");
        assert_eq!(err.to_string(), "Role member doesn't have permission to update post");
        assert!(!err.is_build_error());

        assert!(matches!(
            auth.enforce(&member, &"post", "crud"),
            Err(RbacError::Action(ActionError::UnknownActionOrGroup(_)))
        ));
    }

    #[test]
    fn test_enforce_on_unnamed_resource() {
        struct Blob;
        impl Resource for Blob {}

        let auth = authorizer();
        let member = Member { role: "member", active: true };
        assert!(matches!(
            auth.enforce(&member, &Blob, "view"),
            Err(RbacError::PermissionDenied { ref resource, .. }) if resource == "unnamed"
        ));
    }
}
