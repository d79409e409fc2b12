//! # Role builder
//!
//! Translates allow/deny statements into a [`RuleSet`].
//!
//! A session is opened with [`RoleBuilder::begin_role`] and closed with
//! [`RoleBuilder::end_role`]. Statements issued in between are compiled
//! against the ambient [`Polarity`], which starts as `Allow` and can be
//! flipped for the duration of a nested block with
//! [`RoleBuilder::with_polarity`] (or the `allow`/`deny` shorthands).
//!
//! ## Example
//!
//! ```
//! use bulwark_rbac::{ActionCatalog, RoleBuilder, RuleSet};
//!
//! let mut catalog = ActionCatalog::new();
//! catalog.add_crud().unwrap();
//!
//! let mut builder: RoleBuilder = RoleBuilder::new(&catalog);
//! let manager: RuleSet = builder
//!     .role("manager", &["employee"], |b| {
//!         b.declare("destroy", ["this"], None)?;
//!         b.deny(|b| b.declare("destroy", ["that"], None))
//!     })
//!     .unwrap();
//!
//! assert_eq!(manager.parents(), ["employee"]);
//! assert_eq!(manager.query(&"manager", &"this", "destroy"), Some(true));
//! assert_eq!(manager.query(&"manager", &"that", "destroy"), Some(false));
//! ```

use crate::actions::ActionCatalog;
use crate::actor::Actor;
use crate::error::{RbacError, RbacResult};
use crate::resources::{Resource, ResourceKey};
use crate::response::{Condition, Polarity, Response};
use crate::rules::RuleSet;

/// Build session producing one [`RuleSet`] at a time.
pub struct RoleBuilder<'c, A: ?Sized = dyn Actor> {
    catalog: &'c ActionCatalog,
    role: Option<RuleSet<A>>,
    polarity: Polarity,
}

impl<'c, A: ?Sized + 'static> RoleBuilder<'c, A> {
    /// Create a builder resolving action names through `catalog`.
    pub fn new(catalog: &'c ActionCatalog) -> Self {
        Self {
            catalog,
            role: None,
            polarity: Polarity::Allow,
        }
    }

    /// The catalog actions are resolved against.
    pub fn catalog(&self) -> &'c ActionCatalog {
        self.catalog
    }

    /// The polarity statements are currently compiled with.
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Check if a role definition is open.
    pub fn is_defining(&self) -> bool {
        self.role.is_some()
    }

    /// Open a new role definition.
    ///
    /// # Errors
    ///
    /// [`RbacError::RoleDefinitionInProgress`] if another role is still open.
    pub fn begin_role(&mut self, name: &str, parents: &[&str]) -> RbacResult<()> {
        if let Some(open) = &self.role {
            return Err(RbacError::RoleDefinitionInProgress(open.name().to_string()));
        }
        let mut role = RuleSet::new(name);
        role.add_parents(parents.iter().copied());
        self.role = Some(role);
        self.polarity = Polarity::Allow;
        Ok(())
    }

    fn current(&mut self) -> RbacResult<&mut RuleSet<A>> {
        self.role.as_mut().ok_or(RbacError::OutsideRoleDefinition)
    }

    /// Set the role's default response.
    pub fn set_default(&mut self, response: impl Into<Response<A>>) -> RbacResult<()> {
        let response = response.into();
        self.current()?.set_default(response);
        Ok(())
    }

    /// Append parent roles, skipping ones already declared.
    pub fn add_parents(&mut self, names: &[&str]) -> RbacResult<()> {
        self.current()?.add_parents(names.iter().copied());
        Ok(())
    }

    /// Declare a rule for an action or action group on some resources.
    ///
    /// No resources, or any [`ResourceKey::Other`] among them, declares the
    /// rule for `_other`. Without a condition the rule is the ambient
    /// polarity; with one it becomes a predicate comparing the condition's
    /// outcome with the polarity. Each action/resource pair overwrites any
    /// earlier rule for the same pair and leaves the others in place.
    ///
    /// # Errors
    ///
    /// - [`RbacError::OutsideRoleDefinition`] if no role is open
    /// - [`ActionError::UnknownActionOrGroup`](crate::ActionError) if
    ///   `action` is not registered
    pub fn declare<I, K>(&mut self, action: &str, resources: I, condition: Option<Condition<A>>) -> RbacResult<()>
    where
        I: IntoIterator<Item = K>,
        K: Into<ResourceKey>,
    {
        let catalog = self.catalog;
        let polarity = self.polarity;
        let role = self.current()?;
        let actions = catalog.resolve(action)?;

        let mut keys: Vec<ResourceKey> = resources.into_iter().map(Into::into).collect();
        if keys.is_empty() || keys.iter().any(ResourceKey::is_other) {
            keys = vec![ResourceKey::Other];
        }

        let response = match condition {
            Some(condition) => condition.into_response(polarity),
            None => Response::from(polarity),
        };

        for atomic in actions {
            for key in &keys {
                role.merge_resource_response(atomic.clone(), key.clone(), response.clone());
            }
        }
        tracing::trace!(
            role = %role.name(),
            action = %action,
            resources = keys.len(),
            polarity = ?polarity,
            "Declared rule"
        );
        Ok(())
    }

    /// Declare a rule whose condition is the supplied callback.
    pub fn declare_with<I, K, F>(&mut self, action: &str, resources: I, condition: F) -> RbacResult<()>
    where
        I: IntoIterator<Item = K>,
        K: Into<ResourceKey>,
        F: Fn(&A, &dyn Resource, &str) -> bool + Send + Sync + 'static,
    {
        self.declare(action, resources, Some(Condition::when(condition)))
    }

    /// Store a response for an action regardless of resource.
    pub fn respond(&mut self, action: &str, response: impl Into<Response<A>>) -> RbacResult<()> {
        let catalog = self.catalog;
        let role = self.current()?;
        let actions = catalog.resolve(action)?;
        let response = response.into();
        for atomic in actions {
            role.set_action_response(atomic.clone(), response.clone());
        }
        Ok(())
    }

    /// Run `body` with the ambient polarity set to `polarity`, restoring the
    /// previous polarity afterwards, whether or not `body` succeeds.
    pub fn with_polarity<F>(&mut self, polarity: Polarity, body: F) -> RbacResult<()>
    where
        F: FnOnce(&mut Self) -> RbacResult<()>,
    {
        self.current()?;
        let previous = std::mem::replace(&mut self.polarity, polarity);
        let result = body(self);
        self.polarity = previous;
        result
    }

    /// Run `body` with allowing statements.
    pub fn allow<F>(&mut self, body: F) -> RbacResult<()>
    where
        F: FnOnce(&mut Self) -> RbacResult<()>,
    {
        self.with_polarity(Polarity::Allow, body)
    }

    /// Run `body` with denying statements.
    pub fn deny<F>(&mut self, body: F) -> RbacResult<()>
    where
        F: FnOnce(&mut Self) -> RbacResult<()>,
    {
        self.with_polarity(Polarity::Deny, body)
    }

    /// Close the open role definition and hand out the finished rule set.
    pub fn end_role(&mut self) -> RbacResult<RuleSet<A>> {
        let role = self.role.take().ok_or(RbacError::OutsideRoleDefinition)?;
        self.polarity = Polarity::Allow;
        Ok(role)
    }

    /// Begin a role, run `body` against it and end it.
    ///
    /// If `body` fails the unfinished role is discarded.
    pub fn role<F>(&mut self, name: &str, parents: &[&str], body: F) -> RbacResult<RuleSet<A>>
    where
        F: FnOnce(&mut Self) -> RbacResult<()>,
    {
        self.begin_role(name, parents)?;
        if let Err(e) = body(self) {
            self.role = None;
            self.polarity = Polarity::Allow;
            return Err(e);
        }
        self.end_role()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionError;
    use crate::rules::ActionRule;

    fn catalog() -> ActionCatalog {
        let mut catalog = ActionCatalog::new();
        catalog.register_action("view").unwrap();
        catalog.register_action("update").unwrap();
        catalog.register_group("manage", ["view", "update"]).unwrap();
        catalog
    }

    fn build<F>(catalog: &ActionCatalog, body: F) -> RuleSet
    where
        F: FnOnce(&mut RoleBuilder<'_>) -> RbacResult<()>,
    {
        RoleBuilder::new(catalog).role("a_name", &[], body).unwrap()
    }

    fn key(name: &str) -> ResourceKey {
        ResourceKey::from(name)
    }

    struct Clerk {
        allowed: bool,
    }

    #[test]
    fn test_default_response() {
        let catalog = catalog();
        let role = build(&catalog, |b| b.set_default(false));
        assert!(role.responses().is_empty());
        assert_eq!(role.default_response(), Some(&Response::Deny));
        assert_eq!(role.query(&"x", &"y", "view"), Some(false));
    }

    #[test]
    fn test_unknown_action() {
        let catalog = catalog();
        let mut builder: RoleBuilder = RoleBuilder::new(&catalog);
        let err = builder
            .role("a_name", &[], |b| b.declare("launch", ["rocket"], None))
            .unwrap_err();
        assert!(matches!(err, RbacError::Action(ActionError::UnknownActionOrGroup(ref n)) if n == "launch"));
        assert!(!builder.is_defining());
    }

    #[test]
    fn test_statements_outside_role_definition() {
        let catalog = catalog();
        let mut builder: RoleBuilder = RoleBuilder::new(&catalog);
        assert!(matches!(builder.declare("view", ["foo"], None), Err(RbacError::OutsideRoleDefinition)));
        assert!(matches!(builder.set_default(true), Err(RbacError::OutsideRoleDefinition)));
        assert!(matches!(builder.add_parents(&["x"]), Err(RbacError::OutsideRoleDefinition)));
        assert!(matches!(builder.deny(|_| Ok(())), Err(RbacError::OutsideRoleDefinition)));
        assert!(matches!(builder.end_role(), Err(RbacError::OutsideRoleDefinition)));
    }

    #[test]
    fn test_begin_role_twice() {
        let catalog = catalog();
        let mut builder: RoleBuilder = RoleBuilder::new(&catalog);
        builder.begin_role("first", &[]).unwrap();
        assert!(matches!(
            builder.begin_role("second", &[]),
            Err(RbacError::RoleDefinitionInProgress(ref n)) if n == "first"
        ));
        assert_eq!(builder.end_role().unwrap().name(), "first");
    }

    #[test]
    fn test_allow_is_the_default_polarity() {
        let catalog = catalog();
        let implicit = build(&catalog, |b| {
            b.declare("view", ["foo"], None)?;
            b.declare("update", ["bar"], None)
        });
        let explicit = build(&catalog, |b| {
            b.allow(|b| {
                b.declare("view", ["foo"], None)?;
                b.declare("update", ["bar"], None)
            })
        });
        assert_eq!(implicit.responses(), explicit.responses());
        assert_eq!(implicit.response_for("view", &key("foo")), Some(&Response::Allow));
    }

    #[test]
    fn test_deny_block() {
        let catalog = catalog();
        let role = build(&catalog, |b| {
            b.deny(|b| {
                b.declare("view", ["foo"], None)?;
                b.declare("update", ["bar"], None)
            })
        });
        assert_eq!(role.response_for("view", &key("foo")), Some(&Response::Deny));
        assert_eq!(role.response_for("update", &key("bar")), Some(&Response::Deny));
    }

    #[test]
    fn test_polarity_restored_after_block() {
        let catalog = catalog();
        let role = build(&catalog, |b| {
            b.declare("view", ["foo"], None)?;
            b.deny(|b| b.declare("update", ["foo"], None))?;
            b.declare("view", ["bar"], None)
        });
        assert_eq!(role.response_for("view", &key("foo")), Some(&Response::Allow));
        assert_eq!(role.response_for("view", &key("bar")), Some(&Response::Allow));
        assert_eq!(role.response_for("update", &key("foo")), Some(&Response::Deny));
    }

    #[test]
    fn test_nested_blocks_innermost_wins() {
        let catalog = catalog();
        let role = build(&catalog, |b| {
            b.allow(|b| {
                b.deny(|b| b.declare("update", ["foo"], None))?;
                assert_eq!(b.polarity(), Polarity::Allow);
                b.declare("update", ["bar"], None)
            })
        });
        assert_eq!(role.response_for("update", &key("foo")), Some(&Response::Deny));
        assert_eq!(role.response_for("update", &key("bar")), Some(&Response::Allow));
    }

    #[test]
    fn test_polarity_restored_when_block_fails() {
        let catalog = catalog();
        let mut builder: RoleBuilder = RoleBuilder::new(&catalog);
        builder.begin_role("a_name", &[]).unwrap();
        assert!(builder.deny(|b| b.declare("launch", ["x"], None)).is_err());
        assert_eq!(builder.polarity(), Polarity::Allow);
    }

    #[test]
    fn test_all_resources() {
        let catalog = catalog();
        let explicit = build(&catalog, |b| b.declare("view", [ResourceKey::Other], None));
        let implicit = build(&catalog, |b| b.declare("view", Vec::<ResourceKey>::new(), None));
        let mixed = build(&catalog, |b| b.declare("view", [key("foo"), ResourceKey::Other], None));

        for role in [&explicit, &implicit, &mixed] {
            assert!(matches!(role.rule("view"), Some(ActionRule::Resources(r)) if r.len() == 1));
            assert_eq!(role.response_for("view", &ResourceKey::Other), Some(&Response::Allow));
        }
    }

    #[test]
    fn test_multiple_resources() {
        let catalog = catalog();
        let role = build(&catalog, |b| b.declare("update", ["this", "that"], None));
        assert_eq!(role.response_for("update", &key("this")), Some(&Response::Allow));
        assert_eq!(role.response_for("update", &key("that")), Some(&Response::Allow));
    }

    #[test]
    fn test_group_expansion_matches_individual_declarations() {
        let catalog = catalog();
        let grouped = build(&catalog, |b| b.declare("manage", [ResourceKey::Other], None));
        let individual = build(&catalog, |b| {
            b.declare("view", [ResourceKey::Other], None)?;
            b.declare("update", [ResourceKey::Other], None)
        });
        assert_eq!(grouped.responses(), individual.responses());
    }

    #[test]
    fn test_declarations_merge() {
        let catalog = catalog();
        let role = build(&catalog, |b| {
            b.declare("update", ["this", "that"], None)?;
            b.deny(|b| b.declare("update", [ResourceKey::Other], None))
        });
        assert_eq!(role.response_for("update", &key("this")), Some(&Response::Allow));
        assert_eq!(role.response_for("update", &key("that")), Some(&Response::Allow));
        assert_eq!(role.response_for("update", &ResourceKey::Other), Some(&Response::Deny));
    }

    #[test]
    fn test_last_declaration_wins() {
        let catalog = catalog();
        let role = build(&catalog, |b| {
            b.declare("update", ["this"], None)?;
            b.deny(|b| b.declare("update", ["this"], None))
        });
        assert_eq!(role.response_for("update", &key("this")), Some(&Response::Deny));
    }

    #[test]
    fn test_conditions() {
        let catalog = catalog();
        let role: RuleSet<Clerk> = RoleBuilder::new(&catalog)
            .role("clerk", &[], |b| {
                b.declare("update", ["foo"], Some(Condition::when(|c: &Clerk, _: &dyn Resource, _: &str| c.allowed)))?;
                b.declare("update", ["bar"], Some(Condition::unless(|c: &Clerk, _: &dyn Resource, _: &str| c.allowed)))?;
                b.declare_with("update", ["baz"], |c: &Clerk, _: &dyn Resource, _: &str| c.allowed)?;
                b.deny(|b| b.declare_with("view", ["foo"], |c: &Clerk, _: &dyn Resource, _: &str| c.allowed))
            })
            .unwrap();

        let good = Clerk { allowed: true };
        let bad = Clerk { allowed: false };

        assert_eq!(role.query(&good, &"foo", "update"), Some(true));
        assert_eq!(role.query(&bad, &"foo", "update"), Some(false));
        assert_eq!(role.query(&good, &"bar", "update"), Some(false));
        assert_eq!(role.query(&bad, &"bar", "update"), Some(true));
        assert_eq!(role.query(&good, &"baz", "update"), Some(true));
        assert_eq!(role.query(&bad, &"baz", "update"), Some(false));
        // under deny the predicate is true when the condition is false
        assert_eq!(role.query(&good, &"foo", "view"), Some(false));
        assert_eq!(role.query(&bad, &"foo", "view"), Some(true));
    }

    #[test]
    fn test_condition_shared_across_expansion() {
        let catalog = catalog();
        let role: RuleSet<Clerk> = RoleBuilder::new(&catalog)
            .role("clerk", &[], |b| {
                b.declare_with("manage", ["a", "b"], |c: &Clerk, _: &dyn Resource, _: &str| c.allowed)
            })
            .unwrap();
        let first = role.response_for("view", &key("a"));
        assert!(matches!(first, Some(Response::Predicate(_))));
        assert_eq!(first, role.response_for("update", &key("b")));
    }

    #[test]
    fn test_action_level_response() {
        let catalog = catalog();
        let role = build(&catalog, |b| b.respond("manage", true));
        assert!(matches!(role.rule("view"), Some(ActionRule::Response(Response::Allow))));
        assert!(matches!(role.rule("update"), Some(ActionRule::Response(Response::Allow))));
        assert_eq!(role.query(&"x", &"anything", "update"), Some(true));
    }

    #[test]
    fn test_parents() {
        let catalog = catalog();
        let mut builder: RoleBuilder = RoleBuilder::new(&catalog);
        let role = builder
            .role("name", &["foo", "bar"], |b| {
                b.add_parents(&["baz"])?;
                b.add_parents(&["foo", "qux"])
            })
            .unwrap();
        assert_eq!(role.parents(), ["foo", "bar", "baz", "qux"]);
    }

    #[test]
    fn test_role_without_parents() {
        let catalog = catalog();
        let mut builder: RoleBuilder = RoleBuilder::new(&catalog);
        let role = builder.role("root", &[], |b| b.add_parents(&[])).unwrap();
        assert!(role.parents().is_empty());
    }

    #[test]
    fn test_builder_reusable_after_end() {
        let catalog = catalog();
        let mut builder: RoleBuilder = RoleBuilder::new(&catalog);
        let first = builder.role("first", &[], |b| b.deny(|b| b.declare("view", ["x"], None))).unwrap();
        let second = builder.role("second", &[], |b| b.declare("view", ["x"], None)).unwrap();
        assert_eq!(first.response_for("view", &key("x")), Some(&Response::Deny));
        assert_eq!(second.response_for("view", &key("x")), Some(&Response::Allow));
    }
}
