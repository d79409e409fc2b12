//! # Role registry
//!
//! Owns every built [`RuleSet`] and answers queries by walking the role
//! graph breadth-first.
//!
//! ## Query resolution
//!
//! ```text
//! actor ─► role name ─► registered role? ──no──► MissingRole / default
//!                            │ yes
//!                            ▼
//!            queue = [role] ─► pop ─► RuleSet::evaluate
//!                 ▲                      │
//!                 │        no opinion    │ opinion
//!                 └── push parents ◄─────┴──────────► decision
//!
//! queue empty ─► default_query_response
//! ```
//!
//! Parents are pushed in declaration order, so a nearer ancestor always
//! wins over a more distant one. Each role is evaluated at most once per
//! query, which also makes cyclic parent declarations terminate.
//!
//! A role reachable along several paths is therefore not re-evaluated
//! after it has been dequeued. The decision is the same as with repeated
//! evaluation as long as predicates are pure, but a predicate with side
//! effects (counters, I/O) runs once per query rather than once per path.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::actor::Actor;
use crate::config::{EngineConfig, MissingParentPolicy};
use crate::error::{RbacError, RbacResult};
use crate::resources::{resource_identifier, Resource};
use crate::rules::RuleSet;
use crate::trace::{DecisionSource, QueryTrace, TraceStep};

/// Registry of named roles.
///
/// Filled once during configuration, then shared read-only between any
/// number of querying threads.
pub struct RoleRegistry<A: ?Sized = dyn Actor> {
    roles: Vec<RuleSet<A>>,
    index: HashMap<String, usize>,
    config: EngineConfig,
}

impl<A: ?Sized> Default for RoleRegistry<A> {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

impl<A: ?Sized> std::fmt::Debug for RoleRegistry<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleRegistry")
            .field("roles", &self.roles.iter().map(RuleSet::name).collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

impl<A: ?Sized> RoleRegistry<A> {
    /// Create an empty registry with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry with the given configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            roles: Vec::new(),
            index: HashMap::new(),
            config,
        }
    }

    /// The configuration queries are answered with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Add a uniquely named role.
    ///
    /// # Errors
    ///
    /// [`RbacError::DuplicateRole`] if a role of that name exists; the
    /// registered role is kept.
    pub fn add(&mut self, role: RuleSet<A>) -> RbacResult<()> {
        if self.index.contains_key(role.name()) {
            return Err(RbacError::DuplicateRole(role.name().to_string()));
        }
        tracing::debug!(role = %role.name(), parents = ?role.parents(), "Registered role");
        self.index.insert(role.name().to_string(), self.roles.len());
        self.roles.push(role);
        Ok(())
    }

    /// Find a role by name.
    pub fn get(&self, name: &str) -> Option<&RuleSet<A>> {
        self.index.get(name).map(|&i| &self.roles[i])
    }

    /// Check if a role of this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Number of registered roles.
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Check if no roles are registered.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Role names in registration order.
    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(RuleSet::name)
    }
}

impl<A: ?Sized + Actor> RoleRegistry<A> {
    /// Find the registered role an actor plays.
    pub fn resolve_actor_role(&self, actor: &A) -> Option<&RuleSet<A>> {
        actor.resolved_role().and_then(|name| self.get(&name))
    }

    /// Decide whether `actor` may perform `action` on `resource`.
    ///
    /// # Errors
    ///
    /// - [`RbacError::MissingRole`] when the actor's role is not registered
    ///   and `actor_must_play_role` is set
    /// - [`RbacError::MissingParentRole`] when an unregistered parent is
    ///   reached under [`MissingParentPolicy::Error`]
    ///
    /// Predicates run on the calling thread and may panic through this call.
    pub fn query(&self, actor: &A, resource: &dyn Resource, action: &str) -> RbacResult<bool> {
        self.resolve(actor, resource, action, |_| {})
            .map(|(decision, _)| decision)
    }

    /// Like [`query`](Self::query), also recording how the decision was made.
    pub fn query_traced(&self, actor: &A, resource: &dyn Resource, action: &str) -> RbacResult<QueryTrace> {
        let resource_id = resource_identifier(resource, self.config.all_types_are_resources);
        let mut trace = QueryTrace::start(
            actor.resolved_role().map(|r| r.into_owned()),
            resource_id.map(|r| r.into_owned()),
            action,
        );
        let (decision, source) = self.resolve(actor, resource, action, |step| trace.steps.push(step))?;
        trace.decision = decision;
        trace.source = source;
        Ok(trace)
    }

    fn resolve<F>(&self, actor: &A, resource: &dyn Resource, action: &str, mut on_step: F) -> RbacResult<(bool, DecisionSource)>
    where
        F: FnMut(TraceStep),
    {
        let role_name = actor.resolved_role();
        let Some(role) = role_name.as_deref().and_then(|name| self.get(name)) else {
            if self.config.actor_must_play_role {
                let name = role_name.map_or_else(|| "none".to_string(), |r| r.into_owned());
                return Err(RbacError::MissingRole(name));
            }
            tracing::debug!(role = ?role_name, action = %action, "Actor plays no registered role");
            return Ok((self.config.default_query_response, DecisionSource::NoRole));
        };

        let resource_id = resource_identifier(resource, self.config.all_types_are_resources);
        let resource_id = resource_id.as_deref();

        let mut queue: VecDeque<&RuleSet<A>> = VecDeque::from([role]);
        let mut queued: HashSet<&str> = HashSet::from([role.name()]);

        while let Some(current) = queue.pop_front() {
            let selected = current.select(resource_id, action);
            let result = selected.and_then(|(response, _)| response.evaluate(actor, resource, action));
            let matched = selected.map(|(_, source)| source);

            tracing::debug!(
                role = %current.name(),
                action = %action,
                resource = ?resource_id,
                matched = ?matched,
                result = ?result,
                "Queried role"
            );
            on_step(TraceStep {
                role: current.name().to_string(),
                matched,
                result,
            });

            if let (Some(decision), Some(matched)) = (result, matched) {
                return Ok((
                    decision,
                    DecisionSource::Rule {
                        role: current.name().to_string(),
                        matched,
                    },
                ));
            }

            for parent in current.parents() {
                match self.get(parent) {
                    Some(next) => {
                        if queued.insert(next.name()) {
                            queue.push_back(next);
                        }
                    }
                    None => match self.config.missing_parent {
                        MissingParentPolicy::Skip => {
                            tracing::warn!(role = %current.name(), parent = %parent, "Skipping unregistered parent role");
                        }
                        MissingParentPolicy::Error => {
                            return Err(RbacError::MissingParentRole {
                                role: current.name().to_string(),
                                parent: parent.clone(),
                            });
                        }
                    },
                }
            }
        }

        Ok((self.config.default_query_response, DecisionSource::Fallback))
    }
}
