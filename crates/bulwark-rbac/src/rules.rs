//! # Rule sets
//!
//! A [`RuleSet`] is the rule data of one role: responses keyed by action and
//! optionally by resource, a role-level default, and the names of the parent
//! roles consulted when this role has no opinion.
//!
//! Rule sets are assembled by [`RoleBuilder`](crate::builder::RoleBuilder)
//! and never change once built.
//!
//! ## Matching
//!
//! ```text
//! responses[action] ──┬─ resource rules ── exact name ─┐
//!                     │                  └─ _other ────┤
//!                     └─ action response ──────────────┤
//! default_response ────────────────────────────────────┤
//! Unset ◄──────────────────────────────────────────────┘ (nothing matched)
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::actions::Action;
use crate::actor::Actor;
use crate::resources::{resource_identifier, Resource, ResourceKey};
use crate::response::Response;

/// Where in a rule set a response was found.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    /// A rule keyed by the exact resource identifier.
    Resource,
    /// The `_other` rule of the action.
    Wildcard,
    /// A rule covering the action regardless of resource.
    Action,
    /// The role's default response.
    Default,
}

/// Resource-scoped responses of one action.
pub struct ResourceRules<A: ?Sized = dyn Actor> {
    named: HashMap<String, Response<A>>,
    other: Option<Response<A>>,
}

impl<A: ?Sized> ResourceRules<A> {
    fn new() -> Self {
        Self {
            named: HashMap::new(),
            other: None,
        }
    }

    /// Set the response for a key, replacing any earlier one.
    fn insert(&mut self, key: ResourceKey, response: Response<A>) {
        match key {
            ResourceKey::Named(name) => {
                self.named.insert(name, response);
            }
            ResourceKey::Other => self.other = Some(response),
        }
    }

    /// Get the response stored under a key.
    pub fn get(&self, key: &ResourceKey) -> Option<&Response<A>> {
        match key {
            ResourceKey::Named(name) => self.named.get(name),
            ResourceKey::Other => self.other.as_ref(),
        }
    }

    /// Pick the response for a resource identifier: the exact key first,
    /// then `_other`.
    pub fn select(&self, resource_id: Option<&str>) -> Option<(&Response<A>, MatchSource)> {
        if let Some(response) = resource_id.and_then(|id| self.named.get(id)) {
            return Some((response, MatchSource::Resource));
        }
        self.other.as_ref().map(|response| (response, MatchSource::Wildcard))
    }

    /// Number of keys, counting `_other`.
    pub fn len(&self) -> usize {
        self.named.len() + usize::from(self.other.is_some())
    }

    /// Check if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the stored keys and responses.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKey, &Response<A>)> {
        self.named
            .iter()
            .map(|(name, response)| (ResourceKey::named(name.as_str()), response))
            .chain(self.other.iter().map(|response| (ResourceKey::Other, response)))
    }
}

impl<A: ?Sized> Clone for ResourceRules<A> {
    fn clone(&self) -> Self {
        Self {
            named: self.named.clone(),
            other: self.other.clone(),
        }
    }
}

impl<A: ?Sized> PartialEq for ResourceRules<A> {
    fn eq(&self, other: &Self) -> bool {
        self.named == other.named && self.other == other.other
    }
}

impl<A: ?Sized> fmt::Debug for ResourceRules<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        map.entries(self.named.iter());
        if let Some(other) = &self.other {
            map.entry(&ResourceKey::OTHER, other);
        }
        map.finish()
    }
}

/// The rule stored for one action.
pub enum ActionRule<A: ?Sized = dyn Actor> {
    /// One response for every resource.
    Response(Response<A>),
    /// Responses keyed by resource.
    Resources(ResourceRules<A>),
}

impl<A: ?Sized> Clone for ActionRule<A> {
    fn clone(&self) -> Self {
        match self {
            ActionRule::Response(response) => ActionRule::Response(response.clone()),
            ActionRule::Resources(rules) => ActionRule::Resources(rules.clone()),
        }
    }
}

impl<A: ?Sized> PartialEq for ActionRule<A> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ActionRule::Response(a), ActionRule::Response(b)) => a == b,
            (ActionRule::Resources(a), ActionRule::Resources(b)) => a == b,
            _ => false,
        }
    }
}

impl<A: ?Sized> fmt::Debug for ActionRule<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionRule::Response(response) => response.fmt(f),
            ActionRule::Resources(rules) => rules.fmt(f),
        }
    }
}

/// The rules of one role.
pub struct RuleSet<A: ?Sized = dyn Actor> {
    name: String,
    responses: HashMap<Action, ActionRule<A>>,
    default_response: Option<Response<A>>,
    parents: Vec<String>,
}

impl<A: ?Sized> RuleSet<A> {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: HashMap::new(),
            default_response: None,
            parents: Vec::new(),
        }
    }

    /// Name of the role.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent role names in declaration order.
    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    /// The role-level default, if set.
    pub fn default_response(&self) -> Option<&Response<A>> {
        self.default_response.as_ref()
    }

    /// All action rules.
    pub fn responses(&self) -> &HashMap<Action, ActionRule<A>> {
        &self.responses
    }

    /// The rule stored for an action.
    pub fn rule(&self, action: &str) -> Option<&ActionRule<A>> {
        self.responses.get(action)
    }

    /// The resource-scoped response stored for an action and key.
    pub fn response_for(&self, action: &str, key: &ResourceKey) -> Option<&Response<A>> {
        match self.responses.get(action)? {
            ActionRule::Resources(rules) => rules.get(key),
            ActionRule::Response(_) => None,
        }
    }

    pub(crate) fn set_default(&mut self, response: Response<A>) {
        self.default_response = Some(response);
    }

    /// Append parents, skipping names already present.
    pub(crate) fn add_parents<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !self.parents.contains(&name) {
                self.parents.push(name);
            }
        }
    }

    /// Merge a resource-scoped response. Other keys of the action are kept;
    /// the same key is overwritten, and an action-level response is replaced
    /// by resource rules.
    pub(crate) fn merge_resource_response(&mut self, action: Action, key: ResourceKey, response: Response<A>) {
        let rule = self
            .responses
            .entry(action)
            .or_insert_with(|| ActionRule::Resources(ResourceRules::new()));
        if let ActionRule::Response(_) = rule {
            *rule = ActionRule::Resources(ResourceRules::new());
        }
        if let ActionRule::Resources(rules) = rule {
            rules.insert(key, response);
        }
    }

    /// Store an action-level response, replacing whatever the action had.
    pub(crate) fn set_action_response(&mut self, action: Action, response: Response<A>) {
        self.responses.insert(action, ActionRule::Response(response));
    }

    /// Select the response that governs a query, without evaluating it.
    ///
    /// # Arguments
    ///
    /// * `resource_id` - Canonical identifier of the resource, if any
    /// * `action` - The action being attempted
    pub fn select(&self, resource_id: Option<&str>, action: &str) -> Option<(&Response<A>, MatchSource)> {
        match self.responses.get(action) {
            Some(ActionRule::Response(response)) => return Some((response, MatchSource::Action)),
            Some(ActionRule::Resources(rules)) => {
                if let Some(found) = rules.select(resource_id) {
                    return Some(found);
                }
            }
            None => {}
        }
        self.default_response
            .as_ref()
            .map(|response| (response, MatchSource::Default))
    }

    /// Answer a query against this role alone, given the resource's
    /// canonical identifier. `None` means the role has no opinion.
    ///
    /// A selected predicate is called and its result returned as-is; the
    /// default is not consulted after a rule has been selected.
    pub fn evaluate(&self, actor: &A, resource: &dyn Resource, resource_id: Option<&str>, action: &str) -> Option<bool> {
        self.select(resource_id, action)
            .and_then(|(response, _)| response.evaluate(actor, resource, action))
    }

    /// Answer a query against this role alone, identifying the resource by
    /// its declared name only. A resource without one matches `_other`
    /// rules, even where a registry with `all_types_are_resources` would
    /// match it by type name; use [`query_with`](Self::query_with) there.
    pub fn query(&self, actor: &A, resource: &dyn Resource, action: &str) -> Option<bool> {
        self.query_with(actor, resource, action, false)
    }

    /// Answer a query against this role alone, falling back to the type
    /// name of the resource when `all_types_are_resources` is set.
    pub fn query_with(&self, actor: &A, resource: &dyn Resource, action: &str, all_types_are_resources: bool) -> Option<bool> {
        let resource_id = resource_identifier(resource, all_types_are_resources);
        self.evaluate(actor, resource, resource_id.as_deref(), action)
    }
}

impl<A: ?Sized> fmt::Debug for RuleSet<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("name", &self.name)
            .field("responses", &self.responses)
            .field("default_response", &self.default_response)
            .field("parents", &self.parents)
            .finish()
    }
}
