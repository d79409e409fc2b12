//! # Actions
//!
//! Atomic actions and the named groups that alias them.
//!
//! Groups are expanded eagerly when they are registered: a group stores the
//! already-resolved atomic actions of its members, never another group's
//! name. Every atomic action is also a group of itself, so resolving any
//! registered name is a single lookup.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Action catalog errors.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The name is already registered with a different definition.
    #[error("Action {0} is already registered")]
    DuplicateAction(String),

    /// The name is neither a registered action nor a registered group.
    #[error("Action or group {0} could not be found")]
    UnknownActionOrGroup(String),

    /// A group was declared that resolves to no actions.
    #[error("Action group {0} resolves to no actions")]
    EmptyActionGroup(String),
}

/// Result type for action catalog operations.
pub type ActionResult<T> = Result<T, ActionError>;

impl ActionError {
    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            ActionError::DuplicateAction(_) => "DUPLICATE_ACTION",
            ActionError::UnknownActionOrGroup(_) => "UNKNOWN_ACTION_OR_GROUP",
            ActionError::EmptyActionGroup(_) => "EMPTY_ACTION_GROUP",
        }
    }
}

/// An atomic permission verb such as `view` or `update`.
///
/// Actions are opaque identifiers; equality is by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Action(String);

impl Action {
    /// Create an action from its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the string representation of the action.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Action {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Action {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Action {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// The CRUD actions and their able aliases, in registration order.
pub const CRUD_ACTIONS: [(&str, &str); 4] = [
    ("create", "creatable"),
    ("view", "viewable"),
    ("update", "updatable"),
    ("destroy", "destroyable"),
];

/// Name of the group registered by [`ActionCatalog::add_crud`].
pub const CRUD_GROUP: &str = "crud";

/// Registry of atomic actions and action groups.
///
/// # Example
///
/// ```
/// use bulwark_rbac::actions::ActionCatalog;
///
/// let mut catalog = ActionCatalog::new();
/// catalog.register_action("view").unwrap();
/// catalog.register_action("update").unwrap();
/// catalog.register_group("manage", ["view", "update"]).unwrap();
///
/// let names: Vec<&str> = catalog.resolve("manage").unwrap().iter().map(|a| a.as_str()).collect();
/// assert_eq!(names, vec!["view", "update"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ActionCatalog {
    /// Atomic actions mapped to their optional able alias.
    actions: HashMap<Action, Option<String>>,
    /// Atomic actions in registration order.
    order: Vec<Action>,
    /// Every registered name mapped to its resolved atomic actions.
    resolved: HashMap<String, Vec<Action>>,
    crud: bool,
}

impl ActionCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an atomic action with no able alias.
    ///
    /// Registering the same action again is a no-op; registering a name that
    /// is already a group, or an action that carries an alias, fails.
    pub fn register_action(&mut self, name: &str) -> ActionResult<()> {
        self.insert_action(name, None)
    }

    /// Register an atomic action together with its able alias
    /// (`view` / `viewable`).
    ///
    /// # Arguments
    ///
    /// * `name` - The action name
    /// * `able` - The resource-side alias of the action
    ///
    /// # Errors
    ///
    /// [`ActionError::DuplicateAction`] if `name` is already registered with
    /// a different alias or is the name of a group.
    pub fn register_ability(&mut self, name: &str, able: &str) -> ActionResult<()> {
        self.insert_action(name, Some(able))
    }

    fn insert_action(&mut self, name: &str, able: Option<&str>) -> ActionResult<()> {
        if let Some(existing) = self.actions.get(name) {
            return if existing.as_deref() == able {
                Ok(())
            } else {
                Err(ActionError::DuplicateAction(name.to_string()))
            };
        }
        if self.resolved.contains_key(name) {
            return Err(ActionError::DuplicateAction(name.to_string()));
        }

        let action = Action::new(name);
        self.actions.insert(action.clone(), able.map(str::to_string));
        self.order.push(action.clone());
        self.resolved.insert(name.to_string(), vec![action]);
        tracing::debug!(action = %name, able = ?able, "Registered action");
        Ok(())
    }

    /// Register a group expanding to the union of its members' actions.
    ///
    /// Members must already be registered (actions or groups). The stored
    /// expansion is ordered by first appearance and de-duplicated. An
    /// existing group of the same name is replaced.
    ///
    /// # Errors
    ///
    /// - [`ActionError::UnknownActionOrGroup`] for an unregistered member
    /// - [`ActionError::DuplicateAction`] if `name` is an atomic action
    /// - [`ActionError::EmptyActionGroup`] if no actions result
    pub fn register_group<I, S>(&mut self, name: &str, members: I) -> ActionResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.actions.contains_key(name) {
            return Err(ActionError::DuplicateAction(name.to_string()));
        }

        let mut expanded: Vec<Action> = Vec::new();
        for member in members {
            for action in self.resolve(member.as_ref())? {
                if !expanded.contains(action) {
                    expanded.push(action.clone());
                }
            }
        }
        if expanded.is_empty() {
            return Err(ActionError::EmptyActionGroup(name.to_string()));
        }

        tracing::debug!(group = %name, actions = expanded.len(), "Registered action group");
        self.resolved.insert(name.to_string(), expanded);
        Ok(())
    }

    /// Resolve a registered action or group name to its atomic actions.
    pub fn resolve(&self, name: &str) -> ActionResult<&[Action]> {
        self.resolved
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| ActionError::UnknownActionOrGroup(name.to_string()))
    }

    /// Check if a name is registered, either as an action or a group.
    pub fn contains(&self, name: &str) -> bool {
        self.resolved.contains_key(name)
    }

    /// Check if a name is a registered atomic action.
    pub fn is_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Find the action registered under an able alias.
    pub fn action_for_able(&self, able: &str) -> Option<&Action> {
        self.order
            .iter()
            .find(|action| self.actions.get(*action).and_then(Option::as_deref) == Some(able))
    }

    /// Get the able alias of an action, if it has one.
    pub fn able_for(&self, action: &str) -> Option<&str> {
        self.actions.get(action).and_then(Option::as_deref)
    }

    /// All atomic actions in registration order.
    pub fn actions(&self) -> &[Action] {
        &self.order
    }

    /// Register the CRUD actions and the `crud` group.
    ///
    /// Calling this more than once has no further effect.
    pub fn add_crud(&mut self) -> ActionResult<()> {
        if self.crud {
            return Ok(());
        }
        for (name, able) in CRUD_ACTIONS {
            self.register_ability(name, able)?;
        }
        self.register_group(CRUD_GROUP, CRUD_ACTIONS.iter().map(|(name, _)| *name))?;
        self.crud = true;
        Ok(())
    }
}
