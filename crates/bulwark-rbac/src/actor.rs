//! Actors: whoever attempts an action.
//!
//! The engine only needs the name of the role an actor plays. How that name
//! is produced is up to the implementor.

use std::any::Any;
use std::borrow::Cow;

/// Something that plays a role.
///
/// # Example
///
/// ```
/// use bulwark_rbac::Actor;
/// use std::borrow::Cow;
///
/// struct User {
///     role: Option<String>,
/// }
///
/// impl Actor for User {
///     fn role_name(&self) -> Option<Cow<'_, str>> {
///         self.role.as_deref().map(Cow::Borrowed)
///     }
///
///     fn default_role(&self) -> Option<Cow<'_, str>> {
///         Some(Cow::Borrowed("guest"))
///     }
/// }
///
/// let anonymous = User { role: None };
/// assert_eq!(anonymous.resolved_role().as_deref(), Some("guest"));
/// ```
pub trait Actor {
    /// Role this particular actor plays, if it has one.
    fn role_name(&self) -> Option<Cow<'_, str>>;

    /// Role used when the actor itself has none.
    fn default_role(&self) -> Option<Cow<'_, str>> {
        None
    }

    /// The actor's own role, falling back to the default role.
    fn resolved_role(&self) -> Option<Cow<'_, str>> {
        self.role_name().or_else(|| self.default_role())
    }

    /// Access to the concrete actor for predicates working on `dyn Actor`.
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
}

/// A bare role name acts as an actor playing that role.
impl Actor for &str {
    fn role_name(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(*self))
    }
}

impl Actor for String {
    fn role_name(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self.as_str()))
    }
}
