//! Rule outcomes.
//!
//! A [`Response`] is what a single rule says about a query: allow, deny, no
//! opinion, or "ask this predicate". Predicates are evaluated lazily, only
//! once their rule has been selected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::actor::Actor;
use crate::resources::Resource;

/// Signature of a predicate response.
///
/// Receives the actor, the resource and the action name. `None` means the
/// predicate has no opinion and the query keeps looking.
pub type PredicateFn<A> = dyn Fn(&A, &dyn Resource, &str) -> Option<bool> + Send + Sync;

/// Signature of a rule condition.
pub type ConditionFn<A> = dyn Fn(&A, &dyn Resource, &str) -> bool + Send + Sync;

/// A shareable predicate response.
///
/// Two predicates are equal only if they are the same function instance.
pub struct Predicate<A: ?Sized = dyn Actor>(Arc<PredicateFn<A>>);

impl<A: ?Sized> Predicate<A> {
    /// Wrap a function as a predicate.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&A, &dyn Resource, &str) -> Option<bool> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Evaluate the predicate. The result is returned verbatim.
    pub fn call(&self, actor: &A, resource: &dyn Resource, action: &str) -> Option<bool> {
        (self.0)(actor, resource, action)
    }
}

impl<A: ?Sized> Clone for Predicate<A> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<A: ?Sized> PartialEq for Predicate<A> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<A: ?Sized> fmt::Debug for Predicate<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// The outcome of matching one rule.
pub enum Response<A: ?Sized = dyn Actor> {
    /// The action is permitted.
    Allow,
    /// The action is forbidden.
    Deny,
    /// No opinion; continue the fallback chain.
    Unset,
    /// Decide by calling a predicate.
    Predicate(Predicate<A>),
}

impl<A: ?Sized> Response<A> {
    /// Build a predicate response from a function.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&A, &dyn Resource, &str) -> Option<bool> + Send + Sync + 'static,
    {
        Response::Predicate(Predicate::new(f))
    }

    /// Check if this response has no opinion.
    pub fn is_unset(&self) -> bool {
        matches!(self, Response::Unset)
    }

    /// Resolve the response for a query, calling the predicate if there is
    /// one. `None` is the "no opinion" outcome.
    pub fn evaluate(&self, actor: &A, resource: &dyn Resource, action: &str) -> Option<bool> {
        match self {
            Response::Allow => Some(true),
            Response::Deny => Some(false),
            Response::Unset => None,
            Response::Predicate(p) => p.call(actor, resource, action),
        }
    }
}

impl<A: ?Sized> Clone for Response<A> {
    fn clone(&self) -> Self {
        match self {
            Response::Allow => Response::Allow,
            Response::Deny => Response::Deny,
            Response::Unset => Response::Unset,
            Response::Predicate(p) => Response::Predicate(p.clone()),
        }
    }
}

impl<A: ?Sized> PartialEq for Response<A> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Response::Allow, Response::Allow)
            | (Response::Deny, Response::Deny)
            | (Response::Unset, Response::Unset) => true,
            (Response::Predicate(a), Response::Predicate(b)) => a == b,
            _ => false,
        }
    }
}

impl<A: ?Sized> fmt::Debug for Response<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Allow => f.write_str("Allow"),
            Response::Deny => f.write_str("Deny"),
            Response::Unset => f.write_str("Unset"),
            Response::Predicate(p) => p.fmt(f),
        }
    }
}

impl<A: ?Sized> From<bool> for Response<A> {
    fn from(allowed: bool) -> Self {
        if allowed {
            Response::Allow
        } else {
            Response::Deny
        }
    }
}

impl<A: ?Sized> From<Option<bool>> for Response<A> {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(allowed) => Response::from(allowed),
            None => Response::Unset,
        }
    }
}

impl<A: ?Sized> From<Polarity> for Response<A> {
    fn from(polarity: Polarity) -> Self {
        Response::from(polarity.as_bool())
    }
}

/// Whether rule statements currently grant or revoke.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Statements allow.
    #[default]
    Allow,
    /// Statements deny.
    Deny,
}

impl Polarity {
    /// `true` for `Allow`, `false` for `Deny`.
    pub fn as_bool(self) -> bool {
        matches!(self, Polarity::Allow)
    }

    /// The opposite polarity.
    pub fn negate(self) -> Self {
        match self {
            Polarity::Allow => Polarity::Deny,
            Polarity::Deny => Polarity::Allow,
        }
    }
}

/// A condition attached to a rule statement.
pub enum Condition<A: ?Sized = dyn Actor> {
    /// The rule applies its polarity when the condition holds.
    If(Arc<ConditionFn<A>>),
    /// The rule applies its polarity when the condition does not hold.
    Unless(Arc<ConditionFn<A>>),
}

impl<A: ?Sized + 'static> Condition<A> {
    /// Condition that must hold for the rule's polarity to apply.
    pub fn when<F>(f: F) -> Self
    where
        F: Fn(&A, &dyn Resource, &str) -> bool + Send + Sync + 'static,
    {
        Condition::If(Arc::new(f))
    }

    /// Condition that must not hold for the rule's polarity to apply.
    pub fn unless<F>(f: F) -> Self
    where
        F: Fn(&A, &dyn Resource, &str) -> bool + Send + Sync + 'static,
    {
        Condition::Unless(Arc::new(f))
    }

    /// Compile the condition into a predicate for the given polarity.
    ///
    /// The predicate answers whether the condition's outcome equals the
    /// polarity (negated polarity for `Unless`), not the raw outcome.
    pub fn into_response(self, polarity: Polarity) -> Response<A> {
        let (expected, check) = match self {
            Condition::If(check) => (polarity.as_bool(), check),
            Condition::Unless(check) => (polarity.negate().as_bool(), check),
        };
        Response::predicate(move |actor: &A, resource: &dyn Resource, action: &str| {
            Some(check(actor, resource, action) == expected)
        })
    }
}

impl<A: ?Sized> Clone for Condition<A> {
    fn clone(&self) -> Self {
        match self {
            Condition::If(check) => Condition::If(Arc::clone(check)),
            Condition::Unless(check) => Condition::Unless(Arc::clone(check)),
        }
    }
}

impl<A: ?Sized> fmt::Debug for Condition<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::If(_) => f.write_str("If(..)"),
            Condition::Unless(_) => f.write_str("Unless(..)"),
        }
    }
}
