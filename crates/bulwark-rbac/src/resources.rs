//! # Resources
//!
//! Resources are reduced to a canonical identifier before rules are
//! matched. A bare identifier is used as-is, a richer object contributes its
//! declared name, and only when explicitly enabled is a name derived from
//! the object's type.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::borrow::Cow;
use std::fmt;

use crate::error::{RbacError, RbacResult};

/// Something actions are performed upon.
///
/// # Example
///
/// ```
/// use bulwark_rbac::resources::{resource_identifier, Resource};
/// use std::borrow::Cow;
///
/// struct Invoice;
///
/// impl Resource for Invoice {
///     fn resource_name(&self) -> Option<Cow<'_, str>> {
///         Some(Cow::Borrowed("invoice"))
///     }
/// }
///
/// struct LineItem;
/// impl Resource for LineItem {}
///
/// assert_eq!(resource_identifier(&Invoice, false).as_deref(), Some("invoice"));
/// assert_eq!(resource_identifier(&LineItem, false), None);
/// assert_eq!(resource_identifier(&LineItem, true).as_deref(), Some("line_item"));
/// assert_eq!(resource_identifier(&"report", false).as_deref(), Some("report"));
/// ```
pub trait Resource {
    /// Declared canonical name of the resource.
    fn resource_name(&self) -> Option<Cow<'_, str>> {
        None
    }

    /// Name derived from the implementing type (`LineItem` -> `line_item`).
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Owned(type_derived_name(std::any::type_name::<Self>()))
    }

    /// Access to the concrete resource for predicates.
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
}

/// A bare identifier is its own canonical name.
impl Resource for &str {
    fn resource_name(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(*self))
    }
}

impl Resource for String {
    fn resource_name(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self.as_str()))
    }
}

/// Reduce a resource to the identifier used for rule matching.
///
/// # Arguments
///
/// * `resource` - The resource being acted upon
/// * `all_types_are_resources` - Whether a type-derived name may be used
///   when the resource declares none
pub fn resource_identifier(resource: &dyn Resource, all_types_are_resources: bool) -> Option<Cow<'_, str>> {
    resource
        .resource_name()
        .or_else(|| all_types_are_resources.then(|| resource.type_name()))
}

/// Get the declared name of a resource, failing if it has none.
pub fn require_resource_name(resource: &dyn Resource) -> RbacResult<Cow<'_, str>> {
    resource
        .resource_name()
        .ok_or_else(|| RbacError::MissingResourceName(resource.type_name().into_owned()))
}

/// Snake-case the last path segment of a type name, dropping generics.
pub(crate) fn type_derived_name(type_name: &str) -> String {
    let base = type_name.split('<').next().unwrap_or(type_name);
    let segment = base.rsplit("::").next().unwrap_or(base);

    let chars: Vec<char> = segment.chars().collect();
    let mut out = String::with_capacity(segment.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Key of a resource-scoped rule.
///
/// `Other` is the wildcard matched when no exact name matches; it is shown
/// as `_other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKey {
    /// A canonical resource identifier.
    Named(String),
    /// Every resource without a more specific rule.
    Other,
}

impl ResourceKey {
    /// Display form of the wildcard key.
    pub const OTHER: &'static str = "_other";

    /// Create a key for a named resource.
    pub fn named(name: impl Into<String>) -> Self {
        ResourceKey::Named(name.into())
    }

    /// Check if this is the wildcard key.
    pub fn is_other(&self) -> bool {
        matches!(self, ResourceKey::Other)
    }

    /// Get the string representation of the key.
    pub fn as_str(&self) -> &str {
        match self {
            ResourceKey::Named(name) => name,
            ResourceKey::Other => Self::OTHER,
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ResourceKey {
    fn from(name: &str) -> Self {
        ResourceKey::named(name)
    }
}

impl From<String> for ResourceKey {
    fn from(name: String) -> Self {
        ResourceKey::Named(name)
    }
}
