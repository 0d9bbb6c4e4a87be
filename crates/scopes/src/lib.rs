//! API key scopes.
//!
//! Users describe scopes as an open list of `{ resource, access, targets }`
//! entries; the discue API expects a fixed object with one optional slot per
//! known resource type. [`encode`] and [`decode`] translate between the two.
//! The set of resource types is declared once, in `scope_slots!`, which
//! generates the name enumeration, the record type and the slot accessors.

use serde::{Serialize, Deserialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

mod codec;
mod record;

pub use codec::{decode, encode, ScopeEntry};

/// Target list granting access to every resource of a type.
pub const WILDCARD: &str = "*";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    #[error("unknown scope resource '{name}', expected one of: {}", known_names())]
    UnknownResourceName { name: String },
    #[error("scope resource '{name}' is listed more than once")]
    DuplicateResourceName { name: String },
}

fn known_names() -> String {
    ResourceName::ALL.iter().map(|n| n.as_str()).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Read,
    #[default]
    Write,
}

impl Access {
    pub fn as_str(self) -> &'static str {
        match self { Access::Read => "read", Access::Write => "write" }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Access {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Access::Read),
            "write" => Ok(Access::Write),
            other => Err(format!("unknown access level '{other}', expected read or write")),
        }
    }
}

/// Per-resource-type payload as the API transmits it. `access` stays an
/// opaque string here; only [`decode`] interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScopeValue {
    #[serde(default)]
    pub access: String,
    #[serde(default)]
    pub targets: Vec<String>,
}

impl ScopeValue {
    pub fn new(access: Access, targets: Vec<String>) -> Self {
        Self { access: access.as_str().to_string(), targets }
    }
}

/// Declares the closed set of scoped resource types. Each line maps the
/// capitalized field identifier to the lower-case name users and the API use.
/// Declaration order is the canonical order of decoded entries.
macro_rules! scope_slots {
    ($($variant:ident => $field:ident),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum ResourceName { $($variant),+ }

        impl ResourceName {
            pub const ALL: &'static [ResourceName] = &[$(ResourceName::$variant),+];

            /// External (lower-case) name.
            pub fn as_str(self) -> &'static str {
                match self { $(ResourceName::$variant => stringify!($field)),+ }
            }

            /// Internal field identifier.
            pub fn field_name(self) -> &'static str {
                match self { $(ResourceName::$variant => stringify!($variant)),+ }
            }
        }

        /// API shape of an API key's scopes: one optional slot per resource type.
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct ScopesRecord {
            $(
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<ScopeValue>,
            )+
        }

        impl ScopesRecord {
            pub fn slot(&self, name: ResourceName) -> &Option<ScopeValue> {
                match name { $(ResourceName::$variant => &self.$field),+ }
            }

            pub fn slot_mut(&mut self, name: ResourceName) -> &mut Option<ScopeValue> {
                match name { $(ResourceName::$variant => &mut self.$field),+ }
            }
        }
    };
}

scope_slots! {
    Channels => channels,
    Domains => domains,
    Events => events,
    Listeners => listeners,
    Messages => messages,
    Queues => queues,
    Schemas => schemas,
    Stats => stats,
    Topics => topics,
}

impl ResourceName {
    /// Resolves a slot by field identifier, retrying with the first character
    /// capitalized so `"domains"` and `"Domains"` both name the same slot.
    pub fn resolve_field(name: &str) -> Option<ResourceName> {
        let literal = |n: &str| ResourceName::ALL.iter().copied().find(|r| r.field_name() == n);
        literal(name).or_else(|| literal(&uppercase_first(name)))
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ResourceName {
    type Err = ScopeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceName::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ScopeError::UnknownResourceName { name: s.to_string() })
    }
}

fn uppercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
