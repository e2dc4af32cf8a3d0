//! Roles and role-based authorization
//!
//! The closed, ordered set of roles and the single authorization predicate used by
//! the page guard, the API middleware and the device field policy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Authorization level attached to an identity through its `role` claim.
///
/// Ordered `Public < Member < Moderator < Admin`. The order is informational (UI
/// sorting, grouping); access decisions use [`AllowSet`], never a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Public,
    Member,
    Moderator,
    Admin,
}

impl Role {
    /// Every role in ascending order
    pub const ALL: [Role; 4] = [Role::Public, Role::Member, Role::Moderator, Role::Admin];

    /// Resolve a raw `role` claim. A missing or unrecognised claim is `Public`.
    pub fn from_claim(claim: Option<&str>) -> Role {
        claim
            .and_then(|value| value.parse::<Role>().ok())
            .unwrap_or(Role::Public)
    }

    /// Whether the role may be written through an API call. `Admin` is only
    /// reachable by bootstrap configuration.
    pub fn is_api_assignable(self) -> bool {
        self != Role::Admin
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Public => "public",
            Role::Member => "member",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "public" => Ok(Role::Public),
            "member" => Ok(Role::Member),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Explicit allow-list of roles for a protected page or endpoint.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AllowSet(u8);

impl AllowSet {
    pub const fn empty() -> Self {
        AllowSet(0)
    }

    pub fn of(roles: &[Role]) -> Self {
        roles.iter().fold(AllowSet::empty(), |set, role| set.with(*role))
    }

    /// `{Admin}`
    pub fn admin_only() -> Self {
        AllowSet::of(&[Role::Admin])
    }

    /// `{Moderator, Admin}`
    pub fn editors() -> Self {
        AllowSet::of(&[Role::Moderator, Role::Admin])
    }

    /// `{Member, Moderator, Admin}`
    pub fn staff() -> Self {
        AllowSet::of(&[Role::Member, Role::Moderator, Role::Admin])
    }

    /// Every role, including `Public`. Still requires a verified identity.
    pub fn any() -> Self {
        AllowSet::of(&Role::ALL)
    }

    pub fn with(self, role: Role) -> Self {
        AllowSet(self.0 | role.bit())
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        Role::ALL.into_iter().filter(move |role| self.contains(*role))
    }
}

impl fmt::Debug for AllowSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.roles()).finish()
    }
}

/// The authorization predicate. Membership only, no implied hierarchy.
pub fn is_authorized(role: Role, allowed: &AllowSet) -> bool {
    allowed.contains(role)
}
