//! Allow-list authorization
//!
//! - No IO
//! - No panics
//! - Same inputs, same decision

use crate::directory::GroupMembershipSet;
use std::collections::HashSet;
use warden_core::config::{split_list, AccessConfig};

/// Why access was granted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantBasis {
    /// The identifier itself is allow-listed
    AllowedUser,
    /// A membership contains this allow-listed group
    AllowedGroup(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Granted(GrantBasis),
    Denied,
}

impl Decision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Decision::Granted(_))
    }
}

/// Users and groups permitted access. Built once at startup and shared
/// read-only.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    users: HashSet<String>,
    /// Kept in configuration order so the reported match is stable
    groups: Vec<String>,
}

impl AllowList {
    /// Items are trimmed; empty items are dropped, since an empty group
    /// would match every membership.
    pub fn new<U, G>(users: U, groups: G) -> Self
    where
        U: IntoIterator,
        U::Item: AsRef<str>,
        G: IntoIterator,
        G::Item: AsRef<str>,
    {
        let users = users
            .into_iter()
            .map(|u| u.as_ref().trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();

        let mut unique = Vec::new();
        for group in groups {
            let group = group.as_ref().trim();
            if !group.is_empty() && !unique.iter().any(|g: &String| g == group) {
                unique.push(group.to_string());
            }
        }

        Self {
            users,
            groups: unique,
        }
    }

    pub fn from_config(config: &AccessConfig) -> Self {
        Self::new(&config.allowed_users, &config.allowed_groups)
    }

    /// Build from comma-separated lists
    pub fn from_csv(users: &str, groups: &str) -> Self {
        Self::new(split_list(users), split_list(groups))
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.groups.is_empty()
    }

    /// Exact, case-sensitive identifier match
    pub fn allows_user(&self, identifier: &str) -> bool {
        self.users.contains(identifier)
    }

    /// First allowed group that is a substring of any membership
    pub fn matching_group(&self, memberships: &GroupMembershipSet) -> Option<&str> {
        self.groups
            .iter()
            .find(|allowed| memberships.iter().any(|m| m.contains(allowed.as_str())))
            .map(String::as_str)
    }

    pub fn authorize(&self, identifier: &str, memberships: &GroupMembershipSet) -> Decision {
        if self.allows_user(identifier) {
            return Decision::Granted(GrantBasis::AllowedUser);
        }

        match self.matching_group(memberships) {
            Some(group) => Decision::Granted(GrantBasis::AllowedGroup(group.to_string())),
            None => Decision::Denied,
        }
    }
}
