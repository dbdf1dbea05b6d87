//! Directory abstraction used by the authentication flow

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;

/// A directory that can verify credentials and resolve group memberships.
///
/// A session returned by [`Directory::bind`] must be handed back to
/// [`Directory::close`] once the attempt is over. Dropping a session without
/// closing it must still release the underlying connection.
#[async_trait]
pub trait Directory: Send + Sync {
    type Session: Send;

    /// Authenticate as `identifier` with `secret`
    async fn bind(&self, identifier: &str, secret: &str) -> Result<Self::Session, BindError>;

    /// Resolve the group memberships of `identifier` over an open session
    async fn search_groups(
        &self,
        session: &mut Self::Session,
        identifier: &str,
    ) -> Result<GroupMembershipSet, SearchError>;

    /// Tear down a session
    async fn close(&self, session: Self::Session);
}

/// Why a bind failed. Only ever shown in the audit trail; the end user sees
/// a uniform denial.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("empty identifier or secret")]
    EmptyCredentials,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("bind rejected with result code {rc}: {message}")]
    Rejected { rc: u32, message: String },

    #[error("directory unreachable: {0}")]
    Unreachable(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),
}

impl BindError {
    /// Whether the directory answered and refused the credentials, as
    /// opposed to the attempt failing for infrastructure reasons.
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            BindError::EmptyCredentials | BindError::InvalidCredentials | BindError::Rejected { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("search failed: {0}")]
    Protocol(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),
}

/// Group identifiers resolved for one principal.
///
/// Values from every matched directory entry are flattened into one ordered,
/// de-duplicated set. The number of matched entries is kept so that "account
/// not found" can be told apart from "account has no groups".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupMembershipSet {
    groups: BTreeSet<String>,
    entries: usize,
}

impl GroupMembershipSet {
    /// A search that matched no entry
    pub fn no_entries() -> Self {
        Self::default()
    }

    /// Flatten the group values of each matched entry
    pub fn from_entries<I, J>(entries: I) -> Self
    where
        I: IntoIterator<Item = J>,
        J: IntoIterator<Item = String>,
    {
        let mut set = Self::default();
        for values in entries {
            set.entries += 1;
            set.groups.extend(values);
        }
        set
    }

    pub fn entries_found(&self) -> usize {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn contains(&self, group: &str) -> bool {
        self.groups.contains(group)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(String::as_str)
    }
}

/// Collects the values of a single entry
impl FromIterator<String> for GroupMembershipSet {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self::from_entries([iter])
    }
}
