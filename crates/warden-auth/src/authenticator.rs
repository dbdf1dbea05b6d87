//! End-to-end authentication attempt
//!
//! Bind as the user, authorize against the allow list, record the outcome.
//! Every attempt ends in exactly one decision and one audit entry, and any
//! directory session opened along the way is closed before returning.

use crate::audit::{trace_entry, AuditEntry, AuditOutcome, AuditSink};
use crate::directory::{BindError, Directory, SearchError};
use crate::policy::{AllowList, Decision, GrantBasis};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Shown for every denial, whatever the cause
pub const DENIED_MESSAGE: &str = "Invalid credentials or access denied.";

pub const GRANTED_MESSAGE: &str = "Access granted.";

/// Why a bound user was still refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    /// The account search returned no entry
    NoEntry,
    /// None of the user's groups is allowed
    NoMatchingGroup { groups: usize },
    SearchFailed(SearchError),
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::NoEntry => f.write_str("no directory entry matched account search"),
            DenialReason::NoMatchingGroup { groups } => {
                write!(f, "no allowed group among {} memberships", groups)
            }
            DenialReason::SearchFailed(e) => write!(f, "group search failed: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Granted(GrantBasis),
    Denied(DenialReason),
    BindFailed(BindError),
}

impl AuthOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, AuthOutcome::Granted(_))
    }

    /// Message for the end user. Never reveals whether the account exists.
    pub fn user_message(&self) -> &'static str {
        if self.is_granted() {
            GRANTED_MESSAGE
        } else {
            DENIED_MESSAGE
        }
    }

    pub fn audit_outcome(&self) -> AuditOutcome {
        match self {
            AuthOutcome::Granted(_) => AuditOutcome::Granted,
            AuthOutcome::Denied(DenialReason::SearchFailed(_)) => AuditOutcome::Error,
            AuthOutcome::Denied(_) => AuditOutcome::Denied,
            AuthOutcome::BindFailed(e) if e.is_credential_failure() => AuditOutcome::Denied,
            AuthOutcome::BindFailed(_) => AuditOutcome::Error,
        }
    }

    pub fn audit_detail(&self) -> String {
        match self {
            AuthOutcome::Granted(GrantBasis::AllowedUser) => "allowed user".to_string(),
            AuthOutcome::Granted(GrantBasis::AllowedGroup(group)) => {
                format!("member of allowed group {}", group)
            }
            AuthOutcome::Denied(reason) => reason.to_string(),
            AuthOutcome::BindFailed(e) => format!("bind failed: {}", e),
        }
    }
}

/// Runs authentication attempts against one directory
pub struct Authenticator<D: Directory> {
    directory: D,
    allow_list: Arc<AllowList>,
    audit: Arc<dyn AuditSink>,
}

impl<D: Directory> Authenticator<D> {
    pub fn new(directory: D, allow_list: Arc<AllowList>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            directory,
            allow_list,
            audit,
        }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub async fn authenticate(&self, identifier: &str, secret: &str) -> AuthOutcome {
        let outcome = self.attempt(identifier, secret).await;

        let entry = AuditEntry::new(
            identifier,
            outcome.audit_outcome(),
            Some(outcome.audit_detail()),
        );
        trace_entry(&entry);
        self.audit.record(&entry).await;

        outcome
    }

    async fn attempt(&self, identifier: &str, secret: &str) -> AuthOutcome {
        let mut session = match self.directory.bind(identifier, secret).await {
            Ok(session) => session,
            Err(e) => {
                debug!("Bind failed for {}: {}", identifier, e);
                return AuthOutcome::BindFailed(e);
            }
        };

        if self.allow_list.allows_user(identifier) {
            self.directory.close(session).await;
            return AuthOutcome::Granted(GrantBasis::AllowedUser);
        }

        let result = self.directory.search_groups(&mut session, identifier).await;
        self.directory.close(session).await;

        let memberships = match result {
            Ok(memberships) => memberships,
            Err(e) => {
                warn!("Group search failed for {}: {}", identifier, e);
                return AuthOutcome::Denied(DenialReason::SearchFailed(e));
            }
        };

        if memberships.entries_found() == 0 {
            warn!(
                "Bind succeeded for {} but the account search matched nothing; check the user filter and base DN",
                identifier
            );
            return AuthOutcome::Denied(DenialReason::NoEntry);
        }

        debug!("{} has {} group memberships", identifier, memberships.len());

        match self.allow_list.authorize(identifier, &memberships) {
            Decision::Granted(basis) => AuthOutcome::Granted(basis),
            Decision::Denied => AuthOutcome::Denied(DenialReason::NoMatchingGroup {
                groups: memberships.len(),
            }),
        }
    }
}
