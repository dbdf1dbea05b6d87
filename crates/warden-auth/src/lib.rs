//! Authentication for Warden
//!
//! Directory bind and group lookup, allow-list authorization, the audit
//! trail, and the [`Gatekeeper`] facade tying them to the credential cache.

pub mod audit;
pub mod authenticator;
pub mod directory;
pub mod gatekeeper;
pub mod ldap;
pub mod policy;

#[cfg(test)]
mod testing;

pub use audit::{AuditEntry, AuditOutcome, AuditSink, FileAuditLog, MemoryAuditLog};
pub use authenticator::{AuthOutcome, Authenticator, DenialReason, DENIED_MESSAGE};
pub use directory::{BindError, Directory, GroupMembershipSet, SearchError};
pub use gatekeeper::{Gatekeeper, Prefill};
pub use ldap::{ConnectionCheckError, LdapDirectory, LdapServerInfo, LdapSession};
pub use policy::{AllowList, Decision, GrantBasis};
