//! LDAP / Active Directory backend
//!
//! - Simple bind as the end user, optionally upgraded with STARTTLS
//! - Subtree search for the user's group attribute
//! - Service-account connection check

mod client;
mod types;

pub use client::{LdapDirectory, LdapSession};
pub use types::*;
