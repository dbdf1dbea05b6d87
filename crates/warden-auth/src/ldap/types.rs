//! LDAP/Active Directory types

use crate::directory::{BindError, SearchError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// LDAP server information, read from the root DSE
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LdapServerInfo {
    pub vendor: Option<String>,
    pub version: Option<String>,
    pub naming_contexts: Vec<String>,
    pub supported_ldap_version: Vec<String>,
    pub default_naming_context: Option<String>,
}

/// Failure of the service-account connection check
#[derive(Debug, Error)]
pub enum ConnectionCheckError {
    #[error("service account is not configured")]
    NoServiceAccount,

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    Search(#[from] SearchError),
}
