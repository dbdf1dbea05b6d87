//! LDAP Client implementation
//!
//! Binds as the end user (down-level `DOMAIN\user` or UPN form) and resolves
//! group memberships with a subtree search from the domain root.

use crate::directory::{BindError, Directory, GroupMembershipSet, SearchError};
use crate::ldap::types::*;
use async_trait::async_trait;
use ldap3::{ldap_escape, Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use warden_core::config::DirectoryConfig;

/// LDAP result code for invalid credentials
const RC_INVALID_CREDENTIALS: u32 = 49;

/// Directory backed by an LDAP / Active Directory server
pub struct LdapDirectory {
    config: DirectoryConfig,
}

/// An authenticated connection. Dropping it releases the connection.
pub struct LdapSession {
    ldap: Ldap,
}

impl std::fmt::Debug for LdapSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapSession").finish_non_exhaustive()
    }
}

impl LdapDirectory {
    pub fn new(config: DirectoryConfig) -> Self {
        Self { config }
    }

    fn budget(&self) -> Duration {
        self.config.timeout()
    }

    /// Verify the directory is reachable by binding with the service account
    /// and reading the root DSE.
    pub async fn test_connection(&self) -> Result<LdapServerInfo, ConnectionCheckError> {
        if self.config.service_user.is_empty() {
            return Err(ConnectionCheckError::NoServiceAccount);
        }

        let service_user = &self.config.service_user;
        let bind_name = if service_user.contains(['\\', '@', '=']) {
            service_user.clone()
        } else {
            self.config.bind_name(service_user)
        };

        let mut session = self
            .open_within_budget(&bind_name, &self.config.service_password)
            .await?;

        let info = self.read_root_dse(&mut session).await;
        self.close(session).await;

        let info = info?;
        info!(
            "Directory check succeeded: vendor={:?}, naming contexts={}",
            info.vendor,
            info.naming_contexts.len()
        );
        Ok(info)
    }

    // =========================================================================
    // Private methods
    // =========================================================================

    /// Create LDAP connection with proper TLS settings
    async fn connect(&self) -> Result<Ldap, BindError> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.budget())
            .set_starttls(self.config.start_tls);

        let url = self.config.url();
        debug!("Connecting to directory: {}", url);

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| BindError::Unreachable(e.to_string()))?;

        // The driver task ends once every handle to the connection is gone.
        ldap3::drive!(conn);
        Ok(ldap)
    }

    async fn open_within_budget(
        &self,
        bind_name: &str,
        secret: &str,
    ) -> Result<LdapSession, BindError> {
        let budget = self.budget();
        match timeout(budget, self.open(bind_name, secret)).await {
            Ok(result) => result,
            Err(_) => {
                // The abandoned future owned the handle, so the connection is
                // already released.
                warn!("Bind for {} abandoned after {:?}", bind_name, budget);
                Err(BindError::Timeout(budget))
            }
        }
    }

    async fn open(&self, bind_name: &str, secret: &str) -> Result<LdapSession, BindError> {
        let mut ldap = self.connect().await?;

        let result = match ldap.simple_bind(bind_name, secret).await {
            Ok(result) => result,
            Err(e) => {
                let _ = ldap.unbind().await;
                return Err(BindError::Protocol(e.to_string()));
            }
        };

        if result.rc != 0 {
            let _ = ldap.unbind().await;
            debug!("Bind for {} failed with code {}", bind_name, result.rc);

            if result.rc == RC_INVALID_CREDENTIALS {
                return Err(BindError::InvalidCredentials);
            }
            return Err(BindError::Rejected {
                rc: result.rc,
                message: result.text,
            });
        }

        Ok(LdapSession { ldap })
    }

    async fn read_root_dse(&self, session: &mut LdapSession) -> Result<LdapServerInfo, SearchError> {
        let budget = self.budget();
        let search = session.ldap.search(
            "",
            Scope::Base,
            "(objectClass=*)",
            vec![
                "vendorName",
                "vendorVersion",
                "namingContexts",
                "supportedLDAPVersion",
                "defaultNamingContext",
            ],
        );

        let (rs, _res) = timeout(budget, search)
            .await
            .map_err(|_| SearchError::Timeout(budget))?
            .map_err(|e| SearchError::Protocol(format!("Root DSE query failed: {}", e)))?
            .success()
            .map_err(|e| SearchError::Protocol(format!("Root DSE error: {}", e)))?;

        let info = match rs.into_iter().next() {
            Some(result) => {
                let entry = SearchEntry::construct(result);
                LdapServerInfo {
                    vendor: get_first_attr(&entry, "vendorName"),
                    version: get_first_attr(&entry, "vendorVersion"),
                    naming_contexts: entry
                        .attrs
                        .get("namingContexts")
                        .cloned()
                        .unwrap_or_default(),
                    supported_ldap_version: entry
                        .attrs
                        .get("supportedLDAPVersion")
                        .cloned()
                        .unwrap_or_default(),
                    default_naming_context: get_first_attr(&entry, "defaultNamingContext"),
                }
            }
            None => LdapServerInfo {
                supported_ldap_version: vec!["3".to_string()],
                ..Default::default()
            },
        };

        Ok(info)
    }
}

#[async_trait]
impl Directory for LdapDirectory {
    type Session = LdapSession;

    async fn bind(&self, identifier: &str, secret: &str) -> Result<LdapSession, BindError> {
        // A simple bind with an empty password is an anonymous bind and
        // would "succeed" for any name.
        if identifier.trim().is_empty() || secret.is_empty() {
            return Err(BindError::EmptyCredentials);
        }

        let bind_name = self.config.bind_name(identifier);
        let session = self.open_within_budget(&bind_name, secret).await?;

        debug!("Bind successful for {}", identifier);
        Ok(session)
    }

    async fn search_groups(
        &self,
        session: &mut LdapSession,
        identifier: &str,
    ) -> Result<GroupMembershipSet, SearchError> {
        let base = self.config.base_dn();
        let filter = self.config.build_user_filter(&ldap_escape(identifier));
        let attr = self.config.group_attribute.as_str();
        let budget = self.budget();

        debug!("Searching {} with filter: {}", base, filter);

        let search = session.ldap.search(&base, Scope::Subtree, &filter, vec![attr]);
        let (rs, _res) = timeout(budget, search)
            .await
            .map_err(|_| SearchError::Timeout(budget))?
            .map_err(|e| SearchError::Protocol(e.to_string()))?
            .success()
            .map_err(|e| SearchError::Protocol(e.to_string()))?;

        let memberships = GroupMembershipSet::from_entries(
            rs.into_iter()
                .filter(|entry| !entry.is_ref() && !entry.is_intermediate())
                .map(SearchEntry::construct)
                .map(|entry| group_values(&entry, attr)),
        );

        debug!(
            "Found {} groups across {} entries",
            memberships.len(),
            memberships.entries_found()
        );
        Ok(memberships)
    }

    async fn close(&self, mut session: LdapSession) {
        match timeout(self.budget(), session.ldap.unbind()).await {
            Ok(Ok(())) => debug!("Directory session closed"),
            Ok(Err(e)) => debug!("Unbind failed: {}", e),
            Err(_) => warn!("Unbind timed out; dropping connection"),
        }
    }
}

/// Helper to get first attribute value from LDAP entry
fn get_first_attr(entry: &SearchEntry, attr: &str) -> Option<String> {
    entry.attrs.get(attr).and_then(|v| v.first().cloned())
}

/// All values of the group attribute, whether the server returned one value
/// or many. Attribute names compare case-insensitively, and ranged
/// attributes (`memberOf;range=0-1499`) are included.
fn group_values(entry: &SearchEntry, attr: &str) -> Vec<String> {
    let ranged = format!("{};", attr.to_ascii_lowercase());

    entry
        .attrs
        .iter()
        .filter(|(name, _)| {
            name.eq_ignore_ascii_case(attr) || name.to_ascii_lowercase().starts_with(&ranged)
        })
        .flat_map(|(_, values)| values.iter().cloned())
        .collect()
}
