//! Single entry point for front ends: authenticate, and manage the
//! remembered credentials that prefill the next login.

use crate::audit::{AuditSink, DiscardAuditLog, FileAuditLog};
use crate::authenticator::{AuthOutcome, Authenticator};
use crate::directory::Directory;
use crate::ldap::{ConnectionCheckError, LdapDirectory, LdapServerInfo};
use crate::policy::AllowList;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use warden_core::{ConfigError, WardenConfig};
use warden_crypto::Vault;
use warden_storage::{CacheError, CredentialCache};

/// Shown when a saved record exists but cannot be decrypted
pub const UNREADABLE_CACHE_NOTICE: &str =
    "Unable to decrypt saved credentials. Please enter them again.";

/// Shown when the saved record cannot be read at all
pub const INACCESSIBLE_CACHE_NOTICE: &str =
    "Unable to read saved credentials. Please enter them again.";

/// Values to prefill a login form with
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Prefill {
    pub identifier: String,
    pub secret: String,
    pub found: bool,
    /// Message for the user when a saved record had to be ignored
    pub notice: Option<&'static str>,
}

impl fmt::Debug for Prefill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prefill")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .field("found", &self.found)
            .field("notice", &self.notice)
            .finish()
    }
}

impl Prefill {
    fn empty(notice: Option<&'static str>) -> Self {
        Self {
            notice,
            ..Default::default()
        }
    }
}

pub struct Gatekeeper<D: Directory = LdapDirectory> {
    authenticator: Authenticator<D>,
    cache: CredentialCache,
}

impl Gatekeeper<LdapDirectory> {
    /// Build every component from configuration. Fails if the directory
    /// settings are invalid or the vault key is missing or unusable.
    pub fn from_config(config: &WardenConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let material = config.vault.key_material()?;
        let vault = Vault::from_key_material(&material)
            .map_err(|e| ConfigError::InvalidKey(e.to_string()))?;

        if !config.directory.is_encrypted() {
            warn!(
                "Directory {} is used without TLS; passwords are sent in cleartext",
                config.directory.url()
            );
        }

        let allow_list = AllowList::from_config(&config.access);
        if allow_list.is_empty() {
            warn!("Allow list is empty; every login will be denied");
        }

        let audit: Arc<dyn AuditSink> = if config.audit.enabled {
            Arc::new(FileAuditLog::new(&config.audit.path))
        } else {
            Arc::new(DiscardAuditLog)
        };

        let directory = LdapDirectory::new(config.directory.clone());
        let cache = CredentialCache::new(config.storage.credentials_path(), Arc::new(vault));

        debug!(
            "Gatekeeper ready: directory={}, credentials={:?}",
            config.directory.url(),
            cache.path()
        );

        Ok(Self::new(
            Authenticator::new(directory, Arc::new(allow_list), audit),
            cache,
        ))
    }

    /// Bind with the service account and read the root DSE
    pub async fn check_directory(&self) -> Result<LdapServerInfo, ConnectionCheckError> {
        self.authenticator.directory().test_connection().await
    }
}

impl<D: Directory> Gatekeeper<D> {
    pub fn new(authenticator: Authenticator<D>, cache: CredentialCache) -> Self {
        Self {
            authenticator,
            cache,
        }
    }

    pub fn cache(&self) -> &CredentialCache {
        &self.cache
    }

    pub async fn authenticate(&self, identifier: &str, secret: &str) -> bool {
        self.authenticate_detailed(identifier, secret)
            .await
            .is_granted()
    }

    pub async fn authenticate_detailed(&self, identifier: &str, secret: &str) -> AuthOutcome {
        self.authenticator.authenticate(identifier, secret).await
    }

    /// Authenticate and, on success, remember the credentials if asked to.
    /// A failed save does not affect the outcome.
    pub async fn login(&self, identifier: &str, secret: &str, remember: bool) -> AuthOutcome {
        let outcome = self.authenticate_detailed(identifier, secret).await;

        if remember && outcome.is_granted() {
            if let Err(e) = self.cache_save(identifier, secret).await {
                warn!("Could not remember credentials for {}: {}", identifier, e);
            }
        }

        outcome
    }

    pub async fn cache_save(&self, identifier: &str, secret: &str) -> Result<(), CacheError> {
        self.cache.save(identifier, secret).await
    }

    /// Saved credentials, or empty fields. Never fails: an unreadable record
    /// is reported through `notice` and otherwise treated as absent.
    pub async fn cache_load(&self) -> Prefill {
        match self.cache.load().await {
            Ok(Some(saved)) => Prefill {
                identifier: saved.identifier,
                secret: saved.secret,
                found: true,
                notice: None,
            },
            Ok(None) => Prefill::empty(None),
            Err(CacheError::Io(e)) => {
                warn!("Could not read {:?}: {}", self.cache.path(), e);
                Prefill::empty(Some(INACCESSIBLE_CACHE_NOTICE))
            }
            Err(_) => Prefill::empty(Some(UNREADABLE_CACHE_NOTICE)),
        }
    }

    /// Forget saved credentials. Returns whether a record existed.
    pub async fn cache_clear(&self) -> Result<bool, CacheError> {
        self.cache.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditLog;
    use crate::testing::MockDirectory;
    use std::path::Path;
    use tempfile::TempDir;
    use warden_crypto::generate_key;

    fn vault() -> Arc<Vault> {
        Arc::new(Vault::from_key_material(&generate_key()).unwrap())
    }

    fn gatekeeper(dir: &Path) -> Gatekeeper<MockDirectory> {
        let authenticator = Authenticator::new(
            MockDirectory::new("pw").with_groups(&["CN=Ops,DC=corp"]),
            Arc::new(AllowList::from_csv("jdoe", "CN=Ops")),
            Arc::new(MemoryAuditLog::new()),
        );
        Gatekeeper::new(
            authenticator,
            CredentialCache::new(dir.join("credentials"), vault()),
        )
    }

    fn config(dir: &TempDir) -> WardenConfig {
        let mut config = WardenConfig::default();
        config.directory.domain = "corp.local".to_string();
        config.directory.server_url = "ldap://127.0.0.1:9".to_string();
        config.directory.timeout_seconds = 1;
        config.directory.allow_insecure = true;
        config.vault.key = Some(generate_key());
        config.access.allowed_users = vec!["jdoe".to_string()];
        config.storage.credentials_path = Some(dir.path().join("credentials"));
        config.audit.path = dir.path().join("auth.log");
        config
    }

    #[tokio::test]
    async fn test_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let gk = gatekeeper(dir.path());

        gk.cache_save("jdoe", "secret1").await.unwrap();
        let prefill = gk.cache_load().await;

        assert_eq!(prefill.identifier, "jdoe");
        assert_eq!(prefill.secret, "secret1");
        assert!(prefill.found);
        assert_eq!(prefill.notice, None);
    }

    #[tokio::test]
    async fn test_missing_cache_has_no_notice() {
        let dir = tempfile::tempdir().unwrap();
        let prefill = gatekeeper(dir.path()).cache_load().await;

        assert_eq!(prefill, Prefill::default());
    }

    #[tokio::test]
    async fn test_foreign_key_cache_yields_notice() {
        let dir = tempfile::tempdir().unwrap();
        CredentialCache::new(dir.path().join("credentials"), vault())
            .save("jdoe", "secret1")
            .await
            .unwrap();

        let prefill = gatekeeper(dir.path()).cache_load().await;

        assert!(!prefill.found);
        assert!(prefill.identifier.is_empty() && prefill.secret.is_empty());
        assert_eq!(prefill.notice, Some(UNREADABLE_CACHE_NOTICE));
    }

    #[tokio::test]
    async fn test_garbage_cache_yields_notice() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("credentials"), "not a record").unwrap();

        let prefill = gatekeeper(dir.path()).cache_load().await;

        assert!(!prefill.found);
        assert_eq!(prefill.notice, Some(UNREADABLE_CACHE_NOTICE));
    }

    #[tokio::test]
    async fn test_login_remembers_only_on_grant() {
        let dir = tempfile::tempdir().unwrap();
        let gk = gatekeeper(dir.path());

        assert!(!gk.login("jdoe", "wrong", true).await.is_granted());
        assert!(!gk.cache_load().await.found);

        assert!(gk.login("jdoe", "pw", false).await.is_granted());
        assert!(!gk.cache_load().await.found);

        assert!(gk.login("jdoe", "pw", true).await.is_granted());
        let prefill = gk.cache_load().await;
        assert!(prefill.found);
        assert_eq!(prefill.identifier, "jdoe");
    }

    #[tokio::test]
    async fn test_authenticate_bool() {
        let dir = tempfile::tempdir().unwrap();
        let gk = gatekeeper(dir.path());

        assert!(gk.authenticate("jdoe", "pw").await);
        assert!(gk.authenticate("bsmith", "pw").await);
        assert!(!gk.authenticate("bsmith", "nope").await);
    }

    #[tokio::test]
    async fn test_cache_clear() {
        let dir = tempfile::tempdir().unwrap();
        let gk = gatekeeper(dir.path());

        assert!(!gk.cache_clear().await.unwrap());
        gk.cache_save("jdoe", "secret1").await.unwrap();
        assert!(gk.cache_clear().await.unwrap());
        assert!(!gk.cache_load().await.found);
    }

    #[test]
    fn test_prefill_debug_redacts_secret() {
        let prefill = Prefill {
            identifier: "jdoe".into(),
            secret: "hunter2".into(),
            found: true,
            notice: None,
        };
        assert!(!format!("{:?}", prefill).contains("hunter2"));
    }

    #[tokio::test]
    async fn test_from_config_requires_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(&dir);
        cfg.vault.key = None;

        assert!(matches!(
            Gatekeeper::from_config(&cfg),
            Err(ConfigError::Missing("vault.key"))
        ));
    }

    #[tokio::test]
    async fn test_from_config_rejects_bad_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(&dir);
        cfg.vault.key = Some("too-short".to_string());

        assert!(matches!(
            Gatekeeper::from_config(&cfg),
            Err(ConfigError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_from_config_refuses_cleartext_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(&dir);
        cfg.directory.allow_insecure = false;

        assert!(matches!(
            Gatekeeper::from_config(&cfg),
            Err(ConfigError::Invalid {
                key: "directory.server_url",
                ..
            })
        ));

        cfg.directory.start_tls = true;
        assert!(Gatekeeper::from_config(&cfg).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_directory_denies_and_audits() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&dir);
        let gk = Gatekeeper::from_config(&cfg).unwrap();

        let started = std::time::Instant::now();
        let outcome = gk.authenticate_detailed("jdoe", "secret").await;

        assert!(matches!(outcome, AuthOutcome::BindFailed(_)));
        assert!(started.elapsed() < std::time::Duration::from_secs(5));

        let log = std::fs::read_to_string(&cfg.audit.path).unwrap();
        assert_eq!(log.lines().count(), 1);
        assert!(log.contains("\tjdoe\tERROR\t"));
    }
}
