//! Encrypted credential cache
//!
//! Persists one (identifier, secret) pair so the next login can be
//! pre-filled. Record format, one line:
//!
//! ```text
//! <vault token of identifier>.<vault token of secret>\n
//! ```
//!
//! Vault tokens are base64url without padding, so `.` never occurs inside
//! a token and the record splits unambiguously.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;
use warden_crypto::{DecryptError, EncryptionError, Vault};

/// Separator between the two tokens of a record
pub const RECORD_SEPARATOR: char = '.';

#[derive(Debug, Error)]
pub enum CacheError {
    /// A record exists but cannot be decrypted (wrong key, tampering,
    /// bad framing)
    #[error("Saved credentials are unreadable: {0}")]
    Corrupt(#[from] DecryptError),

    #[error("Failed to encrypt credentials: {0}")]
    Encryption(#[from] EncryptionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A decrypted credential pair
#[derive(Clone, PartialEq, Eq)]
pub struct StoredCredentials {
    pub identifier: String,
    pub secret: String,
}

impl fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// File-backed cache holding a single encrypted credential record
pub struct CredentialCache {
    path: PathBuf,
    vault: Arc<Vault>,
}

impl CredentialCache {
    pub fn new(path: impl AsRef<Path>, vault: Arc<Vault>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            vault,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encrypt and persist the pair, replacing any previous record.
    ///
    /// The record is written to a temporary file in the same directory and
    /// renamed into place, so readers see either the old or the new record.
    pub async fn save(&self, identifier: &str, secret: &str) -> Result<(), CacheError> {
        let record = encode_record(&self.vault, identifier, secret)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let tmp_path = self.temp_path();
        if let Err(e) = write_private(&tmp_path, record.as_bytes()).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        debug!("Saved credentials to {:?}", self.path);
        Ok(())
    }

    /// Read and decrypt the record. `Ok(None)` means nothing has been saved.
    pub async fn load(&self) -> Result<Option<StoredCredentials>, CacheError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No saved credentials at {:?}", self.path);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let content = String::from_utf8(bytes)
            .map_err(|_| DecryptError::Malformed("record is not UTF-8".into()))?;

        match decode_record(&self.vault, &content) {
            Ok(credentials) => Ok(Some(credentials)),
            Err(e) => {
                warn!("Saved credentials at {:?} are unreadable: {}", self.path, e);
                Err(e.into())
            }
        }
    }

    /// Remove the record. Returns whether one existed.
    pub async fn clear(&self) -> Result<bool, CacheError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("Removed saved credentials at {:?}", self.path);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "credentials".to_string());

        self.path
            .with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
    }
}

/// Encrypt both fields and frame them into one record line
pub fn encode_record(
    vault: &Vault,
    identifier: &str,
    secret: &str,
) -> Result<String, EncryptionError> {
    let identifier = vault.encrypt(identifier)?;
    let secret = vault.encrypt(secret)?;
    Ok(format!("{}{}{}\n", identifier, RECORD_SEPARATOR, secret))
}

/// Split a record line and decrypt both fields
pub fn decode_record(vault: &Vault, record: &str) -> Result<StoredCredentials, DecryptError> {
    let record = record.trim_end();

    let mut parts = record.split(RECORD_SEPARATOR);
    let (identifier, secret) = match (parts.next(), parts.next(), parts.next()) {
        (Some(id), Some(secret), None) if !id.is_empty() && !secret.is_empty() => (id, secret),
        _ => {
            return Err(DecryptError::Malformed(
                "expected exactly two tokens".into(),
            ))
        }
    };

    Ok(StoredCredentials {
        identifier: vault.decrypt(identifier)?,
        secret: vault.decrypt(secret)?,
    })
}

async fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_crypto::generate_key;

    fn vault() -> Arc<Vault> {
        Arc::new(Vault::from_key_material(&generate_key()).unwrap())
    }

    fn cache_in(dir: &tempfile::TempDir, vault: Arc<Vault>) -> CredentialCache {
        CredentialCache::new(dir.path().join("credentials"), vault)
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir, vault());

        cache.save("jdoe", "secret1").await.unwrap();
        let loaded = cache.load().await.unwrap().unwrap();

        assert_eq!(loaded.identifier, "jdoe");
        assert_eq!(loaded.secret, "secret1");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir, vault());

        assert!(cache.load().await.unwrap().is_none());
        assert!(!cache.exists().await);
        assert!(!cache.clear().await.unwrap());
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir, vault());

        cache.save("jdoe", "old").await.unwrap();
        cache.save("bsmith", "new").await.unwrap();

        let loaded = cache.load().await.unwrap().unwrap();
        assert_eq!(loaded.identifier, "bsmith");
        assert_eq!(loaded.secret, "new");
    }

    #[tokio::test]
    async fn test_no_plaintext_or_temp_files_left() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir, vault());

        cache.save("jdoe", "hunter2").await.unwrap();

        let content = std::fs::read_to_string(cache.path()).unwrap();
        assert!(!content.contains("jdoe"));
        assert!(!content.contains("hunter2"));
        assert_eq!(content.matches(RECORD_SEPARATOR).count(), 1);

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_record_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir, vault());
        cache.save("jdoe", "secret1").await.unwrap();

        let mode = std::fs::metadata(cache.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CredentialCache::new(dir.path().join("nested/.warden/credentials"), vault());

        cache.save("jdoe", "secret1").await.unwrap();
        assert!(cache.exists().await);
    }

    #[tokio::test]
    async fn test_wrong_key_is_corrupt_not_missing() {
        let dir = tempfile::tempdir().unwrap();
        cache_in(&dir, vault()).save("jdoe", "secret1").await.unwrap();

        let result = cache_in(&dir, vault()).load().await;
        assert!(matches!(
            result,
            Err(CacheError::Corrupt(DecryptError::Authentication))
        ));
    }

    #[tokio::test]
    async fn test_garbage_record_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir, vault());

        std::fs::write(cache.path(), b"jdoe,secret1").unwrap();
        assert!(matches!(
            cache.load().await,
            Err(CacheError::Corrupt(DecryptError::Malformed(_)))
        ));

        std::fs::write(cache.path(), [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(
            cache.load().await,
            Err(CacheError::Corrupt(DecryptError::Malformed(_)))
        ));
    }

    #[test]
    fn test_record_framing() {
        let vault = vault();
        let record = encode_record(&vault, "jdoe", "a.b.c").unwrap();
        assert!(record.ends_with('\n'));

        let decoded = decode_record(&vault, &record).unwrap();
        assert_eq!(decoded.secret, "a.b.c");

        let token = vault.encrypt("x").unwrap();
        let three = format!("{}.{}.{}", token, token, token);
        assert!(matches!(
            decode_record(&vault, &three),
            Err(DecryptError::Malformed(_))
        ));
        assert!(matches!(
            decode_record(&vault, &format!(".{}", token)),
            Err(DecryptError::Malformed(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = StoredCredentials {
            identifier: "jdoe".into(),
            secret: "hunter2".into(),
        };
        let debug = format!("{:?}", creds);
        assert!(debug.contains("jdoe"));
        assert!(!debug.contains("hunter2"));
    }
}
