//! Symmetric credential vault
//!
//! One process-wide AES-256-GCM key encrypts short credential strings.
//!
//! Token layout (before base64url encoding, no padding):
//! - version: 1 byte, also bound as associated data
//! - nonce: 12 random bytes, fresh per token
//! - ciphertext || tag: plaintext length + 16 bytes
//!
//! Tokens are self-contained: decrypting needs nothing beyond the key. The
//! encoded alphabet is `A-Z a-z 0-9 - _`, so callers may frame tokens with
//! any other character.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use std::fmt;
use thiserror::Error;

/// Key length in bytes (256 bits)
pub const KEY_LEN: usize = 32;

/// AES-GCM nonce length in bytes
pub const NONCE_LEN: usize = 12;

/// AES-GCM tag length in bytes
pub const TAG_LEN: usize = 16;

/// Current token format version
pub const TOKEN_VERSION: u8 = 1;

/// Errors raised while building a vault or encrypting
#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Errors raised while decrypting a token
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptError {
    #[error("Token is not valid base64url: {0}")]
    Encoding(String),

    #[error("Token is too short")]
    Truncated,

    #[error("Unsupported token version: {0}")]
    UnsupportedVersion(u8),

    #[error("Token failed authentication (tampered or encrypted with another key)")]
    Authentication,

    #[error("Decrypted value is not valid UTF-8")]
    Utf8,

    #[error("Malformed record: {0}")]
    Malformed(String),
}

/// Holds the process-wide key and performs encryption/decryption
#[derive(Clone)]
pub struct Vault {
    cipher: Aes256Gcm,
}

impl Vault {
    /// Create a vault from raw key bytes
    pub fn new(key: &[u8]) -> Result<Self, EncryptionError> {
        if key.len() != KEY_LEN {
            return Err(EncryptionError::InvalidKey(format!(
                "Key must be {} bytes (256 bits), got {}",
                KEY_LEN,
                key.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| EncryptionError::InvalidKey(e.to_string()))?;

        Ok(Self { cipher })
    }

    /// Create a vault from a hex-encoded key (64 hex chars)
    pub fn from_hex(hex_key: &str) -> Result<Self, EncryptionError> {
        let key = hex::decode(hex_key.trim())
            .map_err(|e| EncryptionError::InvalidKey(format!("Invalid hex: {}", e)))?;
        Self::new(&key)
    }

    /// Create a vault from a base64-encoded key. Both the standard and the
    /// URL-safe alphabets are accepted, padded or not.
    pub fn from_base64(b64_key: &str) -> Result<Self, EncryptionError> {
        let b64_key = b64_key.trim();
        let key = [&URL_SAFE, &URL_SAFE_NO_PAD, &STANDARD, &STANDARD_NO_PAD]
            .iter()
            .find_map(|engine| engine.decode(b64_key).ok())
            .ok_or_else(|| EncryptionError::InvalidKey("Invalid base64".into()))?;
        Self::new(&key)
    }

    /// Create a vault from key material in either hex or base64 form
    pub fn from_key_material(material: &str) -> Result<Self, EncryptionError> {
        let material = material.trim();
        if material.len() == KEY_LEN * 2 && material.chars().all(|c| c.is_ascii_hexdigit()) {
            Self::from_hex(material)
        } else {
            Self::from_base64(material)
        }
    }

    /// Encrypt a string into a self-contained token
    pub fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = self
            .cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: &[TOKEN_VERSION],
                },
            )
            .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?;

        let mut raw = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
        raw.push(TOKEN_VERSION);
        raw.extend_from_slice(nonce.as_slice());
        raw.extend_from_slice(&ciphertext);

        Ok(URL_SAFE_NO_PAD.encode(raw))
    }

    /// Decrypt a token produced by [`Vault::encrypt`]
    pub fn decrypt(&self, token: &str) -> Result<String, DecryptError> {
        let raw = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|e| DecryptError::Encoding(e.to_string()))?;

        if raw.len() < 1 + NONCE_LEN + TAG_LEN {
            return Err(DecryptError::Truncated);
        }

        let (version, rest) = (raw[0], &raw[1..]);
        if version != TOKEN_VERSION {
            return Err(DecryptError::UnsupportedVersion(version));
        }

        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: &[version],
                },
            )
            .map_err(|_| DecryptError::Authentication)?;

        String::from_utf8(plaintext).map_err(|_| DecryptError::Utf8)
    }
}

impl fmt::Debug for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault").field("key", &"<redacted>").finish()
    }
}

/// Generate a fresh random key, URL-safe base64 encoded, suitable for
/// [`Vault::from_key_material`]
pub fn generate_key() -> String {
    let key = Aes256Gcm::generate_key(OsRng);
    URL_SAFE.encode(key.as_slice())
}
