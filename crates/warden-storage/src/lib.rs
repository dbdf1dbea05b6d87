//! Local persistence for Warden

pub mod credentials;

pub use credentials::{CacheError, CredentialCache, StoredCredentials, RECORD_SEPARATOR};
