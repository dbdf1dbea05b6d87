//! Configuration for Warden
//!
//! Loaded from a TOML file and/or `WARDEN_*` environment variables.
//!
//! Example config:
//! ```toml
//! [directory]
//! server_url = "ldaps://dc01.corp.example.com:636"
//! domain = "corp.example.com"
//!
//! [access]
//! allowed_users = ["jdoe"]
//! allowed_groups = ["CN=Ops"]
//!
//! [vault]
//! key_file = "/etc/warden/vault.key"
//! ```

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WardenConfig {
    #[serde(default)]
    pub directory: DirectoryConfig,

    #[serde(default)]
    pub access: AccessConfig,

    #[serde(default)]
    pub vault: VaultConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WardenConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load the file if one is given, then let the environment override it.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::from_env());
        };

        let mut config = Self::from_file(path)?;
        config.apply_env();
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{}{}", crate::ENV_PREFIX, suffix));

        if let Some(url) = var("DIRECTORY_URL") {
            self.directory.server_url = url;
        }
        if let Some(domain) = var("DOMAIN") {
            self.directory.domain = domain;
        }
        if let Some(base_dn) = var("BASE_DN") {
            self.directory.base_dn = Some(base_dn);
        }
        if let Some(format) = var("BIND_FORMAT") {
            self.directory.bind_format = format;
        }
        if let Some(filter) = var("USER_FILTER") {
            self.directory.user_filter = filter;
        }
        if let Some(start_tls) = var("START_TLS") {
            self.directory.start_tls = start_tls == "true" || start_tls == "1";
        }
        if let Some(insecure) = var("ALLOW_INSECURE") {
            self.directory.allow_insecure = insecure == "true" || insecure == "1";
        }
        if let Some(user) = var("SERVICE_USER") {
            self.directory.service_user = user;
        }
        if let Some(password) = var("SERVICE_PASSWORD") {
            self.directory.service_password = password;
        }
        if let Some(timeout) = var("TIMEOUT_SECS") {
            if let Ok(t) = timeout.parse() {
                self.directory.timeout_seconds = t;
            }
        }

        if let Some(users) = var("ALLOWED_USERS") {
            self.access.allowed_users = split_list(&users);
        }
        if let Some(groups) = var("ALLOWED_GROUPS") {
            self.access.allowed_groups = split_list(&groups);
        }

        if let Some(key) = var("ENCRYPTION_KEY") {
            self.vault.key = Some(key);
        }
        if let Some(path) = var("CREDENTIALS_PATH") {
            self.storage.credentials_path = Some(PathBuf::from(path));
        }
        if let Some(path) = var("AUDIT_LOG") {
            self.audit.path = PathBuf::from(path);
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.directory.validate()?;
        self.vault.validate()?;
        Ok(())
    }
}

/// Split a comma-separated list, trimming items and dropping empty ones.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// ============================================================================
// Directory
// ============================================================================

/// Directory (LDAP / Active Directory) connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Server URL (ldap:// or ldaps://). A bare host name is accepted and
    /// treated as ldap://host.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// DNS domain, e.g. "corp.example.com"
    #[serde(default)]
    pub domain: String,

    /// Search base. Derived from `domain` when unset.
    #[serde(default)]
    pub base_dn: Option<String>,

    /// Bind name template. Placeholders: {domain}, {username}
    #[serde(default = "default_bind_format")]
    pub bind_format: String,

    /// Account search filter. Placeholder: {username}
    #[serde(default = "default_user_filter")]
    pub user_filter: String,

    /// Attribute holding group memberships
    #[serde(default = "default_group_attribute")]
    pub group_attribute: String,

    /// Use STARTTLS for connection upgrade
    #[serde(default)]
    pub start_tls: bool,

    /// Permit simple binds over plain ldap:// without STARTTLS. Passwords then
    /// cross the network in cleartext.
    #[serde(default)]
    pub allow_insecure: bool,

    /// Service account, used only for the connection check
    #[serde(default)]
    pub service_user: String,

    #[serde(default)]
    pub service_password: String,

    /// Budget for connect, bind and search, each (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_server_url() -> String {
    "ldap://localhost:389".to_string()
}

fn default_bind_format() -> String {
    "{domain}\\{username}".to_string()
}

fn default_user_filter() -> String {
    "(sAMAccountName={username})".to_string()
}

fn default_group_attribute() -> String {
    "memberOf".to_string()
}

fn default_timeout() -> u64 {
    crate::DEFAULT_TIMEOUT_SECS
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            domain: String::new(),
            base_dn: None,
            bind_format: default_bind_format(),
            user_filter: default_user_filter(),
            group_attribute: default_group_attribute(),
            start_tls: false,
            allow_insecure: false,
            service_user: String::new(),
            service_password: String::new(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl DirectoryConfig {
    /// Server URL with a scheme
    pub fn url(&self) -> String {
        let url = self.server_url.trim();
        if url.contains("://") {
            url.to_string()
        } else {
            format!("ldap://{}", url)
        }
    }

    /// Configured base DN, or one derived from the domain:
    /// "corp.example.com" -> "DC=corp,DC=example,DC=com"
    pub fn base_dn(&self) -> String {
        if let Some(base) = self.base_dn.as_deref().filter(|b| !b.trim().is_empty()) {
            return base.to_string();
        }

        self.domain
            .split('.')
            .filter(|label| !label.is_empty())
            .map(|label| format!("DC={}", label))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Fully-qualified principal name used for the bind
    pub fn bind_name(&self, username: &str) -> String {
        self.bind_format
            .replace("{domain}", &self.domain)
            .replace("{username}", username)
    }

    /// Build the account search filter. `escaped_username` must already be
    /// escaped for use inside an LDAP filter.
    pub fn build_user_filter(&self, escaped_username: &str) -> String {
        self.user_filter.replace("{username}", escaped_username)
    }

    /// Whether binds travel over TLS (ldaps:// or STARTTLS)
    pub fn is_encrypted(&self) -> bool {
        self.start_tls || self.url().starts_with("ldaps://")
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds)
    }

    pub fn validate(&self) -> Result<()> {
        if self.domain.trim().is_empty() {
            return Err(ConfigError::Missing("directory.domain"));
        }

        let url = self.url();
        if !url.starts_with("ldap://") && !url.starts_with("ldaps://") {
            return Err(ConfigError::invalid(
                "directory.server_url",
                "must start with ldap:// or ldaps://",
            ));
        }

        if !self.is_encrypted() && !self.allow_insecure {
            return Err(ConfigError::invalid(
                "directory.server_url",
                "ldap:// sends passwords in cleartext; use ldaps://, enable start_tls, or set allow_insecure",
            ));
        }

        if !self.bind_format.contains("{username}") {
            return Err(ConfigError::invalid(
                "directory.bind_format",
                "must contain {username} placeholder",
            ));
        }

        if !self.user_filter.contains("{username}") {
            return Err(ConfigError::invalid(
                "directory.user_filter",
                "must contain {username} placeholder",
            ));
        }

        if self.group_attribute.trim().is_empty() {
            return Err(ConfigError::Missing("directory.group_attribute"));
        }

        if self.timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "directory.timeout_seconds",
                "must be positive",
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Access
// ============================================================================

/// Static allow-lists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Account names granted access directly
    #[serde(default)]
    pub allowed_users: Vec<String>,

    /// Group identifiers; a membership containing any of these grants access
    #[serde(default)]
    pub allowed_groups: Vec<String>,
}

// ============================================================================
// Vault
// ============================================================================

/// Symmetric key source for the credential vault
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Key material (64 hex chars or base64 of 32 bytes)
    #[serde(default)]
    pub key: Option<String>,

    /// Path to a file containing the key
    #[serde(default)]
    pub key_file: Option<PathBuf>,

    /// Environment variable containing the key
    #[serde(default)]
    pub key_env: Option<String>,
}

impl VaultConfig {
    /// Resolve the key material from the first configured source.
    pub fn key_material(&self) -> Result<String> {
        if let Some(key) = self.key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            return Ok(key.to_string());
        }

        if let Some(ref path) = self.key_file {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            let key = content.trim();
            if key.is_empty() {
                return Err(ConfigError::InvalidKey(format!("key file {:?} is empty", path)));
            }
            return Ok(key.to_string());
        }

        if let Some(ref env_var) = self.key_env {
            if let Some(key) = std::env::var(env_var).ok().filter(|k| !k.trim().is_empty()) {
                return Ok(key.trim().to_string());
            }
        }

        Err(ConfigError::Missing("vault.key"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.key.is_none() && self.key_file.is_none() && self.key_env.is_none() {
            return Err(ConfigError::Missing("vault.key"));
        }
        Ok(())
    }
}

// ============================================================================
// Storage, audit, logging
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Encrypted credential cache file. Defaults to ~/.warden/credentials
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn credentials_path(&self) -> PathBuf {
        if let Some(ref path) = self.credentials_path {
            return path.clone();
        }

        let dir = directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".warden"))
            .unwrap_or_else(|| PathBuf::from(".warden"));

        dir.join("credentials")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_audit_path")]
    pub path: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_audit_path() -> PathBuf {
    PathBuf::from("auth.log")
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_audit_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
