//! Configuration for the mycert certificate service.
//!
//! A [`Config`] is built once at startup (from flags and environment in the
//! server binary), validated, has its paths made absolute, and is then shared
//! read-only with every request handler.
//!
//! # Example
//!
//! ```
//! use mycert_config::Config;
//!
//! let config = Config::default().resolve_paths().unwrap();
//! config.validate().unwrap();
//! assert!(config.cert_dir.is_absolute());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

mod validate;

pub use validate::{parse_listen_addr, ConfigError};

/// Default listen address, Go-style: all interfaces, port 80
pub const DEFAULT_ADDR: &str = ":80";

/// Default shared secret guarding the root CA private key
pub const DEFAULT_SECRET: &str = "admin";

/// Default working directory for issued certificates
pub const DEFAULT_CERT_DIR: &str = "./certs";

/// Default path of the mkcert binary
pub const DEFAULT_TOOL_PATH: &str = "./mkcert";

/// Default CA root directory handed to mkcert as `CAROOT`
pub const DEFAULT_CA_ROOT: &str = "./ca";

/// Default page title
pub const DEFAULT_TITLE: &str = "HTTPS Self-Signed Certificates";

/// Default deadline for one issuance run
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 60;

/// File name of the root certificate inside the CA root
pub const ROOT_CERT_FILE: &str = "rootCA.pem";

/// File name of the root private key inside the CA root
pub const ROOT_KEY_FILE: &str = "rootCA-key.pem";

/// What happens to an issued certificate/key pair once it has been returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionPolicy {
    /// Leave the files in the working directory indefinitely
    #[default]
    Keep,
    /// Delete both files after they have been read for the response
    Remove,
}

impl RetentionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetentionPolicy::Keep => "keep",
            RetentionPolicy::Remove => "remove",
        }
    }
}

impl fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetentionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(RetentionPolicy::Keep),
            "remove" => Ok(RetentionPolicy::Remove),
            other => Err(ConfigError::UnknownRetention(other.to_string())),
        }
    }
}

/// Service configuration, immutable after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address the HTTP server binds to
    pub listen: SocketAddr,
    /// Shared secret required to download the root CA private key
    pub secret: String,
    /// Working directory the tool writes issued certificates into
    pub cert_dir: PathBuf,
    /// Path of the mkcert binary
    pub tool_path: PathBuf,
    /// CA root directory (`CAROOT`)
    pub ca_root: PathBuf,
    /// Title shown on the landing page
    pub title: String,
    /// Optional on-disk directory overriding the embedded `/static` assets
    pub static_dir: Option<PathBuf>,
    /// Deadline for a single issuance run
    pub tool_timeout: Duration,
    /// What to do with issued files after the response
    pub retention: RetentionPolicy,
    /// When set, artifacts older than this are swept from `cert_dir`
    pub sweep_after: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 80)),
            secret: DEFAULT_SECRET.to_string(),
            cert_dir: PathBuf::from(DEFAULT_CERT_DIR),
            tool_path: PathBuf::from(DEFAULT_TOOL_PATH),
            ca_root: PathBuf::from(DEFAULT_CA_ROOT),
            title: DEFAULT_TITLE.to_string(),
            static_dir: None,
            tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            retention: RetentionPolicy::Keep,
            sweep_after: None,
        }
    }
}

impl Config {
    /// Path of the root certificate
    pub fn root_cert_path(&self) -> PathBuf {
        self.ca_root.join(ROOT_CERT_FILE)
    }

    /// Path of the root private key
    pub fn root_key_path(&self) -> PathBuf {
        self.ca_root.join(ROOT_KEY_FILE)
    }
}
