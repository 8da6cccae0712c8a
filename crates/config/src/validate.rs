//! Configuration validation and path resolution.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

use crate::Config;

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid listen address '{addr}': {reason}")]
    InvalidListenAddress { addr: String, reason: String },

    #[error("shared secret must not be empty")]
    EmptySecret,

    #[error("title must not be empty")]
    EmptyTitle,

    #[error("tool timeout must be greater than zero")]
    ZeroToolTimeout,

    #[error("sweep age must be greater than zero")]
    ZeroSweepAge,

    #[error("unknown retention policy '{0}' (expected 'keep' or 'remove')")]
    UnknownRetention(String),

    #[error("failed to resolve {what} path {path:?}: {source}")]
    ResolvePath {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Parse a listen address.
///
/// Accepts a full socket address (`127.0.0.1:8080`, `[::1]:8080`), a
/// `host:port` pair that resolves, or the Go-style `:port` shorthand which
/// binds every IPv4 interface.
pub fn parse_listen_addr(addr: &str) -> Result<SocketAddr, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidListenAddress {
        addr: addr.to_string(),
        reason,
    };

    let addr = addr.trim();
    if let Some(port) = addr.strip_prefix(':') {
        let port: u16 = port
            .parse()
            .map_err(|e| invalid(format!("bad port: {}", e)))?;
        return Ok(SocketAddr::from(([0, 0, 0, 0], port)));
    }

    if let Ok(parsed) = addr.parse::<SocketAddr>() {
        return Ok(parsed);
    }

    addr.to_socket_addrs()
        .map_err(|e| invalid(e.to_string()))?
        .next()
        .ok_or_else(|| invalid("resolved to no addresses".to_string()))
}

impl Config {
    /// Check the invariants that cannot be expressed in the types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        trace!("Validating configuration");

        if self.secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        if self.title.trim().is_empty() {
            return Err(ConfigError::EmptyTitle);
        }
        if self.tool_timeout == Duration::ZERO {
            return Err(ConfigError::ZeroToolTimeout);
        }
        if self.sweep_after == Some(Duration::ZERO) {
            return Err(ConfigError::ZeroSweepAge);
        }

        Ok(())
    }

    /// Make every configured filesystem path absolute.
    ///
    /// Relative paths are resolved against the current working directory.
    /// The paths do not have to exist yet.
    pub fn resolve_paths(mut self) -> Result<Self, ConfigError> {
        self.cert_dir = absolute("cert dir", &self.cert_dir)?;
        self.tool_path = absolute("mkcert", &self.tool_path)?;
        self.ca_root = absolute("CA root", &self.ca_root)?;
        if let Some(ref dir) = self.static_dir {
            self.static_dir = Some(absolute("static dir", dir)?);
        }

        debug!(
            cert_dir = %self.cert_dir.display(),
            tool = %self.tool_path.display(),
            ca_root = %self.ca_root.display(),
            "Resolved configured paths"
        );

        Ok(self)
    }
}

fn absolute(what: &'static str, path: &Path) -> Result<PathBuf, ConfigError> {
    std::path::absolute(path).map_err(|source| ConfigError::ResolvePath {
        what,
        path: path.to_path_buf(),
        source,
    })
}
