//! Startup preparation
//!
//! Runs once, before the listener is bound: creates the working and CA
//! directories and makes sure a root CA exists. Every error here is fatal.

use mycert_config::Config;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::tool::{CertTool, ToolError};

/// Errors that can occur during startup preparation
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Failed to create directory: {0}")]
    CreateDir(String),

    #[error("Failed to install root CA: {0}")]
    Install(#[from] ToolError),
}

/// Outcome of [`ensure_root_ca`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootCaState {
    /// `rootCA.pem` was already present; the tool was not run
    AlreadyPresent,
    /// The tool was run with `-install`
    Installed,
}

/// Ensure the working directory and CA root exist
pub fn prepare_directories(config: &Config) -> Result<(), BootstrapError> {
    create_dir_if_missing(&config.cert_dir)?;
    create_dir_if_missing(&config.ca_root)?;
    Ok(())
}

/// Check whether the root certificate is present
pub fn root_ca_exists(config: &Config) -> bool {
    config.root_cert_path().is_file()
}

/// Install the root CA unless `rootCA.pem` already exists
pub async fn ensure_root_ca(
    config: &Config,
    tool: &dyn CertTool,
) -> Result<RootCaState, BootstrapError> {
    if root_ca_exists(config) {
        debug!(
            root_cert = %config.root_cert_path().display(),
            "Root CA present, skipping installation"
        );
        return Ok(RootCaState::AlreadyPresent);
    }

    info!(
        ca_root = %config.ca_root.display(),
        "No root CA found, running install"
    );
    tool.install_root_ca().await?;

    if !root_ca_exists(config) {
        warn!(
            root_cert = %config.root_cert_path().display(),
            "Install finished but the root certificate is still missing"
        );
    }

    Ok(RootCaState::Installed)
}

/// Create a directory if it doesn't exist
fn create_dir_if_missing(path: &Path) -> Result<(), BootstrapError> {
    if path.is_dir() {
        return Ok(());
    }

    std::fs::create_dir_all(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            BootstrapError::PermissionDenied(path.display().to_string())
        } else {
            BootstrapError::CreateDir(format!("{}: {}", path.display(), e))
        }
    })?;

    debug!(path = %path.display(), "Created directory");
    Ok(())
}
