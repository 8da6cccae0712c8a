//! Certificate tool abstraction
//!
//! All cryptography is delegated to an external mkcert binary. This module
//! decouples the rest of the service from process execution: handlers and
//! bootstrap talk to a [`CertTool`], production uses [`MkcertTool`], and tests
//! substitute a fake.

use async_trait::async_trait;
use mycert_common::{ArtifactKind, ArtifactPrefix};
use mycert_config::{Config, RetentionPolicy};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Environment variable telling mkcert where the CA lives
pub const CAROOT_ENV: &str = "CAROOT";

/// Errors from running the certificate tool
#[derive(Debug, Error)]
pub enum ToolError {
    /// The binary could not be started or waited on
    #[error("failed to run {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Issuance exited non-zero; displays the tool's captured output verbatim
    #[error("{output}")]
    Failed { status: ExitStatus, output: String },

    /// `-install` exited non-zero
    #[error("root CA installation exited with {0}")]
    InstallFailed(ExitStatus),

    /// The deadline elapsed and the process was killed
    #[error("certificate tool timed out after {0:?}")]
    TimedOut(Duration),

    /// The tool reported success but an output file could not be read
    #[error("{}: {source}", path.display())]
    ReadOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A freshly issued certificate/key pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCertificate {
    /// Prefix the files were written under
    pub prefix: ArtifactPrefix,
    /// PEM-encoded leaf certificate
    pub cert_pem: String,
    /// PEM-encoded private key
    pub key_pem: String,
    /// Combined stdout and stderr of the run
    pub output: String,
}

/// Operations the service needs from the certificate tool.
#[async_trait]
pub trait CertTool: Send + Sync {
    /// Provision the root CA in the CA root directory
    async fn install_root_ca(&self) -> Result<(), ToolError>;

    /// Issue a leaf certificate covering `domains`
    async fn issue(&self, domains: &[String]) -> Result<IssuedCertificate, ToolError>;
}

/// mkcert driven as a subprocess
#[derive(Debug, Clone)]
pub struct MkcertTool {
    binary: PathBuf,
    ca_root: PathBuf,
    work_dir: PathBuf,
    timeout: Duration,
    retention: RetentionPolicy,
}

impl MkcertTool {
    pub fn new(config: &Config) -> Self {
        Self {
            binary: config.tool_path.clone(),
            ca_root: config.ca_root.clone(),
            work_dir: config.cert_dir.clone(),
            timeout: config.tool_timeout,
            retention: config.retention,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn spawn_error(&self, source: io::Error) -> ToolError {
        ToolError::Spawn {
            path: self.binary.clone(),
            source,
        }
    }

    /// Run mkcert for one prefix and read back what it wrote
    async fn run_issue(
        &self,
        prefix: &ArtifactPrefix,
        domains: &[String],
    ) -> Result<IssuedCertificate, ToolError> {
        let cert_file = prefix.cert_file_name();
        let key_file = prefix.key_file_name();

        // Only CAROOT is passed through so the tool cannot pick up another CA
        let child = Command::new(&self.binary)
            .arg("--cert-file")
            .arg(&cert_file)
            .arg("--key-file")
            .arg(&key_file)
            .args(domains)
            .current_dir(&self.work_dir)
            .env_clear()
            .env(CAROOT_ENV, &self.ca_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        debug!(
            prefix = %prefix,
            pid = ?child.id(),
            "Spawned certificate tool"
        );

        // Dropping the wait future on timeout drops the child, which kills it
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| self.spawn_error(e))?,
            Err(_) => {
                warn!(
                    prefix = %prefix,
                    timeout = ?self.timeout,
                    "Certificate tool timed out, killed"
                );
                return Err(ToolError::TimedOut(self.timeout));
            }
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            warn!(
                prefix = %prefix,
                status = %output.status,
                "Certificate tool failed"
            );
            return Err(ToolError::Failed {
                status: output.status,
                output: combined,
            });
        }

        let cert_pem = read_artifact(&self.work_dir.join(&cert_file)).await?;
        let key_pem = read_artifact(&self.work_dir.join(&key_file)).await?;

        Ok(IssuedCertificate {
            prefix: prefix.clone(),
            cert_pem,
            key_pem,
            output: combined,
        })
    }

    /// Delete both files of a prefix; missing files are fine
    async fn discard(&self, prefix: &ArtifactPrefix) {
        for kind in [ArtifactKind::Certificate, ArtifactKind::Key] {
            let path = self.work_dir.join(prefix.file_name(kind));
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "Removed issued artifact"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to remove issued artifact"
                ),
            }
        }
    }
}

#[async_trait]
impl CertTool for MkcertTool {
    async fn install_root_ca(&self) -> Result<(), ToolError> {
        info!(
            tool = %self.binary.display(),
            ca_root = %self.ca_root.display(),
            "Installing root CA"
        );

        // Operator-facing: inherit the environment and terminal
        let status = Command::new(&self.binary)
            .arg("-install")
            .current_dir(&self.work_dir)
            .env(CAROOT_ENV, &self.ca_root)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !status.success() {
            return Err(ToolError::InstallFailed(status));
        }
        Ok(())
    }

    async fn issue(&self, domains: &[String]) -> Result<IssuedCertificate, ToolError> {
        let prefix = ArtifactPrefix::generate();
        let result = self.run_issue(&prefix, domains).await;

        if self.retention == RetentionPolicy::Remove {
            self.discard(&prefix).await;
        }

        result
    }
}

async fn read_artifact(path: &Path) -> Result<String, ToolError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ToolError::ReadOutput {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
