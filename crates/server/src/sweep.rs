//! Background sweep of old issued artifacts
//!
//! Issued certificate/key pairs are kept on disk by default. When a maximum
//! age is configured, this task periodically deletes artifact files older than
//! that age from the working directory. Files whose names are not artifact
//! names are never touched.

use mycert_common::ArtifactKind;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Shortest interval between sweeps
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Longest interval between sweeps (1 hour)
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Deletes artifact files older than a maximum age
#[derive(Debug, Clone)]
pub struct ArtifactSweeper {
    /// Directory the certificate tool writes into
    dir: PathBuf,
    /// Artifacts older than this are deleted
    max_age: Duration,
    /// Time between sweeps
    check_interval: Duration,
}

impl ArtifactSweeper {
    /// Create a sweeper checking at half the maximum age, clamped to
    /// [1 second, 1 hour]
    pub fn new(dir: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            dir: dir.into(),
            max_age,
            check_interval: (max_age / 2).clamp(MIN_SWEEP_INTERVAL, MAX_SWEEP_INTERVAL),
        }
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Run the sweep loop forever
    pub async fn run(self) {
        info!(
            dir = %self.dir.display(),
            max_age_secs = self.max_age.as_secs(),
            check_interval_secs = self.check_interval.as_secs(),
            "Starting artifact sweeper"
        );

        let mut interval = interval(self.check_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            match self.sweep_once().await {
                Ok(0) => debug!("Artifact sweep found nothing to delete"),
                Ok(removed) => info!(removed, "Swept old artifacts"),
                Err(e) => warn!(error = %e, "Artifact sweep failed"),
            }
        }
    }

    /// Delete expired artifacts once, returning how many files were removed
    pub async fn sweep_once(&self) -> io::Result<usize> {
        let now = SystemTime::now();
        let mut removed = 0;

        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if ArtifactKind::from_file_name(name).is_none() {
                continue;
            }

            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }

            let age = now
                .duration_since(metadata.modified()?)
                .unwrap_or_default();
            if age <= self.max_age {
                continue;
            }

            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => {
                    debug!(file = %name, age_secs = age.as_secs(), "Removed expired artifact");
                    removed += 1;
                }
                // Raced with another remover
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }

        Ok(removed)
    }
}
