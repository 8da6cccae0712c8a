//! Identifier newtypes for issued certificate artifacts.
//!
//! Every issuance writes a certificate/key pair into the working directory
//! under a fresh [`ArtifactPrefix`]. The prefix is what keeps concurrent
//! requests from overwriting each other's files, so it is generated in one
//! place and parsed back in one place.

use chrono::{DateTime, Local, TimeZone};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp layout used at the start of every prefix (second precision).
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Number of digits produced by [`TIMESTAMP_FORMAT`].
const TIMESTAMP_LEN: usize = 14;

/// Random bytes appended to the timestamp.
pub const ENTROPY_BYTES: usize = 4;

/// Suffix of the certificate file written for a prefix.
pub const CERT_SUFFIX: &str = ".pem";

/// Suffix of the private key file written for a prefix.
pub const KEY_SUFFIX: &str = "-key.pem";

/// Unique filename prefix for one issued certificate/key pair.
///
/// Formatted as `YYYYMMDDhhmmss-xxxxxxxx`: the local time of issuance
/// followed by 4 bytes from the OS random source, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactPrefix(String);

impl ArtifactPrefix {
    /// Generate a fresh prefix for the current local time
    pub fn generate() -> Self {
        let mut entropy = [0u8; ENTROPY_BYTES];
        OsRng.fill_bytes(&mut entropy);
        Self::at(&Local::now(), entropy)
    }

    /// Build a prefix from an explicit time and entropy
    pub fn at<Tz>(time: &DateTime<Tz>, entropy: [u8; ENTROPY_BYTES]) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        Self(format!(
            "{}-{}",
            time.format(TIMESTAMP_FORMAT),
            hex::encode(entropy)
        ))
    }

    /// Parse a prefix, accepting only the exact generated layout
    pub fn parse(s: &str) -> Option<Self> {
        let (timestamp, entropy) = s.split_once('-')?;

        let timestamp_ok =
            timestamp.len() == TIMESTAMP_LEN && timestamp.bytes().all(|b| b.is_ascii_digit());
        let entropy_ok = entropy.len() == ENTROPY_BYTES * 2
            && entropy
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));

        (timestamp_ok && entropy_ok).then(|| Self(s.to_string()))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the certificate written for this prefix
    pub fn cert_file_name(&self) -> String {
        format!("{}{}", self.0, CERT_SUFFIX)
    }

    /// File name of the private key written for this prefix
    pub fn key_file_name(&self) -> String {
        format!("{}{}", self.0, KEY_SUFFIX)
    }

    /// File name of the given artifact kind
    pub fn file_name(&self, kind: ArtifactKind) -> String {
        match kind {
            ArtifactKind::Certificate => self.cert_file_name(),
            ArtifactKind::Key => self.key_file_name(),
        }
    }
}

impl fmt::Display for ArtifactPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ArtifactPrefix {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Which half of an issued pair a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Certificate,
    Key,
}

impl ArtifactKind {
    /// Classify a file name produced for an issuance.
    ///
    /// Returns `None` for anything that is not exactly `<prefix>.pem` or
    /// `<prefix>-key.pem`, e.g. files an operator dropped into the directory.
    pub fn from_file_name(name: &str) -> Option<(ArtifactPrefix, ArtifactKind)> {
        if let Some(stem) = name.strip_suffix(KEY_SUFFIX) {
            if let Some(prefix) = ArtifactPrefix::parse(stem) {
                return Some((prefix, ArtifactKind::Key));
            }
        }

        let stem = name.strip_suffix(CERT_SUFFIX)?;
        ArtifactPrefix::parse(stem).map(|prefix| (prefix, ArtifactKind::Certificate))
    }
}
