//! Command-line interface.
//!
//! Every option is a flag with an environment variable fallback. Flags win
//! over the environment, and both win over the built-in defaults.

use clap::{Parser, ValueEnum};
use mycert_config::{
    parse_listen_addr, Config, ConfigError, RetentionPolicy, DEFAULT_ADDR, DEFAULT_CA_ROOT,
    DEFAULT_CERT_DIR, DEFAULT_SECRET, DEFAULT_TITLE, DEFAULT_TOOL_PATH,
    DEFAULT_TOOL_TIMEOUT_SECS,
};
use std::path::PathBuf;
use std::time::Duration;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// mycert - issue locally-trusted development certificates over HTTP
#[derive(Parser, Debug)]
#[command(name = "mycert")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Listen address; `:port` binds every interface
    #[arg(long = "addr", env = "MYCERT_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: String,

    /// Shared secret required to download the root CA private key
    #[arg(long = "key", env = "MYCERT_KEY", default_value = DEFAULT_SECRET, hide_env_values = true)]
    pub key: String,

    /// Working directory for issued certificates
    #[arg(long = "dir", env = "MYCERT_DIR", default_value = DEFAULT_CERT_DIR)]
    pub dir: PathBuf,

    /// Path to the mkcert binary
    #[arg(long = "mkcert", env = "MYCERT_MKCERT", default_value = DEFAULT_TOOL_PATH)]
    pub mkcert: PathBuf,

    /// CA root directory, passed to mkcert as CAROOT
    #[arg(long = "caroot", env = "MYCERT_CAROOT", default_value = DEFAULT_CA_ROOT)]
    pub caroot: PathBuf,

    /// Page title
    #[arg(long = "title", env = "MYCERT_TITLE", default_value = DEFAULT_TITLE)]
    pub title: String,

    /// Serve `/static/*` from this directory instead of the embedded assets
    #[arg(long = "static-dir", env = "MYCERT_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Deadline for one certificate issuance, in seconds
    #[arg(long = "tool-timeout-secs", env = "MYCERT_TOOL_TIMEOUT_SECS", default_value_t = DEFAULT_TOOL_TIMEOUT_SECS)]
    pub tool_timeout_secs: u64,

    /// What to do with issued files once returned (keep or remove)
    #[arg(long = "retention", env = "MYCERT_RETENTION", default_value_t = RetentionPolicy::Keep)]
    pub retention: RetentionPolicy,

    /// Periodically delete issued files older than this many seconds
    #[arg(long = "sweep-after-secs", env = "MYCERT_SWEEP_AFTER_SECS")]
    pub sweep_after_secs: Option<u64>,

    /// Log output format
    #[arg(long = "log-format", env = "MYCERT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Enable verbose logging (debug level)
    #[arg(long = "verbose")]
    pub verbose: bool,

    /// Test configuration and exit
    #[arg(short = 't', long = "test")]
    pub test: bool,
}

impl Cli {
    /// Build a validated configuration with absolute paths
    pub fn to_config(&self) -> Result<Config, ConfigError> {
        let config = Config {
            listen: parse_listen_addr(&self.addr)?,
            secret: self.key.clone(),
            cert_dir: self.dir.clone(),
            tool_path: self.mkcert.clone(),
            ca_root: self.caroot.clone(),
            title: self.title.clone(),
            static_dir: self.static_dir.clone(),
            tool_timeout: Duration::from_secs(self.tool_timeout_secs),
            retention: self.retention,
            sweep_after: self.sweep_after_secs.map(Duration::from_secs),
        };

        config.validate()?;
        config.resolve_paths()
    }
}
