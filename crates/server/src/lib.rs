//! mycert Server Library
//!
//! A small HTTP front-end for mkcert: it hands out the local root CA and issues
//! leaf certificates for arbitrary domain lists on request.
//!
//! - **Bootstrap**: provisions the root CA on first start
//! - **Issuance**: runs mkcert per request with a deadline and a clean environment
//! - **Downloads**: root certificate, and the root key behind a shared secret
//! - **Web UI**: an embedded landing page and its assets
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mycert_config::Config;
//! use mycert_server::{router, AppState, MkcertTool};
//!
//! let config = Config::default().resolve_paths()?;
//! let tool = Arc::new(MkcertTool::new(&config));
//! let app = router(AppState::new(config, tool));
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

pub mod app;
pub mod assets;
pub mod bootstrap;
pub mod cli;
pub mod errors;
pub mod files;
pub mod handlers;
pub mod sweep;
pub mod tool;

// ============================================================================
// Public API Re-exports
// ============================================================================

// Routing
pub use app::{router, AppState};

// Startup
pub use bootstrap::{ensure_root_ca, prepare_directories, BootstrapError, RootCaState};
pub use cli::{Cli, LogFormat};

// Certificate tool
pub use tool::{CertTool, IssuedCertificate, MkcertTool, ToolError};

// Errors
pub use errors::ApiError;

// Artifact cleanup
pub use sweep::ArtifactSweeper;
