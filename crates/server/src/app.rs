//! Application state and HTTP routing.

use axum::routing::{get, post};
use axum::Router;
use mycert_config::Config;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::files::FileServer;
use crate::handlers;
use crate::tool::CertTool;

/// Shared, read-only state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Startup configuration
    pub config: Arc<Config>,
    /// Certificate tool used for issuance
    pub tool: Arc<dyn CertTool>,
    /// On-disk overrides for `/static/*`, if configured
    pub static_files: Option<FileServer>,
}

impl AppState {
    pub fn new(config: Config, tool: Arc<dyn CertTool>) -> Self {
        let static_files = config.static_dir.clone().map(FileServer::new);
        Self {
            config: Arc::new(config),
            tool,
            static_files,
        }
    }
}

/// Build the router.
///
/// Routes:
/// - GET  /                  - landing page
/// - GET  /static/*path      - UI assets
/// - GET  /mycertCA.pem      - root certificate download
/// - GET  /mycertCA.crt      - root certificate download (alias)
/// - GET  /mycertCA-key.pem  - root private key download, `?key=<secret>`
/// - POST /api/make          - issue a certificate
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/static/*path", get(handlers::static_asset))
        .route("/mycertCA.pem", get(handlers::root_cert_pem))
        .route("/mycertCA.crt", get(handlers::root_cert_crt))
        .route("/mycertCA-key.pem", get(handlers::root_key))
        .route("/api/make", post(handlers::make_cert))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
