//! Request handlers.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::app::AppState;
use crate::assets;
use crate::errors::ApiError;
use crate::files::{serve_file, Disposition, FileError};

/// Download name of the root certificate
pub const ROOT_CERT_PEM_NAME: &str = "mycertCA.pem";

/// Download name of the root certificate, `.crt` flavour
pub const ROOT_CERT_CRT_NAME: &str = "mycertCA.crt";

/// Download name of the root private key
pub const ROOT_KEY_NAME: &str = "mycertCA-key.pem";

/// Body of `POST /api/make`
#[derive(Debug, Clone, Deserialize)]
pub struct MakeCertRequest {
    pub domains: Vec<String>,
}

/// Successful response of `POST /api/make`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MakeCertResponse {
    pub cert: String,
    pub key: String,
}

/// Query parameter carrying the shared secret on `GET /mycertCA-key.pem`
pub const KEY_PARAM: &str = "key";

/// First value of `name` in a decoded query; a missing parameter is the empty string
pub fn first_param<'a>(pairs: &'a [(String, String)], name: &str) -> &'a str {
    pairs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .unwrap_or_default()
}

/// Plain equality against the configured secret
pub fn is_authorized(secret: &str, supplied: &str) -> bool {
    supplied == secret
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(assets::render_index(&state.config.title))
}

pub async fn static_asset(
    State(state): State<AppState>,
    Path(path): Path<String>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(ref files) = state.static_files {
        match files.serve(&method, &headers, &path).await {
            Ok(response) => return Ok(response.into_response()),
            Err(FileError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    let asset = assets::lookup(&path).ok_or_else(|| FileError::NotFound(PathBuf::from(&path)))?;
    Ok(asset.to_response()?.into_response())
}

pub async fn root_cert_pem(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let path = state.config.root_cert_path();
    let response =
        serve_file(&method, &headers, &path, Disposition::Attachment(ROOT_CERT_PEM_NAME)).await?;
    Ok(response.into_response())
}

pub async fn root_cert_crt(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let path = state.config.root_cert_path();
    let response =
        serve_file(&method, &headers, &path, Disposition::Attachment(ROOT_CERT_CRT_NAME)).await?;
    Ok(response.into_response())
}

pub async fn root_key(
    State(state): State<AppState>,
    Query(query): Query<Vec<(String, String)>>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if !is_authorized(&state.config.secret, first_param(&query, KEY_PARAM)) {
        warn!("Rejected root key download: token mismatch");
        return Err(ApiError::Unauthorized);
    }

    info!("Serving root CA private key");
    let path = state.config.root_key_path();
    let response =
        serve_file(&method, &headers, &path, Disposition::Attachment(ROOT_KEY_NAME)).await?;
    Ok(response.into_response())
}

/// Issue a certificate.
///
/// The body is decoded by hand rather than with the `Json` extractor so that
/// every decoding failure is a 400 carrying the parser's message, regardless
/// of content type.
pub async fn make_cert(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<MakeCertResponse>, ApiError> {
    let request: MakeCertRequest = serde_json::from_slice(&body)?;

    info!(domains = ?request.domains, "Issuing certificate");
    let issued = state.tool.issue(&request.domains).await?;
    info!(
        prefix = %issued.prefix,
        domains = request.domains.len(),
        "Issued certificate"
    );

    Ok(Json(MakeCertResponse {
        cert: issued.cert_pem,
        key: issued.key_pem,
    }))
}
