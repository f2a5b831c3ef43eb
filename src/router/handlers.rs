use super::static_files::StaticFiles;
use super::types::ApiError;
use crate::federation::fanout::Federation;
use crate::federation::protocol::VIA_HEADER;
use crate::federation::types::ViaChain;
use crate::http::request::Headers;
use crate::http::response::Response;
use crate::storage::memory::ChirpStore;
use crate::storage::types::{Chirp, ChirpId, ChirpList, CreateChirpRequest, DeleteChirpResponse};

use http::StatusCode;
use serde_json::Value;
use std::io;

/// Served for `GET /` when the document root has no `index.html`.
pub const WELCOME_PAGE: &str = "<!DOCTYPE html>\n\
<html><head><title>Chirp Server</title></head>\n\
<body><h1>Chirp Server</h1><p>Chirps are available at <a href=\"/chirps\">/chirps</a>.</p></body></html>\n";

pub const INDEX_FILE: &str = "index.html";

pub const DELETED_MESSAGE: &str = "Chirp deleted successfully";

fn parse_id(raw: &str) -> Result<ChirpId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid chirp id {:?}", raw)))
}

pub async fn welcome(files: &StaticFiles) -> Result<Response, ApiError> {
    match serve_file(files, INDEX_FILE).await {
        Err(ApiError::NotFound(_)) => Ok(Response::html(StatusCode::OK, WELCOME_PAGE)),
        other => other,
    }
}

pub async fn serve_file(files: &StaticFiles, url_path: &str) -> Result<Response, ApiError> {
    match files.load(url_path).await {
        Ok((bytes, content_type)) => {
            tracing::debug!("Serving {} ({} bytes)", url_path, bytes.len());
            Ok(Response::new(StatusCode::OK).with_body(content_type, bytes))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(ApiError::NotFound(format!("file {}", url_path)))
        }
        Err(e) => Err(ApiError::Internal(format!("reading {}: {}", url_path, e))),
    }
}

/// `GET /chirps`: local chirps plus whatever the reachable peers return.
pub async fn list_chirps(
    store: &ChirpStore,
    federation: &Federation,
    headers: &Headers,
) -> Result<Response, ApiError> {
    let via = headers.get(VIA_HEADER).map(ViaChain::parse).unwrap_or_default();
    if !via.is_empty() {
        tracing::debug!("Incoming Via chain: {:?}", via.hops());
    }

    let chirps = federation.aggregate(&via, store.list()).await;
    Ok(Response::json(StatusCode::OK, &ChirpList { chirps })?)
}

/// `POST /chirps`: both fields are trimmed and must be non-empty.
pub fn create_chirp(store: &ChirpStore, body: &str) -> Result<Response, ApiError> {
    let req: CreateChirpRequest = serde_json::from_str(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid chirp body: {}", e)))?;

    let username = req.username.trim();
    let content = req.content.trim();
    if username.is_empty() || content.is_empty() {
        return Err(ApiError::BadRequest(
            "username and content are required".to_string(),
        ));
    }

    let chirp = store.create(username, content)?;
    tracing::info!("Created chirp {} by {}", chirp.id, chirp.username);
    Ok(Response::json(StatusCode::CREATED, &chirp)?)
}

pub fn delete_chirp(store: &ChirpStore, raw_id: &str) -> Result<Response, ApiError> {
    let id = parse_id(raw_id)?;

    match store.delete(id) {
        Some(_) => {
            tracing::info!("Deleted chirp {}", id);
            Ok(Response::json(
                StatusCode::OK,
                &DeleteChirpResponse {
                    message: DELETED_MESSAGE.to_string(),
                },
            )?)
        }
        None => Err(ApiError::NotFound(format!("chirp {}", id))),
    }
}

/// `PUT /chirps/<id>`: replaces an existing chirp with a full post body and
/// echoes that body back as received. The stored chirp keeps the path id
/// whatever the body says.
pub fn update_chirp(store: &ChirpStore, raw_id: &str, body: &str) -> Result<Response, ApiError> {
    let id = parse_id(raw_id)?;

    let unreadable =
        |e: serde_json::Error| ApiError::Internal(format!("unreadable chirp for {}: {}", id, e));
    let echoed: Value = serde_json::from_str(body).map_err(unreadable)?;
    let chirp: Chirp = serde_json::from_value(echoed.clone()).map_err(unreadable)?;

    store.update(id, chirp)?;
    tracing::info!("Updated chirp {}", id);
    Ok(Response::json(StatusCode::CREATED, &echoed)?)
}

pub fn preflight() -> Result<Response, ApiError> {
    Ok(Response::cors_preflight())
}
