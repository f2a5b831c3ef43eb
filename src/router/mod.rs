//! Request Router
//!
//! Maps `(method, path)` onto a handler, turns handler errors into small HTML error
//! pages, writes the response and closes the connection.
//!
//! | Method    | Path           | Handler                       |
//! |-----------|----------------|-------------------------------|
//! | `GET`     | `/`            | `index.html` or welcome page  |
//! | `GET`     | `/chirps`      | federated listing             |
//! | `GET`     | `/<file>`      | static file                   |
//! | `POST`    | `/chirps`      | create                        |
//! | `DELETE`  | `/chirps/<id>` | delete                        |
//! | `PUT`     | `/chirps/<id>` | replace                       |
//! | `OPTIONS` | any            | CORS preflight                |
//!
//! Unknown paths under a known method are 404; unknown methods are 405.

pub mod handlers;
pub mod static_files;
pub mod types;

use crate::dispatch::types::Dispatch;
use crate::federation::fanout::Federation;
use crate::federation::protocol::ENDPOINT_CHIRPS;
use crate::http::request::{Request, RequestFrame};
use crate::http::response::Response;
use crate::storage::memory::ChirpStore;
use static_files::StaticFiles;
use types::ApiError;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// The handler a request resolves to. Borrowed pieces are path segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Welcome,
    ListChirps,
    StaticFile(&'a str),
    CreateChirp,
    DeleteChirp(&'a str),
    UpdateChirp(&'a str),
    Preflight,
    NotFound,
    MethodNotAllowed,
}

impl<'a> Route<'a> {
    pub fn resolve(method: &str, path: &'a str) -> Self {
        // `/chirps/<id>[/...]`: only the first segment after the prefix is the id.
        let chirp_id = path
            .strip_prefix(ENDPOINT_CHIRPS)
            .and_then(|rest| rest.strip_prefix('/'))
            .map(|rest| rest.split_once('/').map_or(rest, |(id, _)| id));

        match method {
            "GET" => match path {
                "/" => Route::Welcome,
                ENDPOINT_CHIRPS => Route::ListChirps,
                _ => match path.strip_prefix('/') {
                    Some(name) => Route::StaticFile(name),
                    None => Route::NotFound,
                },
            },
            "POST" if path == ENDPOINT_CHIRPS => Route::CreateChirp,
            "DELETE" => chirp_id.map_or(Route::NotFound, Route::DeleteChirp),
            "PUT" => chirp_id.map_or(Route::NotFound, Route::UpdateChirp),
            "OPTIONS" => Route::Preflight,
            "POST" => Route::NotFound,
            _ => Route::MethodNotAllowed,
        }
    }
}

pub struct Router {
    store: Arc<ChirpStore>,
    federation: Arc<Federation>,
    static_files: StaticFiles,
}

impl Router {
    pub fn new(store: Arc<ChirpStore>, federation: Arc<Federation>, document_root: PathBuf) -> Self {
        Self {
            store,
            federation,
            static_files: StaticFiles::new(document_root),
        }
    }

    pub fn store(&self) -> &Arc<ChirpStore> {
        &self.store
    }

    /// Produces the response for one frame. Never fails: handler errors
    /// become error pages.
    pub async fn respond(&self, frame: &RequestFrame) -> Response {
        let route = Route::resolve(&frame.method, frame.path());

        let result = match route {
            Route::Welcome => handlers::welcome(&self.static_files).await,
            Route::ListChirps => {
                handlers::list_chirps(&self.store, &self.federation, &frame.headers).await
            }
            Route::StaticFile(name) => handlers::serve_file(&self.static_files, name).await,
            Route::CreateChirp => handlers::create_chirp(&self.store, &frame.body),
            Route::DeleteChirp(id) => handlers::delete_chirp(&self.store, id),
            Route::UpdateChirp(id) => handlers::update_chirp(&self.store, id, &frame.body),
            Route::Preflight => handlers::preflight(),
            Route::NotFound => Err(ApiError::NotFound(frame.path().to_string())),
            Route::MethodNotAllowed => Err(ApiError::MethodNotAllowed(frame.method.clone())),
        };

        result.unwrap_or_else(|e| {
            match e {
                ApiError::Internal(_) => tracing::error!("{} {}: {}", frame.method, frame.target, e),
                _ => tracing::info!("{} {}: {}", frame.method, frame.target, e),
            }
            Response::error(e.status_code())
        })
    }

    /// Answers `request` and closes its connection. Write failures are logged;
    /// the client has gone and there is nobody left to tell.
    pub async fn handle(&self, request: Request) {
        let Request {
            mut stream,
            peer_addr,
            frame,
        } = request;

        tracing::info!("{} {} from {}", frame.method, frame.target, peer_addr);
        let response = self.respond(&frame).await;
        tracing::debug!(
            "{} {} -> {}",
            frame.method,
            frame.target,
            response.status().as_u16()
        );

        if let Err(e) = response.write_to(&mut stream).await {
            tracing::warn!("Failed to write response to {}: {}", peer_addr, e);
            return;
        }
        if let Err(e) = stream.shutdown().await {
            tracing::debug!("Shutdown of {} failed: {}", peer_addr, e);
        }
    }
}

#[async_trait]
impl Dispatch<Request> for Router {
    async fn dispatch(&self, request: Request) {
        self.handle(request).await;
    }
}
