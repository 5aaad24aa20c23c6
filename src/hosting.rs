//! Public hosting for videos too large to attach.
//!
//! Files are copied (never moved, the public directory may sit on another
//! device) into `{public_dir}/videos/{source}/` and linked as
//! `{public_base_url}/videos/{source}/{filename}`. The directory is
//! append-only: every copy has a unique task-derived name, so no locking is
//! needed.
//!
//! [`start_file_server`] optionally serves that directory itself.

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use axum::Router;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Path segment hosted videos live under, both on disk and in URLs
pub const VIDEOS_SEGMENT: &str = "videos";

/// A video copied into the public directory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostedVideo {
    /// Location of the public copy
    pub path: PathBuf,
    /// Externally reachable URL of the copy
    pub url: String,
}

/// The persistent public directory and the URL it is served under
#[derive(Clone, Debug)]
pub struct PublicStore {
    public_dir: PathBuf,
    base_url: String,
}

impl PublicStore {
    /// Create a store rooted at `public_dir`, served at `base_url`
    pub fn new(public_dir: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            public_dir: public_dir.into(),
            base_url,
        }
    }

    /// Create a store from storage configuration
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.public_dir, &config.public_base_url)
    }

    /// Directory holding every source's hosted videos
    pub fn videos_dir(&self) -> PathBuf {
        self.public_dir.join(VIDEOS_SEGMENT)
    }

    /// Public URL for a hosted file
    pub fn public_url(&self, source: &str, filename: &str) -> String {
        format!("{}/{VIDEOS_SEGMENT}/{source}/{filename}", self.base_url)
    }

    /// Copy `file` into the public directory for `source`
    ///
    /// The original is left in place for the caller to clean up.
    pub async fn publish(&self, file: &Path, source: &str) -> Result<HostedVideo> {
        let filename = file
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::Other(format!("cannot host file without a name: {file:?}")))?;

        let target_dir = self.videos_dir().join(source);
        tokio::fs::create_dir_all(&target_dir).await?;

        let target = target_dir.join(filename);
        let copied = tokio::fs::copy(file, &target).await?;

        tracing::info!(source, bytes = copied, path = ?target, "Published hosted video");

        Ok(HostedVideo {
            url: self.public_url(source, filename),
            path: target,
        })
    }
}

/// Router serving `{public_dir}/videos` under `/videos`
pub fn file_router(store: &PublicStore) -> Router {
    Router::new()
        .nest_service(
            &format!("/{VIDEOS_SEGMENT}"),
            ServeDir::new(store.videos_dir()),
        )
        .layer(TraceLayer::new_for_http())
}

/// Serve hosted videos until `shutdown` is cancelled
///
/// # Example
///
/// ```no_run
/// use native_vids::hosting::{PublicStore, start_file_server};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = PublicStore::new("./public", "http://localhost:8000");
/// let shutdown = CancellationToken::new();
///
/// start_file_server("0.0.0.0:8000".parse()?, store, shutdown).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_file_server(
    bind_address: SocketAddr,
    store: PublicStore,
    shutdown: CancellationToken,
) -> Result<()> {
    tracing::info!(address = %bind_address, "Starting hosted video server");

    let app = file_router(&store);
    let listener = TcpListener::bind(bind_address).await.map_err(Error::Io)?;

    tracing::info!(address = %bind_address, dir = ?store.videos_dir(), "Hosted video server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| Error::Server(e.to_string()))?;

    tracing::info!("Hosted video server stopped");
    Ok(())
}
