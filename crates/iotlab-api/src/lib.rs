//! ---
//! iotlab_section: "05-networking-external-interfaces"
//! iotlab_subsection: "module"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "HTTP surface for sensor and file resources."
//! iotlab_version: "v0.0.0-prealpha"
//! iotlab_owner: "tbd"
//! ---
use std::fmt;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use iotlab_common::config::{StorageBackend, StorageConfig};
use iotlab_sensor::SensorReader;
use iotlab_store::{ConfigStore, FileStore, FsStore, KeyValueStore, MemoryStore};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod docs;
mod error;
mod routes;

pub use docs::openapi_document;
pub use error::ApiError;

/// Shared API state exposed to handlers.
pub struct ApiState {
    reader: SensorReader,
    configs: ConfigStore,
    files: FileStore,
}

impl ApiState {
    pub fn new(reader: SensorReader, configs: ConfigStore, files: FileStore) -> Self {
        Self {
            reader,
            configs,
            files,
        }
    }

    /// Build the stores described by the storage section of the configuration.
    pub fn from_storage(storage: &StorageConfig) -> Result<Self> {
        let (sensors, files): (Arc<dyn KeyValueStore>, Arc<dyn KeyValueStore>) =
            match storage.backend {
                StorageBackend::Filesystem => (
                    Arc::new(FsStore::new(&storage.sensors_dir).with_context(|| {
                        format!(
                            "unable to open sensor directory {}",
                            storage.sensors_dir.display()
                        )
                    })?),
                    Arc::new(FsStore::new(&storage.files_dir).with_context(|| {
                        format!(
                            "unable to open files directory {}",
                            storage.files_dir.display()
                        )
                    })?),
                ),
                StorageBackend::Memory => {
                    (Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
                }
            };
        info!(backend = ?storage.backend, "api storage ready");
        Ok(Self::new(
            SensorReader::new(),
            ConfigStore::new(sensors),
            FileStore::new(files),
        ))
    }

    /// State backed entirely by memory, convenient for tests and demos.
    pub fn in_memory() -> Self {
        Self::new(
            SensorReader::new(),
            ConfigStore::new(Arc::new(MemoryStore::new())),
            FileStore::new(Arc::new(MemoryStore::new())),
        )
    }

    pub(crate) fn reader(&self) -> &SensorReader {
        &self.reader
    }

    pub(crate) fn configs(&self) -> &ConfigStore {
        &self.configs
    }

    pub(crate) fn files(&self) -> &FileStore {
        &self.files
    }
}

impl fmt::Debug for ApiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiState")
            .field("configs", &self.configs)
            .field("files", &self.files)
            .finish_non_exhaustive()
    }
}

/// Handle to the running API server.
#[derive(Debug)]
pub struct ApiServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl ApiServer {
    /// Address the listener is bound to (resolves port `0`).
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(err.into()),
        }
    }
}

/// Assemble every route on top of `state`, with Swagger UI at `/apidocs/`
/// reading the document served at `/apispec.json`.
pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(docs::index))
        .route("/healthz", get(|| async { "ok" }))
        .merge(
            SwaggerUi::new(docs::APIDOCS_PATH)
                .url(docs::APISPEC_PATH, docs::ApiDoc::openapi()),
        )
        .merge(routes::sensors::router())
        .merge(routes::files::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Spawn the REST API on `addr`.
pub fn spawn_api_server(state: Arc<ApiState>, addr: SocketAddr) -> Result<ApiServer> {
    let router = build_router(state);

    let listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind API listener {addr}"))?;
    listener
        .set_nonblocking(true)
        .context("failed to configure API listener as non-blocking")?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve API listener address")?;
    let tcp_listener =
        TcpListener::from_std(listener).context("failed to create tokio listener")?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle: JoinHandle<Result<()>> = tokio::spawn(async move {
        info!(address = %local_addr, "api server listening");
        if let Err(err) = axum::serve(tcp_listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
        {
            error!(address = %local_addr, error = %err, "api server exited with error");
            return Err(err.into());
        }
        Ok(())
    });

    Ok(ApiServer {
        addr: local_addr,
        shutdown: Some(shutdown_tx),
        task: handle,
    })
}
