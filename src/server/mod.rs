pub mod handlers;
pub mod supervisor;
pub mod templates;

use crate::config::{ServerConfig, Topology};
use crate::core::catalog::Catalog;
use crate::core::sheet::Sheet;
use crate::domain::ports::AssetSource;
use crate::utils::error::Result;
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use supervisor::WorkerPool;
use templates::TemplateSet;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Everything a request handler reads. All of it is immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub sheet: Arc<Sheet>,
    pub catalog: Arc<Catalog>,
    pub templates: Arc<TemplateSet>,
    pub pool: Arc<WorkerPool>,
}

impl AppState {
    pub fn new(sheet: Sheet, catalog: Catalog, templates: TemplateSet, topology: Topology) -> Self {
        Self {
            sheet: Arc::new(sheet),
            catalog: Arc::new(catalog),
            templates: Arc::new(templates),
            pool: Arc::new(WorkerPool::new(topology)),
        }
    }

    /// Loads the catalog, templates and dataset. Template or catalog problems
    /// are fatal; a missing dataset is reported by the routes instead.
    pub async fn load<A: AssetSource>(
        assets: &A,
        config: &ServerConfig,
        topology: Topology,
    ) -> Result<Self> {
        let catalog = Catalog::embedded()?;
        let templates = TemplateSet::load(assets, &config.templates_dir).await?;
        let sheet = Sheet::load_or_empty(assets, &config.csv_path).await;
        if !sheet.is_loaded() {
            tracing::warn!("⚠️  CSV file not loaded, please ensure '{}' exists", config.csv_path);
        }
        Ok(Self::new(sheet, catalog, templates, topology))
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/calculate", post(handlers::calculate))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Puts `router` behind the worker pool and request logging.
pub fn supervised(router: Router, pool: Arc<WorkerPool>) -> Router {
    router
        .layer(middleware::from_fn_with_state(pool, supervisor::supervise))
        .layer(TraceLayer::new_for_http())
}

pub fn build_router(state: AppState) -> Router {
    let pool = state.pool.clone();
    supervised(routes(state), pool)
}

pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    Ok(listener)
}

pub async fn serve(listener: TcpListener, app: Router) -> Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("SIGTERM received, shutting down"),
                    _ = sigint.recv() => tracing::info!("SIGINT received, shutting down"),
                }
            }
            _ => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
