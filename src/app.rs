use crate::config::{Config, StorageConfig};
use crate::error::{PersistError, SearchError};
use crate::models::MovieRecord;
use crate::persistence::{FileStore, LocalBackend, RemoteBackend, WatchlistBackend};
use crate::search::{SearchApi, UpstreamClient};
use crate::watchlist::{AddOutcome, WatchlistStore};
use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};

const MAX_BODY_BYTES: usize = 1024 * 1024; // 1MB safety cap
const SEARCH_FAILED: &str = "Failed to fetch movies. Please try again later.";

#[derive(Clone)]
pub struct AppState {
    pub search: Arc<dyn SearchApi>,
    pub watchlist: Arc<Mutex<WatchlistStore>>,
}

pub async fn run_server(config: Config) -> Result<()> {
    let state = build_state(&config).await?;
    let app = build_router(state);

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Wire clients and load the persisted watchlist. Fails if the stored
/// watchlist cannot be read.
pub async fn build_state(config: &Config) -> Result<AppState> {
    let search: Arc<dyn SearchApi> = Arc::new(UpstreamClient::new(config.upstream.clone())?);
    let backend: Arc<dyn WatchlistBackend> = match &config.storage {
        StorageConfig::Local { dir } => {
            info!("Persisting watchlist under {:?}", dir);
            Arc::new(LocalBackend::new(FileStore::new(dir)))
        }
        StorageConfig::Remote {
            base_url,
            collection,
        } => {
            info!("Persisting watchlist to {}/{}", base_url, collection);
            Arc::new(RemoteBackend::new(base_url, collection)?)
        }
    };

    let mut store = WatchlistStore::new(backend, config.sync_policy);
    store
        .load()
        .await
        .context("Failed to load watchlist; refusing to start over it")?;

    Ok(AppState {
        search,
        watchlist: Arc::new(Mutex::new(store)),
    })
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(search_movies))
        .route("/movies", get(list_movies).post(add_movie))
        .route("/movies/:id", get(get_movie).delete(remove_movie))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handler error rendered as `{"error": message}`.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Search(SearchError),
    Persist(PersistError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(id) => (StatusCode::NOT_FOUND, format!("'{}' is not in the watchlist", id)),
            ApiError::Search(e) => {
                error!("Error fetching movies: {}", e);
                (StatusCode::BAD_GATEWAY, SEARCH_FAILED.to_string())
            }
            ApiError::Persist(e) => {
                error!("Watchlist sync failed: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    format!("Failed to save watchlist: {}", e),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        ApiError::Search(e)
    }
}

impl From<PersistError> for ApiError {
    fn from(e: PersistError) -> Self {
        ApiError::Persist(e)
    }
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: String,
}

async fn search_movies(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<MovieRecord>>, ApiError> {
    let results = state.search.search(&params.q).await?;
    Ok(Json(results))
}

async fn list_movies(State(state): State<AppState>) -> Json<Vec<MovieRecord>> {
    Json(state.watchlist.lock().await.records().to_vec())
}

async fn get_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MovieRecord>, ApiError> {
    let store = state.watchlist.lock().await;
    store
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or(ApiError::NotFound(id))
}

async fn add_movie(
    State(state): State<AppState>,
    Json(record): Json<MovieRecord>,
) -> Result<(StatusCode, Json<MovieRecord>), ApiError> {
    let mut store = state.watchlist.lock().await;
    match store.add(record).await? {
        AddOutcome::Added(stored) => Ok((StatusCode::CREATED, Json(stored))),
        AddOutcome::Duplicate(existing) => Ok((StatusCode::OK, Json(existing))),
    }
}

async fn remove_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut store = state.watchlist.lock().await;
    match store.remove(&id).await? {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(ApiError::NotFound(id)),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
