use crate::source::{ArticleFetcher, SourceTable};
use crate::{
    DEFAULT_DATABASE, ExtractError, PickDefaults, StoreError, UsageStore,
    extract_words_from_bytes, select_words_random,
};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::Mutex as AsyncMutex;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info};

type SharedState = Arc<AppState>;

pub struct AppState {
    fetcher: ArticleFetcher,
    store: Arc<UsageStore>,
    defaults: PickDefaults,
    language_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl AppState {
    pub fn new(fetcher: ArticleFetcher, store: Arc<UsageStore>, defaults: PickDefaults) -> Self {
        Self {
            fetcher,
            store,
            defaults,
            language_locks: Mutex::new(HashMap::new()),
        }
    }

    fn language_lock(&self, language: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.language_locks.lock();
        Arc::clone(locks.entry(language.to_string()).or_default())
    }
}

#[derive(Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub database: PathBuf,
    pub sources: SourceTable,
    pub defaults: PickDefaults,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            database: PathBuf::from(DEFAULT_DATABASE),
            sources: SourceTable::default(),
            defaults: PickDefaults::default(),
        }
    }
}

#[derive(Debug)]
pub enum WebError {
    Io(std::io::Error),
    Store(StoreError),
    Client(reqwest::Error),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::Io(err) => write!(f, "io error: {err}"),
            WebError::Store(err) => write!(f, "{err}"),
            WebError::Client(err) => write!(f, "http client error: {err}"),
        }
    }
}

impl std::error::Error for WebError {}

impl From<std::io::Error> for WebError {
    fn from(value: std::io::Error) -> Self {
        WebError::Io(value)
    }
}

impl From<StoreError> for WebError {
    fn from(value: StoreError) -> Self {
        WebError::Store(value)
    }
}

impl From<reqwest::Error> for WebError {
    fn from(value: reqwest::Error) -> Self {
        WebError::Client(value)
    }
}

/// Everything that can sink a `/pick` request. All of it surfaces as a 500.
#[derive(Debug)]
pub enum PickError {
    UnknownSource(String),
    Fetch(reqwest::Error),
    Extract(ExtractError),
    Store(StoreError),
    Task(tokio::task::JoinError),
}

impl fmt::Display for PickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PickError::UnknownSource(language) => {
                write!(f, "no random article source for language {language:?}")
            }
            PickError::Fetch(err) => write!(f, "fetch failed: {err}"),
            PickError::Extract(err) => write!(f, "{err}"),
            PickError::Store(err) => write!(f, "{err}"),
            PickError::Task(err) => write!(f, "background task failed: {err}"),
        }
    }
}

impl std::error::Error for PickError {}

impl From<reqwest::Error> for PickError {
    fn from(value: reqwest::Error) -> Self {
        PickError::Fetch(value)
    }
}

impl From<ExtractError> for PickError {
    fn from(value: ExtractError) -> Self {
        PickError::Extract(value)
    }
}

impl From<StoreError> for PickError {
    fn from(value: StoreError) -> Self {
        PickError::Store(value)
    }
}

impl From<tokio::task::JoinError> for PickError {
    fn from(value: tokio::task::JoinError) -> Self {
        PickError::Task(value)
    }
}

impl IntoResponse for PickError {
    fn into_response(self) -> Response {
        error!(error = %self, "pick request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

pub async fn serve(config: WebConfig) -> Result<(), WebError> {
    let store = Arc::new(UsageStore::open(&config.database)?);
    let fetcher = ArticleFetcher::new(config.sources.clone())?;
    let state = Arc::new(AppState::new(fetcher, store, config.defaults.clone()));
    let router = build_router(state);
    let languages: Vec<&str> = config.sources.languages().collect();
    info!(
        %config.addr,
        database = %config.database.display(),
        ?languages,
        default_language = %config.defaults.language,
        default_count = config.defaults.count,
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/pick", get(pick))
        .route("/healthz", get(health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "wordpick" }))
}

#[derive(Debug, Default, PartialEq, Eq)]
struct PickParams {
    language: Option<String>,
    count: Option<String>,
}

impl PickParams {
    /// The first occurrence of a key wins; repeats and unknown keys are ignored.
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "language" if params.language.is_none() => params.language = Some(value),
                "count" if params.count.is_none() => params.count = Some(value),
                _ => {}
            }
        }
        params
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickResponse {
    pub language: String,
    pub words: Vec<String>,
}

async fn pick(
    State(state): State<SharedState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<PickResponse>, PickError> {
    let params = PickParams::from_pairs(pairs);
    let language = state.defaults.language(params.language.as_deref());
    let count = state.defaults.count(params.count.as_deref());

    let body = state.fetcher.fetch(&language).await?;
    let pool = extract_words_from_bytes(&body)?;

    // Load, select and persist under one lock so two requests for the same
    // language cannot both miss each other's picks.
    let lock = state.language_lock(&language);
    let _guard = lock.lock().await;
    let store = Arc::clone(&state.store);
    let partition = language.clone();
    let words = tokio::task::spawn_blocking(move || -> Result<Vec<String>, StoreError> {
        let excluded = store.used_words(&partition)?;
        let words = select_words_random(&pool, count, &excluded);
        store.store_used(&words, &partition)?;
        Ok(words)
    })
    .await??;

    info!(%language, requested = count, served = words.len(), "served words");
    Ok(Json(PickResponse { language, words }))
}
