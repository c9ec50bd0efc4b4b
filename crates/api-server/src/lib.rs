//! REST API for the BVMT trading assistant.

use std::sync::Arc;

use analysis_core::{AnalysisError, RiskProfile};
use anomaly_detection::{AlertManager, AnomalyDetector};
use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    Json, Router,
};
use data_loader::StockStore;
use decision_engine::{DecisionConfig, DecisionEngine};
use forecasting::Forecaster;
use market_memory::{MarketMemory, MemoryConfig, RemoteEmbedder};
use ml_client::MLClient;
use portfolio_manager::{Portfolio, PortfolioError, DEFAULT_NAME};
use sentiment_analysis::{NewsCache, SentimentAnalyzer, SentimentMethod};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

pub mod analysis_routes;
pub mod config;
pub mod portfolio_routes;
pub mod request_id;
pub mod stock_routes;

#[cfg(test)]
mod api_tests;

pub use config::ServerConfig;

const DEFAULT_LOG_FILTER: &str = "info,api_server=debug,tower_http=debug";

/// JSON envelope shared by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Handler error: any error plus the status code to answer with.
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, anyhow::anyhow!(message.into()))
    }

    /// Map a signal-module error onto the closest HTTP status.
    pub fn analysis(e: AnalysisError) -> Self {
        let status = match &e {
            AnalysisError::NotFound(_) => StatusCode::NOT_FOUND,
            AnalysisError::InvalidData(_) | AnalysisError::InsufficientData(_) => StatusCode::BAD_REQUEST,
            AnalysisError::ApiError(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::with_status(status, e.into())
    }

    /// Rejected orders are the caller's fault; storage failures are ours.
    pub fn portfolio(e: PortfolioError) -> Self {
        let status = if e.is_rejection() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::with_status(status, e.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.error);
        }
        (self.status, Json(ApiResponse::<()>::error(self.error.to_string()))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, err.into())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DecisionEngine>,
    pub store: Arc<StockStore>,
    pub forecaster: Arc<Forecaster>,
    pub sentiment: Arc<SentimentAnalyzer>,
    pub anomalies: Arc<AnomalyDetector>,
    pub alerts: Arc<RwLock<AlertManager>>,
    /// The single session portfolio
    pub portfolio: Arc<RwLock<Portfolio>>,
    pub config: Arc<ServerConfig>,
}

fn load_store(config: &ServerConfig) -> StockStore {
    match StockStore::from_path(&config.data_dir) {
        Ok(store) => store,
        Err(e) => {
            tracing::warn!("No market data loaded from {}: {}", config.data_dir.display(), e);
            StockStore::default()
        }
    }
}

async fn market_memory(ml: &MLClient) -> MarketMemory {
    let memory = MarketMemory::new(MemoryConfig::default(), Arc::new(RemoteEmbedder::new(ml.embeddings.clone())));
    if memory.connect().await {
        tracing::info!("Market memory online ({} embeddings)", memory.embedding_method());
    } else {
        tracing::warn!("Market memory offline, recommendations will carry no evidence");
    }
    memory
}

/// Wire the data store, signal modules and decision engine. Missing data
/// files degrade to empty stores rather than failing startup.
pub async fn build_state(config: ServerConfig) -> AppState {
    let store = Arc::new(load_store(&config));
    let ml = MLClient::with_defaults();

    let forecaster = Arc::new(Forecaster::new(store.clone()).with_predictor(ml.price_predictor.clone()));

    let news = NewsCache::load(&config.news_cache).unwrap_or_else(|e| {
        tracing::warn!("Failed to read news cache {}: {}", config.news_cache.display(), e);
        NewsCache::new()
    });
    let sentiment = Arc::new(SentimentAnalyzer::new(news).with_ml(&ml, SentimentMethod::parse(&config.sentiment_method)));

    let anomalies = Arc::new(AnomalyDetector::new(store.clone()).with_scorer(ml.anomaly.clone()));

    let alerts = AlertManager::with_autosave(&config.alerts_file).unwrap_or_else(|e| {
        tracing::warn!("Failed to load alerts from {}: {}", config.alerts_file.display(), e);
        AlertManager::new()
    });

    let decision_config = DecisionConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!("Invalid decision settings, using defaults: {}", e);
        DecisionConfig::default()
    });

    let use_mocks = config.use_mocks || store.is_empty();
    let engine = if use_mocks {
        if !config.use_mocks {
            tracing::warn!("Market data is empty, falling back to mock providers");
        }
        DecisionEngine::with_mocks().with_config(decision_config)
    } else {
        DecisionEngine::new(store.clone(), forecaster.clone(), sentiment.clone(), anomalies.clone())
            .with_config(decision_config)
            .with_memory(Arc::new(market_memory(&ml).await))
    };

    let portfolio = Portfolio::new(DEFAULT_NAME, config.initial_capital, RiskProfile::default());

    AppState {
        engine: Arc::new(engine),
        store,
        forecaster,
        sentiment,
        anomalies,
        alerts: Arc::new(RwLock::new(alerts)),
        portfolio: Arc::new(RwLock::new(portfolio)),
        config: Arc::new(config),
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(stock_routes::stock_routes())
        .merge(portfolio_routes::portfolio_routes())
        .merge(analysis_routes::analysis_routes())
        .with_state(state)
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Shutdown signal received");
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .init();

    let config = ServerConfig::from_env();
    let addr = config.bind_addr();
    tracing::info!(
        "Starting BVMT assistant API (data: {}, mocks: {})",
        config.data_dir.display(),
        config.use_mocks
    );

    let state = build_state(config).await;
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
