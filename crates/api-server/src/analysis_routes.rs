//! Signal-module routes: forecasts, sentiment, anomalies and the alert ledger.

use anomaly_detection::{ActionType, Alert, AlertAction, AlertEntry, AnomalyReport};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use forecasting::Forecast;
use sentiment_analysis::{MarketSentiment, StockSentiment};
use serde::{Deserialize, Serialize};

use crate::{ApiResponse, AppError, AppState};

#[derive(Deserialize)]
pub struct ForecastQuery {
    #[serde(default = "default_days")]
    pub days: usize,
}

fn default_days() -> usize {
    5
}

#[derive(Deserialize)]
pub struct AnomalyQuery {
    #[serde(default = "default_lookback")]
    pub lookback: usize,
}

fn default_lookback() -> usize {
    30
}

#[derive(Deserialize)]
pub struct AlertsQuery {
    #[serde(default = "default_alert_days")]
    pub days: i64,
}

fn default_alert_days() -> i64 {
    7
}

#[derive(Deserialize)]
pub struct AlertActionRequest {
    pub action: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Serialize)]
pub struct AnomalyView {
    #[serde(flatten)]
    pub report: AnomalyReport,
    pub alerts: Vec<Alert>,
}

pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/api/forecast/:code", get(forecast))
        .route("/api/sentiment/market", get(market_sentiment))
        .route("/api/sentiment/:code", get(stock_sentiment))
        .route("/api/anomalies/:code", get(anomalies))
        .route("/api/alerts", get(alert_history))
        .route("/api/alerts/:id/action", post(alert_action))
}

async fn forecast(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<ApiResponse<Forecast>>, AppError> {
    let code = code.trim().to_uppercase();
    let forecast = state
        .forecaster
        .forecast_or_fallback(&code, query.days)
        .await
        .map_err(AppError::analysis)?;
    Ok(Json(ApiResponse::success(forecast)))
}

async fn stock_sentiment(State(state): State<AppState>, Path(code): Path<String>) -> Json<ApiResponse<StockSentiment>> {
    let code = code.trim().to_uppercase();
    Json(ApiResponse::success(state.sentiment.get_sentiment_score(&code).await))
}

async fn market_sentiment(State(state): State<AppState>) -> Json<ApiResponse<MarketSentiment>> {
    Json(ApiResponse::success(state.sentiment.get_market_sentiment().await))
}

/// Run detection and file any new alerts in the ledger.
async fn anomalies(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<AnomalyQuery>,
) -> Result<Json<ApiResponse<AnomalyView>>, AppError> {
    let code = code.trim().to_uppercase();
    let report = state
        .anomalies
        .detect_stock(&code, query.lookback)
        .await
        .map_err(AppError::analysis)?;

    let alerts = Alert::from_report(&report);
    if !alerts.is_empty() {
        let mut ledger = state.alerts.write().await;
        match ledger.register(alerts.clone()) {
            Ok(added) => tracing::debug!("Registered {} new alerts for {}", added, code),
            Err(e) => tracing::warn!("Failed to persist alerts for {}: {}", code, e),
        }
    }

    Ok(Json(ApiResponse::success(AnomalyView { report, alerts })))
}

async fn alert_history(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> Json<ApiResponse<Vec<AlertEntry>>> {
    let ledger = state.alerts.read().await;
    Json(ApiResponse::success(ledger.history(query.days)))
}

async fn alert_action(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AlertActionRequest>,
) -> Result<Json<ApiResponse<AlertAction>>, AppError> {
    let action: ActionType = req.action.parse().map_err(AppError::analysis)?;
    let mut ledger = state.alerts.write().await;
    let recorded = ledger
        .record_action(&id, action, &req.notes)
        .map_err(AppError::analysis)?;
    tracing::info!("Alert {} marked {:?}", id, recorded.action_type);
    Ok(Json(ApiResponse::success(recorded)))
}
