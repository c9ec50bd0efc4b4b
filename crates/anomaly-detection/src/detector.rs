use std::collections::HashSet;
use std::sync::Arc;

use analysis_core::adaptive::round_to;
use analysis_core::{AnalysisError, AnomalyProvider, AnomalySignal, StockRecord};
use async_trait::async_trait;
use chrono::NaiveDate;
use data_loader::{engineer_features, FeatureRow, StockStore};
use ml_client::AnomalyClient;

use crate::rules;
use crate::types::{anomaly_score, Anomaly, AnomalyReport, AnomalyRisk, AnomalyType};

pub const MIN_HISTORY: usize = 30;
pub const DEFAULT_LOOKBACK: usize = 30;

const NO_ANOMALY_SUMMARY: &str = "Aucune anomalie significative détectée. Comportement normal du marché.";
const INSUFFICIENT_SUMMARY: &str = "Données insuffisantes pour l'analyse d'anomalies";

pub struct AnomalyDetector {
    store: Arc<StockStore>,
    scorer: Option<AnomalyClient>,
}

impl AnomalyDetector {
    pub fn new(store: Arc<StockStore>) -> Self {
        Self { store, scorer: None }
    }

    /// Add the isolation-forest scoring service.
    pub fn with_scorer(mut self, scorer: AnomalyClient) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Detect anomalies for a stock held in the store.
    pub async fn detect_stock(&self, stock_code: &str, lookback_days: usize) -> Result<AnomalyReport, AnalysisError> {
        let rows = self.store.history(stock_code);
        if rows.is_empty() {
            return Err(AnalysisError::NotFound(format!("Stock {} not found", stock_code)));
        }
        Ok(self.detect(stock_code, rows, lookback_days).await)
    }

    /// Run every check over the last `lookback_days` sessions of `rows`.
    pub async fn detect(&self, stock_code: &str, rows: &[StockRecord], lookback_days: usize) -> AnomalyReport {
        let stock_name = self.store.get_stock_name(stock_code);

        if rows.len() < MIN_HISTORY {
            return AnomalyReport {
                stock_code: stock_code.to_string(),
                stock_name,
                date: rows.last().map(|r| r.date),
                status: "insufficient_data".to_string(),
                anomalies_detected: Vec::new(),
                score: 0.0,
                risk_level: AnomalyRisk::Normal,
                summary: INSUFFICIENT_SUMMARY.to_string(),
                ml_enabled: false,
            };
        }

        let features = engineer_features(rows);
        let start = features.len().saturating_sub(lookback_days.max(1));
        let recent = &features[start..];

        let ml_flags = self.ml_flags(stock_code, recent).await;
        let ml_enabled = ml_flags.is_some();
        let ml_dates: HashSet<NaiveDate> = ml_flags
            .map(|flags| {
                recent
                    .iter()
                    .zip(flags)
                    .filter(|(_, flagged)| *flagged)
                    .map(|(row, _)| row.date)
                    .collect()
            })
            .unwrap_or_default();

        let mut anomalies: Vec<Anomaly> = Vec::new();
        for row in recent {
            let found = rules::check_row(row);
            if found.is_empty() && ml_dates.contains(&row.date) {
                anomalies.push(rules::ml_detected(row));
            }
            anomalies.extend(found);
        }

        // Most recent first, then most severe
        anomalies.sort_by(|a, b| b.date.cmp(&a.date).then(b.severity.cmp(&a.severity)));

        let last_date = rows[rows.len() - 1].date;
        let stamp = last_date.format("%Y%m%d").to_string();
        for (index, anomaly) in anomalies.iter_mut().enumerate() {
            anomaly.alert_id = format!("{}_{}_{}", stamp, stock_code, index);
        }

        let score = round_to(anomaly_score(&anomalies), 2);
        let risk_level = AnomalyRisk::from_score(score);
        let summary = summarize(&anomalies, risk_level);

        AnomalyReport {
            stock_code: stock_code.to_string(),
            stock_name,
            date: Some(last_date),
            status: "ok".to_string(),
            anomalies_detected: anomalies,
            score,
            risk_level,
            summary,
            ml_enabled,
        }
    }

    async fn ml_flags(&self, stock_code: &str, recent: &[FeatureRow]) -> Option<Vec<bool>> {
        let scorer = self.scorer.as_ref()?;
        let vectors: Vec<Vec<f64>> = recent.iter().map(FeatureRow::as_vector).collect();
        match scorer.score(&vectors).await {
            Ok(flags) => Some(flags),
            Err(e) => {
                tracing::debug!("Anomaly scorer failed for {}, falling back to rules only: {}", stock_code, e);
                None
            }
        }
    }
}

fn summarize(anomalies: &[Anomaly], risk: AnomalyRisk) -> String {
    if anomalies.is_empty() {
        return NO_ANOMALY_SUMMARY.to_string();
    }
    let parts: Vec<String> = AnomalyType::all()
        .iter()
        .filter_map(|kind| {
            let count = anomalies.iter().filter(|a| a.anomaly_type == *kind).count();
            (count > 0).then(|| format!("{} {}", count, kind.label_fr()))
        })
        .collect();
    format!("Anomalies détectées: {}. Niveau de risque: {}.", parts.join(", "), risk.as_str())
}

/// Reduce a report to the decision-engine signal.
pub fn to_signal(report: &AnomalyReport) -> AnomalySignal {
    AnomalySignal {
        volume_spike: report.has_type(AnomalyType::VolumeSpike),
        price_spike: report.has_type(AnomalyType::PriceGap),
        any_anomaly: !report.anomalies_detected.is_empty(),
        anomaly_score: round_to((report.score / 10.0).clamp(0.0, 1.0), 3),
        risk_level: report.risk_level.as_str().to_string(),
        details: report.summary.clone(),
    }
}

#[async_trait]
impl AnomalyProvider for AnomalyDetector {
    async fn anomalies(&self, stock_code: &str) -> Result<AnomalySignal, AnalysisError> {
        let report = self.detect_stock(stock_code, DEFAULT_LOOKBACK).await?;
        Ok(to_signal(&report))
    }
}
