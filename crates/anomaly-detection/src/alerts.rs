use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use analysis_core::AnalysisError;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AnomalyReport, AnomalyType, Severity};

/// An anomaly registered for follow-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: String,
    pub stock_code: String,
    pub stock_name: String,
    #[serde(rename = "type")]
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    pub date: NaiveDate,
    pub description: String,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

impl Alert {
    pub fn from_report(report: &AnomalyReport) -> Vec<Alert> {
        report
            .anomalies_detected
            .iter()
            .map(|a| Alert {
                alert_id: a.alert_id.clone(),
                stock_code: report.stock_code.clone(),
                stock_name: report.stock_name.clone(),
                anomaly_type: a.anomaly_type,
                severity: a.severity,
                date: a.date,
                description: a.description.clone(),
                metrics: a.metrics.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Ignored,
    Investigated,
    Traded,
    Reported,
}

impl FromStr for ActionType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ignored" => Ok(ActionType::Ignored),
            "investigated" => Ok(ActionType::Investigated),
            "traded" => Ok(ActionType::Traded),
            "reported" => Ok(ActionType::Reported),
            other => Err(AnalysisError::InvalidData(format!(
                "unknown alert action '{}' (expected ignored, investigated, traded or reported)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertAction {
    pub action_type: ActionType,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub user_notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEntry {
    #[serde(flatten)]
    pub alert: Alert,
    pub action: Option<AlertAction>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AlertFile {
    #[serde(default)]
    alerts: Vec<Alert>,
    #[serde(default)]
    actions: BTreeMap<String, AlertAction>,
}

/// Alert ledger with optional JSON autosave.
#[derive(Debug, Default)]
pub struct AlertManager {
    alerts: Vec<Alert>,
    actions: BTreeMap<String, AlertAction>,
    autosave_path: Option<PathBuf>,
}

impl AlertManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path` if it exists and save back to it after every change.
    pub fn with_autosave(path: impl Into<PathBuf>) -> Result<Self, AnalysisError> {
        let path = path.into();
        let mut manager = Self::new();
        manager.load(&path)?;
        manager.autosave_path = Some(path);
        Ok(manager)
    }

    /// Add alerts whose id is not already known. Returns how many were added.
    pub fn register(&mut self, alerts: impl IntoIterator<Item = Alert>) -> Result<usize, AnalysisError> {
        let mut added = 0;
        for alert in alerts {
            if alert.alert_id.is_empty() || self.alerts.iter().any(|a| a.alert_id == alert.alert_id) {
                continue;
            }
            self.alerts.push(alert);
            added += 1;
        }
        if added > 0 {
            self.autosave()?;
        }
        Ok(added)
    }

    pub fn record_action(&mut self, alert_id: &str, action: ActionType, notes: &str) -> Result<AlertAction, AnalysisError> {
        if !self.alerts.iter().any(|a| a.alert_id == alert_id) {
            return Err(AnalysisError::NotFound(format!("Alert {} not found", alert_id)));
        }
        let entry = AlertAction {
            action_type: action,
            timestamp: Utc::now(),
            user_notes: notes.to_string(),
        };
        self.actions.insert(alert_id.to_string(), entry.clone());
        self.autosave()?;
        Ok(entry)
    }

    pub fn action_for(&self, alert_id: &str) -> Option<&AlertAction> {
        self.actions.get(alert_id)
    }

    /// Alerts dated within `days` of the newest alert, newest first.
    pub fn history(&self, days: i64) -> Vec<AlertEntry> {
        let Some(newest) = self.alerts.iter().map(|a| a.date).max() else {
            return Vec::new();
        };
        let cutoff = newest - Duration::days(days.max(0));

        let mut entries: Vec<AlertEntry> = self
            .alerts
            .iter()
            .filter(|a| a.date >= cutoff)
            .map(|a| AlertEntry {
                alert: a.clone(),
                action: self.actions.get(&a.alert_id).cloned(),
            })
            .collect();
        entries.sort_by(|a, b| b.alert.date.cmp(&a.alert.date));
        entries
    }

    pub fn unactioned(&self) -> Vec<&Alert> {
        self.alerts
            .iter()
            .filter(|a| !self.actions.contains_key(&a.alert_id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AnalysisError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = AlertFile {
            alerts: self.alerts.clone(),
            actions: self.actions.clone(),
        };
        std::fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    /// Replace the ledger with the file contents. A missing file leaves it empty.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), AnalysisError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(());
        }
        let file: AlertFile = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        tracing::info!("Loaded {} alerts from {}", file.alerts.len(), path.display());
        self.alerts = file.alerts;
        self.actions = file.actions;
        Ok(())
    }

    fn autosave(&self) -> Result<(), AnalysisError> {
        match &self.autosave_path {
            Some(path) => self.save(path),
            None => Ok(()),
        }
    }
}
