//! Market anomaly detection over BVMT session data, plus the alert ledger
//! that tracks what the user did about each flag.

pub mod alerts;
pub mod detector;
pub mod rules;
pub mod types;


pub use alerts::{ActionType, Alert, AlertAction, AlertEntry, AlertManager};
pub use detector::AnomalyDetector;
pub use types::{Anomaly, AnomalyReport, AnomalyRisk, AnomalyType, Severity};
