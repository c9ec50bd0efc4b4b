//! Row-wise threshold checks against the engineered features.

use std::collections::BTreeMap;

use data_loader::FeatureRow;

use crate::types::{Anomaly, AnomalyType, Severity};

pub const VOLUME_SPIKE_RATIO: f64 = 3.5;
pub const VOLUME_SPIKE_HIGH_RATIO: f64 = 5.0;
pub const PRICE_GAP_PCT: f64 = 0.03;
pub const PRICE_GAP_SIGMA: f64 = 2.0;
pub const LOW_LIQUIDITY_TRANSACTIONS: f64 = 3.0;
pub const DIVERGENCE_PRICE: f64 = 0.03;
pub const DIVERGENCE_VOLUME: f64 = -0.3;

fn anomaly(
    kind: AnomalyType,
    severity: Severity,
    row: &FeatureRow,
    description: String,
    metrics: &[(&str, f64)],
) -> Anomaly {
    Anomaly {
        alert_id: String::new(),
        anomaly_type: kind,
        severity,
        date: row.date,
        description,
        metrics: metrics.iter().map(|(k, v)| (k.to_string(), *v)).collect::<BTreeMap<_, _>>(),
    }
}

/// Thousands separated with spaces, French style.
fn format_volume(volume: f64) -> String {
    let digits = format!("{:.0}", volume.abs());
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    if volume < 0.0 {
        format!("-{}", out)
    } else {
        out
    }
}

pub fn volume_spike(row: &FeatureRow) -> Option<Anomaly> {
    if row.volume == 0.0 || row.volume_ratio_30d <= VOLUME_SPIKE_RATIO {
        return None;
    }
    let severity = if row.volume_ratio_30d > VOLUME_SPIKE_HIGH_RATIO {
        Severity::High
    } else {
        Severity::Medium
    };
    Some(anomaly(
        AnomalyType::VolumeSpike,
        severity,
        row,
        format!(
            "Volume spike: {:.1}x moyenne 30j (volume: {})",
            row.volume_ratio_30d,
            format_volume(row.volume)
        ),
        &[
            ("actual_value", row.volume),
            ("volume_ratio", row.volume_ratio_30d),
            ("deviation_sigma", row.volume_ratio_30d - 1.0),
        ],
    ))
}

pub fn price_gap(row: &FeatureRow) -> Option<Anomaly> {
    let change = row.price_change_pct.abs();
    if change <= PRICE_GAP_PCT || row.volatility_7d <= 0.0 {
        return None;
    }
    let z = change / row.volatility_7d;
    if z <= PRICE_GAP_SIGMA {
        return None;
    }
    let severity = if z > 3.0 { Severity::High } else { Severity::Medium };
    let direction = if row.price_change_pct > 0.0 { "hausse" } else { "baisse" };
    Some(anomaly(
        AnomalyType::PriceGap,
        severity,
        row,
        format!("Variation anormale: {} de {:.1}% ({:.1}σ)", direction, change * 100.0, z),
        &[
            ("actual_value", row.price_change_pct),
            ("deviation_sigma", z),
            ("price", row.close),
        ],
    ))
}

/// Only sessions without a single transaction are reported.
pub fn low_liquidity(row: &FeatureRow) -> Option<Anomaly> {
    let thin = row.num_transactions < LOW_LIQUIDITY_TRANSACTIONS || row.volume == 0.0;
    if !thin || row.num_transactions != 0.0 {
        return None;
    }
    Some(anomaly(
        AnomalyType::LowLiquidity,
        Severity::High,
        row,
        format!(
            "Liquidité très faible: {} transactions, volume: {}",
            row.num_transactions,
            format_volume(row.volume)
        ),
        &[("actual_value", row.num_transactions), ("volume", row.volume)],
    ))
}

/// Price up sharply while volume dries up.
pub fn divergence(row: &FeatureRow) -> Option<Anomaly> {
    if row.price_change_pct <= DIVERGENCE_PRICE || row.volume_change_pct >= DIVERGENCE_VOLUME {
        return None;
    }
    Some(anomaly(
        AnomalyType::Divergence,
        Severity::Low,
        row,
        format!(
            "Divergence: prix +{:.1}% mais volume {:.1}%",
            row.price_change_pct * 100.0,
            row.volume_change_pct * 100.0
        ),
        &[
            ("price_change", row.price_change_pct),
            ("volume_change", row.volume_change_pct),
        ],
    ))
}

pub fn ml_detected(row: &FeatureRow) -> Anomaly {
    anomaly(
        AnomalyType::MlDetected,
        Severity::Medium,
        row,
        "Modèle ML a détecté un comportement atypique".to_string(),
        &[("volume", row.volume), ("price_change", row.price_change_pct)],
    )
}

/// Every statistical check for one session.
pub fn check_row(row: &FeatureRow) -> Vec<Anomaly> {
    [volume_spike(row), price_gap(row), low_liquidity(row), divergence(row)]
        .into_iter()
        .flatten()
        .collect()
}
