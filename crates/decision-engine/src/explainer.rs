//! Human readable explanations of a recommendation.

use analysis_core::{Action, MacdTrend, MemoryEvidence, Recommendation, RiskLevel, RiskProfile, SignalBundle};
use serde::{Deserialize, Serialize};

use crate::config::SignalWeights;

const SEPARATOR_WIDTH: usize = 40;
const FORECAST_MOVE: f64 = 0.02;
const SENTIMENT_NOTE_LEVEL: f64 = 0.4;
const SENTIMENT_TEXT_LEVEL: f64 = 0.3;
const EVIDENCE_PER_KIND: usize = 2;
const EVIDENCE_TEXT_CHARS: usize = 100;

pub const OFFLINE_MEMORY_NOTE: &str = "(Mode offline: memoire semantique indisponible)";
pub const ANALYSIS_ERROR_TEXT: &str = "Erreur lors de l'analyse";

fn separator() -> String {
    "-".repeat(SEPARATOR_WIDTH)
}

fn percent(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}

/// One French line per signal, in evaluation order.
pub fn signal_notes(bundle: &SignalBundle, memory: Option<&MemoryEvidence>) -> Vec<String> {
    let mut notes = Vec::new();

    match &bundle.forecast {
        Some(f) if f.trend > FORECAST_MOVE => {
            notes.push(format!("Prevision positive: +{:.1}% attendu sur 5 jours", f.trend * 100.0))
        }
        Some(f) if f.trend < -FORECAST_MOVE => {
            notes.push(format!("Prevision negative: {:.1}% attendu sur 5 jours", f.trend * 100.0))
        }
        Some(_) => notes.push("Prevision stable, pas de tendance claire".to_string()),
        None => notes.push("Prevision non disponible".to_string()),
    }

    match &bundle.sentiment {
        Some(s) if s.score > SENTIMENT_NOTE_LEVEL => notes.push(format!(
            "Sentiment positif ({:.2}) base sur {} articles",
            s.score, s.num_articles
        )),
        Some(s) if s.score < -SENTIMENT_NOTE_LEVEL => {
            notes.push(format!("Sentiment negatif ({:.2}) - prudence recommandee", s.score))
        }
        Some(s) if s.num_articles > 0 => {
            notes.push(format!("Sentiment neutre ({:.2}) - marche indecis", s.score))
        }
        Some(_) => notes.push("Pas d'articles recents pour l'analyse de sentiment".to_string()),
        None => notes.push("Analyse de sentiment non disponible".to_string()),
    }

    match &bundle.anomaly {
        Some(a) => {
            if a.volume_spike {
                notes.push("Volume anormal detecte - prudence recommandee".to_string());
            }
            if a.price_spike {
                notes.push("Variation de prix inhabituelle sans actualite justificative".to_string());
            }
            if !a.any_anomaly && !a.volume_spike && !a.price_spike {
                notes.push("Aucune anomalie detectee - trading normal".to_string());
            } else if !a.volume_spike && !a.price_spike {
                notes.push(format!("Anomalie detectee: {}", a.details));
            }
        }
        None => notes.push("Detection d'anomalies non disponible".to_string()),
    }

    if let Some(t) = &bundle.technical {
        if let Some(rsi) = t.rsi {
            if rsi < technical_analysis::RSI_OVERSOLD {
                notes.push(format!("RSI indique survente ({:.1}) - opportunite d'achat", rsi));
            } else if rsi > technical_analysis::RSI_OVERBOUGHT {
                notes.push(format!("RSI indique surachat ({:.1}) - risque de correction", rsi));
            }
        }
        match t.macd.as_ref().map(|m| m.trend) {
            Some(MacdTrend::Bullish) => notes.push("MACD confirme tendance haussiere".to_string()),
            Some(MacdTrend::Bearish) => notes.push("MACD indique tendance baissiere".to_string()),
            None => {}
        }
    }

    if let Some(evidence) = memory.filter(|m| !m.is_empty()) {
        notes.push(format!(
            "Evidence semantique: {} elements retrouves dans Market Memory",
            evidence.total()
        ));
    }

    notes
}

pub fn suggested_action(action: Action, stock_name: &str, price: f64, confidence: f64, profile: RiskProfile) -> String {
    let (qty_range, modifier) = match profile {
        RiskProfile::Conservative => ("20-50", "prudemment "),
        RiskProfile::Moderate => ("50-100", ""),
        RiskProfile::Aggressive => ("100-200", ""),
    };

    match action {
        Action::Buy if confidence >= 0.7 => format!(
            "Acheter {}{} actions de {} au prix actuel de {:.2} TND",
            modifier, qty_range, stock_name, price
        ),
        Action::Buy => format!(
            "Envisager l'achat de {} actions - surveiller le prix avant d'agir",
            qty_range
        ),
        Action::Sell if confidence >= 0.7 => format!(
            "Vendre {}vos positions sur {} au prix de {:.2} TND",
            modifier, stock_name, price
        ),
        Action::Sell => "Envisager de reduire votre position - placer un ordre stop-loss".to_string(),
        Action::Hold => format!(
            "Conserver votre position actuelle sur {} - pas d'action immediate",
            stock_name
        ),
    }
}

fn risk_text_fr(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => "FAIBLE - Volatilite reduite, investissement stable",
        RiskLevel::Medium => "MOYEN - Volatilite moderee, surveiller les positions",
        RiskLevel::High => "ELEVE - Forte volatilite, position speculative",
    }
}

fn risk_text_en(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => "LOW - Low volatility, stable investment",
        RiskLevel::Medium => "MEDIUM - Moderate volatility, monitor positions",
        RiskLevel::High => "HIGH - High volatility, speculative position",
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

fn memory_lines(memory: Option<&MemoryEvidence>, lines: &mut Vec<String>) {
    lines.push(separator());
    let Some(evidence) = memory else {
        lines.push(OFFLINE_MEMORY_NOTE.to_string());
        lines.push(String::new());
        return;
    };

    lines.push("EVIDENCE RETROUVEE (Market Memory):".to_string());
    lines.push(String::new());
    let groups = [
        ("Actualite", &evidence.news),
        ("Anomalie", &evidence.anomalies),
        ("Recommandation", &evidence.recommendations),
    ];
    for (label, items) in groups {
        for item in items.iter().take(EVIDENCE_PER_KIND) {
            lines.push(format!(
                "  [{}] {} (Score: {:.2})",
                label,
                truncate(&item.text, EVIDENCE_TEXT_CHARS),
                item.score
            ));
        }
    }
    if evidence.is_empty() {
        lines.push("  Aucune evidence semantique trouvee dans la memoire du marche".to_string());
    } else {
        lines.push(String::new());
        lines.push(format!("  Total: {} elements pertinents trouves", evidence.total()));
    }
    lines.push(String::new());
}

/// Full French explanation.
pub fn explain_fr(rec: &Recommendation) -> String {
    let hint = match rec.action {
        Action::Buy => "(Signal positif)",
        Action::Sell => "(Signal negatif)",
        Action::Hold => "(Signal neutre)",
    };

    let mut lines = vec![
        format!("RECOMMANDATION: {} {}", rec.action.label_fr(), rec.stock_name),
        format!("Confiance: {} {}", percent(rec.confidence), hint),
        String::new(),
        "ANALYSE DETAILLEE:".to_string(),
        separator(),
    ];

    let signals = &rec.signals;
    match &signals.forecast {
        Some(f) if f.trend > FORECAST_MOVE => {
            lines.push(format!("  Prevision: Hausse attendue de +{:.1}% sur 5 jours", f.trend * 100.0));
            lines.push("            Le modele de prediction indique une tendance haussiere".to_string());
        }
        Some(f) if f.trend < -FORECAST_MOVE => {
            lines.push(format!("  Prevision: Baisse attendue de {:.1}% sur 5 jours", f.trend * 100.0));
            lines.push("            Le modele de prediction indique une tendance baissiere".to_string());
        }
        Some(_) => lines.push("  Prevision: Tendance stable, pas de mouvement significatif attendu".to_string()),
        None => lines.push("  Prevision: Non disponible".to_string()),
    }
    lines.push(String::new());

    match &signals.sentiment {
        Some(s) => {
            let (text, marker) = if s.score > SENTIMENT_TEXT_LEVEL {
                ("POSITIF", "(+)")
            } else if s.score < -SENTIMENT_TEXT_LEVEL {
                ("NEGATIF", "(-)")
            } else {
                ("NEUTRE", "(=)")
            };
            lines.push(format!("  Sentiment: {} {}", text, marker));
            lines.push(format!(
                "            Score: {:.2}/1.0 base sur {} articles recents",
                s.score, s.num_articles
            ));
        }
        None => lines.push("  Sentiment: Non disponible".to_string()),
    }
    lines.push(String::new());

    match &signals.anomaly {
        Some(a) if a.any_anomaly => {
            lines.push("  Anomalies: DETECTEES (!)".to_string());
            lines.push(format!("            {}", a.details));
            lines.push("            Prudence recommandee - activite inhabituelle".to_string());
        }
        Some(_) => {
            lines.push("  Anomalies: Aucune detectee".to_string());
            lines.push("            Trading normal, pas de comportement suspect".to_string());
        }
        None => lines.push("  Anomalies: Detection non disponible".to_string()),
    }
    lines.push(String::new());

    if let Some(t) = &signals.technical {
        if let Some(rsi) = t.rsi {
            let text = if rsi < technical_analysis::RSI_OVERSOLD {
                "SURVENTE (opportunite d'achat potentielle)"
            } else if rsi > technical_analysis::RSI_OVERBOUGHT {
                "SURACHAT (risque de correction)"
            } else {
                "zone neutre"
            };
            lines.push(format!("  RSI: {:.1} - {}", rsi, text));
        }
        if let Some(macd) = &t.macd {
            let text = match macd.trend {
                MacdTrend::Bullish => "tendance haussiere",
                MacdTrend::Bearish => "tendance baissiere",
            };
            lines.push(format!("  MACD: {:.3} (signal {:.3}) - {}", macd.macd, macd.signal, text));
        }
        lines.push(String::new());
    }

    memory_lines(rec.memory.as_ref(), &mut lines);

    lines.push(separator());
    lines.push(format!("NIVEAU DE RISQUE: {}", risk_text_fr(rec.risk_level)));
    lines.push(String::new());

    if !rec.suggested_action.is_empty() {
        lines.push(separator());
        lines.push(format!("ACTION SUGGEREE: {}", rec.suggested_action));
    }

    lines.join("\n")
}

pub fn explain_en(rec: &Recommendation) -> String {
    let mut lines = vec![
        format!("RECOMMENDATION: {} {}", rec.action.label_en(), rec.stock_name),
        format!("Confidence: {}", percent(rec.confidence)),
        String::new(),
        "DETAILED ANALYSIS:".to_string(),
        separator(),
    ];

    let signals = &rec.signals;
    match &signals.forecast {
        Some(f) if f.trend > FORECAST_MOVE => lines.push(format!(
            "  Forecast: Expected increase of +{:.1}% over 5 days",
            f.trend * 100.0
        )),
        Some(f) if f.trend < -FORECAST_MOVE => lines.push(format!(
            "  Forecast: Expected decrease of {:.1}% over 5 days",
            f.trend * 100.0
        )),
        Some(_) => lines.push("  Forecast: Stable trend, no significant movement expected".to_string()),
        None => lines.push("  Forecast: Not available".to_string()),
    }
    lines.push(String::new());

    if let Some(s) = &signals.sentiment {
        let text = if s.score > SENTIMENT_TEXT_LEVEL {
            "POSITIVE"
        } else if s.score < -SENTIMENT_TEXT_LEVEL {
            "NEGATIVE"
        } else {
            "NEUTRAL"
        };
        lines.push(format!("  Sentiment: {}", text));
        lines.push(format!(
            "            Score: {:.2}/1.0 based on {} recent articles",
            s.score, s.num_articles
        ));
    }
    lines.push(String::new());

    if let Some(a) = &signals.anomaly {
        if a.any_anomaly {
            lines.push("  Anomalies: DETECTED - Unusual trading activity".to_string());
        } else {
            lines.push("  Anomalies: None detected - Normal trading".to_string());
        }
    }
    lines.push(String::new());

    lines.push(separator());
    lines.push(format!("RISK LEVEL: {}", risk_text_en(rec.risk_level)));

    if !rec.suggested_action.is_empty() {
        lines.push(String::new());
        lines.push(format!("SUGGESTED ACTION: {}", rec.suggested_action));
    }

    lines.join("\n")
}

/// One-line summary for lists.
pub fn short_explanation(rec: &Recommendation) -> String {
    match rec.action {
        Action::Buy => format!(
            "ACHETER {} (confiance: {}) - Signaux positifs detectes",
            rec.stock_name,
            percent(rec.confidence)
        ),
        Action::Sell => format!(
            "VENDRE {} (confiance: {}) - Signaux negatifs detectes",
            rec.stock_name,
            percent(rec.confidence)
        ),
        Action::Hold => format!("CONSERVER {} - Pas de signal fort, attendre", rec.stock_name),
    }
}

/// Notification text, only for confident trades or anomalies.
pub fn alert_message(rec: &Recommendation) -> Option<String> {
    match rec.action {
        Action::Buy if rec.confidence >= 0.7 => {
            return Some(format!(
                "ALERTE ACHAT: {} presente une opportunite d'achat avec {} de confiance",
                rec.stock_name,
                percent(rec.confidence)
            ))
        }
        Action::Sell if rec.confidence >= 0.7 => {
            return Some(format!(
                "ALERTE VENTE: {} montre des signaux de vente avec {} de confiance",
                rec.stock_name,
                percent(rec.confidence)
            ))
        }
        _ => {}
    }

    rec.signals
        .anomaly
        .as_ref()
        .filter(|a| a.any_anomaly)
        .map(|_| format!("ALERTE ANOMALIE: Activite inhabituelle detectee sur {}", rec.stock_name))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    pub signal: String,
    pub value: String,
    /// "+", "-" or "="
    pub impact: String,
    pub weight: f64,
}

fn impact(positive: bool, negative: bool) -> String {
    if positive {
        "+".to_string()
    } else if negative {
        "-".to_string()
    } else {
        "=".to_string()
    }
}

pub fn signals_table(bundle: &SignalBundle, weights: &SignalWeights) -> Vec<SignalRow> {
    let mut rows = Vec::new();

    if let Some(f) = &bundle.forecast {
        rows.push(SignalRow {
            signal: "Prevision".to_string(),
            value: format!("{:+.1}%", f.trend * 100.0),
            impact: impact(f.trend > FORECAST_MOVE, f.trend < -FORECAST_MOVE),
            weight: weights.forecast,
        });
    }
    if let Some(s) = &bundle.sentiment {
        rows.push(SignalRow {
            signal: "Sentiment".to_string(),
            value: format!("{:.2}", s.score),
            impact: impact(s.score > SENTIMENT_TEXT_LEVEL, s.score < -SENTIMENT_TEXT_LEVEL),
            weight: weights.sentiment,
        });
    }
    if let Some(a) = &bundle.anomaly {
        rows.push(SignalRow {
            signal: "Anomalie".to_string(),
            value: if a.any_anomaly { "Oui" } else { "Non" }.to_string(),
            impact: impact(!a.any_anomaly, a.any_anomaly),
            weight: weights.anomaly,
        });
    }
    if let Some(rsi) = bundle.technical.as_ref().and_then(|t| t.rsi) {
        rows.push(SignalRow {
            signal: "RSI".to_string(),
            value: format!("{:.1}", rsi),
            impact: impact(
                rsi < technical_analysis::RSI_OVERSOLD,
                rsi > technical_analysis::RSI_OVERBOUGHT,
            ),
            weight: weights.technical,
        });
    }

    rows
}

/// Markdown rendering of [`signals_table`].
pub fn render_signals_table(rows: &[SignalRow]) -> String {
    let mut lines = vec![
        "| Signal      | Valeur    | Impact | Poids |".to_string(),
        "|-------------|-----------|--------|-------|".to_string(),
    ];
    for row in rows {
        lines.push(format!(
            "| {:<11} | {:<9} | {:<6} | {:>4.0}% |",
            row.signal,
            row.value,
            row.impact,
            row.weight * 100.0
        ));
    }
    lines.join("\n")
}
