use analysis_core::adaptive::{median, round_to};
use analysis_core::{AnalysisError, RiskProfile};
use serde::{Deserialize, Serialize};

use crate::engine::{DecisionEngine, RecommendationFilter};

const CANDIDATE_POOL: usize = 20;
const MAX_PER_BUCKET: usize = 5;
const VOLATILITY_DAYS: usize = 30;
const LIQUID_MIN_AVG_VOLUME: f64 = 1000.0;
const LIQUID_MIN_DAYS: usize = 30;

const STABLE_DESCRIPTION: &str = "Actions stables (faible volatilite)";
const GROWTH_DESCRIPTION: &str = "Actions de croissance (volatilite elevee)";
const BONDS_DESCRIPTION: &str = "Obligations (representees en cash pour MVP)";
const CASH_DESCRIPTION: &str = "Reserves de liquidites pour opportunites/risques";

/// Target split of capital for one profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocationTemplate {
    pub stable_stocks: f64,
    pub growth_stocks: f64,
    pub bonds: f64,
    pub cash: f64,
}

impl AllocationTemplate {
    pub fn for_profile(profile: RiskProfile) -> Self {
        match profile {
            RiskProfile::Conservative => Self {
                stable_stocks: 0.30,
                growth_stocks: 0.0,
                bonds: 0.40,
                cash: 0.30,
            },
            RiskProfile::Moderate => Self {
                stable_stocks: 0.40,
                growth_stocks: 0.0,
                bonds: 0.30,
                cash: 0.30,
            },
            RiskProfile::Aggressive => Self {
                stable_stocks: 0.20,
                growth_stocks: 0.60,
                bonds: 0.0,
                cash: 0.20,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AllocationKind {
    Stock,
    Bonds,
    Cash,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationSuggestion {
    #[serde(rename = "type")]
    pub kind: AllocationKind,
    pub stock_code: Option<String>,
    pub stock_name: Option<String>,
    pub quantity: Option<u64>,
    pub amount: f64,
    pub percentage: f64,
    pub description: String,
}

impl AllocationSuggestion {
    fn reserve(kind: AllocationKind, amount: f64, capital: f64, description: &str) -> Self {
        Self {
            kind,
            stock_code: None,
            stock_name: None,
            quantity: None,
            amount: round_to(amount, 2),
            percentage: round_to(amount / capital * 100.0, 2),
            description: description.to_string(),
        }
    }
}

/// Split codes at the median volatility: at or below is stable, above is growth.
pub fn split_by_volatility(vols: &[(String, f64)]) -> (Vec<String>, Vec<String>) {
    if vols.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let values: Vec<f64> = vols.iter().map(|(_, v)| *v).collect();
    let cut = median(&values);

    let stable = vols.iter().filter(|(_, v)| *v <= cut).map(|(c, _)| c.clone()).collect();
    let growth = vols.iter().filter(|(_, v)| *v > cut).map(|(c, _)| c.clone()).collect();
    (stable, growth)
}

impl DecisionEngine {
    /// Whole-share purchases with an equal budget per stock. Returns the
    /// suggestions and the money left unspent.
    fn bucket(&self, codes: &[String], amount: f64, capital: f64, description: &str) -> (Vec<AllocationSuggestion>, f64) {
        if amount <= 0.0 || codes.is_empty() {
            return (Vec::new(), amount.max(0.0));
        }

        let budget = amount / codes.len() as f64;
        let mut used = 0.0;
        let mut suggestions = Vec::new();

        for code in codes {
            let price = match self.market().current_price(code) {
                Ok(p) if p > 0.0 => p,
                _ => continue,
            };
            let quantity = (budget / price).floor() as u64;
            if quantity == 0 {
                continue;
            }
            let allocated = quantity as f64 * price;
            used += allocated;
            suggestions.push(AllocationSuggestion {
                kind: AllocationKind::Stock,
                stock_code: Some(code.clone()),
                stock_name: Some(self.market().stock_name(code)),
                quantity: Some(quantity),
                amount: round_to(allocated, 2),
                percentage: round_to(allocated / capital * 100.0, 2),
                description: description.to_string(),
            });
        }

        (suggestions, (amount - used).max(0.0))
    }

    /// Diversified allocation of `capital` for a profile, built from the
    /// current liquid BUY recommendations.
    pub async fn suggest_diversified_portfolio(
        &self,
        profile: RiskProfile,
        capital: f64,
    ) -> Result<Vec<AllocationSuggestion>, AnalysisError> {
        if !capital.is_finite() || capital <= 0.0 {
            return Err(AnalysisError::InvalidData(format!("capital must be positive, got {}", capital)));
        }
        let template = AllocationTemplate::for_profile(profile);

        let buys = self
            .get_top_recommendations(CANDIDATE_POOL, profile, RecommendationFilter::Buy)
            .await;
        let liquid = self.market().liquid_stock_codes(LIQUID_MIN_AVG_VOLUME, LIQUID_MIN_DAYS);
        let vols: Vec<(String, f64)> = buys
            .iter()
            .filter(|r| liquid.contains(&r.stock_code))
            .filter_map(|r| {
                self.market()
                    .volatility(&r.stock_code, VOLATILITY_DAYS)
                    .map(|v| (r.stock_code.clone(), v))
            })
            .collect();
        let (stable, growth) = split_by_volatility(&vols);
        tracing::info!(
            "Allocation for {}: {} stable and {} growth candidates",
            profile.as_str(),
            stable.len(),
            growth.len()
        );

        let mut suggestions = Vec::new();
        let mut leftover = 0.0;

        for (share, codes, description) in [
            (template.stable_stocks, &stable, STABLE_DESCRIPTION),
            (template.growth_stocks, &growth, GROWTH_DESCRIPTION),
        ] {
            if share <= 0.0 {
                continue;
            }
            let picks: Vec<String> = codes.iter().take(MAX_PER_BUCKET).cloned().collect();
            let (bucket, rest) = self.bucket(&picks, capital * share, capital, description);
            suggestions.extend(bucket);
            leftover += rest;
        }

        let bonds = capital * template.bonds;
        if bonds > 0.0 {
            suggestions.push(AllocationSuggestion::reserve(AllocationKind::Bonds, bonds, capital, BONDS_DESCRIPTION));
        }

        let cash = capital * template.cash + leftover;
        if cash > 0.0 {
            suggestions.push(AllocationSuggestion::reserve(AllocationKind::Cash, cash, capital, CASH_DESCRIPTION));
        }

        Ok(suggestions)
    }
}
