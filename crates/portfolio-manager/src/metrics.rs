//! Performance analytics over the ledger. The return and drawdown helpers
//! are stateless and work on a plain value series.
use std::cmp::Ordering;
use std::collections::BTreeMap;

use analysis_core::adaptive::{pct_change, round_to};
use analysis_core::RiskProfile;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::portfolio::{Portfolio, PriceMap, TransactionType};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const CASH_KEY: &str = "CASH";

/// Period returns of a value series, skipping zero bases.
pub fn daily_returns(values: &[f64]) -> Vec<f64> {
    pct_change(values)
}

/// Annualized Sharpe ratio with a zero risk-free rate, using the population
/// standard deviation of the returns. 0 when fewer than two returns exist
/// or the returns are flat.
pub fn sharpe_ratio(values: &[f64]) -> f64 {
    let returns = daily_returns(values);
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = returns.iter().mean();
    let std_dev = returns.iter().population_std_dev();
    if !std_dev.is_finite() || std_dev < 1e-12 {
        return 0.0;
    }
    mean / std_dev * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Largest peak-to-trough decline, in percent.
pub fn max_drawdown_pct(values: &[f64]) -> f64 {
    let Some(&first) = values.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &v in values {
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            max_dd = max_dd.max((peak - v) / peak);
        }
    }
    max_dd * 100.0
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub portfolio_name: String,
    pub user_profile: RiskProfile,
    pub initial_capital: f64,
    pub total_value: f64,
    pub cash: f64,
    pub holdings_value: f64,
    pub total_gain_loss: f64,
    pub roi_percentage: f64,
    pub realized_profit: f64,
    pub unrealized_profit: f64,
    /// Share of profitable sells, in percent
    pub win_rate: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub num_positions: usize,
    pub num_transactions: usize,
    pub num_closed_trades: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionDetail {
    pub stock_code: String,
    pub stock_name: String,
    pub quantity: u64,
    pub avg_price: f64,
    pub current_price: f64,
    pub cost_basis: f64,
    pub current_value: f64,
    pub gain_loss: f64,
    pub gain_loss_pct: f64,
    pub is_profitable: bool,
}

impl Portfolio {
    /// Daily values in date order, as floats.
    fn value_series(&self) -> Vec<f64> {
        let mut values = self.daily_values().to_vec();
        values.sort_by_key(|d| d.date);
        values.into_iter().map(|d| to_f64(d.value)).collect()
    }

    pub fn performance_metrics(&self, prices: &PriceMap) -> PerformanceMetrics {
        let total_value = self.current_value(prices);
        let gain_loss = total_value - self.initial_capital();
        let roi = if self.initial_capital() > Decimal::ZERO {
            to_f64(gain_loss / self.initial_capital()) * 100.0
        } else {
            0.0
        };

        let closed: Vec<Decimal> = self
            .transactions()
            .iter()
            .filter(|t| t.kind == TransactionType::Sell)
            .map(|t| t.profit_loss.unwrap_or_default())
            .collect();
        let wins = closed.iter().filter(|pl| **pl > Decimal::ZERO).count();
        let win_rate = if closed.is_empty() {
            0.0
        } else {
            wins as f64 / closed.len() as f64 * 100.0
        };

        let series = self.value_series();

        PerformanceMetrics {
            portfolio_name: self.name().to_string(),
            user_profile: self.profile(),
            initial_capital: to_f64(self.initial_capital()),
            total_value: round_to(to_f64(total_value), 2),
            cash: round_to(to_f64(self.cash()), 2),
            holdings_value: round_to(to_f64(self.holdings_value(prices)), 2),
            total_gain_loss: round_to(to_f64(gain_loss), 2),
            roi_percentage: round_to(roi, 2),
            realized_profit: round_to(to_f64(self.realized_profit()), 2),
            unrealized_profit: round_to(to_f64(self.unrealized_profit(prices)), 2),
            win_rate: round_to(win_rate, 1),
            sharpe_ratio: round_to(sharpe_ratio(&series), 4),
            max_drawdown: round_to(max_drawdown_pct(&series), 2),
            num_positions: self.holdings().len(),
            num_transactions: self.transactions().len(),
            num_closed_trades: closed.len(),
        }
    }

    /// Percent of total value per position, plus `CASH`.
    pub fn allocation(&self, prices: &PriceMap) -> BTreeMap<String, f64> {
        let total = self.current_value(prices);
        let mut allocation = BTreeMap::new();
        if total <= Decimal::ZERO {
            allocation.insert(CASH_KEY.to_string(), 100.0);
            return allocation;
        }

        let pct = |value: Decimal| round_to(to_f64(value / total) * 100.0, 2);
        allocation.insert(CASH_KEY.to_string(), pct(self.cash()));
        for (code, holding) in self.holdings() {
            let value = self.price_of(code, holding, prices) * Decimal::from(holding.quantity);
            allocation.insert(code.clone(), pct(value));
        }
        allocation
    }

    /// Open positions, largest current value first.
    pub fn position_details(&self, prices: &PriceMap) -> Vec<PositionDetail> {
        let mut positions: Vec<(Decimal, PositionDetail)> = self
            .holdings()
            .iter()
            .map(|(code, holding)| {
                let price = self.price_of(code, holding, prices);
                let value = price * Decimal::from(holding.quantity);
                let cost = holding.cost_basis();
                let gain = value - cost;
                let gain_pct = if cost > Decimal::ZERO {
                    to_f64(gain / cost) * 100.0
                } else {
                    0.0
                };
                let detail = PositionDetail {
                    stock_code: code.clone(),
                    stock_name: holding.stock_name.clone(),
                    quantity: holding.quantity,
                    avg_price: round_to(to_f64(holding.avg_price), 3),
                    current_price: round_to(to_f64(price), 3),
                    cost_basis: round_to(to_f64(cost), 2),
                    current_value: round_to(to_f64(value), 2),
                    gain_loss: round_to(to_f64(gain), 2),
                    gain_loss_pct: round_to(gain_pct, 2),
                    is_profitable: gain > Decimal::ZERO,
                };
                (value, detail)
            })
            .collect();

        positions.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.stock_code.cmp(&b.1.stock_code)));
        positions.into_iter().map(|(_, d)| d).collect()
    }

    /// Short French summary for logs and chat replies.
    pub fn summary_text(&self, prices: &PriceMap) -> String {
        let m = self.performance_metrics(prices);
        [
            format!("=== {} ===", m.portfolio_name),
            format!("Valeur totale: {:.2} TND", m.total_value),
            format!("Cash: {:.2} TND", m.cash),
            format!("Positions: {:.2} TND", m.holdings_value),
            String::new(),
            "Performance:".to_string(),
            format!("  ROI: {:+.2}%", m.roi_percentage),
            format!("  Gain/Perte: {:+.2} TND", m.total_gain_loss),
            format!("  Taux de reussite: {:.1}%", m.win_rate),
            String::new(),
            "Activite:".to_string(),
            format!("  Positions ouvertes: {}", m.num_positions),
            format!("  Transactions: {}", m.num_transactions),
        ]
        .join("\n")
    }
}

/// Order by ROI, best first. Ties keep their input order.
pub(crate) fn by_roi_desc(a: &PerformanceMetrics, b: &PerformanceMetrics) -> Ordering {
    b.roi_percentage
        .partial_cmp(&a.roi_percentage)
        .unwrap_or(Ordering::Equal)
}
