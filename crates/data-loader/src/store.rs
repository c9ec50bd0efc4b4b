use analysis_core::{adaptive, AnalysisError, MarketData, StockRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::DataError;
use crate::loader::load_path;
use crate::names::known_stock_name;

/// Aggregated liquidity of one stock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityRank {
    pub code: String,
    pub name: String,
    pub trading_days: usize,
    pub total_volume: f64,
    pub total_transactions: u64,
    pub total_capital: f64,
    pub liq_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSummary {
    pub stock_code: String,
    pub stock_name: String,
    pub current_price: f64,
    pub previous_close: f64,
    pub change_pct: f64,
    pub avg_volume_30d: f64,
    pub avg_price_30d: f64,
    pub min_price_30d: f64,
    pub max_price_30d: f64,
    pub num_data_points: usize,
    pub date_range: String,
}

/// Normalized in-memory table of exchange sessions, grouped per stock and
/// sorted by date. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct StockStore {
    by_code: BTreeMap<String, Vec<StockRecord>>,
    names: HashMap<String, String>,
}

impl StockStore {
    pub fn new(records: Vec<StockRecord>) -> Self {
        let mut by_code: BTreeMap<String, Vec<StockRecord>> = BTreeMap::new();
        let mut names = HashMap::new();

        for record in records {
            if !record.stock_name.is_empty() {
                names
                    .entry(record.stock_code.clone())
                    .or_insert_with(|| record.stock_name.clone());
            }
            by_code.entry(record.stock_code.clone()).or_default().push(record);
        }

        for rows in by_code.values_mut() {
            rows.sort_by_key(|r| r.date);
            rows.dedup_by(|later, earlier| {
                if later.date == earlier.date {
                    std::mem::swap(later, earlier);
                    true
                } else {
                    false
                }
            });
        }

        Self { by_code, names }
    }

    /// Load from a CSV file or a directory of CSV files.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let records = load_path(path)?;
        let store = Self::new(records);
        tracing::info!(
            "Stock store ready: {} stocks, {} sessions",
            store.by_code.len(),
            store.len()
        );
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.by_code.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// Full history of a stock, oldest first (empty if unknown).
    pub fn history(&self, code: &str) -> &[StockRecord] {
        self.by_code.get(code).map(Vec::as_slice).unwrap_or(&[])
    }

    /// History filtered by an inclusive date range and a minimum volume.
    pub fn get_stock_data(
        &self,
        code: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        min_volume: Option<f64>,
    ) -> Result<Vec<StockRecord>, DataError> {
        let rows = self
            .by_code
            .get(code)
            .ok_or_else(|| DataError::UnknownStock(code.to_string()))?;

        Ok(rows
            .iter()
            .filter(|r| start.map_or(true, |s| r.date >= s))
            .filter(|r| end.map_or(true, |e| r.date <= e))
            .filter(|r| min_volume.map_or(true, |v| r.volume >= v))
            .cloned()
            .collect())
    }

    pub fn get_all_stocks(&self) -> Vec<String> {
        self.by_code.keys().cloned().collect()
    }

    /// Stocks with enough sessions and a high enough average volume, sorted by code.
    pub fn get_liquid_stocks(&self, min_avg_volume: f64, min_days: usize) -> Vec<String> {
        self.by_code
            .iter()
            .filter(|(_, rows)| {
                let volumes: Vec<f64> = rows.iter().map(|r| r.volume).collect();
                rows.len() >= min_days && adaptive::mean(&volumes) >= min_avg_volume
            })
            .map(|(code, _)| code.clone())
            .collect()
    }

    /// Top `n` stocks by liquidity score over sessions that actually traded.
    pub fn most_liquid(&self, n: usize) -> Vec<LiquidityRank> {
        let mut ranks: Vec<LiquidityRank> = self
            .by_code
            .iter()
            .filter_map(|(code, rows)| {
                let traded: Vec<&StockRecord> = rows.iter().filter(|r| r.volume > 0.0).collect();
                if traded.is_empty() {
                    return None;
                }
                let total_volume: f64 = traded.iter().map(|r| r.volume).sum();
                let total_transactions: u64 = traded.iter().map(|r| r.num_transactions).sum();
                let total_capital: f64 = traded.iter().map(|r| r.capital).sum();
                let liq_score = total_volume.ln_1p()
                    + (total_transactions as f64).ln_1p()
                    + 0.5 * total_capital.max(0.0).ln_1p();
                Some(LiquidityRank {
                    code: code.clone(),
                    name: self.get_stock_name(code),
                    trading_days: traded.len(),
                    total_volume,
                    total_transactions,
                    total_capital,
                    liq_score,
                })
            })
            .collect();

        ranks.sort_by(|a, b| {
            b.liq_score
                .partial_cmp(&a.liq_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranks.truncate(n);
        ranks
    }

    pub fn get_current_price(&self, code: &str) -> Result<f64, DataError> {
        self.history(code)
            .last()
            .map(|r| r.close)
            .ok_or_else(|| DataError::UnknownStock(code.to_string()))
    }

    /// Known display name, then the name found in the data, then the code itself.
    pub fn get_stock_name(&self, code: &str) -> String {
        known_stock_name(code)
            .map(str::to_string)
            .or_else(|| self.names.get(code).cloned())
            .unwrap_or_else(|| code.to_string())
    }

    /// Last `days` sessions.
    pub fn get_price_history(&self, code: &str, days: usize) -> Vec<StockRecord> {
        let rows = self.history(code);
        rows[rows.len().saturating_sub(days)..].to_vec()
    }

    pub fn get_stock_summary(&self, code: &str) -> Result<StockSummary, DataError> {
        let rows = self.history(code);
        let last = rows
            .last()
            .ok_or_else(|| DataError::UnknownStock(code.to_string()))?;
        let first = &rows[0];

        let previous_close = if rows.len() > 1 { rows[rows.len() - 2].close } else { 0.0 };
        let change_pct = if rows.len() > 1 && previous_close != 0.0 {
            (last.close - previous_close) / previous_close * 100.0
        } else {
            0.0
        };

        let recent = &rows[rows.len().saturating_sub(30)..];
        let closes: Vec<f64> = recent.iter().map(|r| r.close).collect();
        let volumes: Vec<f64> = recent.iter().map(|r| r.volume).collect();

        Ok(StockSummary {
            stock_code: code.to_string(),
            stock_name: self.get_stock_name(code),
            current_price: last.close,
            previous_close,
            change_pct,
            avg_volume_30d: adaptive::mean(&volumes),
            avg_price_30d: adaptive::mean(&closes),
            min_price_30d: closes.iter().cloned().fold(f64::INFINITY, f64::min),
            max_price_30d: closes.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            num_data_points: rows.len(),
            date_range: format!(
                "{} to {}",
                first.date.format("%Y-%m-%d"),
                last.date.format("%Y-%m-%d")
            ),
        })
    }

    /// Std of daily returns over the last `days` sessions.
    pub fn get_volatility(&self, code: &str, days: usize) -> Option<f64> {
        let closes: Vec<f64> = self
            .get_price_history(code, days)
            .iter()
            .map(|r| r.close)
            .collect();
        let returns = adaptive::pct_change(&closes);
        if returns.is_empty() {
            None
        } else {
            Some(adaptive::population_std(&returns))
        }
    }
}

impl MarketData for StockStore {
    fn stock_name(&self, stock_code: &str) -> String {
        self.get_stock_name(stock_code)
    }

    fn current_price(&self, stock_code: &str) -> Result<f64, AnalysisError> {
        Ok(self.get_current_price(stock_code)?)
    }

    fn all_stock_codes(&self) -> Vec<String> {
        self.get_all_stocks()
    }

    fn closes(&self, stock_code: &str) -> Vec<f64> {
        self.history(stock_code).iter().map(|r| r.close).collect()
    }

    fn liquid_stock_codes(&self, min_avg_volume: f64, min_days: usize) -> Vec<String> {
        self.get_liquid_stocks(min_avg_volume, min_days)
    }

    fn volatility(&self, stock_code: &str, days: usize) -> Option<f64> {
        self.get_volatility(stock_code, days)
    }
}
