//! Simulated trading ledger for one investor session.
//!
//! Cash and prices are `Decimal` so that a round trip at the same price
//! leaves the balance untouched.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::Path;

use analysis_core::RiskProfile;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::PortfolioError;

pub const DEFAULT_NAME: &str = "Mon Portefeuille";
pub const DEFAULT_CAPITAL: Decimal = dec!(10000);

/// Current price per stock code. Codes missing from the map are valued at
/// their average purchase price.
pub type PriceMap = HashMap<String, Decimal>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub stock_name: String,
    pub quantity: u64,
    pub avg_price: Decimal,
    pub first_buy_date: NaiveDate,
    pub last_buy_date: NaiveDate,
}

impl Holding {
    pub fn cost_basis(&self) -> Decimal {
        self.avg_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Buy,
    Sell,
}

impl TransactionType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "BUY" | "ACHAT" => Some(Self::Buy),
            "SELL" | "VENTE" => Some(Self::Sell),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub stock_code: String,
    pub stock_name: String,
    pub quantity: u64,
    pub price: Decimal,
    pub total: Decimal,
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
    pub cash_after: Decimal,
    /// Only set on sells
    #[serde(default)]
    pub profit_loss: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub date: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_value: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub cash: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub holdings_value: Decimal,
    pub num_positions: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyValue {
    pub date: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    name: String,
    initial_capital: Decimal,
    cash: Decimal,
    #[serde(default)]
    profile: RiskProfile,
    #[serde(default)]
    holdings: BTreeMap<String, Holding>,
    #[serde(default)]
    transactions: Vec<Transaction>,
    #[serde(default)]
    snapshots: Vec<Snapshot>,
    #[serde(default)]
    daily_values: Vec<DailyValue>,
    created_at: DateTime<Utc>,
}

impl Default for Portfolio {
    fn default() -> Self {
        Self::new(DEFAULT_NAME, DEFAULT_CAPITAL, RiskProfile::default())
    }
}

impl Portfolio {
    pub fn new(name: &str, initial_capital: Decimal, profile: RiskProfile) -> Self {
        Self {
            name: name.to_string(),
            initial_capital,
            cash: initial_capital,
            profile,
            holdings: BTreeMap::new(),
            transactions: Vec::new(),
            snapshots: Vec::new(),
            daily_values: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial_capital(&self) -> Decimal {
        self.initial_capital
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn profile(&self) -> RiskProfile {
        self.profile
    }

    pub fn set_profile(&mut self, profile: RiskProfile) {
        self.profile = profile;
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn holdings(&self) -> &BTreeMap<String, Holding> {
        &self.holdings
    }

    pub fn holding(&self, stock_code: &str) -> Option<&Holding> {
        self.holdings.get(stock_code)
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn daily_values(&self) -> &[DailyValue] {
        &self.daily_values
    }

    /// Buy `quantity` shares at `price`, averaging into any existing position.
    pub fn buy(
        &mut self,
        stock_code: &str,
        stock_name: &str,
        quantity: u64,
        price: Decimal,
        date: NaiveDate,
    ) -> Result<Transaction, PortfolioError> {
        if quantity == 0 {
            return Err(PortfolioError::InvalidQuantity);
        }
        if price <= Decimal::ZERO {
            return Err(PortfolioError::InvalidPrice(price));
        }
        let total = price
            .checked_mul(Decimal::from(quantity))
            .ok_or(PortfolioError::InvalidQuantity)?;
        if total > self.cash {
            return Err(PortfolioError::InsufficientFunds {
                required: total,
                available: self.cash,
            });
        }

        self.cash -= total;

        let holding = self.holdings.entry(stock_code.to_string()).or_insert_with(|| Holding {
            stock_name: stock_name.to_string(),
            quantity: 0,
            avg_price: Decimal::ZERO,
            first_buy_date: date,
            last_buy_date: date,
        });
        let new_quantity = holding.quantity + quantity;
        holding.avg_price = (holding.cost_basis() + total) / Decimal::from(new_quantity);
        holding.quantity = new_quantity;
        holding.last_buy_date = date;

        let transaction = Transaction {
            kind: TransactionType::Buy,
            stock_code: stock_code.to_string(),
            stock_name: holding.stock_name.clone(),
            quantity,
            price,
            total,
            date,
            timestamp: Utc::now(),
            cash_after: self.cash,
            profit_loss: None,
        };
        tracing::debug!("{}: bought {} {} at {}", self.name, quantity, stock_code, price);
        Ok(self.record(transaction))
    }

    /// Sell shares of an existing position. Realized P/L is measured against
    /// the average purchase price.
    pub fn sell(
        &mut self,
        stock_code: &str,
        quantity: u64,
        price: Decimal,
        date: NaiveDate,
    ) -> Result<Transaction, PortfolioError> {
        if quantity == 0 {
            return Err(PortfolioError::InvalidQuantity);
        }
        if price <= Decimal::ZERO {
            return Err(PortfolioError::InvalidPrice(price));
        }

        let holding = self
            .holdings
            .get_mut(stock_code)
            .ok_or_else(|| PortfolioError::PositionNotFound(stock_code.to_string()))?;
        if holding.quantity < quantity {
            return Err(PortfolioError::InsufficientShares {
                available: holding.quantity,
                requested: quantity,
            });
        }

        let sold = Decimal::from(quantity);
        let proceeds = price.checked_mul(sold).ok_or(PortfolioError::InvalidQuantity)?;
        let profit_loss = proceeds - holding.avg_price * sold;
        holding.quantity -= quantity;
        let stock_name = holding.stock_name.clone();
        if holding.quantity == 0 {
            self.holdings.remove(stock_code);
        }

        self.cash += proceeds;

        let transaction = Transaction {
            kind: TransactionType::Sell,
            stock_code: stock_code.to_string(),
            stock_name,
            quantity,
            price,
            total: proceeds,
            date,
            timestamp: Utc::now(),
            cash_after: self.cash,
            profit_loss: Some(profit_loss),
        };
        tracing::debug!(
            "{}: sold {} {} at {} (P/L {})",
            self.name,
            quantity,
            stock_code,
            price,
            profit_loss
        );
        Ok(self.record(transaction))
    }

    fn record(&mut self, transaction: Transaction) -> Transaction {
        let overrides = PriceMap::from([(transaction.stock_code.clone(), transaction.price)]);
        self.record_daily_value(transaction.date, &overrides);
        self.transactions.push(transaction.clone());
        transaction
    }

    /// Store the portfolio value for `date`, valuing holdings at their
    /// average price unless overridden. A later write for the same date
    /// replaces the earlier one.
    pub fn record_daily_value(&mut self, date: NaiveDate, overrides: &PriceMap) {
        let mut prices: PriceMap = self
            .holdings
            .iter()
            .map(|(code, h)| (code.clone(), h.avg_price))
            .collect();
        prices.extend(overrides.iter().map(|(c, p)| (c.clone(), *p)));
        let value = self.current_value(&prices);

        match self.daily_values.iter_mut().rev().find(|d| d.date == date) {
            Some(entry) => entry.value = value,
            None => self.daily_values.push(DailyValue { date, value }),
        }
    }

    pub(crate) fn price_of(&self, stock_code: &str, holding: &Holding, prices: &PriceMap) -> Decimal {
        prices.get(stock_code).copied().unwrap_or(holding.avg_price)
    }

    pub fn holdings_value(&self, prices: &PriceMap) -> Decimal {
        self.holdings
            .iter()
            .map(|(code, h)| self.price_of(code, h, prices) * Decimal::from(h.quantity))
            .sum()
    }

    pub fn current_value(&self, prices: &PriceMap) -> Decimal {
        self.cash + self.holdings_value(prices)
    }

    pub fn realized_profit(&self) -> Decimal {
        self.transactions.iter().filter_map(|t| t.profit_loss).sum()
    }

    pub fn unrealized_profit(&self, prices: &PriceMap) -> Decimal {
        self.holdings_value(prices) - self.holdings.values().map(Holding::cost_basis).sum::<Decimal>()
    }

    /// Most recent first, optionally restricted to one transaction type.
    pub fn transaction_history(&self, limit: Option<usize>, kind: Option<TransactionType>) -> Vec<Transaction> {
        self.transactions
            .iter()
            .rev()
            .filter(|t| kind.map_or(true, |k| t.kind == k))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    pub fn take_snapshot(&mut self, prices: &PriceMap, date: NaiveDate) -> Snapshot {
        let snapshot = Snapshot {
            date,
            total_value: self.current_value(prices),
            cash: self.cash,
            holdings_value: self.holdings_value(prices),
            num_positions: self.holdings.len(),
            timestamp: Utc::now(),
        };
        self.snapshots.push(snapshot.clone());
        snapshot
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PortfolioError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        tracing::info!("Saved portfolio '{}' to {}", self.name, path.display());
        Ok(())
    }

    /// Load a saved portfolio. Files written before daily values were
    /// tracked get them rebuilt from the snapshots.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PortfolioError> {
        let content = fs::read_to_string(path.as_ref())?;
        let mut portfolio: Portfolio = serde_json::from_str(&content)?;
        if portfolio.daily_values.is_empty() && !portfolio.snapshots.is_empty() {
            portfolio.daily_values = portfolio
                .snapshots
                .iter()
                .map(|s| DailyValue {
                    date: s.date,
                    value: s.total_value,
                })
                .collect();
        }
        Ok(portfolio)
    }

    /// Write every transaction as a CSV row, oldest first. Returns the
    /// number of rows written.
    pub fn export_transactions_csv<W: Write>(&self, writer: W) -> Result<usize, PortfolioError> {
        let mut wtr = csv::Writer::from_writer(writer);
        for transaction in &self.transactions {
            wtr.serialize(transaction)?;
        }
        wtr.flush()?;
        Ok(self.transactions.len())
    }
}
