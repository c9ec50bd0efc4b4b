pub mod error;
pub mod manager;
pub mod metrics;
pub mod portfolio;

#[cfg(test)]
mod portfolio_tests;

pub use error::PortfolioError;
pub use manager::PortfolioManager;
pub use metrics::{daily_returns, max_drawdown_pct, sharpe_ratio, PerformanceMetrics, PositionDetail, CASH_KEY};
pub use portfolio::{
    DailyValue, Holding, Portfolio, PriceMap, Snapshot, Transaction, TransactionType, DEFAULT_CAPITAL,
    DEFAULT_NAME,
};
