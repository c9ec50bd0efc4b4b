//! BVMT historical data: CSV ingestion, the in-memory `StockStore`, and the
//! per-row features used by the anomaly detector.

pub mod error;
pub mod features;
pub mod loader;
pub mod names;
pub mod store;

#[cfg(test)]
mod store_tests;

pub use error::DataError;
pub use features::{engineer_features, FeatureRow};
pub use loader::{load_csv, load_dir, load_path, parse_reader};
pub use names::{known_stock_name, STOCK_NAMES};
pub use store::{LiquidityRank, StockStore, StockSummary};
