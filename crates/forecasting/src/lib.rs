//! Short-horizon price forecasts for BVMT stocks.

pub mod forecaster;
pub mod model;
pub mod trend;

pub use forecaster::Forecaster;
pub use model::{Forecast, ForecastMetrics, ForecastPoint};
pub use trend::{TrendAnalysis, TrendLabel};
