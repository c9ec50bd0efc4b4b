use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;

/// Server settings, read from `BVMT_*` environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// CSV file or directory of CSV files
    pub data_dir: PathBuf,
    pub news_cache: PathBuf,
    pub alerts_file: PathBuf,
    /// Serve the deterministic demo scenarios instead of real data
    pub use_mocks: bool,
    pub initial_capital: Decimal,
    /// auto, llm, ml or keywords
    pub sentiment_method: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            data_dir: PathBuf::from("data/raw"),
            news_cache: PathBuf::from("data/news_cache.json"),
            alerts_file: PathBuf::from("data/alerts.json"),
            use_mocks: false,
            initial_capital: portfolio_manager::DEFAULT_CAPITAL,
            sentiment_method: "auto".to_string(),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("BVMT_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(defaults.port);

        let initial_capital = std::env::var("BVMT_INITIAL_CAPITAL")
            .ok()
            .and_then(|v| Decimal::from_str(v.trim()).ok())
            .filter(|c| *c > Decimal::ZERO)
            .unwrap_or(defaults.initial_capital);

        Self {
            host: std::env::var("BVMT_HOST").unwrap_or(defaults.host),
            port,
            data_dir: std::env::var("BVMT_DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            news_cache: std::env::var("BVMT_NEWS_CACHE")
                .map(PathBuf::from)
                .unwrap_or(defaults.news_cache),
            alerts_file: std::env::var("BVMT_ALERTS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.alerts_file),
            use_mocks: std::env::var("BVMT_USE_MOCKS").map(|v| parse_flag(&v)).unwrap_or(false),
            initial_capital,
            sentiment_method: std::env::var("BVMT_SENTIMENT_METHOD").unwrap_or(defaults.sentiment_method),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
        assert_eq!(config.initial_capital, Decimal::from(10000));
        assert!(!config.use_mocks);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" 1 "));
        assert!(parse_flag("YES"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }
}
